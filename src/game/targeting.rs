//! Target resolution for spell effects
//!
//! Everything resolves synchronously except manual selection, which hands a
//! [`ManualTargetingRequest`] to the registered UI callback and returns a
//! [`PendingTargeting`] future. The pending side holds a snapshot of the
//! eligible entities, so the roster is not borrowed while waiting.

use crate::core::{CardInstance, InstanceId, Rarity, SpellEffect, SpellTargetType, TagId, TargetCriteria};
use crate::game::state::Roster;
use rand::seq::SliceRandom;
use rand::RngCore;
use smallvec::SmallVec;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

pub type TargetList = SmallVec<[InstanceId; 4]>;

/// Abstract target specification of one effect
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    SelfTarget,
    Opponent,
    All,
    Tagged(Option<TagId>),
    Random { count: usize },
    Manual { count: usize, criteria: TargetCriteria },
}

impl TargetSpec {
    pub fn from_effect(effect: &SpellEffect) -> Self {
        let count = effect.target_count.unwrap_or(1);
        match effect.target_type {
            SpellTargetType::SelfTarget => TargetSpec::SelfTarget,
            SpellTargetType::Opponent => TargetSpec::Opponent,
            SpellTargetType::All => TargetSpec::All,
            SpellTargetType::Tagged => TargetSpec::Tagged(effect.tag_target),
            SpellTargetType::Random => TargetSpec::Random { count },
            SpellTargetType::Manual => TargetSpec::Manual {
                count,
                criteria: effect.criteria.clone().unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetingResult {
    pub id: u64,
    pub targets: TargetList,
    pub success: bool,
    pub error: Option<String>,
}

impl TargetingResult {
    fn found(id: u64, targets: TargetList) -> Self {
        TargetingResult {
            id,
            targets,
            success: true,
            error: None,
        }
    }

    fn failed(id: u64, error: impl Into<String>) -> Self {
        TargetingResult {
            id,
            targets: TargetList::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// What a manual-selection validator needs to know about an entity
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfile {
    pub id: InstanceId,
    pub tags: Vec<TagId>,
    pub rarity: Rarity,
    pub health_percent: f64,
}

impl TargetProfile {
    pub fn of(entity: &CardInstance) -> Self {
        TargetProfile {
            id: entity.id,
            tags: entity.active_tags.iter().map(|t| t.tag.id).collect(),
            rarity: entity.card.rarity,
            health_percent: entity.health_percentage(),
        }
    }

    pub fn matches(&self, criteria: &TargetCriteria) -> bool {
        if !criteria.by_tag.is_empty() && !criteria.by_tag.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        if !criteria.by_rarity.is_empty() && !criteria.by_rarity.contains(&self.rarity) {
            return false;
        }
        if let Some(range) = criteria.by_health_percent {
            if range.min.is_some_and(|min| self.health_percent < min) {
                return false;
            }
            if range.max.is_some_and(|max| self.health_percent > max) {
                return false;
            }
        }
        !criteria.exclude_tags.iter().any(|tag| self.tags.contains(tag))
    }
}

#[derive(Debug)]
enum ManualSelection {
    Selected(Vec<InstanceId>),
    Cancelled,
}

type SelectionSlot = Mutex<Option<oneshot::Sender<ManualSelection>>>;

/// Answer side of a manual request, cloneable for UI code
///
/// Only the first `complete` or `cancel` is delivered. Dropping every clone
/// without answering cancels the request.
#[derive(Debug, Clone)]
pub struct ManualSelectionHandle {
    request_id: u64,
    sender: Arc<SelectionSlot>,
}

impl ManualSelectionHandle {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Deliver the chosen targets; false if the request was already answered
    pub fn complete(&self, targets: Vec<InstanceId>) -> bool {
        deliver(&self.sender, ManualSelection::Selected(targets))
    }

    pub fn cancel(&self) -> bool {
        deliver(&self.sender, ManualSelection::Cancelled)
    }
}

fn deliver(slot: &SelectionSlot, selection: ManualSelection) -> bool {
    let Ok(mut guard) = slot.lock() else {
        return false;
    };
    match guard.take() {
        Some(sender) => sender.send(selection).is_ok(),
        None => false,
    }
}

/// What the UI callback receives
#[derive(Debug, Clone)]
pub struct ManualTargetingRequest {
    pub request_id: u64,
    pub source: InstanceId,
    pub possible_targets: Vec<InstanceId>,
    pub min_targets: usize,
    pub max_targets: usize,
    pub criteria: TargetCriteria,
    pub handle: ManualSelectionHandle,
}

/// A manual selection waiting for the UI
#[derive(Debug)]
pub struct PendingTargeting {
    request_id: u64,
    receiver: oneshot::Receiver<ManualSelection>,
    candidates: Vec<TargetProfile>,
    criteria: TargetCriteria,
    count: usize,
    timeout: Option<Duration>,
}

impl PendingTargeting {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Wait for the UI answer and validate it
    pub async fn wait(self) -> TargetingResult {
        let id = self.request_id;
        let answer = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(answer) => answer,
                Err(_) => return TargetingResult::failed(id, "manual target selection timed out"),
            },
            None => self.receiver.await,
        };

        match answer {
            Ok(ManualSelection::Selected(targets)) => {
                validate_selection(id, &targets, &self.candidates, &self.criteria, self.count)
            }
            Ok(ManualSelection::Cancelled) | Err(_) => {
                TargetingResult::failed(id, "manual target selection cancelled")
            }
        }
    }
}

fn validate_selection(
    id: u64,
    targets: &[InstanceId],
    candidates: &[TargetProfile],
    criteria: &TargetCriteria,
    count: usize,
) -> TargetingResult {
    if targets.is_empty() {
        return TargetingResult::failed(id, "no target selected");
    }
    if targets.len() > count {
        return TargetingResult::failed(id, format!("too many targets: {} selected, {count} allowed", targets.len()));
    }
    let valid = targets.iter().all(|target| {
        candidates
            .iter()
            .any(|profile| profile.id == *target && profile.matches(criteria))
    });
    if !valid {
        return TargetingResult::failed(id, "invalid targets");
    }
    TargetingResult::found(id, targets.iter().copied().collect())
}

/// Result of [`TargetingService::resolve`]
#[derive(Debug)]
pub enum TargetingRequest {
    Ready(TargetingResult),
    Pending(PendingTargeting),
}

impl TargetingRequest {
    /// Resolve to a final result, waiting on manual selection if needed
    pub async fn into_result(self) -> TargetingResult {
        match self {
            TargetingRequest::Ready(result) => result,
            TargetingRequest::Pending(pending) => pending.wait().await,
        }
    }

    pub fn ready(self) -> Option<TargetingResult> {
        match self {
            TargetingRequest::Ready(result) => Some(result),
            TargetingRequest::Pending(_) => None,
        }
    }
}

pub type ManualTargetingCallback = Box<dyn Fn(ManualTargetingRequest) + Send + Sync>;

/// Turns target specifications into entity lists
pub struct TargetingService {
    next_request_id: u64,
    manual_callback: Option<ManualTargetingCallback>,
    pending: Vec<(u64, Weak<SelectionSlot>)>,
    timeout: Option<Duration>,
}

impl TargetingService {
    pub fn new(timeout: Option<Duration>) -> Self {
        TargetingService {
            next_request_id: 1,
            manual_callback: None,
            pending: Vec::new(),
            timeout,
        }
    }

    pub fn register_manual_callback<F>(&mut self, callback: F)
    where
        F: Fn(ManualTargetingRequest) + Send + Sync + 'static,
    {
        self.manual_callback = Some(Box::new(callback));
    }

    pub fn clear_manual_callback(&mut self) {
        self.manual_callback = None;
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    pub fn resolve(
        &mut self,
        source: InstanceId,
        spec: &TargetSpec,
        roster: &Roster,
        rng: &mut dyn RngCore,
    ) -> TargetingRequest {
        let id = self.next_id();
        let others = || roster.ids().iter().copied().filter(|t| *t != source);

        let targets: TargetList = match spec {
            TargetSpec::SelfTarget => {
                if !roster.contains(source) {
                    return TargetingRequest::Ready(TargetingResult::failed(id, format!("source {source} not found")));
                }
                std::iter::once(source).collect()
            }
            TargetSpec::Opponent => others().collect(),
            TargetSpec::All => roster.ids().iter().copied().collect(),
            TargetSpec::Tagged(None) => {
                return TargetingRequest::Ready(TargetingResult::failed(id, "tagged targeting without a tag"));
            }
            TargetSpec::Tagged(Some(tag)) => roster
                .iter()
                .filter(|(_, entity)| entity.has_tag(*tag))
                .map(|(target, _)| target)
                .collect(),
            TargetSpec::Random { count } => {
                let pool: Vec<InstanceId> = others().collect();
                if pool.is_empty() {
                    return TargetingRequest::Ready(TargetingResult::failed(id, "no target available for random targeting"));
                }
                pool.choose_multiple(rng, *count).copied().collect()
            }
            TargetSpec::Manual { count, criteria } => {
                return self.request_manual(id, source, *count, criteria, roster);
            }
        };

        if targets.is_empty() {
            return TargetingRequest::Ready(TargetingResult::failed(id, "no target matches"));
        }
        TargetingRequest::Ready(TargetingResult::found(id, targets))
    }

    fn request_manual(
        &mut self,
        id: u64,
        source: InstanceId,
        count: usize,
        criteria: &TargetCriteria,
        roster: &Roster,
    ) -> TargetingRequest {
        if self.manual_callback.is_none() {
            return TargetingRequest::Ready(TargetingResult::failed(id, "manual targeting is not configured"));
        }

        let candidates: Vec<TargetProfile> = roster
            .iter()
            .filter(|(target, _)| *target != source)
            .map(|(_, entity)| TargetProfile::of(entity))
            .collect();

        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        self.pending.retain(|(_, weak)| weak.strong_count() > 0);
        self.pending.push((id, Arc::downgrade(&slot)));

        let request = ManualTargetingRequest {
            request_id: id,
            source,
            possible_targets: candidates.iter().map(|c| c.id).collect(),
            min_targets: 1,
            max_targets: count,
            criteria: criteria.clone(),
            handle: ManualSelectionHandle {
                request_id: id,
                sender: slot,
            },
        };
        if let Some(callback) = &self.manual_callback {
            callback(request);
        }

        TargetingRequest::Pending(PendingTargeting {
            request_id: id,
            receiver: rx,
            candidates,
            criteria: criteria.clone(),
            count,
            timeout: self.timeout,
        })
    }

    /// Requests the UI still holds a handle for
    pub fn pending_count(&self) -> usize {
        self.pending
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .filter(|slot| {
                slot.lock()
                    .map(|s| s.as_ref().is_some_and(|tx| !tx.is_closed()))
                    .unwrap_or(false)
            })
            .count()
    }

    /// Cancel every outstanding manual request; returns how many were live
    pub fn clear_pending_operations(&mut self) -> usize {
        self.pending
            .drain(..)
            .filter_map(|(_, weak)| weak.upgrade())
            .filter(|slot| deliver(slot, ManualSelection::Cancelled))
            .count()
    }
}

impl Default for TargetingService {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for TargetingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetingService")
            .field("next_request_id", &self.next_request_id)
            .field("has_manual_callback", &self.manual_callback.is_some())
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Keep the targets that exist and satisfy `criteria`
pub fn validate_targets(targets: &[InstanceId], criteria: &TargetCriteria, roster: &Roster) -> Vec<InstanceId> {
    targets
        .iter()
        .copied()
        .filter(|id| {
            roster
                .get(*id)
                .map(|entity| TargetProfile::of(entity).matches(criteria))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardId, HealthPercentRange, Tag};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn roster_of(n: u32) -> Roster {
        let mut roster = Roster::new();
        for i in 1..=n {
            let id = roster.next_id();
            let card = Arc::new(Card::character(CardId::new(i), format!("Unit {i}"), 10, 1.0, 0.0));
            roster.insert(id, CardInstance::new(id, card, None));
        }
        roster
    }

    fn ready(request: TargetingRequest) -> TargetingResult {
        request.ready().expect("synchronous targeting")
    }

    #[test]
    fn test_self_and_opponent() {
        let roster = roster_of(3);
        let mut service = TargetingService::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let source = InstanceId::new(2);

        let me = ready(service.resolve(source, &TargetSpec::SelfTarget, &roster, &mut rng));
        assert_eq!(me.targets.as_slice(), &[source]);

        let others = ready(service.resolve(source, &TargetSpec::Opponent, &roster, &mut rng));
        assert_eq!(others.targets.as_slice(), &[InstanceId::new(1), InstanceId::new(3)]);

        let all = ready(service.resolve(source, &TargetSpec::All, &roster, &mut rng));
        assert_eq!(all.targets.len(), 3);
        assert_ne!(me.id, others.id);
    }

    #[test]
    fn test_tagged_targets() {
        let mut roster = roster_of(3);
        let night = Arc::new(Tag::new(TagId::new(7), "NUIT"));
        roster.get_mut(InstanceId::new(3)).unwrap().add_tag(night, false, None);
        let mut service = TargetingService::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let source = InstanceId::new(1);

        let tagged = ready(service.resolve(source, &TargetSpec::Tagged(Some(TagId::new(7))), &roster, &mut rng));
        assert_eq!(tagged.targets.as_slice(), &[InstanceId::new(3)]);

        let unknown = ready(service.resolve(source, &TargetSpec::Tagged(Some(TagId::new(99))), &roster, &mut rng));
        assert!(!unknown.success);
        assert!(unknown.targets.is_empty());

        let untagged = ready(service.resolve(source, &TargetSpec::Tagged(None), &roster, &mut rng));
        assert!(!untagged.success);
    }

    #[test]
    fn test_random_never_returns_source() {
        let roster = roster_of(5);
        let mut service = TargetingService::default();
        let source = InstanceId::new(3);
        for seed in 0..50 {
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let result = ready(service.resolve(source, &TargetSpec::Random { count: 2 }, &roster, &mut rng));
            assert!(result.success);
            assert_eq!(result.targets.len(), 2);
            assert!(!result.targets.contains(&source));
            assert_ne!(result.targets[0], result.targets[1]);
        }

        let alone = roster_of(1);
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let result = ready(service.resolve(InstanceId::new(1), &TargetSpec::Random { count: 1 }, &alone, &mut rng));
        assert!(!result.success);
    }

    #[test]
    fn test_manual_without_callback_fails_immediately() {
        let roster = roster_of(2);
        let mut service = TargetingService::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let spec = TargetSpec::Manual {
            count: 1,
            criteria: TargetCriteria::default(),
        };
        let result = ready(service.resolve(InstanceId::new(1), &spec, &roster, &mut rng));
        assert_eq!(result.error.as_deref(), Some("manual targeting is not configured"));
    }

    #[test]
    fn test_spec_from_effect() {
        let mut effect = SpellEffect::new(crate::core::SpellEffectKind::Damage, 3.0, SpellTargetType::Random);
        effect.target_count = Some(2);
        assert_eq!(TargetSpec::from_effect(&effect), TargetSpec::Random { count: 2 });
        effect.target_type = SpellTargetType::Tagged;
        effect.tag_target = Some(TagId::new(4));
        assert_eq!(TargetSpec::from_effect(&effect), TargetSpec::Tagged(Some(TagId::new(4))));
    }

    #[test]
    fn test_validate_targets_applies_criteria() {
        let mut roster = roster_of(3);
        roster.get_mut(InstanceId::new(2)).unwrap().apply_damage(8.0, None);
        let criteria = TargetCriteria {
            by_health_percent: Some(HealthPercentRange {
                min: None,
                max: Some(50.0),
            }),
            ..TargetCriteria::default()
        };
        let valid = validate_targets(
            &[InstanceId::new(1), InstanceId::new(2), InstanceId::new(42)],
            &criteria,
            &roster,
        );
        assert_eq!(valid, vec![InstanceId::new(2)]);
    }

    #[test]
    fn test_profile_exclusions() {
        let profile = TargetProfile {
            id: InstanceId::new(1),
            tags: vec![TagId::new(1)],
            rarity: Rarity::Banger,
            health_percent: 100.0,
        };
        assert!(profile.matches(&TargetCriteria::default()));
        assert!(profile.matches(&TargetCriteria {
            by_rarity: vec![Rarity::Banger],
            ..TargetCriteria::default()
        }));
        assert!(!profile.matches(&TargetCriteria {
            exclude_tags: vec![TagId::new(1)],
            ..TargetCriteria::default()
        }));
        assert!(!profile.matches(&TargetCriteria {
            by_tag: vec![TagId::new(2)],
            ..TargetCriteria::default()
        }));
    }

    fn manual_service(answer: impl Fn(ManualTargetingRequest) + Send + Sync + 'static) -> TargetingService {
        let mut service = TargetingService::new(Some(Duration::from_millis(50)));
        service.register_manual_callback(answer);
        service
    }

    fn manual_spec(count: usize) -> TargetSpec {
        TargetSpec::Manual {
            count,
            criteria: TargetCriteria::default(),
        }
    }

    #[tokio::test]
    async fn test_manual_selection_completes() {
        let roster = roster_of(4);
        let mut service = manual_service(|request| {
            assert!(!request.possible_targets.contains(&request.source));
            request.handle.complete(vec![InstanceId::new(3), InstanceId::new(4)]);
        });
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let result = service
            .resolve(InstanceId::new(1), &manual_spec(2), &roster, &mut rng)
            .into_result()
            .await;
        assert!(result.success);
        assert_eq!(result.targets.as_slice(), &[InstanceId::new(3), InstanceId::new(4)]);
    }

    #[tokio::test]
    async fn test_manual_selection_over_count_is_rejected() {
        let roster = roster_of(4);
        let mut service = manual_service(|request| {
            request.handle.complete(vec![InstanceId::new(3), InstanceId::new(4)]);
        });
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let result = service
            .resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng)
            .into_result()
            .await;
        assert!(!result.success);
        assert!(result.targets.is_empty());
        assert_eq!(
            result.error.as_deref(),
            Some("too many targets: 2 selected, 1 allowed")
        );
    }

    #[tokio::test]
    async fn test_manual_selection_rejects_source() {
        let roster = roster_of(2);
        let mut service = manual_service(|request| {
            request.handle.complete(vec![request.source]);
        });
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let result = service
            .resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng)
            .into_result()
            .await;
        assert_eq!(result.error.as_deref(), Some("invalid targets"));
    }

    #[tokio::test]
    async fn test_manual_cancel_and_drop() {
        let roster = roster_of(2);
        let mut rng = ChaCha12Rng::seed_from_u64(1);

        let mut service = manual_service(|request| {
            assert!(request.handle.cancel());
            assert!(!request.handle.complete(vec![InstanceId::new(2)]));
        });
        let result = service
            .resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng)
            .into_result()
            .await;
        assert_eq!(result.error.as_deref(), Some("manual target selection cancelled"));

        let mut service = manual_service(|_request| {});
        let result = service
            .resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng)
            .into_result()
            .await;
        assert_eq!(result.error.as_deref(), Some("manual target selection cancelled"));
    }

    #[tokio::test]
    async fn test_manual_timeout_and_clear_pending() {
        let roster = roster_of(2);
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let mut service = manual_service(move |request| keep.lock().unwrap().push(request.handle));

        let pending = service.resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng);
        assert_eq!(service.pending_count(), 1);
        let result = pending.into_result().await;
        assert_eq!(result.error.as_deref(), Some("manual target selection timed out"));

        assert_eq!(service.pending_count(), 0);

        let pending = service.resolve(InstanceId::new(1), &manual_spec(1), &roster, &mut rng);
        assert_eq!(service.clear_pending_operations(), 1);
        assert_eq!(service.pending_count(), 0);
        let result = pending.into_result().await;
        assert_eq!(result.error.as_deref(), Some("manual target selection cancelled"));
    }
}

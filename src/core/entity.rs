//! Battlefield entity storage keyed by instance id

use crate::core::InstanceId;
use crate::{CombatError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Central storage for live battle entities
///
/// Lookups go through an FxHashMap; iteration follows insertion order so that
/// "all entities" always means the same sequence for a given battle. Target
/// resolution and random draws depend on that order being reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStore<T> {
    entities: FxHashMap<InstanceId, T>,
    order: Vec<InstanceId>,
    next_id: u32,
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        EntityStore {
            entities: FxHashMap::default(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Generate a new unique InstanceId
    pub fn next_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert an entity with a specific ID, replacing any previous one
    pub fn insert(&mut self, id: InstanceId, entity: T) {
        if self.entities.insert(id, entity).is_none() {
            self.order.push(id);
        }
        if id.as_u32() >= self.next_id {
            self.next_id = id.as_u32() + 1;
        }
    }

    pub fn get(&self, id: InstanceId) -> Result<&T> {
        self.entities
            .get(&id)
            .ok_or(CombatError::EntityNotFound(id.as_u32()))
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Result<&mut T> {
        self.entities
            .get_mut(&id)
            .ok_or(CombatError::EntityNotFound(id.as_u32()))
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Remove an entity (defeated characters leave the battlefield)
    pub fn remove(&mut self, id: InstanceId) -> Option<T> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            self.order.retain(|other| *other != id);
        }
        removed
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[InstanceId] {
        &self.order
    }

    /// Iterate over all entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &T)> {
        self.order
            .iter()
            .filter_map(move |id| self.entities.get(id).map(|entity| (*id, entity)))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

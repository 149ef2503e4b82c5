//! Battle orchestration: planning, targeting, logging and turn flow

pub mod actions;
pub mod attack_conditions;
pub mod combat;
pub mod conversion;
pub mod lieu;
pub mod logger;
pub mod state;
pub mod targeting;

pub use actions::{
    ActionData, ActionDraft, ActionKind, ActionResolver, ConflictDetails, ConflictKind, ConflictResolution,
    ConflictResolutionConfig, PlannedAction, ResolutionReport, ResolutionStrategy, ResourceLookup,
};
pub use attack_conditions::{base_damage, can_attack, can_attack_base, AttackCheck, AttackTarget};
pub use combat::{CombatManager, MotivationView};
pub use conversion::{batch_convert, cleanup_card_instances, convert_card_to_instance, ConversionRequest};
pub use lieu::{LieuBoard, LieuDistributionConfig};
pub use logger::{CombatLog, CombatLogEvent, LogEntry, OutputMode, VerbosityLevel};
pub use state::{BattleState, Roster};
pub use targeting::{
    validate_targets, ManualSelectionHandle, ManualTargetingRequest, PendingTargeting, TargetList, TargetSpec,
    TargetingRequest, TargetingResult, TargetingService,
};

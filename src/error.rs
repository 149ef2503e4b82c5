//! Error types for the combat engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Player not found: {0}")]
    PlayerNotFound(u32),

    #[error("Invalid combat action: {0}")]
    InvalidAction(String),

    #[error("Invalid tag rule: {0}")]
    InvalidRule(String),

    #[error("Attack not allowed: {0}")]
    AttackNotAllowed(String),

    #[error("Lieu distribution error: {0}")]
    LieuDistribution(String),

    #[error("Insufficient charisme: need {needed}, have {available}")]
    InsufficientCharisme { needed: u32, available: u32 },

    #[error("Insufficient motivation: need {needed}, have {available}")]
    InsufficientMotivation { needed: u32, available: u32 },

    #[error("Object slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CombatError {
    fn from(err: serde_json::Error) -> Self {
        CombatError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CombatError>;

//! Environment error types

use thiserror::Error;

use crate::config::RewardType;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown reward type: {0}")]
    UnknownRewardType(String),

    #[error("Reward type {0} has no goal vectors")]
    NotGoalConditioned(RewardType),

    #[error("Goal batch shape mismatch: expected rows of {expected}, got {got} values")]
    GoalShape { expected: usize, got: usize },

    #[error("Multi-agent step requires an action for the alt paddle")]
    MissingAltAction,
}

impl EnvError {
    /// Configuration faults are startup errors, never per-step conditions
    pub fn is_config_fault(&self) -> bool {
        match self {
            EnvError::Io(_) => false,
            EnvError::Json(_) => true,
            EnvError::InvalidConfig(_) => true,
            EnvError::UnknownRewardType(_) => true,
            EnvError::NotGoalConditioned(_) => true,
            EnvError::GoalShape { .. } => false,
            EnvError::MissingAltAction => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvError>;

//! Air Hockey - a 2D air hockey table as a reinforcement learning environment
//!
//! Core modules:
//! - `sim`: Deterministic episode engine (scene construction, control, contacts,
//!   termination, rewards, observations) and the built-in physics backend
//! - `env`: The reset/step/compute_reward surface exposed to training harnesses
//! - `config`: Data-driven environment parameters
//! - `spaces`: Declared observation/action bounds

pub mod config;
pub mod env;
pub mod error;
pub mod sim;
pub mod spaces;

pub use config::{EnvConfig, GoalRadiusType, Gravity, RewardType};
pub use env::{AirHockeyEnv, Observation, ResetInfo, Reward, StepInfo, StepOutcome};
pub use error::EnvError;

use glam::Vec2;

/// Environment constants shared across the simulation
pub mod consts {
    /// Velocity solver iterations per physics step
    pub const VELOCITY_ITERATIONS: u32 = 10;
    /// Position solver iterations per physics step
    pub const POSITION_ITERATIONS: u32 = 10;

    /// Home region radius as a fraction of the table width (90 / 560 px)
    pub const HOME_RADIUS_FRACTION: f32 = 0.16;

    /// Guard against division by zero when normalizing vectors
    pub const UNIT_EPSILON: f32 = 1e-8;

    /// Spawn inset from the table's short edges
    pub const EDGE_SPAWN_INSET: f32 = 0.01;
    /// Pucks never spawn above this forward coordinate
    pub const PUCK_MAX_SPAWN_HEIGHT: f32 = 30.0;
    /// Targets never spawn below this forward coordinate
    pub const TARGET_MIN_SPAWN_HEIGHT: f32 = -30.0;

    /// Largest direction-change penalty (paddle reverses against its motion)
    pub const MAX_DIRECTION_CHANGE_PENALTY: f32 = -0.05;

    /// Steepness of the shaped goal reward
    pub const GOAL_SIGMOID_SCALE: f32 = 2.0;
    /// Estimated upper bound on useful forward puck velocity
    pub const PUCK_VEL_REWARD_MAX: f32 = 2.0;
}

/// Unit vector with an epsilon-guarded magnitude (zero stays zero)
#[inline]
pub fn guarded_unit(v: Vec2) -> Vec2 {
    v / (v.length() + consts::UNIT_EPSILON)
}

/// Scale `v` down to `max` if its magnitude exceeds it, preserving direction
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    if v.length() > max {
        guarded_unit(v) * max
    } else {
        v
    }
}

/// Logistic sigmoid
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

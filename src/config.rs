//! Environment configuration
//!
//! Keys mirror the trainer's YAML/JSON parameter names so existing task
//! configs load unchanged.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnvError, Result};

/// Reward variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    /// 1 inside the goal disk, 0 outside
    GoalDiscrete,
    /// Sigmoid-shaped distance to the goal position
    GoalPosition,
    /// Position term plus velocity alignment and magnitude terms
    GoalPositionVelocity,
    /// Forward puck coordinate, normalized by half the table length
    #[default]
    PuckHeight,
    /// Forward puck velocity clamped to [0, 2]
    PuckVel,
    /// Any contact this step
    PuckTouch,
    /// Puck inside the opposing home region
    AltHome,
}

/// Layout of the achieved/desired goal vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalLayout {
    /// `[y, x]`
    Position,
    /// `[y, x, vx, vy]`
    PositionVelocity,
}

impl GoalLayout {
    pub fn len(&self) -> usize {
        match self {
            GoalLayout::Position => 2,
            GoalLayout::PositionVelocity => 4,
        }
    }
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::GoalDiscrete => "goal_discrete",
            RewardType::GoalPosition => "goal_position",
            RewardType::GoalPositionVelocity => "goal_position_velocity",
            RewardType::PuckHeight => "puck_height",
            RewardType::PuckVel => "puck_vel",
            RewardType::PuckTouch => "puck_touch",
            RewardType::AltHome => "alt_home",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "goal_discrete" => Ok(RewardType::GoalDiscrete),
            "goal_position" => Ok(RewardType::GoalPosition),
            "goal_position_velocity" => Ok(RewardType::GoalPositionVelocity),
            "puck_height" => Ok(RewardType::PuckHeight),
            "puck_vel" => Ok(RewardType::PuckVel),
            "puck_touch" => Ok(RewardType::PuckTouch),
            "alt_home" => Ok(RewardType::AltHome),
            other => Err(EnvError::UnknownRewardType(other.to_string())),
        }
    }

    /// Whether episodes sample a goal region
    pub fn samples_goal(&self) -> bool {
        matches!(
            self,
            RewardType::GoalDiscrete | RewardType::GoalPosition | RewardType::GoalPositionVelocity
        )
    }

    /// Goal vector layout, if observations are goal-wrapped
    pub fn goal_layout(&self) -> Option<GoalLayout> {
        match self {
            RewardType::GoalPosition => Some(GoalLayout::Position),
            RewardType::GoalPositionVelocity => Some(GoalLayout::PositionVelocity),
            _ => None,
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the goal acceptance radius is chosen each episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalRadiusType {
    /// Constant home-region radius
    #[default]
    Home,
    /// Curriculum: anneals from 3x base down to base over the training budget
    Fixed,
}

/// Gravity along the forward axis: constant, or sampled per episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gravity {
    Fixed(f32),
    Range([f32; 2]),
}

impl Default for Gravity {
    fn default() -> Self {
        Gravity::Fixed(-5.0)
    }
}

/// Air hockey environment parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    // === Scene ===
    /// 1 = single agent, 2 = ego vs alt
    pub num_paddles: u32,
    pub num_pucks: u32,
    pub num_blocks: u32,
    pub num_obstacles: u32,
    pub num_targets: u32,
    /// Destroy targets on puck contact
    pub absorb_target: bool,
    /// Give targets a random initial velocity instead of pinning them
    pub dynamic_targets: bool,

    // === Table ===
    /// Full extent along the forward axis
    pub length: f32,
    /// Full extent along the lateral axis
    pub width: f32,
    pub gravity: Gravity,

    // === Bodies ===
    pub puck_radius: f32,
    pub paddle_radius: f32,
    pub paddle_density: f32,
    pub puck_density: f32,
    pub paddle_damping: f32,
    pub puck_damping: f32,

    // === Control ===
    /// Force magnitude cap per control step
    pub max_force_timestep: f32,
    /// Force gain used when a paddle is confined to its own half
    pub force_scaling: f32,
    /// m/s, bounded by the robot arm
    pub max_paddle_vel: f32,
    /// Control frequency in Hz
    pub time_frequency: f32,

    // === Episode ===
    pub max_timesteps: u32,
    /// Total training budget, drives the goal radius curriculum
    pub n_training_steps: u64,
    pub terminate_on_out_of_bounds: bool,
    pub terminate_on_enemy_goal: bool,
    /// Reward for truncated steps
    pub truncate_rew: f32,
    /// Reward added when the paddle hugs a wall (0 disables)
    pub wall_bumping_rew: f32,

    // === Reward / goals ===
    pub reward_type: RewardType,
    pub goal_radius_type: GoalRadiusType,
    pub goal_max_x_velocity: f32,
    pub goal_min_y_velocity: f32,
    pub goal_max_y_velocity: f32,

    /// RNG seed for the first episode (random if absent)
    pub seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_paddles: 1,
            num_pucks: 1,
            num_blocks: 0,
            num_obstacles: 0,
            num_targets: 0,
            absorb_target: false,
            dynamic_targets: false,

            length: 10.0,
            width: 5.0,
            gravity: Gravity::default(),

            puck_radius: 0.25,
            paddle_radius: 0.25,
            paddle_density: 1.0,
            puck_density: 0.25,
            paddle_damping: 1.0,
            puck_damping: 2.0,

            max_force_timestep: 100.0,
            force_scaling: 1000.0,
            max_paddle_vel: 1.5,
            time_frequency: 20.0,

            max_timesteps: 1000,
            n_training_steps: 1_000_000,
            terminate_on_out_of_bounds: false,
            terminate_on_enemy_goal: false,
            truncate_rew: -1.0,
            wall_bumping_rew: 0.0,

            reward_type: RewardType::default(),
            goal_radius_type: GoalRadiusType::default(),
            goal_max_x_velocity: 1.0,
            goal_min_y_velocity: 0.5,
            goal_max_y_velocity: 2.0,

            seed: None,
        }
    }
}

impl EnvConfig {
    /// Parse a JSON config and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded environment config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn multiagent(&self) -> bool {
        self.num_paddles == 2
    }

    /// Seconds per control step
    pub fn time_per_step(&self) -> f32 {
        1.0 / self.time_frequency
    }

    /// Reject configurations the engine cannot run
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EnvError::InvalidConfig(msg));

        if !(1..=2).contains(&self.num_paddles) {
            return invalid(format!("num_paddles must be 1 or 2, got {}", self.num_paddles));
        }
        if self.num_pucks == 0 {
            return invalid("num_pucks must be at least 1".to_string());
        }
        let positive = [
            ("length", self.length),
            ("width", self.width),
            ("puck_radius", self.puck_radius),
            ("paddle_radius", self.paddle_radius),
            ("paddle_density", self.paddle_density),
            ("puck_density", self.puck_density),
            ("max_paddle_vel", self.max_paddle_vel),
            ("max_force_timestep", self.max_force_timestep),
            ("time_frequency", self.time_frequency),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        if self.goal_radius_type == GoalRadiusType::Fixed && self.n_training_steps == 0 {
            return invalid("n_training_steps must be positive for a fixed goal radius".to_string());
        }
        if let Gravity::Range([low, high]) = self.gravity {
            if low > high {
                return invalid(format!("gravity range [{low}, {high}] is inverted"));
            }
        }
        if self.goal_min_y_velocity > self.goal_max_y_velocity {
            return invalid("goal_min_y_velocity exceeds goal_max_y_velocity".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_type_round_trip_names() {
        for name in ["goal_discrete", "goal_position", "puck_vel", "alt_home"] {
            assert_eq!(RewardType::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_unknown_reward_type() {
        let err = RewardType::parse("puck_spin").unwrap_err();
        assert!(matches!(err, EnvError::UnknownRewardType(ref s) if s == "puck_spin"));
        assert!(err.is_config_fault());
    }

    #[test]
    fn test_goal_layouts() {
        assert_eq!(RewardType::GoalPosition.goal_layout(), Some(GoalLayout::Position));
        assert_eq!(RewardType::GoalPositionVelocity.goal_layout().map(|l| l.len()), Some(4));
        assert_eq!(RewardType::GoalDiscrete.goal_layout(), None);
        assert!(RewardType::GoalDiscrete.samples_goal());
        assert!(!RewardType::PuckTouch.samples_goal());
    }

    #[test]
    fn test_parse_json_with_defaults() {
        let config = EnvConfig::from_json_str(
            r#"{"num_paddles": 2, "reward_type": "goal_position", "gravity": [-6.0, -4.0]}"#,
        )
        .unwrap();
        assert!(config.multiagent());
        assert_eq!(config.reward_type, RewardType::GoalPosition);
        assert_eq!(config.gravity, Gravity::Range([-6.0, -4.0]));
        assert_eq!(config.max_timesteps, 1000);
        assert!((config.time_per_step() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_parse_scalar_gravity() {
        let config = EnvConfig::from_json_str(r#"{"gravity": -3.5}"#).unwrap();
        assert_eq!(config.gravity, Gravity::Fixed(-3.5));
    }

    #[test]
    fn test_unknown_reward_in_json_is_config_fault() {
        let err = EnvConfig::from_json_str(r#"{"reward_type": "nope"}"#).unwrap_err();
        assert!(err.is_config_fault());
    }

    #[test]
    fn test_validate_rejects_three_paddles() {
        let config = EnvConfig {
            num_paddles: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let config = EnvConfig {
            width: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

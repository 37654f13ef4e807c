//! Declared observation and action bounds
//!
//! Bounds are advisory: the simulation never clamps observations to them.

use serde::{Deserialize, Serialize};

use crate::config::{EnvConfig, GoalLayout};
use crate::sim::OBSERVATION_SIZE;

/// Continuous box with per-dimension bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        debug_assert_eq!(low.len(), high.len());
        Self { low, high }
    }

    /// Same bounds on every dimension
    pub fn uniform(len: usize, low: f32, high: f32) -> Self {
        Self::new(vec![low; len], vec![high; len])
    }

    pub fn shape(&self) -> [usize; 1] {
        [self.low.len()]
    }

    pub fn contains(&self, value: &[f32]) -> bool {
        value.len() == self.low.len()
            && value
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }
}

/// Observation space, matching the observation shape the env emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationSpace {
    Flat(BoxSpace),
    Goal {
        observation: BoxSpace,
        desired_goal: BoxSpace,
        achieved_goal: BoxSpace,
    },
    /// One box per paddle, each in its own frame
    Joint { ego: BoxSpace, alt: BoxSpace },
}

/// Upper bound on puck speed: a full-force paddle hit transferred to the puck
pub fn max_puck_vel(config: &EnvConfig) -> f32 {
    let area = |r: f32| std::f32::consts::PI * r * r;
    let paddle_mass = config.paddle_density * area(config.paddle_radius);
    let puck_mass = config.puck_density * area(config.puck_radius);
    let dt = config.time_per_step();
    let max_force = paddle_mass * config.max_paddle_vel / dt;
    max_force / puck_mass * dt
}

/// Bounds of one agent's observation
pub fn agent_observation_space(config: &EnvConfig) -> BoxSpace {
    let (x_max, y_max) = (config.width / 2.0, config.length / 2.0);
    let paddle_vel = config.max_paddle_vel;
    let puck_vel = max_puck_vel(config);
    let low = vec![
        -x_max,
        -y_max,
        -paddle_vel,
        -paddle_vel,
        -x_max,
        -y_max,
        -puck_vel,
        -puck_vel,
    ];
    let high = vec![x_max, y_max, paddle_vel, paddle_vel, x_max, y_max, puck_vel, puck_vel];
    debug_assert_eq!(low.len(), OBSERVATION_SIZE);
    BoxSpace::new(low, high)
}

/// Bounds of goal vectors (forward-first, goals lie on the far half)
pub fn goal_space(config: &EnvConfig, layout: GoalLayout) -> BoxSpace {
    let (x_max, y_max) = (config.width / 2.0, config.length / 2.0);
    let mut low = vec![0.0, -x_max];
    let mut high = vec![y_max, x_max];
    if layout == GoalLayout::PositionVelocity {
        let puck_vel = max_puck_vel(config);
        low.extend([-puck_vel, -puck_vel]);
        high.extend([puck_vel, puck_vel]);
    }
    BoxSpace::new(low, high)
}

pub fn observation_space(config: &EnvConfig) -> ObservationSpace {
    let observation = agent_observation_space(config);
    if config.multiagent() {
        // Mirrored bounds are symmetric, so both sides share one box
        return ObservationSpace::Joint {
            alt: observation.clone(),
            ego: observation,
        };
    }
    match config.reward_type.goal_layout() {
        Some(layout) => ObservationSpace::Goal {
            observation,
            desired_goal: goal_space(config, layout),
            achieved_goal: goal_space(config, layout),
        },
        None => ObservationSpace::Flat(observation),
    }
}

/// Positional deltas in [-1, 1] per axis
pub fn action_space() -> BoxSpace {
    BoxSpace::uniform(2, -1.0, 1.0)
}

pub fn reward_range() -> (f32, f32) {
    (0.0, 1.0)
}

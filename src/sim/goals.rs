//! Goal regions and goal vectors
//!
//! Internally every point is in the body frame (`x` lateral, `y` forward).
//! Goal vectors handed to learners are ordered forward-first (`[y, x]`), and
//! goal overrides arrive in the same order. This module is the only place
//! that ordering is swapped.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::factory::uniform;
use super::state::Table;
use crate::config::{EnvConfig, GoalLayout, GoalRadiusType, RewardType};
use crate::error::{EnvError, Result};

/// A goal region for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub position: Vec2,
    /// Desired puck velocity on arrival
    pub velocity: Vec2,
    pub radius: f32,
}

impl Goal {
    /// Whether `point` lies strictly inside the goal disk
    pub fn contains(&self, point: Vec2) -> bool {
        within_region(point, self.position, self.radius)
    }
}

/// Goals for the current episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub ego: Goal,
    /// Only sampled in multi-agent episodes
    pub alt: Option<Goal>,
}

/// Point-in-disk test shared by home and goal regions
#[inline]
pub fn within_region(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance(center) < radius
}

/// Body-frame point from a forward-first `[y, x]` pair
#[inline]
pub fn from_goal_order(pair: [f32; 2]) -> Vec2 {
    Vec2::new(pair[1], pair[0])
}

/// Forward-first `[y, x]` pair from a body-frame point
#[inline]
pub fn to_goal_order(point: Vec2) -> [f32; 2] {
    [point.y, point.x]
}

/// Goal vector for `layout` from a position and a velocity
fn goal_vector(layout: GoalLayout, position: Vec2, velocity: Vec2) -> Vec<f32> {
    let [a, b] = to_goal_order(position);
    match layout {
        GoalLayout::Position => vec![a, b],
        GoalLayout::PositionVelocity => vec![a, b, velocity.x, velocity.y],
    }
}

/// What the puck has achieved: its position (and velocity)
pub fn achieved_goal(reward_type: RewardType, puck_position: Vec2, puck_velocity: Vec2) -> Result<Vec<f32>> {
    let layout = reward_type
        .goal_layout()
        .ok_or(EnvError::NotGoalConditioned(reward_type))?;
    Ok(goal_vector(layout, puck_position, puck_velocity))
}

/// What the learner is asked to achieve
pub fn desired_goal(reward_type: RewardType, goal: &Goal) -> Result<Vec<f32>> {
    let layout = reward_type
        .goal_layout()
        .ok_or(EnvError::NotGoalConditioned(reward_type))?;
    Ok(goal_vector(layout, goal.position, goal.velocity))
}

/// Samples goal regions at reset
#[derive(Debug, Clone)]
pub struct GoalManager {
    table: Table,
    radius_type: GoalRadiusType,
    n_training_steps: u64,
    max_x_velocity: f32,
    min_y_velocity: f32,
    max_y_velocity: f32,
}

impl GoalManager {
    pub fn from_config(config: &EnvConfig, table: Table) -> Self {
        Self {
            table,
            radius_type: config.goal_radius_type,
            n_training_steps: config.n_training_steps,
            max_x_velocity: config.goal_max_x_velocity,
            min_y_velocity: config.goal_min_y_velocity,
            max_y_velocity: config.goal_max_y_velocity,
        }
    }

    /// Smallest curriculum radius
    pub fn base_radius(&self) -> f32 {
        let width = self.table.width;
        0.75 * (width / 16.0 + width / 4.0) / 2.0
    }

    /// Fraction of the training budget consumed, in [0, 1]
    pub fn progress(&self, n_timesteps_so_far: u64) -> f32 {
        if self.n_training_steps == 0 {
            return 1.0;
        }
        (n_timesteps_so_far as f64 / self.n_training_steps as f64).clamp(0.0, 1.0) as f32
    }

    /// Goal radius for an episode starting after `n_timesteps_so_far` steps
    pub fn radius(&self, n_timesteps_so_far: u64) -> f32 {
        match self.radius_type {
            GoalRadiusType::Home => self.table.home_radius(),
            GoalRadiusType::Fixed => {
                let ratio = 2.0 * (1.0 - self.progress(n_timesteps_so_far)) + 1.0;
                self.base_radius() * ratio
            }
        }
    }

    /// Sample this episode's goals
    ///
    /// Overrides are forward-first `[y, x]` pairs and are used verbatim.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n_timesteps_so_far: u64,
        multiagent: bool,
        ego_override: Option<[f32; 2]>,
        alt_override: Option<[f32; 2]>,
    ) -> Goals {
        let table = &self.table;
        let radius = self.radius(n_timesteps_so_far);

        let ego_position = match ego_override {
            Some(pair) => from_goal_order(pair),
            None => {
                let y = uniform(rng, radius, table.y_max() - radius);
                let x = uniform(rng, table.x_min() + radius, table.x_max() - radius);
                Vec2::new(x, y)
            }
        };
        let ego_velocity = Vec2::new(
            uniform(rng, -self.max_x_velocity, self.max_x_velocity),
            uniform(rng, self.min_y_velocity, self.max_y_velocity),
        );

        let alt = multiagent.then(|| {
            let position = match alt_override {
                Some(pair) => from_goal_order(pair),
                None => {
                    let y = uniform(rng, table.y_min(), 0.0);
                    let x = uniform(rng, table.x_min(), table.x_max());
                    Vec2::new(x, y)
                }
            };
            // Same task seen from the other end
            Goal {
                position,
                velocity: -ego_velocity,
                radius,
            }
        });

        Goals {
            ego: Goal {
                position: ego_position,
                velocity: ego_velocity,
                radius,
            },
            alt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn manager(radius_type: GoalRadiusType) -> GoalManager {
        let config = EnvConfig {
            width: 8.0,
            length: 16.0,
            goal_radius_type: radius_type,
            n_training_steps: 1000,
            ..Default::default()
        };
        GoalManager::from_config(&config, Table::from_config(&config))
    }

    #[test]
    fn test_home_radius_is_constant() {
        let goals = manager(GoalRadiusType::Home);
        assert!((goals.radius(0) - 0.16 * 8.0).abs() < 1e-6);
        assert_eq!(goals.radius(0), goals.radius(5000));
    }

    #[test]
    fn test_fixed_radius_anneals() {
        let goals = manager(GoalRadiusType::Fixed);
        let base = goals.base_radius();
        assert!((base - 0.75 * (0.5 + 2.0) / 2.0).abs() < 1e-6);
        assert!((goals.radius(0) - 3.0 * base).abs() < 1e-5);
        assert!((goals.radius(500) - 2.0 * base).abs() < 1e-5);
        assert!((goals.radius(1000) - base).abs() < 1e-5);
        assert!((goals.radius(10_000) - base).abs() < 1e-5);
    }

    #[test]
    fn test_sampled_goal_stays_on_far_half() {
        let goals = manager(GoalRadiusType::Home);
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..100 {
            let sampled = goals.sample(&mut rng, 0, false, None, None);
            let g = sampled.ego;
            assert!(g.position.y >= g.radius && g.position.y <= 8.0 - g.radius);
            assert!(g.position.x >= -4.0 + g.radius && g.position.x <= 4.0 - g.radius);
            assert!(g.velocity.x.abs() <= 1.0);
            assert!(g.velocity.y >= 0.5 && g.velocity.y <= 2.0);
            assert!(sampled.alt.is_none());
        }
    }

    #[test]
    fn test_overrides_swap_axes_once() {
        let goals = manager(GoalRadiusType::Home);
        let mut rng = Pcg32::seed_from_u64(5);
        let sampled = goals.sample(&mut rng, 0, true, Some([3.0, -1.0]), Some([-2.0, 0.5]));
        assert_eq!(sampled.ego.position, Vec2::new(-1.0, 3.0));
        let alt = sampled.alt.unwrap();
        assert_eq!(alt.position, Vec2::new(0.5, -2.0));
        assert_eq!(alt.radius, sampled.ego.radius);

        let desired = desired_goal(RewardType::GoalPosition, &sampled.ego).unwrap();
        assert_eq!(desired, vec![3.0, -1.0]);
    }

    #[test]
    fn test_goal_vectors() {
        let achieved = achieved_goal(
            RewardType::GoalPositionVelocity,
            Vec2::new(1.0, 2.0),
            Vec2::new(0.3, 0.4),
        )
        .unwrap();
        assert_eq!(achieved, vec![2.0, 1.0, 0.3, 0.4]);
    }

    #[test]
    fn test_goal_vectors_need_goal_variant() {
        let err = achieved_goal(RewardType::GoalDiscrete, Vec2::ZERO, Vec2::ZERO).unwrap_err();
        assert!(matches!(err, EnvError::NotGoalConditioned(RewardType::GoalDiscrete)));
        assert!(err.is_config_fault());
    }

    proptest! {
        #[test]
        fn prop_curriculum_radius_monotone_and_bounded(a in 0u64..5000, b in 0u64..5000) {
            let goals = manager(GoalRadiusType::Fixed);
            let (early, late) = (a.min(b), a.max(b));
            let base = goals.base_radius();
            prop_assert!(goals.radius(late) <= goals.radius(early));
            prop_assert!(goals.radius(late) >= base - 1e-5);
            prop_assert!(goals.radius(early) <= 3.0 * base + 1e-5);
        }
    }
}

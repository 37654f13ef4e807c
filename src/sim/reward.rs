//! Reward functions
//!
//! Every variant is evaluated from one side's perspective. The multi-agent
//! joint reward runs the same evaluation twice, the second time with the
//! table mirrored for the alt paddle.

use glam::Vec2;

use super::goals::Goal;
use super::state::Side;
use crate::config::{EnvConfig, GoalLayout, RewardType};
use crate::consts::{GOAL_SIGMOID_SCALE, PUCK_VEL_REWARD_MAX, UNIT_EPSILON};
use crate::error::{EnvError, Result};
use crate::sigmoid;

/// Inputs for one side's reward (kinematics in world frame)
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    pub side: Side,
    pub puck_position: Vec2,
    pub puck_velocity: Vec2,
    pub hit_a_puck: bool,
    /// Puck inside the home region defended by this side's opponent
    pub puck_within_opponent_home: bool,
    pub goal: Option<&'a Goal>,
}

/// Shaped reward for being `distance` from a goal of `radius`
pub fn goal_position_reward(distance: f32, radius: f32) -> f32 {
    if distance >= radius {
        return 0.0;
    }
    sigmoid(GOAL_SIGMOID_SCALE * (1.0 - distance / radius))
}

/// Position reward plus velocity alignment and magnitude terms
pub fn goal_position_velocity_reward(
    distance: f32,
    radius: f32,
    achieved_velocity: Vec2,
    desired_velocity: Vec2,
    max_paddle_vel: f32,
) -> f32 {
    let position = goal_position_reward(distance, radius);
    if position == 0.0 {
        return 0.0;
    }
    let cos = (achieved_velocity.dot(desired_velocity)
        / (achieved_velocity.length() * desired_velocity.length() + UNIT_EPSILON))
        .clamp(-1.0, 1.0);
    let angle = (cos + 1.0) / 2.0;
    let magnitude = 1.0 - (achieved_velocity - desired_velocity).length() / max_paddle_vel;
    0.5 * position + 0.5 * (angle + magnitude)
}

/// Evaluates the configured reward variant
#[derive(Debug, Clone)]
pub struct RewardEngine {
    reward_type: RewardType,
    half_length: f32,
    max_paddle_vel: f32,
}

impl RewardEngine {
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            reward_type: config.reward_type,
            half_length: config.length / 2.0,
            max_paddle_vel: config.max_paddle_vel,
        }
    }

    fn goal<'a>(&self, ctx: &RewardContext<'a>) -> Result<&'a Goal> {
        ctx.goal.ok_or(EnvError::NotGoalConditioned(self.reward_type))
    }

    /// Reward for one side
    pub fn evaluate(&self, ctx: &RewardContext<'_>) -> Result<f32> {
        let sign = ctx.side.forward_sign();
        let reward = match self.reward_type {
            RewardType::GoalDiscrete => {
                if self.goal(ctx)?.contains(ctx.puck_position) { 1.0 } else { 0.0 }
            }
            RewardType::GoalPosition => {
                let goal = self.goal(ctx)?;
                goal_position_reward(ctx.puck_position.distance(goal.position), goal.radius)
            }
            RewardType::GoalPositionVelocity => {
                let goal = self.goal(ctx)?;
                goal_position_velocity_reward(
                    ctx.puck_position.distance(goal.position),
                    goal.radius,
                    ctx.puck_velocity,
                    goal.velocity,
                    self.max_paddle_vel,
                )
            }
            RewardType::PuckHeight => (ctx.puck_position.y * sign).max(0.0) / self.half_length,
            RewardType::PuckVel => {
                (ctx.puck_velocity.y * sign).clamp(0.0, PUCK_VEL_REWARD_MAX) / PUCK_VEL_REWARD_MAX
            }
            RewardType::PuckTouch => {
                if ctx.hit_a_puck { 1.0 } else { 0.0 }
            }
            RewardType::AltHome => {
                if ctx.puck_within_opponent_home { 1.0 } else { 0.0 }
            }
        };
        Ok(reward)
    }

    /// Rewards for both paddles
    pub fn joint(&self, ego: &RewardContext<'_>, alt: &RewardContext<'_>) -> Result<(f32, f32)> {
        Ok((self.evaluate(ego)?, self.evaluate(alt)?))
    }

    /// Batched goal reward for relabeled `(achieved, desired)` rows
    ///
    /// Both slices are row-major with one goal vector per row.
    pub fn compute_reward(&self, achieved: &[f32], desired: &[f32], radius: f32) -> Result<Vec<f32>> {
        let layout = self
            .reward_type
            .goal_layout()
            .ok_or(EnvError::NotGoalConditioned(self.reward_type))?;
        let row = layout.len();
        if achieved.len() != desired.len() {
            return Err(EnvError::GoalShape {
                expected: achieved.len(),
                got: desired.len(),
            });
        }
        if achieved.len() % row != 0 {
            return Err(EnvError::GoalShape {
                expected: row,
                got: achieved.len(),
            });
        }

        let rewards = achieved
            .chunks_exact(row)
            .zip(desired.chunks_exact(row))
            .map(|(a, d)| {
                let distance = Vec2::new(a[0], a[1]).distance(Vec2::new(d[0], d[1]));
                match layout {
                    GoalLayout::Position => goal_position_reward(distance, radius),
                    GoalLayout::PositionVelocity => goal_position_velocity_reward(
                        distance,
                        radius,
                        Vec2::new(a[2], a[3]),
                        Vec2::new(d[2], d[3]),
                        self.max_paddle_vel,
                    ),
                }
            })
            .collect();
        Ok(rewards)
    }
}

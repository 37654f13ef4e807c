//! Paddle control
//!
//! Actions are desired positional deltas for one control step. They are
//! turned into a velocity, then into a force that reaches that velocity in
//! one step, both clamped to the robot's limits.

use glam::Vec2;

use super::physics::{BodyHandle, PhysicsWorld};
use super::state::{Side, Table};
use crate::config::EnvConfig;
use crate::consts::MAX_DIRECTION_CHANGE_PENALTY;
use crate::{clamp_magnitude, guarded_unit};

/// Map an action from a side's own frame into the world frame
#[inline]
pub fn to_world_action(side: Side, action: [f32; 2]) -> Vec2 {
    Vec2::from(action) * side.forward_sign()
}

/// Penalty for pushing against the paddle's current motion
///
/// 0 when the force follows the velocity, `MAX_DIRECTION_CHANGE_PENALTY`
/// when it opposes it.
pub fn direction_penalty(velocity: Vec2, force: Vec2) -> f32 {
    let v = guarded_unit(velocity);
    let f = guarded_unit(force);
    let cos = v.dot(f) / (v.length() * f.length() + crate::consts::UNIT_EPSILON);
    let aligned = (cos + 1.0) / 2.0;
    MAX_DIRECTION_CHANGE_PENALTY * (1.0 - aligned)
}

/// Turns actions into paddle forces and enforces paddle limits
#[derive(Debug, Clone)]
pub struct StepController {
    dt: f32,
    max_paddle_vel: f32,
    max_force: f32,
    force_scaling: f32,
    wall_bumping_rew: f32,
}

impl StepController {
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            dt: config.time_per_step(),
            max_paddle_vel: config.max_paddle_vel,
            max_force: config.max_force_timestep,
            force_scaling: config.force_scaling,
            wall_bumping_rew: config.wall_bumping_rew,
        }
    }

    pub fn max_paddle_vel(&self) -> f32 {
        self.max_paddle_vel
    }

    /// Force that moves a paddle of `mass` at `position` by `action` (world frame)
    pub fn force_for(&self, side: Side, mass: f32, position: Vec2, action: Vec2) -> Vec2 {
        let velocity = clamp_magnitude(action / self.dt, self.max_paddle_vel);
        let mut force = clamp_magnitude(mass * velocity / self.dt, self.max_force);

        // Past the centre line only retreat is allowed
        let sign = side.forward_sign();
        if position.y * sign > 0.0 {
            let forward = (self.force_scaling * mass * action.y * sign).min(0.0);
            force.y = forward * sign;
        }
        force
    }

    /// Apply the control force for this step; returns the direction penalty
    pub fn apply<W: PhysicsWorld>(
        &self,
        world: &mut W,
        paddle: BodyHandle,
        side: Side,
        action: Vec2,
    ) -> f32 {
        let force = self.force_for(side, world.mass(paddle), world.position(paddle), action);
        let penalty = direction_penalty(world.linear_velocity(paddle), force);
        world.apply_force_to_center(paddle, force);
        penalty
    }

    /// Re-clamp the paddle's speed after the physics step
    pub fn clamp_velocity<W: PhysicsWorld>(&self, world: &mut W, paddle: BodyHandle) {
        let velocity = world.linear_velocity(paddle);
        if velocity.length() > self.max_paddle_vel {
            world.set_linear_velocity(paddle, clamp_magnitude(velocity, self.max_paddle_vel));
        }
    }

    /// Wall-bump reward for a paddle hugging any table edge
    pub fn wall_bump(&self, table: &Table, position: Vec2, radius: f32) -> f32 {
        if self.wall_bumping_rew == 0.0 {
            return 0.0;
        }
        let near_edge = position.x < table.x_min() + radius
            || position.x > table.x_max() - radius
            || position.y < table.y_min() + radius
            || position.y > table.y_max() - radius;
        if near_edge { self.wall_bumping_rew } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{BodyDef, BodyKind, Shape};
    use crate::sim::world::TableWorld;
    use proptest::prelude::*;

    fn controller() -> StepController {
        StepController::from_config(&EnvConfig::default())
    }

    #[test]
    fn test_small_action_moves_exactly() {
        let c = controller();
        // 0.05 m in a 0.05 s step = 1 m/s, under the 1.5 m/s cap
        let force = c.force_for(Side::Ego, 2.0, Vec2::new(0.0, -3.0), Vec2::new(0.05, 0.0));
        assert!((force - Vec2::new(40.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_velocity_and_force_caps() {
        let c = controller();
        let force = c.force_for(Side::Ego, 10.0, Vec2::new(0.0, -3.0), Vec2::new(1.0, 1.0));
        assert!((force.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_far_half_allows_only_retreat() {
        let c = controller();
        let past = Vec2::new(0.0, 0.5);
        let push = c.force_for(Side::Ego, 0.2, past, Vec2::new(0.0, 0.5));
        assert_eq!(push.y, 0.0);
        let retreat = c.force_for(Side::Ego, 0.2, past, Vec2::new(0.0, -0.01));
        assert!((retreat.y - 1000.0 * 0.2 * -0.01).abs() < 1e-4);
    }

    #[test]
    fn test_alt_confinement_is_mirrored() {
        let c = controller();
        let past = Vec2::new(0.0, -0.5);
        let action = to_world_action(Side::Alt, [0.0, 0.5]);
        assert_eq!(action, Vec2::new(0.0, -0.5));
        let push = c.force_for(Side::Alt, 0.2, past, action);
        assert_eq!(push.y, 0.0);
        let retreat = c.force_for(Side::Alt, 0.2, past, to_world_action(Side::Alt, [0.0, -0.01]));
        assert!(retreat.y > 0.0);
    }

    #[test]
    fn test_direction_penalty_range() {
        let v = Vec2::new(1.0, 0.0);
        assert!(direction_penalty(v, Vec2::new(3.0, 0.0)).abs() < 1e-5);
        assert!((direction_penalty(v, Vec2::new(-3.0, 0.0)) - MAX_DIRECTION_CHANGE_PENALTY).abs() < 1e-5);
        assert!((direction_penalty(v, Vec2::new(0.0, 2.0)) - MAX_DIRECTION_CHANGE_PENALTY / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_wall_bump() {
        let table = Table::new(10.0, 5.0);
        let mut config = EnvConfig::default();
        assert_eq!(StepController::from_config(&config).wall_bump(&table, Vec2::new(2.4, 0.0), 0.25), 0.0);

        config.wall_bumping_rew = -0.1;
        let c = StepController::from_config(&config);
        assert_eq!(c.wall_bump(&table, Vec2::new(2.4, 0.0), 0.25), -0.1);
        assert_eq!(c.wall_bump(&table, Vec2::new(0.0, -4.9), 0.25), -0.1);
        assert_eq!(c.wall_bump(&table, Vec2::new(0.0, 0.0), 0.25), 0.0);
    }

    proptest! {
        #[test]
        fn prop_post_step_speed_is_capped(
            ax in -1.0f32..1.0,
            ay in -1.0f32..1.0,
            vx in -20.0f32..20.0,
            vy in -20.0f32..20.0,
        ) {
            let c = controller();
            let mut world = TableWorld::new(Vec2::ZERO, Vec2::new(2.5, 5.0));
            let mut def = BodyDef::new(BodyKind::Dynamic, Shape::Circle { radius: 0.25 }, Vec2::new(0.0, -4.0));
            def.linear_velocity = Vec2::new(vx, vy);
            def.linear_damping = 1.0;
            let paddle = world.create_body(&def);

            c.apply(&mut world, paddle, Side::Ego, Vec2::new(ax, ay));
            world.step(0.05, 10, 10);
            c.clamp_velocity(&mut world, paddle);
            prop_assert!(world.linear_velocity(paddle).length() <= c.max_paddle_vel() + 1e-4);
        }
    }
}

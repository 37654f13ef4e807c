//! Observation vectors

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::{BodyHandle, PhysicsWorld};
use super::state::Side;

/// Length of one agent's observation
pub const OBSERVATION_SIZE: usize = 8;

/// `[paddle_x, paddle_y, paddle_vx, paddle_vy, puck_x, puck_y, puck_vx, puck_vy]`
pub type AgentObservation = [f32; OBSERVATION_SIZE];

/// Position and velocity of one body
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Kinematics {
    pub fn of<W: PhysicsWorld>(world: &W, body: BodyHandle) -> Self {
        Self {
            position: world.position(body),
            velocity: world.linear_velocity(body),
        }
    }

    /// Point reflection through the table centre
    pub fn mirrored(&self) -> Self {
        Self {
            position: -self.position,
            velocity: -self.velocity,
        }
    }

    /// As seen by `side` (alt sees the table rotated half a turn)
    pub fn seen_by(&self, side: Side) -> Self {
        match side {
            Side::Ego => *self,
            Side::Alt => self.mirrored(),
        }
    }
}

/// One agent's observation of its own paddle and the puck
pub fn agent_observation(side: Side, paddle: Kinematics, puck: Kinematics) -> AgentObservation {
    let paddle = paddle.seen_by(side);
    let puck = puck.seen_by(side);
    [
        paddle.position.x,
        paddle.position.y,
        paddle.velocity.x,
        paddle.velocity.y,
        puck.position.x,
        puck.position.y,
        puck.velocity.x,
        puck.velocity.y,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(px: f32, py: f32, vx: f32, vy: f32) -> Kinematics {
        Kinematics {
            position: Vec2::new(px, py),
            velocity: Vec2::new(vx, vy),
        }
    }

    #[test]
    fn test_ego_layout() {
        let obs = agent_observation(Side::Ego, k(1.0, 2.0, 3.0, 4.0), k(5.0, 6.0, 7.0, 8.0));
        assert_eq!(obs, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_alt_is_negated() {
        let paddle = k(0.3, 4.0, -0.2, 0.1);
        let puck = k(-1.0, 2.0, 0.5, -1.5);
        let obs = agent_observation(Side::Alt, paddle, puck);
        assert_eq!(obs, [-0.3, -4.0, 0.2, -0.1, 1.0, -2.0, -0.5, 1.5]);
    }

    #[test]
    fn test_symmetric_state_looks_identical() {
        let ego = k(0.5, -4.0, 0.1, 0.2);
        let puck = k(0.0, 0.0, 0.0, 0.0);
        let a = agent_observation(Side::Ego, ego, puck);
        let b = agent_observation(Side::Alt, ego.mirrored(), puck.mirrored());
        assert_eq!(a, b);
    }
}

//! Scene construction
//!
//! Spawns pucks, blocks, obstacles, targets and paddles for a new episode,
//! registering each one. RNG draw order is fixed so a seed always builds
//! the same table.

use glam::Vec2;
use rand::Rng;

use super::physics::{BodyDef, BodyKind, CollisionFilter, PhysicsWorld, Shape};
use super::state::{ObjectRole, Registry, Side, Table, WorldObject};
use crate::config::EnvConfig;
use crate::consts::{EDGE_SPAWN_INSET, PUCK_MAX_SPAWN_HEIGHT, TARGET_MIN_SPAWN_HEIGHT};

/// Restitution for paddles and pucks (air hockey is near-elastic)
const DISC_RESTITUTION: f32 = 1.0;
/// Restitution for blocks, obstacles and targets
const RECT_RESTITUTION: f32 = 0.1;
const RECT_DENSITY: f32 = 1.0;
const RECT_MIN_WIDTH: f32 = 0.75;
const RECT_MAX_WIDTH: f32 = 3.0;
const RECT_MIN_HEIGHT: f32 = 0.5;
/// Forward launch speed of a single-agent puck (toward the ego paddle)
const SERVE_FORWARD_VELOCITY: f32 = -0.7;

/// Uniform sample in `[low, high)`, tolerant of empty ranges
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    low + rng.random::<f32>() * (high - low)
}

/// Builds the objects for one episode
#[derive(Debug, Clone)]
pub struct WorldObjectFactory {
    table: Table,
    num_pucks: u32,
    num_blocks: u32,
    num_obstacles: u32,
    num_targets: u32,
    dynamic_targets: bool,
    multiagent: bool,
    puck_radius: f32,
    puck_density: f32,
    puck_damping: f32,
    paddle_radius: f32,
    paddle_density: f32,
    paddle_damping: f32,
}

impl WorldObjectFactory {
    pub fn from_config(config: &EnvConfig, table: Table) -> Self {
        Self {
            table,
            num_pucks: config.num_pucks,
            num_blocks: config.num_blocks,
            num_obstacles: config.num_obstacles,
            num_targets: config.num_targets,
            dynamic_targets: config.dynamic_targets,
            multiagent: config.multiagent(),
            puck_radius: config.puck_radius,
            puck_density: config.puck_density,
            puck_damping: config.puck_damping,
            paddle_radius: config.paddle_radius,
            paddle_density: config.paddle_density,
            paddle_damping: config.paddle_damping,
        }
    }

    /// Paddle mass from areal density
    pub fn paddle_mass(&self) -> f32 {
        self.paddle_density * std::f32::consts::PI * self.paddle_radius * self.paddle_radius
    }

    /// Puck mass from areal density
    pub fn puck_mass(&self) -> f32 {
        self.puck_density * std::f32::consts::PI * self.puck_radius * self.puck_radius
    }

    /// Spawn every object for a new episode into `world` and `registry`
    pub fn build<W: PhysicsWorld, R: Rng + ?Sized>(
        &self,
        world: &mut W,
        registry: &mut Registry,
        rng: &mut R,
    ) {
        for i in 0..self.num_pucks {
            let def = self.puck_def(rng);
            spawn(world, registry, ObjectRole::Puck, i, &def, Some(self.puck_radius));
        }
        for i in 0..self.num_blocks {
            let def = self.rect_def(ObjectRole::Block, rng);
            spawn(world, registry, ObjectRole::Block, i, &def, None);
        }
        for i in 0..self.num_obstacles {
            let def = self.rect_def(ObjectRole::Obstacle, rng);
            spawn(world, registry, ObjectRole::Obstacle, i, &def, None);
        }
        for i in 0..self.num_targets {
            let def = self.rect_def(ObjectRole::Target, rng);
            spawn(world, registry, ObjectRole::Target, i, &def, None);
        }

        let sides: &[Side] = if self.multiagent {
            &[Side::Ego, Side::Alt]
        } else {
            &[Side::Ego]
        };
        for &side in sides {
            let def = self.paddle_def(side);
            spawn(
                world,
                registry,
                ObjectRole::Paddle(side),
                0,
                &def,
                Some(self.paddle_radius),
            );
        }

        registry.sort_roles();
    }

    fn puck_def<R: Rng + ?Sized>(&self, rng: &mut R) -> BodyDef {
        let table = &self.table;
        let max_height = PUCK_MAX_SPAWN_HEIGHT.min(table.y_max());
        // Spread of initial speeds
        let speed_span = 2.0 * table.width;

        let (position, velocity) = if !self.multiagent {
            // Serve from the far end, away from the side rails
            let x = uniform(rng, -table.width / 3.0, table.width / 3.0);
            let position = Vec2::new(x, max_height - EDGE_SPAWN_INSET);
            let vx = 2.0 * rng.random::<f32>() * speed_span - table.width;
            (position, Vec2::new(vx, SERVE_FORWARD_VELOCITY))
        } else {
            let min_height = (table.y_min() + table.length / 3.0).max(table.y_min());
            let x = (rng.random::<f32>() - 0.5) * 2.0 * table.x_max();
            let y = min_height + rng.random::<f32>() * (max_height - min_height);
            let vx = rng.random::<f32>() * speed_span - table.width;
            let vy = 10.0 * rng.random::<f32>() * speed_span - table.width;
            (Vec2::new(x, y), Vec2::new(vx, vy))
        };

        let mut def = BodyDef::new(
            BodyKind::Dynamic,
            Shape::Circle {
                radius: self.puck_radius,
            },
            position,
        );
        def.linear_velocity = velocity;
        def.density = self.puck_density;
        def.restitution = DISC_RESTITUTION;
        def.linear_damping = self.puck_damping;
        def
    }

    fn rect_def<R: Rng + ?Sized>(&self, role: ObjectRole, rng: &mut R) -> BodyDef {
        let table = &self.table;
        let angle = match role {
            ObjectRole::Obstacle => rng.random::<f32>() * std::f32::consts::PI,
            _ => 0.0,
        };
        let min_height = match role {
            ObjectRole::Target => TARGET_MIN_SPAWN_HEIGHT.max(table.y_min()),
            _ => 0.0,
        };

        let x = (rng.random::<f32>() - 0.5) * 2.0 * table.x_max();
        let y = min_height + rng.random::<f32>() * (table.y_max() - min_height);
        let velocity = Vec2::new(
            (rng.random::<f32>() - 0.5) * 2.0 * table.width,
            (rng.random::<f32>() - 0.5) * 2.0 * table.length,
        );
        let width = (rng.random::<f32>() * RECT_MAX_WIDTH).max(RECT_MIN_WIDTH);
        let height = rng.random::<f32>().max(RECT_MIN_HEIGHT);

        let dynamic = role == ObjectRole::Target && self.dynamic_targets;
        let kind = if dynamic {
            BodyKind::Dynamic
        } else {
            BodyKind::Static
        };

        let mut def = BodyDef::new(
            kind,
            Shape::Rect {
                half_extents: Vec2::new(width / 2.0, height / 2.0),
            },
            Vec2::new(x, y),
        );
        def.angle = angle;
        def.linear_velocity = if dynamic { velocity } else { Vec2::ZERO };
        def.density = RECT_DENSITY;
        def.restitution = RECT_RESTITUTION;
        def
    }

    fn paddle_def(&self, side: Side) -> BodyDef {
        // Start inside the home region
        let y = match side {
            Side::Ego => self.table.y_min() + EDGE_SPAWN_INSET,
            Side::Alt => self.table.y_max() - EDGE_SPAWN_INSET,
        };
        let mut def = BodyDef::new(
            BodyKind::Dynamic,
            Shape::Circle {
                radius: self.paddle_radius,
            },
            Vec2::new(0.0, y),
        );
        def.density = self.paddle_density;
        def.restitution = DISC_RESTITUTION;
        def.linear_damping = self.paddle_damping;
        def.gravity_scale = 0.0;
        def
    }
}

fn spawn<W: PhysicsWorld>(
    world: &mut W,
    registry: &mut Registry,
    role: ObjectRole,
    ordinal: u32,
    def: &BodyDef,
    radius: Option<f32>,
) {
    let collidable = def.filter == CollisionFilter::COLLIDABLE;
    let body = world.create_body(def);
    registry.insert(WorldObject {
        name: role.object_name(ordinal),
        role,
        body,
        radius,
        collidable,
    });
}

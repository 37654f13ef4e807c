//! Table geometry and the live object registry
//!
//! Objects live in one arena keyed by stable integer ids. Role index sets
//! (pucks, blocks, obstacles, targets) are kept sorted by name so every
//! pass over them runs in the same order.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::BodyHandle;
use crate::config::EnvConfig;
use crate::consts::HOME_RADIUS_FRACTION;

/// Immutable per-episode table geometry
///
/// Body frame: `x` is the lateral (width) axis, `y` the forward (length)
/// axis. The ego side defends `y_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub length: f32,
    pub width: f32,
}

impl Table {
    pub fn new(length: f32, width: f32) -> Self {
        Self { length, width }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.length, config.width)
    }

    #[inline]
    pub fn x_min(&self) -> f32 {
        -self.width / 2.0
    }

    #[inline]
    pub fn x_max(&self) -> f32 {
        self.width / 2.0
    }

    #[inline]
    pub fn y_min(&self) -> f32 {
        -self.length / 2.0
    }

    #[inline]
    pub fn y_max(&self) -> f32 {
        self.length / 2.0
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.length / 2.0)
    }

    /// Radius of both home regions
    pub fn home_radius(&self) -> f32 {
        HOME_RADIUS_FRACTION * self.width
    }

    /// Center of a side's home region (middle of its back edge)
    pub fn home_anchor(&self, side: Side) -> Vec2 {
        match side {
            Side::Ego => Vec2::new(0.0, self.y_min()),
            Side::Alt => Vec2::new(0.0, self.y_max()),
        }
    }
}

/// Which end of the table a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Defends the negative forward end
    Ego,
    /// Defends the positive forward end
    Alt,
}

impl Side {
    /// +1 for ego, -1 for alt: maps world vectors into the side's own frame
    #[inline]
    pub fn forward_sign(&self) -> f32 {
        match self {
            Side::Ego => 1.0,
            Side::Alt => -1.0,
        }
    }

    pub fn paddle_name(&self) -> &'static str {
        match self {
            Side::Ego => "paddle_ego",
            Side::Alt => "paddle_alt",
        }
    }
}

/// Object role on the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRole {
    Paddle(Side),
    Puck,
    Block,
    Obstacle,
    Target,
}

impl ObjectRole {
    /// Name prefix for ordinal-named roles
    pub fn prefix(&self) -> &'static str {
        match self {
            ObjectRole::Paddle(side) => side.paddle_name(),
            ObjectRole::Puck => "puck",
            ObjectRole::Block => "block",
            ObjectRole::Obstacle => "obstacle",
            ObjectRole::Target => "target",
        }
    }

    /// Table-unique name for the `ordinal`-th object of this role
    pub fn object_name(&self, ordinal: u32) -> String {
        match self {
            ObjectRole::Paddle(side) => side.paddle_name().to_string(),
            _ => format!("{}{}", self.prefix(), ordinal),
        }
    }
}

/// Stable arena identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// A registered physics object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldObject {
    pub name: String,
    pub role: ObjectRole,
    pub body: BodyHandle,
    /// Circle radius (paddles and pucks)
    pub radius: Option<f32>,
    pub collidable: bool,
}

/// Live objects for the current episode
#[derive(Debug, Clone, Default)]
pub struct Registry {
    objects: Vec<Option<WorldObject>>,
    paddles: Vec<ObjectId>,
    pucks: Vec<ObjectId>,
    blocks: Vec<ObjectId>,
    obstacles: Vec<ObjectId>,
    targets: Vec<ObjectId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and return its id
    pub fn insert(&mut self, object: WorldObject) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.role_ids_mut(object.role).push(id);
        self.objects.push(Some(object));
        id
    }

    /// Remove an object; `None` if it was already gone
    pub fn remove(&mut self, id: ObjectId) -> Option<WorldObject> {
        let object = self.objects.get_mut(id.0 as usize)?.take()?;
        self.role_ids_mut(object.role).retain(|&other| other != id);
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(id.0 as usize).and_then(|o| o.as_ref())
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empty the arena (bodies must already be destroyed)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Sort role index sets by object name
    pub fn sort_roles(&mut self) {
        let objects = &self.objects;
        let name = |id: &ObjectId| {
            objects[id.0 as usize]
                .as_ref()
                .map(|o| o.name.clone())
                .unwrap_or_default()
        };
        self.pucks.sort_by_key(name);
        self.blocks.sort_by_key(name);
        self.obstacles.sort_by_key(name);
        self.targets.sort_by_key(name);
    }

    fn role_ids_mut(&mut self, role: ObjectRole) -> &mut Vec<ObjectId> {
        match role {
            ObjectRole::Paddle(_) => &mut self.paddles,
            ObjectRole::Puck => &mut self.pucks,
            ObjectRole::Block => &mut self.blocks,
            ObjectRole::Obstacle => &mut self.obstacles,
            ObjectRole::Target => &mut self.targets,
        }
    }

    pub fn paddles(&self) -> &[ObjectId] {
        &self.paddles
    }

    pub fn pucks(&self) -> &[ObjectId] {
        &self.pucks
    }

    pub fn blocks(&self) -> &[ObjectId] {
        &self.blocks
    }

    pub fn obstacles(&self) -> &[ObjectId] {
        &self.obstacles
    }

    pub fn targets(&self) -> &[ObjectId] {
        &self.targets
    }

    /// The paddle defending `side`
    pub fn paddle(&self, side: Side) -> Option<&WorldObject> {
        self.paddle_id(side).and_then(|id| self.get(id))
    }

    pub fn paddle_id(&self, side: Side) -> Option<ObjectId> {
        self.paddles
            .iter()
            .copied()
            .find(|&id| self.get(id).is_some_and(|o| o.role == ObjectRole::Paddle(side)))
    }

    /// First puck in name order (the one observations and rewards track)
    pub fn primary_puck(&self) -> Option<&WorldObject> {
        self.pucks.first().and_then(|&id| self.get(id))
    }

    /// Every live id: paddles, pucks, blocks, obstacles, targets
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.paddles
            .iter()
            .chain(&self.pucks)
            .chain(&self.blocks)
            .chain(&self.obstacles)
            .chain(&self.targets)
            .copied()
    }

    /// Names of a role's objects in iteration order
    pub fn names(&self, ids: &[ObjectId]) -> Vec<&str> {
        ids.iter()
            .filter_map(|&id| self.get(id))
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.ids()
            .find(|&id| self.get(id).is_some_and(|o| o.name == name))
    }
}

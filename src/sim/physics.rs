//! Rigid-body engine boundary
//!
//! The episode engine only creates bodies, pushes forces, steps, reads back
//! kinematics and touching contacts, and destroys bodies. Anything that can do
//! that can drive the table.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Engine-assigned body identity (generational, never reused while live)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle {
    pub index: u32,
    pub generation: u32,
}

/// Static bodies never move; dynamic bodies integrate forces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Static,
    Dynamic,
}

/// Collision geometry in body-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Rectangle centered on the body origin
    Rect { half_extents: Vec2 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rect { half_extents } => 4.0 * half_extents.x * half_extents.y,
        }
    }
}

/// Category/mask collision filter (two bodies interact only if each
/// category is accepted by the other's mask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub category: u16,
    pub mask: u16,
}

impl CollisionFilter {
    /// Everything on the table shares one category
    pub const COLLIDABLE: Self = Self {
        category: 1,
        mask: 1,
    };
    /// Ghost bodies: cleared mask, so they accept nothing
    pub const NON_COLLIDABLE: Self = Self {
        category: 1,
        mask: 0,
    };

    #[inline]
    pub fn accepts(&self, other: &CollisionFilter) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::COLLIDABLE
    }
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub shape: Shape,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub density: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Multiplier on world gravity (0 = unaffected)
    pub gravity_scale: f32,
    pub filter: CollisionFilter,
}

impl BodyDef {
    pub fn new(kind: BodyKind, shape: Shape, position: Vec2) -> Self {
        Self {
            kind,
            shape,
            position,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            density: 1.0,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            filter: CollisionFilter::COLLIDABLE,
        }
    }

    /// Mass from areal density (2D; a real puck has height too)
    pub fn mass(&self) -> f32 {
        self.density * self.shape.area()
    }
}

/// Rigid-body world consumed by the episode engine
pub trait PhysicsWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    /// Destroy a body; later queries against the handle are invalid
    fn destroy_body(&mut self, handle: BodyHandle);

    /// Whether the handle still refers to a live body
    fn contains(&self, handle: BodyHandle) -> bool;

    /// Apply a continuous force at the center of mass for the next step
    fn apply_force_to_center(&mut self, handle: BodyHandle, force: Vec2);

    /// Advance the world synchronously by `dt`
    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32);

    fn position(&self, handle: BodyHandle) -> Vec2;

    fn linear_velocity(&self, handle: BodyHandle) -> Vec2;

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2);

    fn mass(&self, handle: BodyHandle) -> f32;

    fn set_gravity(&mut self, gravity: Vec2);

    /// Bodies currently touching `handle` (boundary walls excluded)
    fn touching(&self, handle: BodyHandle) -> Vec<BodyHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_mass_is_areal() {
        let mut def = BodyDef::new(
            BodyKind::Dynamic,
            Shape::Circle { radius: 0.5 },
            Vec2::ZERO,
        );
        def.density = 2.0;
        assert!((def.mass() - 2.0 * std::f32::consts::PI * 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_filter_excludes_non_collidable() {
        let a = CollisionFilter::COLLIDABLE;
        let ghost = CollisionFilter::NON_COLLIDABLE;
        assert!(a.accepts(&a));
        assert!(!a.accepts(&ghost));
        assert!(!ghost.accepts(&a));
    }
}

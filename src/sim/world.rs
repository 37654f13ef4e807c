//! Built-in rigid-body backend for the air hockey table
//!
//! A small sequential-impulse solver in the Box2D mould: semi-implicit Euler
//! integration, restitution with a velocity threshold, Baumgarte position
//! correction, and the table rim as a fixed boundary. Rotation is kinematic
//! (bodies keep their angular velocity; contacts apply no torque).

use glam::Vec2;

use super::collision::{boundary_collisions, shape_shape};
use super::physics::{BodyDef, BodyHandle, BodyKind, CollisionFilter, PhysicsWorld, Shape};

/// Allowed overlap; contacts closer than this count as touching
pub const LINEAR_SLOP: f32 = 0.005;
/// Fraction of overlap resolved per position iteration
pub const BAUMGARTE: f32 = 0.2;
/// Largest position correction per iteration
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;
/// Largest distance a body may travel in one step
pub const MAX_TRANSLATION: f32 = 2.0;
/// Approach speed below which collisions are inelastic
pub const RESTITUTION_THRESHOLD: f32 = 1.0;

#[derive(Debug, Clone)]
struct Body {
    kind: BodyKind,
    shape: Shape,
    pos: Vec2,
    vel: Vec2,
    angle: f32,
    angular_vel: f32,
    mass: f32,
    inv_mass: f32,
    restitution: f32,
    linear_damping: f32,
    angular_damping: f32,
    gravity_scale: f32,
    filter: CollisionFilter,
    force: Vec2,
}

impl Body {
    fn from_def(def: &BodyDef) -> Self {
        let (mass, inv_mass) = match def.kind {
            BodyKind::Static => (0.0, 0.0),
            BodyKind::Dynamic => {
                let mass = def.mass();
                (mass, if mass > 0.0 { 1.0 / mass } else { 0.0 })
            }
        };
        Self {
            kind: def.kind,
            shape: def.shape,
            pos: def.position,
            vel: match def.kind {
                BodyKind::Static => Vec2::ZERO,
                BodyKind::Dynamic => def.linear_velocity,
            },
            angle: def.angle,
            angular_vel: def.angular_velocity,
            mass,
            inv_mass,
            restitution: def.restitution,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            filter: def.filter,
            force: Vec2::ZERO,
        }
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Contact between a body and either another body or the rim (`a == None`)
#[derive(Debug, Clone)]
struct Contact {
    a: Option<usize>,
    b: usize,
    normal: Vec2,
    penetration: f32,
    velocity_bias: f32,
    normal_impulse: f32,
}

/// Rectangular table world with solid rim
#[derive(Debug, Clone)]
pub struct TableWorld {
    gravity: Vec2,
    bounds_min: Vec2,
    bounds_max: Vec2,
    rim_filter: CollisionFilter,
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Body pairs the last step's solver saw in contact
    touching: Vec<(BodyHandle, BodyHandle)>,
}

impl TableWorld {
    /// Create a world whose rim spans `[-half_extents, half_extents]`
    pub fn new(gravity: Vec2, half_extents: Vec2) -> Self {
        Self {
            gravity,
            bounds_min: -half_extents,
            bounds_max: half_extents,
            rim_filter: CollisionFilter {
                category: 1,
                mask: u16::MAX,
            },
            slots: Vec::new(),
            free: Vec::new(),
            touching: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.slots.iter().filter(|s| s.body.is_some()).count()
    }

    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    fn handle_of(&self, index: usize) -> BodyHandle {
        BodyHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    fn live_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.body.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    #[inline]
    fn live(&self, index: usize) -> &Body {
        // Only called with indices from live_indices()
        self.slots[index].body.as_ref().expect("live body index")
    }

    #[inline]
    fn live_mut(&mut self, index: usize) -> &mut Body {
        self.slots[index].body.as_mut().expect("live body index")
    }

    /// Gather overlapping pairs (and rim contacts when `with_rim`)
    fn find_contacts(&self, margin: f32, with_rim: bool) -> Vec<Contact> {
        let live = self.live_indices();
        let mut contacts = Vec::new();

        for (n, &i) in live.iter().enumerate() {
            let a = self.live(i);

            if with_rim && a.is_dynamic() && self.rim_filter.accepts(&a.filter) {
                for hit in boundary_collisions(
                    &a.shape,
                    a.pos,
                    a.angle,
                    self.bounds_min,
                    self.bounds_max,
                    margin,
                ) {
                    contacts.push(Contact {
                        a: None,
                        b: i,
                        normal: hit.normal,
                        penetration: hit.penetration,
                        velocity_bias: 0.0,
                        normal_impulse: 0.0,
                    });
                }
            }

            for &j in &live[n + 1..] {
                let b = self.live(j);
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }
                if !a.filter.accepts(&b.filter) {
                    continue;
                }
                let hit = shape_shape(&a.shape, a.pos, a.angle, &b.shape, b.pos, b.angle, margin);
                if hit.hit {
                    contacts.push(Contact {
                        a: Some(i),
                        b: j,
                        normal: hit.normal,
                        penetration: hit.penetration,
                        velocity_bias: 0.0,
                        normal_impulse: 0.0,
                    });
                }
            }
        }

        contacts
    }

    fn contact_state(&self, contact: &Contact) -> (f32, f32, f32, f32) {
        let b = self.live(contact.b);
        let (va, ima, ea) = match contact.a {
            Some(a) => {
                let a = self.live(a);
                (a.vel, a.inv_mass, a.restitution)
            }
            None => (Vec2::ZERO, 0.0, 0.0),
        };
        let vn = (b.vel - va).dot(contact.normal);
        (vn, ima, b.inv_mass, ea.max(b.restitution))
    }

    fn integrate_velocities(&mut self, dt: f32) {
        let gravity = self.gravity;
        for slot in &mut self.slots {
            let Some(body) = slot.body.as_mut() else {
                continue;
            };
            if body.is_dynamic() {
                body.vel += dt * (gravity * body.gravity_scale + body.force * body.inv_mass);
                body.vel *= 1.0 / (1.0 + dt * body.linear_damping);
                body.angular_vel *= 1.0 / (1.0 + dt * body.angular_damping);
            }
            body.force = Vec2::ZERO;
        }
    }

    fn solve_velocities(&mut self, contacts: &mut [Contact], iterations: u32) {
        for contact in contacts.iter_mut() {
            let (vn, _, _, restitution) = self.contact_state(contact);
            if vn < -RESTITUTION_THRESHOLD {
                contact.velocity_bias = -restitution * vn;
            }
        }

        for _ in 0..iterations {
            for contact in contacts.iter_mut() {
                let (vn, ima, imb, _) = self.contact_state(contact);
                let total = ima + imb;
                if total <= 0.0 {
                    continue;
                }
                let lambda = -(vn - contact.velocity_bias) / total;
                let accumulated = (contact.normal_impulse + lambda).max(0.0);
                let lambda = accumulated - contact.normal_impulse;
                contact.normal_impulse = accumulated;

                let impulse = lambda * contact.normal;
                if let Some(a) = contact.a {
                    self.live_mut(a).vel -= ima * impulse;
                }
                self.live_mut(contact.b).vel += imb * impulse;
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        for slot in &mut self.slots {
            let Some(body) = slot.body.as_mut() else {
                continue;
            };
            if !body.is_dynamic() {
                continue;
            }
            let mut translation = dt * body.vel;
            if translation.length() > MAX_TRANSLATION {
                let scale = MAX_TRANSLATION / translation.length();
                body.vel *= scale;
                translation *= scale;
            }
            body.pos += translation;
            body.angle += dt * body.angular_vel;
        }
    }

    fn solve_positions(&mut self, iterations: u32) {
        for _ in 0..iterations {
            let contacts = self.find_contacts(0.0, true);
            let mut max_penetration: f32 = 0.0;

            for contact in &contacts {
                max_penetration = max_penetration.max(contact.penetration);
                let correction = (BAUMGARTE * (contact.penetration - LINEAR_SLOP))
                    .clamp(0.0, MAX_LINEAR_CORRECTION);
                let ima = contact.a.map_or(0.0, |a| self.live(a).inv_mass);
                let imb = self.live(contact.b).inv_mass;
                let total = ima + imb;
                if total <= 0.0 || correction <= 0.0 {
                    continue;
                }
                let push = correction / total * contact.normal;
                if let Some(a) = contact.a {
                    self.live_mut(a).pos -= ima * push;
                }
                self.live_mut(contact.b).pos += imb * push;
            }

            if max_penetration < 3.0 * LINEAR_SLOP {
                break;
            }
        }
    }

    fn update_touching(&mut self) {
        let pairs: Vec<(BodyHandle, BodyHandle)> = self
            .find_contacts(LINEAR_SLOP, false)
            .into_iter()
            .filter_map(|c| c.a.map(|a| (self.handle_of(a), self.handle_of(c.b))))
            .collect();
        self.touching = pairs;
    }
}

impl PhysicsWorld for TableWorld {
    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let body = Body::from_def(def);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.body = Some(body);
                BodyHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    body: Some(body),
                });
                BodyHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    fn destroy_body(&mut self, handle: BodyHandle) {
        if !self.contains(handle) {
            return;
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.body = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.touching.retain(|&(a, b)| a != handle && b != handle);
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some()
    }

    fn apply_force_to_center(&mut self, handle: BodyHandle, force: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.force += force;
            }
        }
    }

    fn step(&mut self, dt: f32, velocity_iterations: u32, position_iterations: u32) {
        if dt <= 0.0 {
            return;
        }
        self.update_touching();
        self.integrate_velocities(dt);
        let mut contacts = self.find_contacts(0.0, true);
        self.solve_velocities(&mut contacts, velocity_iterations);
        self.integrate_positions(dt);
        self.solve_positions(position_iterations);
    }

    fn position(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle).map_or(Vec2::ZERO, |b| b.pos)
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Vec2 {
        self.body(handle).map_or(Vec2::ZERO, |b| b.vel)
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.body_mut(handle) {
            if body.is_dynamic() {
                body.vel = velocity;
            }
        }
    }

    fn mass(&self, handle: BodyHandle) -> f32 {
        self.body(handle).map_or(0.0, |b| b.mass)
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn touching(&self, handle: BodyHandle) -> Vec<BodyHandle> {
        self.touching
            .iter()
            .filter_map(|&(a, b)| {
                if a == handle {
                    Some(b)
                } else if b == handle {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> TableWorld {
        TableWorld::new(Vec2::ZERO, Vec2::new(2.5, 5.0))
    }

    fn disc(pos: Vec2, vel: Vec2, radius: f32) -> BodyDef {
        let mut def = BodyDef::new(BodyKind::Dynamic, Shape::Circle { radius }, pos);
        def.linear_velocity = vel;
        def.restitution = 1.0;
        def
    }

    #[test]
    fn test_free_flight() {
        let mut w = world();
        let h = w.create_body(&disc(Vec2::ZERO, Vec2::new(1.0, 0.0), 0.1));
        w.step(0.1, 10, 10);
        assert!((w.position(h).x - 0.1).abs() < 1e-5);
        assert!((w.linear_velocity(h).x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_gravity_and_scale() {
        let mut w = TableWorld::new(Vec2::new(0.0, -5.0), Vec2::new(2.5, 5.0));
        let falling = w.create_body(&disc(Vec2::new(-1.0, 0.0), Vec2::ZERO, 0.1));
        let mut floating_def = disc(Vec2::new(1.0, 0.0), Vec2::ZERO, 0.1);
        floating_def.gravity_scale = 0.0;
        let floating = w.create_body(&floating_def);

        w.step(0.1, 10, 10);
        assert!((w.linear_velocity(falling).y + 0.5).abs() < 1e-5);
        assert_eq!(w.linear_velocity(floating), Vec2::ZERO);
    }

    #[test]
    fn test_linear_damping() {
        let mut w = world();
        let mut def = disc(Vec2::ZERO, Vec2::new(1.0, 0.0), 0.1);
        def.linear_damping = 2.0;
        let h = w.create_body(&def);
        w.step(0.5, 10, 10);
        assert!((w.linear_velocity(h).x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_force_accelerates_then_clears() {
        let mut w = world();
        let h = w.create_body(&disc(Vec2::ZERO, Vec2::ZERO, 0.5));
        let mass = w.mass(h);
        w.apply_force_to_center(h, Vec2::new(mass * 2.0, 0.0));
        w.step(0.1, 10, 10);
        assert!((w.linear_velocity(h).x - 0.2).abs() < 1e-4);
        w.step(0.1, 10, 10);
        assert!((w.linear_velocity(h).x - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_rim_bounce() {
        let mut w = world();
        let h = w.create_body(&disc(Vec2::new(2.3, 0.0), Vec2::new(3.0, 0.0), 0.25));
        w.step(0.05, 10, 10);
        assert!(w.linear_velocity(h).x < 0.0, "should bounce off the right rim");
        assert!(w.position(h).x <= 2.5);
    }

    #[test]
    fn test_elastic_head_on_exchange() {
        let mut w = world();
        let a = w.create_body(&disc(Vec2::new(-0.24, 0.0), Vec2::new(2.0, 0.0), 0.25));
        let b = w.create_body(&disc(Vec2::new(0.24, 0.0), Vec2::ZERO, 0.25));
        w.step(0.05, 10, 10);
        assert!(w.linear_velocity(a).x.abs() < 0.05);
        assert!((w.linear_velocity(b).x - 2.0).abs() < 0.05);
        assert_eq!(w.touching(a), vec![b]);
        assert_eq!(w.touching(b), vec![a]);
    }

    #[test]
    fn test_static_body_does_not_move() {
        let mut w = world();
        let block = w.create_body(&BodyDef::new(
            BodyKind::Static,
            Shape::Rect {
                half_extents: Vec2::new(0.5, 0.25),
            },
            Vec2::new(0.0, 1.0),
        ));
        let puck = w.create_body(&disc(Vec2::new(0.0, 0.6), Vec2::new(0.0, 2.0), 0.2));
        w.step(0.05, 10, 10);
        assert_eq!(w.position(block), Vec2::new(0.0, 1.0));
        assert!(w.linear_velocity(puck).y < 0.0);
        assert_eq!(w.mass(block), 0.0);
    }

    #[test]
    fn test_non_collidable_passes_through() {
        let mut w = world();
        let a = w.create_body(&disc(Vec2::new(-0.2, 0.0), Vec2::ZERO, 0.25));
        let mut ghost = disc(Vec2::new(0.2, 0.0), Vec2::ZERO, 0.25);
        ghost.filter = CollisionFilter::NON_COLLIDABLE;
        let g = w.create_body(&ghost);
        w.step(0.05, 10, 10);
        assert!(w.touching(a).is_empty());
        assert_eq!(w.position(g), Vec2::new(0.2, 0.0));
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut w = world();
        let a = w.create_body(&disc(Vec2::new(-0.2, 0.0), Vec2::ZERO, 0.25));
        let b = w.create_body(&disc(Vec2::new(0.2, 0.0), Vec2::ZERO, 0.25));
        w.step(0.01, 10, 10);
        assert!(!w.touching(a).is_empty());

        w.destroy_body(b);
        assert!(!w.contains(b));
        assert!(w.touching(a).is_empty());
        assert_eq!(w.body_count(), 1);

        // Slot reuse bumps the generation
        let c = w.create_body(&disc(Vec2::new(1.0, 1.0), Vec2::ZERO, 0.25));
        assert_eq!(c.index, b.index);
        assert_ne!(c, b);
        assert!(!w.contains(b));

        // Destroying twice is a no-op
        w.destroy_body(b);
        assert!(w.contains(c));
    }
}

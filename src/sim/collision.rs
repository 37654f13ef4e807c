//! Narrow-phase collision detection for circles and rectangles
//!
//! Every test returns a normal pointing from the first shape toward the
//! second, plus a signed penetration (negative means a gap). A `margin`
//! lets callers count near-misses as touching.

use glam::Vec2;

use super::physics::Shape;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap (or are within the margin)
    pub hit: bool,
    /// Contact normal, from the first shape toward the second
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    fn from_separation(separation: f32, normal: Vec2, margin: f32) -> Self {
        if separation < margin {
            Self {
                hit: true,
                normal,
                penetration: -separation,
            }
        } else {
            Self::miss()
        }
    }
}

/// A rectangle placed in the world
#[derive(Debug, Clone, Copy)]
pub struct OrientedRect {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub angle: f32,
}

impl OrientedRect {
    pub fn new(center: Vec2, half_extents: Vec2, angle: f32) -> Self {
        Self {
            center,
            half_extents,
            angle,
        }
    }

    /// Local x and y axes in world space
    #[inline]
    pub fn axes(&self) -> [Vec2; 2] {
        let rot = Vec2::from_angle(self.angle);
        [rot, rot.perp()]
    }

    /// Half-width of the rectangle's projection onto `axis`
    pub fn projected_radius(&self, axis: Vec2) -> f32 {
        let [ax, ay] = self.axes();
        self.half_extents.x * ax.dot(axis).abs() + self.half_extents.y * ay.dot(axis).abs()
    }

    /// Axis-aligned half extents of the rotated rectangle
    pub fn world_half_extents(&self) -> Vec2 {
        Vec2::new(self.projected_radius(Vec2::X), self.projected_radius(Vec2::Y))
    }
}

/// Circle vs circle
pub fn circle_circle(pa: Vec2, ra: f32, pb: Vec2, rb: f32, margin: f32) -> CollisionResult {
    let delta = pb - pa;
    let dist = delta.length();
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
    CollisionResult::from_separation(dist - ra - rb, normal, margin)
}

/// Rectangle vs circle (normal points from the rectangle toward the circle)
pub fn rect_circle(rect: &OrientedRect, center: Vec2, radius: f32, margin: f32) -> CollisionResult {
    let rot = Vec2::from_angle(rect.angle);
    let local = Vec2::from_angle(-rect.angle).rotate(center - rect.center);
    let h = rect.half_extents;
    let closest = local.clamp(-h, h);
    let offset = local - closest;
    let dist = offset.length();

    if dist > 1e-6 {
        // Center outside the rectangle
        let normal = rot.rotate(offset / dist);
        CollisionResult::from_separation(dist - radius, normal, margin)
    } else {
        // Center inside: push out through the nearest face
        let gap_x = h.x - local.x.abs();
        let gap_y = h.y - local.y.abs();
        let local_normal = if gap_x < gap_y {
            Vec2::new(local.x.signum(), 0.0)
        } else {
            Vec2::new(0.0, local.y.signum())
        };
        let normal = rot.rotate(local_normal);
        CollisionResult::from_separation(-(gap_x.min(gap_y) + radius), normal, margin)
    }
}

/// Rectangle vs rectangle via separating axes
pub fn rect_rect(a: &OrientedRect, b: &OrientedRect, margin: f32) -> CollisionResult {
    let delta = b.center - a.center;
    let [a0, a1] = a.axes();
    let [b0, b1] = b.axes();

    let mut best_overlap = f32::MAX;
    let mut best_axis = Vec2::Y;
    for axis in [a0, a1, b0, b1] {
        let distance = delta.dot(axis);
        let overlap = a.projected_radius(axis) + b.projected_radius(axis) - distance.abs();
        if overlap < best_overlap {
            best_overlap = overlap;
            best_axis = if distance < 0.0 { -axis } else { axis };
        }
    }

    CollisionResult::from_separation(-best_overlap, best_axis, margin)
}

/// Collide two placed shapes (normal from `a` toward `b`)
pub fn shape_shape(
    a: &Shape,
    pa: Vec2,
    angle_a: f32,
    b: &Shape,
    pb: Vec2,
    angle_b: f32,
    margin: f32,
) -> CollisionResult {
    match (*a, *b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(pa, ra, pb, rb, margin)
        }
        (Shape::Rect { half_extents }, Shape::Circle { radius }) => {
            rect_circle(&OrientedRect::new(pa, half_extents, angle_a), pb, radius, margin)
        }
        (Shape::Circle { radius }, Shape::Rect { half_extents }) => {
            let mut result =
                rect_circle(&OrientedRect::new(pb, half_extents, angle_b), pa, radius, margin);
            result.normal = -result.normal;
            result
        }
        (Shape::Rect { half_extents: ha }, Shape::Rect { half_extents: hb }) => rect_rect(
            &OrientedRect::new(pa, ha, angle_a),
            &OrientedRect::new(pb, hb, angle_b),
            margin,
        ),
    }
}

/// Axis-aligned half extents of a placed shape
pub fn shape_half_extents(shape: &Shape, angle: f32) -> Vec2 {
    match *shape {
        Shape::Circle { radius } => Vec2::splat(radius),
        Shape::Rect { half_extents } => {
            OrientedRect::new(Vec2::ZERO, half_extents, angle).world_half_extents()
        }
    }
}

/// Collide a placed shape with the inside of the table boundary
///
/// Returns one result per wall in contact; normals point from the wall into
/// the table.
pub fn boundary_collisions(
    shape: &Shape,
    pos: Vec2,
    angle: f32,
    min: Vec2,
    max: Vec2,
    margin: f32,
) -> Vec<CollisionResult> {
    let extents = shape_half_extents(shape, angle);
    let walls = [
        (pos.x - extents.x - min.x, Vec2::X),
        (max.x - (pos.x + extents.x), Vec2::NEG_X),
        (pos.y - extents.y - min.y, Vec2::Y),
        (max.y - (pos.y + extents.y), Vec2::NEG_Y),
    ];
    walls
        .into_iter()
        .map(|(separation, normal)| CollisionResult::from_separation(separation, normal, margin))
        .filter(|result| result.hit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_circle_circle_overlap() {
        let result = circle_circle(Vec2::ZERO, 1.0, Vec2::new(1.5, 0.0), 1.0, 0.0);
        assert!(result.hit);
        assert!((result.penetration - 0.5).abs() < 1e-5);
        assert!((result.normal - Vec2::X).length() < 1e-5);
    }

    #[test]
    fn test_circle_circle_gap_within_margin() {
        let result = circle_circle(Vec2::ZERO, 1.0, Vec2::new(2.004, 0.0), 1.0, 0.005);
        assert!(result.hit);
        assert!(result.penetration < 0.0);
        assert!(!circle_circle(Vec2::ZERO, 1.0, Vec2::new(2.1, 0.0), 1.0, 0.005).hit);
    }

    #[test]
    fn test_rect_circle_face() {
        let rect = OrientedRect::new(Vec2::ZERO, Vec2::new(1.0, 0.5), 0.0);
        let result = rect_circle(&rect, Vec2::new(0.0, 0.7), 0.25, 0.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::Y).length() < 1e-5);
        assert!((result.penetration - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_rect_circle_rotated_miss() {
        // Diamond: corner reaches sqrt(2) along x
        let rect = OrientedRect::new(Vec2::ZERO, Vec2::splat(1.0), FRAC_PI_4);
        assert!(rect_circle(&rect, Vec2::new(1.3, 0.0), 0.2, 0.0).hit);
        assert!(!rect_circle(&rect, Vec2::new(1.7, 0.0), 0.2, 0.0).hit);
    }

    #[test]
    fn test_rect_circle_center_inside() {
        let rect = OrientedRect::new(Vec2::ZERO, Vec2::new(2.0, 1.0), 0.0);
        let result = rect_circle(&rect, Vec2::new(0.0, -0.8), 0.1, 0.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::NEG_Y).length() < 1e-5);
        assert!((result.penetration - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_rect_rect() {
        let a = OrientedRect::new(Vec2::ZERO, Vec2::splat(1.0), 0.0);
        let b = OrientedRect::new(Vec2::new(1.8, 0.0), Vec2::splat(1.0), 0.0);
        let result = rect_rect(&a, &b, 0.0);
        assert!(result.hit);
        assert!((result.normal - Vec2::X).length() < 1e-5);
        assert!((result.penetration - 0.2).abs() < 1e-5);

        let far = OrientedRect::new(Vec2::new(3.0, 0.0), Vec2::splat(1.0), 0.0);
        assert!(!rect_rect(&a, &far, 0.0).hit);
    }

    #[test]
    fn test_boundary_collisions() {
        let shape = Shape::Circle { radius: 0.5 };
        let min = Vec2::new(-2.0, -4.0);
        let max = Vec2::new(2.0, 4.0);

        assert!(boundary_collisions(&shape, Vec2::ZERO, 0.0, min, max, 0.0).is_empty());

        let hits = boundary_collisions(&shape, Vec2::new(-1.8, 3.9), 0.0, min, max, 0.0);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|h| (h.normal - Vec2::X).length() < 1e-5));
        assert!(hits.iter().any(|h| (h.normal - Vec2::NEG_Y).length() < 1e-5));
    }
}

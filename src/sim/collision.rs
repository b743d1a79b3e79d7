//! Collision detection and response for the gravity arena
//!
//! The orb is a circle; obstacles are axis-aligned rectangles and the arena
//! is a box with its origin at the top-left corner.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (origin at top-left, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Closest point inside the rect to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max())
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max()).all()
    }

    /// Rect grown by `margin` on every side
    pub fn inflate(&self, margin: f32) -> Rect {
        Rect {
            min: self.min - Vec2::splat(margin),
            size: self.size + Vec2::splat(margin * 2.0),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.cmplt(other.max()).all() && other.min.cmplt(self.max()).all()
    }
}

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at contact (pointing toward the circle center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
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
}

/// Check overlap between a circle and a rectangle
pub fn circle_rect_collision(center: Vec2, radius: f32, rect: &Rect) -> CollisionResult {
    let closest = rect.closest_point(center);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq >= radius * radius {
        return CollisionResult::miss();
    }

    if dist_sq > 1e-8 {
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center inside the rect - push out through the rect center
    let normal = (center - rect.center()).normalize_or(Vec2::NEG_Y);
    CollisionResult {
        hit: true,
        normal,
        penetration: radius,
    }
}

/// Keep a circle inside a `[0, bounds]` box.
///
/// Any axis that crossed a wall is clamped and its velocity component is
/// reflected and scaled by `restitution`. Returns true if a wall was hit.
pub fn clamp_to_arena(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    bounds: Vec2,
    restitution: f32,
) -> bool {
    let lo = Vec2::splat(radius);
    let hi = (bounds - Vec2::splat(radius)).max(lo);
    let mut hit = false;

    if pos.x < lo.x || pos.x > hi.x {
        pos.x = pos.x.clamp(lo.x, hi.x);
        vel.x = -vel.x * restitution;
        hit = true;
    }
    if pos.y < lo.y || pos.y > hi.y {
        pos.y = pos.y.clamp(lo.y, hi.y);
        vel.y = -vel.y * restitution;
        hit = true;
    }
    // NaN never escapes the arena either
    if !pos.is_finite() {
        *pos = (lo + hi) * 0.5;
        *vel = Vec2::ZERO;
        hit = true;
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_rect_side_hit() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0);
        // Circle just above the top edge
        let result = circle_rect_collision(Vec2::new(120.0, 92.0), 10.0, &rect);
        assert!(result.hit);
        assert!((result.normal - Vec2::NEG_Y).length() < 1e-4);
        assert!((result.penetration - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_rect_miss() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0);
        let result = circle_rect_collision(Vec2::new(50.0, 50.0), 10.0, &rect);
        assert!(!result.hit);
    }

    #[test]
    fn test_circle_rect_center_inside() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let result = circle_rect_collision(Vec2::new(80.0, 50.0), 10.0, &rect);
        assert!(result.hit);
        assert!(result.normal.x > 0.9);
    }

    #[test]
    fn test_clamp_to_arena_reflects_with_restitution() {
        let mut pos = Vec2::new(-5.0, 50.0);
        let mut vel = Vec2::new(-100.0, 10.0);
        let hit = clamp_to_arena(&mut pos, &mut vel, 10.0, Vec2::new(200.0, 200.0), 0.5);
        assert!(hit);
        assert_eq!(pos, Vec2::new(10.0, 50.0));
        assert_eq!(vel, Vec2::new(50.0, 10.0));
    }

    #[test]
    fn test_clamp_to_arena_inside_is_untouched() {
        let mut pos = Vec2::new(100.0, 100.0);
        let mut vel = Vec2::new(3.0, 4.0);
        assert!(!clamp_to_arena(&mut pos, &mut vel, 10.0, Vec2::new(200.0, 200.0), 0.5));
        assert_eq!(vel, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_rect_helpers() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 20.0, 1.0, 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.inflate(15.0).intersects(&c));
        assert!(a.contains(Vec2::new(10.0, 10.0)));
        assert_eq!(a.center(), Vec2::new(5.0, 5.0));
    }
}

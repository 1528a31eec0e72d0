//! Camera Collision Queries
//!
//! The camera never owns world geometry. Penetration avoidance asks a
//! [`CollisionQuery`] collaborator to sweep a sphere along a segment and
//! report the first blocking hit as a fraction of the segment.
//!
//! Any `Fn(&SweepQuery) -> Option<SweepHit>` closure is a collision query,
//! and [`BoxWorld`] offers a small axis-aligned box scene for tools and
//! tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::types::ViewTargetId;

/// One sphere sweep request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepQuery {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
    /// Geometry belonging to this target must not block
    pub ignore: Option<ViewTargetId>,
}

/// First blocking hit of a sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    /// Fraction of the segment travelled before the hit, in `[0, 1]`
    pub time: f32,
    /// Owner of the blocking geometry, when known
    pub blocker: Option<ViewTargetId>,
}

impl SweepHit {
    pub fn new(time: f32, blocker: Option<ViewTargetId>) -> Self {
        Self { time: time.clamp(0.0, 1.0), blocker }
    }
}

/// Synchronous world sweep collaborator.
pub trait CollisionQuery {
    fn sweep_sphere(&self, query: &SweepQuery) -> Option<SweepHit>;
}

impl<F> CollisionQuery for F
where
    F: Fn(&SweepQuery) -> Option<SweepHit>,
{
    fn sweep_sphere(&self, query: &SweepQuery) -> Option<SweepHit> {
        self(query)
    }
}

/// A world with nothing in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCollision;

impl CollisionQuery for NoCollision {
    fn sweep_sphere(&self, _query: &SweepQuery) -> Option<SweepHit> {
        None
    }
}

/// Axis-aligned blocking volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub min: Vec3,
    pub max: Vec3,
    #[serde(default)]
    pub owner: Option<ViewTargetId>,
}

/// Static scene of axis-aligned boxes.
///
/// Sphere sweeps are answered by sweeping the segment against each box
/// grown by the sphere radius, a conservative stand-in for a true
/// sphere-box sweep around the box corners.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxWorld {
    pub obstacles: Vec<Obstacle>,
}

impl BoxWorld {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }
}

impl CollisionQuery for BoxWorld {
    fn sweep_sphere(&self, query: &SweepQuery) -> Option<SweepHit> {
        let dir = query.end - query.start;
        let grow = Vec3::splat(query.radius.max(0.0));

        self.obstacles
            .iter()
            .filter(|o| query.ignore.is_none() || o.owner != query.ignore)
            .filter_map(|o| {
                segment_aabb_intersect(query.start, dir, o.min - grow, o.max + grow)
                    .map(|t| SweepHit::new(t, o.owner))
            })
            .min_by(|a, b| a.time.total_cmp(&b.time))
    }
}

/// Slab-method intersection of the segment `origin + dir * t`, `t` in
/// `[0, 1]`, with a box. Returns the entry fraction, or 0 when the segment
/// starts inside.
pub fn segment_aabb_intersect(origin: Vec3, dir: Vec3, aabb_min: Vec3, aabb_max: Vec3) -> Option<f32> {
    let inv = |d: f32| if d.abs() > 1e-10 { 1.0 / d } else { f32::MAX * d.signum() };
    let inv_dir = Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z));

    let t1 = (aabb_min - origin) * inv_dir;
    let t2 = (aabb_max - origin) * inv_dir;

    let t_min = t1.min(t2).max_element();
    let t_max = t1.max(t2).min_element();

    if t_max < t_min || t_max < 0.0 || t_min > 1.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> BoxWorld {
        BoxWorld::new(vec![Obstacle {
            min: Vec3::new(-60.0, -500.0, -500.0),
            max: Vec3::new(-50.0, 500.0, 500.0),
            owner: Some(7),
        }])
    }

    #[test]
    fn test_sweep_hits_wall_fraction() {
        let query = SweepQuery { start: Vec3::ZERO, end: Vec3::new(-100.0, 0.0, 0.0), radius: 10.0, ignore: None };
        let hit = wall().sweep_sphere(&query).unwrap();
        // Grown face at x = -40
        assert!((hit.time - 0.4).abs() < 1e-4);
        assert_eq!(hit.blocker, Some(7));
    }

    #[test]
    fn test_sweep_short_of_wall_misses() {
        let query = SweepQuery { start: Vec3::ZERO, end: Vec3::new(-30.0, 0.0, 0.0), radius: 5.0, ignore: None };
        assert!(wall().sweep_sphere(&query).is_none());
    }

    #[test]
    fn test_ignored_owner_does_not_block() {
        let query = SweepQuery { start: Vec3::ZERO, end: Vec3::new(-100.0, 0.0, 0.0), radius: 10.0, ignore: Some(7) };
        assert!(wall().sweep_sphere(&query).is_none());
    }

    #[test]
    fn test_start_inside_reports_zero() {
        let t = segment_aabb_intersect(Vec3::ZERO, Vec3::X, Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_closure_is_a_query() {
        let query_fn = |q: &SweepQuery| if q.radius > 5.0 { Some(SweepHit::new(0.5, None)) } else { None };
        let q = SweepQuery { start: Vec3::ZERO, end: Vec3::X, radius: 8.0, ignore: None };
        assert_eq!(query_fn.sweep_sphere(&q).map(|h| h.time), Some(0.5));
    }
}

//! Camera Penetration Avoidance
//!
//! Keeps the camera out of world geometry by sweeping a fan of feeler
//! spheres from a known-unobstructed anchor (the "safe location") toward the
//! ideal camera position. The resulting blocked fraction pulls the camera
//! along the anchor-to-ideal segment:
//!
//! ```text
//! out = safe + (ideal - safe) * blocked_pct
//! ```
//!
//! ## Ray Roles
//!
//! - **Primary** rays are authoritative: a closer hit snaps the fraction in
//!   immediately ("hard" block).
//! - **Feeler** rays only nudge: their hits blend the fraction in over
//!   `blend_in_time` ("soft" block), reducing pops when the camera grazes
//!   geometry at an angle.
//!
//! When obstructions clear, the fraction eases back out toward 1 over
//! `blend_out_time`. Rays that found nothing may be re-traced only every
//! `trace_interval` frames; a blocked ray is re-traced every frame.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{KINDA_SMALL_NUMBER, Rotator, map_range_clamped};

use super::collision::{CollisionQuery, SweepQuery};
use super::types::ViewTargetId;

/// One feeler sphere sweep, offset in angle from the anchor-to-ideal ray.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenetrationAvoidanceRay {
    /// Pitch/yaw offset from the base ray; roll is ignored.
    pub adjustment: Rotator,
    /// 0 means a hit never blocks, 1 means the full hit fraction applies
    pub world_weight: f32,
    pub radius: f32,
    /// Frames to skip between traces while unobstructed
    pub trace_interval: i32,
    #[serde(skip)]
    pub frames_until_next_trace: i32,
    pub enabled: bool,
    pub primary: bool,
}

impl Default for PenetrationAvoidanceRay {
    fn default() -> Self {
        Self {
            adjustment: Rotator::ZERO,
            world_weight: 1.0,
            radius: 8.0,
            trace_interval: 0,
            frames_until_next_trace: 0,
            enabled: true,
            primary: false,
        }
    }
}

impl PenetrationAvoidanceRay {
    pub fn new(adjustment: Rotator, world_weight: f32, radius: f32, trace_interval: i32, primary: bool) -> Self {
        Self {
            adjustment,
            world_weight,
            radius,
            trace_interval,
            frames_until_next_trace: 0,
            enabled: true,
            primary,
        }
    }
}

/// The default camera fan: one primary ray plus yaw feelers at 3, 6, 9 and
/// 12 degrees each side and one raised feeler.
pub fn default_camera_rays() -> Vec<PenetrationAvoidanceRay> {
    let feeler = |pitch: f32, yaw: f32, weight: f32| {
        PenetrationAvoidanceRay::new(Rotator::new(pitch, yaw, 0.0), weight, 8.0, 0, false)
    };
    vec![
        PenetrationAvoidanceRay::new(Rotator::ZERO, 1.0, 10.0, 0, true),
        feeler(0.0, 3.0, 1.0),
        feeler(0.0, -3.0, 1.0),
        feeler(0.0, 6.0, 0.9),
        feeler(0.0, -6.0, 0.9),
        feeler(0.0, 9.0, 0.8),
        feeler(0.0, -9.0, 0.8),
        feeler(0.0, 12.0, 0.7),
        feeler(0.0, -12.0, 0.7),
        feeler(8.0, 0.0, 1.0),
    ]
}

/// A single fat primary ray used to validate the safe anchor itself.
pub fn default_safe_location_rays() -> Vec<PenetrationAvoidanceRay> {
    vec![PenetrationAvoidanceRay::new(Rotator::ZERO, 1.0, 14.0, 0, true)]
}

/// Per-call inputs to [`PenetrationAvoidance::evaluate`].
#[derive(Clone, Copy, Debug)]
pub struct PenetrationRequest {
    /// Geometry owned by this target never blocks
    pub target: ViewTargetId,
    pub safe_location: Vec3,
    pub ideal_location: Vec3,
    pub delta_time: f32,
    pub single_ray_only: bool,
    /// Snap instead of blending (after a cut or reset)
    pub skip_blend: bool,
}

/// Ray set plus the persistent blocked fraction it drives.
#[derive(Clone, Debug, PartialEq)]
pub struct PenetrationAvoidance {
    pub rays: Vec<PenetrationAvoidanceRay>,
    pub blend_in_time: f32,
    pub blend_out_time: f32,
    blocked_pct: f32,
    blocking: Vec<ViewTargetId>,
}

impl PenetrationAvoidance {
    pub fn new(rays: Vec<PenetrationAvoidanceRay>, blend_in_time: f32, blend_out_time: f32) -> Self {
        Self {
            rays,
            blend_in_time,
            blend_out_time,
            blocked_pct: 1.0,
            blocking: Vec::new(),
        }
    }

    /// Fraction of the anchor-to-ideal segment the camera may use.
    #[inline]
    pub fn blocked_pct(&self) -> f32 {
        self.blocked_pct
    }

    #[inline]
    pub fn set_blocked_pct(&mut self, pct: f32) {
        self.blocked_pct = pct.clamp(0.0, 1.0);
    }

    /// Owners of the geometry that blocked a ray during the last call.
    #[inline]
    pub fn blocking_targets(&self) -> &[ViewTargetId] {
        &self.blocking
    }

    /// Sweeps the ray fan and returns the adjusted camera location.
    pub fn evaluate(&mut self, collision: &dyn CollisionQuery, request: &PenetrationRequest) -> Vec3 {
        let safe = request.safe_location;
        let ideal = request.ideal_location;
        let dt = request.delta_time;

        let mut hard_blocked = self.blocked_pct;
        let mut soft_blocked = self.blocked_pct;
        let mut blocked_this_frame = 1.0_f32;

        let base_ray = ideal - safe;
        let base_rot = Rotator::from_direction(base_ray);
        let (local_right, local_up) = (base_rot.right(), base_rot.up());

        self.blocking.clear();

        for ray in self.rays.iter_mut() {
            if request.single_ray_only && !ray.primary {
                continue;
            }
            if !ray.enabled {
                continue;
            }
            if ray.frames_until_next_trace > 0 {
                ray.frames_until_next_trace -= 1;
                continue;
            }

            let rotated = Quat::from_axis_angle(local_up, ray.adjustment.yaw.to_radians()) * base_ray;
            let rotated = Quat::from_axis_angle(local_right, ray.adjustment.pitch.to_radians()) * rotated;

            let query = SweepQuery {
                start: safe,
                end: safe + rotated,
                radius: ray.radius,
                ignore: Some(request.target),
            };
            ray.frames_until_next_trace = ray.trace_interval;

            if let Some(hit) = collision.sweep_sphere(&query) {
                let new_block = map_range_clamped((1.0, 0.0), (hit.time, 1.0), ray.world_weight);
                blocked_this_frame = blocked_this_frame.min(new_block);
                // Keep tracing every frame while obstructed
                ray.frames_until_next_trace = 0;
                if let Some(blocker) = hit.blocker {
                    if !self.blocking.contains(&blocker) {
                        self.blocking.push(blocker);
                    }
                }
            }

            if ray.primary {
                hard_blocked = blocked_this_frame;
            } else {
                soft_blocked = blocked_this_frame;
            }
        }

        let mut pct = self.blocked_pct;
        if pct < blocked_this_frame {
            // Obstruction cleared: ease back out toward the ideal location
            if self.blend_out_time > dt && !request.skip_blend {
                pct += dt / self.blend_out_time * (blocked_this_frame - pct);
            } else {
                pct = blocked_this_frame;
            }
        } else if pct > hard_blocked {
            pct = hard_blocked;
        } else if pct > soft_blocked {
            if self.blend_in_time > dt && !request.skip_blend {
                pct -= dt / self.blend_in_time * (pct - soft_blocked);
            } else {
                pct = soft_blocked;
            }
        }

        pct = pct.clamp(0.0, 1.0);
        if pct < KINDA_SMALL_NUMBER {
            pct = 0.0;
        }
        self.blocked_pct = pct;

        log::trace!(
            "penetration: target={} pct={:.3} this_frame={:.3} blockers={}",
            request.target,
            pct,
            blocked_this_frame,
            self.blocking.len()
        );

        if pct < 1.0 { safe + base_ray * pct } else { ideal }
    }
}

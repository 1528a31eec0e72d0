//! Camera Boundary Types
//!
//! Per-tick inputs the host hands to the camera rig (view target pose,
//! vehicle state) and the point-of-view record the rig hands back.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::Rotator;

/// Stable identity of a view target across ticks.
pub type ViewTargetId = u64;

/// Vehicle input and contact state sampled once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivingState {
    pub throttle: f32,
    pub brake: f32,
    /// -1 (full left) to 1 (full right)
    pub steering: f32,
    pub handbrake_on: bool,
    /// Signed speed along the vehicle's forward axis, world units per second
    pub forward_speed: f32,
    pub rpm: f32,
    pub gear: i32,
    pub automatic: bool,
    pub all_wheels_on_ground: bool,
    pub no_wheels_on_ground: bool,
}

/// Everything the driving camera needs to know about the vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleInfo {
    pub driving: DrivingState,
    pub is_drifting: bool,
    /// Seconds the steering has been held past the sharp-steering threshold
    pub time_spent_sharp_steering: f32,
    /// Per-vehicle camera-to-pivot offset applied on activation
    pub camera_to_pivot_override: Option<Vec3>,
    /// Per-vehicle local look-at offset applied on activation
    pub look_at_offset_override: Option<Vec3>,
}

/// Vertical capsule around a character, centered on its location.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub radius: f32,
    pub half_height: f32,
}

impl Capsule {
    /// Distance from `point` to the capsule's inner axis segment when the
    /// capsule is centered at `center`.
    pub fn distance_to_axis(&self, center: Vec3, point: Vec3) -> f32 {
        let segment_half = (self.half_height - self.radius).max(0.0);
        let top = center + Vec3::Z * segment_half;
        let bottom = center - Vec3::Z * segment_half;
        let axis = top - bottom;
        let t = if axis.length_squared() > f32::EPSILON {
            ((point - bottom).dot(axis) / axis.length_squared()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        point.distance(bottom + axis * t)
    }

    /// Whether `point` lies inside the capsule centered at `center`.
    #[inline]
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        self.distance_to_axis(center, point) < self.radius
    }
}

/// Pose and motion of the thing the camera looks at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewTarget {
    pub id: ViewTargetId,
    pub location: Vec3,
    pub rotation: Rotator,
    pub velocity: Vec3,
    /// Vertical offset of the visible mesh relative to `location`
    pub mesh_height_offset: f32,
    pub simulating_physics: bool,
    pub vehicle: Option<VehicleInfo>,
    pub capsule: Option<Capsule>,
}

impl Default for ViewTarget {
    fn default() -> Self {
        Self {
            id: 0,
            location: Vec3::ZERO,
            rotation: Rotator::ZERO,
            velocity: Vec3::ZERO,
            mesh_height_offset: 0.0,
            simulating_physics: false,
            vehicle: None,
            capsule: None,
        }
    }
}

impl ViewTarget {
    pub fn new(id: ViewTargetId, location: Vec3, rotation: Rotator) -> Self {
        Self { id, location, rotation, ..Default::default() }
    }

    /// Transforms a point from target-local space to world space.
    #[inline]
    pub fn transform_position(&self, local: Vec3) -> Vec3 {
        self.location + self.rotation.rotate_vector(local)
    }

    /// Transforms a world-space point into target-local space.
    #[inline]
    pub fn inverse_transform_position(&self, world: Vec3) -> Vec3 {
        self.rotation.unrotate_vector(world - self.location)
    }

    #[inline]
    pub fn driving_state(&self) -> Option<&DrivingState> {
        self.vehicle.as_ref().map(|v| &v.driving)
    }
}

/// Depth-of-field parameters carried by a POV. `None` means the camera
/// leaves the value to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthOfField {
    pub fstop: Option<f32>,
    pub focal_distance: Option<f32>,
}

/// Point of view produced by a camera mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPov {
    pub location: Vec3,
    pub rotation: Rotator,
    /// Horizontal field of view in degrees
    pub fov: f32,
    pub depth_of_field: DepthOfField,
}

impl Default for CameraPov {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Rotator::ZERO,
            fov: 90.0,
            depth_of_field: DepthOfField::default(),
        }
    }
}

static_assertions::assert_impl_all!(CameraPov: Copy, Send, Sync);
static_assertions::assert_impl_all!(ViewTarget: Copy, Send, Sync);

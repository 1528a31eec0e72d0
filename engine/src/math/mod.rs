//! Math Module
//!
//! Value types and scalar helpers the camera rig is built on. Vectors and
//! quaternions come from glam; orientation is carried as a degree-based
//! [`Rotator`].

pub mod ops;
pub mod rotator;

pub use glam::{Quat, Vec2, Vec3};
pub use ops::{
    CMS_TO_MPH, InterpValue, KINDA_SMALL_NUMBER, MAX_SUBSTEP_TIME, SMALL_NUMBER, get_range_pct,
    interp_constant_to, interp_to, lerp, map_range_clamped,
};
pub use rotator::{Rotator, clamp_angle, clamp_axis, normalize_axis};

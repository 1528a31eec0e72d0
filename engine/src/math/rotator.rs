//! Rotator - Euler Orientation in Degrees
//!
//! Camera code reasons about orientation in pitch/yaw/roll degrees because
//! limits, thresholds and response curves are all authored that way.
//! Conversions to `glam::Quat` happen only when a vector must be rotated.
//!
//! ## Axis Convention
//!
//! The world is right-handed and Z-up with X forward (Y points left):
//! - **Yaw**: rotation about +Z, positive turns X toward Y
//! - **Pitch**: positive raises the nose toward +Z
//! - **Roll**: rotation about the forward axis

use std::ops::{Add, Mul, Neg, Sub};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Wraps an angle in degrees to `(-180, 180]`.
#[inline]
pub fn normalize_axis(angle: f32) -> f32 {
    let wrapped = clamp_axis(angle);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Wraps an angle in degrees to `[0, 360)`.
#[inline]
pub fn clamp_axis(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Clamps an angle to the arc `[min, max]`, handling wrap-around.
///
/// The arc is centered between `min` and `max`; angles outside it snap to
/// the nearer edge. The result is normalized to `(-180, 180]`.
pub fn clamp_angle(angle: f32, min: f32, max: f32) -> f32 {
    let max_delta = clamp_axis(max - min) * 0.5;
    let range_center = clamp_axis(min + max_delta);
    let delta_from_center = normalize_axis(angle - range_center);

    if delta_from_center > max_delta {
        normalize_axis(range_center + max_delta)
    } else if delta_from_center < -max_delta {
        normalize_axis(range_center - max_delta)
    } else {
        normalize_axis(angle)
    }
}

/// Orientation as pitch/yaw/roll in degrees.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Every axis wrapped to `(-180, 180]`.
    #[inline]
    pub fn normalized(self) -> Self {
        Self::new(
            normalize_axis(self.pitch),
            normalize_axis(self.yaw),
            normalize_axis(self.roll),
        )
    }

    /// Axis-wise comparison of the wrapped difference against `tolerance`.
    pub fn equals(self, other: Rotator, tolerance: f32) -> bool {
        let delta = (self - other).normalized();
        delta.pitch.abs() <= tolerance && delta.yaw.abs() <= tolerance && delta.roll.abs() <= tolerance
    }

    /// True when every wrapped axis is within `tolerance` of zero.
    pub fn is_nearly_zero(self, tolerance: f32) -> bool {
        self.equals(Rotator::ZERO, tolerance)
    }

    pub fn to_quat(self) -> Quat {
        Quat::from_rotation_z(self.yaw.to_radians())
            * Quat::from_rotation_y(-self.pitch.to_radians())
            * Quat::from_rotation_x(self.roll.to_radians())
    }

    /// Unit forward (local +X) axis.
    #[inline]
    pub fn forward(self) -> Vec3 {
        self.to_quat() * Vec3::X
    }

    /// Unit right axis (local -Y).
    #[inline]
    pub fn right(self) -> Vec3 {
        self.to_quat() * Vec3::NEG_Y
    }

    /// Unit up (local +Z) axis.
    #[inline]
    pub fn up(self) -> Vec3 {
        self.to_quat() * Vec3::Z
    }

    /// Transforms a local-space vector into world space.
    #[inline]
    pub fn rotate_vector(self, v: Vec3) -> Vec3 {
        self.to_quat() * v
    }

    /// Transforms a world-space vector into this rotation's local space.
    #[inline]
    pub fn unrotate_vector(self, v: Vec3) -> Vec3 {
        self.to_quat().inverse() * v
    }

    /// Orientation that looks along `direction` with zero roll.
    ///
    /// A zero-length direction yields [`Rotator::ZERO`].
    pub fn from_direction(direction: Vec3) -> Self {
        if direction.length_squared() <= f32::EPSILON {
            return Rotator::ZERO;
        }
        let horizontal = (direction.x * direction.x + direction.y * direction.y).sqrt();
        Self::new(
            direction.z.atan2(horizontal).to_degrees(),
            direction.y.atan2(direction.x).to_degrees(),
            0.0,
        )
    }

    /// Packs into a vector as `(roll, pitch, yaw)`.
    #[inline]
    pub fn as_vector(self) -> Vec3 {
        Vec3::new(self.roll, self.pitch, self.yaw)
    }

    /// Inverse of [`Rotator::as_vector`].
    #[inline]
    pub fn from_vector(v: Vec3) -> Self {
        Self::new(v.y, v.z, v.x)
    }
}

impl Add for Rotator {
    type Output = Rotator;

    fn add(self, rhs: Rotator) -> Rotator {
        Rotator::new(self.pitch + rhs.pitch, self.yaw + rhs.yaw, self.roll + rhs.roll)
    }
}

impl Sub for Rotator {
    type Output = Rotator;

    fn sub(self, rhs: Rotator) -> Rotator {
        Rotator::new(self.pitch - rhs.pitch, self.yaw - rhs.yaw, self.roll - rhs.roll)
    }
}

impl Mul<f32> for Rotator {
    type Output = Rotator;

    fn mul(self, scale: f32) -> Rotator {
        Rotator::new(self.pitch * scale, self.yaw * scale, self.roll * scale)
    }
}

impl Neg for Rotator {
    type Output = Rotator;

    fn neg(self) -> Rotator {
        Rotator::new(-self.pitch, -self.yaw, -self.roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_axis_range() {
        assert_eq!(normalize_axis(180.0), 180.0);
        assert_eq!(normalize_axis(-180.0), 180.0);
        assert!((normalize_axis(190.0) + 170.0).abs() < 0.001);
        assert!((normalize_axis(-350.0) - 10.0).abs() < 0.001);
        assert!((normalize_axis(720.0)).abs() < 0.001);
    }

    #[test]
    fn test_clamp_angle_wraps_around() {
        // Arc (-80, 80) around zero
        assert!((clamp_angle(85.0, -80.0, 80.0) - 80.0).abs() < 0.001);
        assert!((clamp_angle(-95.0, -80.0, 80.0) + 80.0).abs() < 0.001);
        assert!((clamp_angle(30.0, -80.0, 80.0) - 30.0).abs() < 0.001);
        // Arc crossing 180
        assert!((clamp_angle(-175.0, 170.0, -170.0) + 175.0).abs() < 0.001);
        assert!((clamp_angle(150.0, 170.0, -170.0) - 170.0).abs() < 0.001);
    }

    #[test]
    fn test_forward_matches_direction() {
        let rot = Rotator::new(30.0, 45.0, 0.0);
        let back = Rotator::from_direction(rot.forward());
        assert!(back.equals(rot, 0.01));
    }

    #[test]
    fn test_axes_are_orthonormal() {
        let rot = Rotator::new(-20.0, 130.0, 15.0);
        let (f, r, u) = (rot.forward(), rot.right(), rot.up());
        assert!(f.dot(r).abs() < 0.001);
        assert!(f.dot(u).abs() < 0.001);
        assert!((f.cross(u) - r).length() < 0.001);
        // At zero rotation right must be world -Y
        assert!((Rotator::ZERO.right() - Vec3::NEG_Y).length() < 0.001);
    }

    #[test]
    fn test_unrotate_inverts_rotate() {
        let rot = Rotator::new(10.0, -60.0, 5.0);
        let v = Vec3::new(3.0, -2.0, 7.0);
        assert!((rot.unrotate_vector(rot.rotate_vector(v)) - v).length() < 0.001);
    }

    #[test]
    fn test_equals_uses_wrapped_difference() {
        assert!(Rotator::new(0.0, 179.95, 0.0).equals(Rotator::new(0.0, -179.98, 0.0), 0.1));
        assert!(!Rotator::new(0.0, 10.0, 0.0).equals(Rotator::new(0.0, 10.5, 0.0), 0.1));
    }
}

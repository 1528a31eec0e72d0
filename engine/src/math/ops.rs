//! Scalar Math Ops
//!
//! Small numeric helpers shared by the interpolators and camera models, plus
//! the [`InterpValue`] capability trait that lets one interpolator
//! implementation serve floats, vectors and rotators.

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use glam::Vec3;

use super::rotator::Rotator;

/// Largest time slice a sub-stepped interpolator integrates at once.
pub const MAX_SUBSTEP_TIME: f32 = 1.0 / 120.0;

/// Epsilon used to terminate sub-step loops and guard divisions by time.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// Squared-distance epsilon for "already at goal" checks.
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Value types the interpolators can operate on.
///
/// `wrap` brings an angular difference back into `(-180, 180]`; it is the
/// identity for linear types.
pub trait InterpValue:
    Copy + Debug + PartialEq + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    fn zero() -> Self;

    #[inline]
    fn wrap(self) -> Self {
        self
    }

    /// Euclidean length of the value viewed as a vector.
    fn magnitude(self) -> f32;
}

impl InterpValue for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn magnitude(self) -> f32 {
        self.abs()
    }
}

impl InterpValue for Vec3 {
    #[inline]
    fn zero() -> Self {
        Vec3::ZERO
    }

    #[inline]
    fn magnitude(self) -> f32 {
        self.length()
    }
}

impl InterpValue for Rotator {
    #[inline]
    fn zero() -> Self {
        Rotator::ZERO
    }

    #[inline]
    fn wrap(self) -> Self {
        self.normalized()
    }

    #[inline]
    fn magnitude(self) -> f32 {
        self.as_vector().length()
    }
}

/// Linear blend `a + (b - a) * alpha`, taking the short way for rotators.
#[inline]
pub fn lerp<T: InterpValue>(a: T, b: T, alpha: f32) -> T {
    (a + (b - a).wrap() * alpha).wrap()
}

/// One exponential "ease toward goal" step.
///
/// Moves `current` by `1 - e^(-speed * dt)` of the remaining distance.
/// A non-positive `speed` snaps straight to `goal`.
pub fn interp_to<T: InterpValue>(current: T, goal: T, dt: f32, speed: f32) -> T {
    if speed <= 0.0 {
        return goal;
    }
    let delta = (goal - current).wrap();
    let dist = delta.magnitude();
    if dist * dist < SMALL_NUMBER {
        return goal;
    }
    let alpha = 1.0 - (-speed * dt.max(0.0)).exp();
    (current + delta * alpha).wrap()
}

/// Moves `current` toward `target` at a constant `speed` units per second.
pub fn interp_constant_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
    let dist = target - current;
    if dist * dist < SMALL_NUMBER || speed <= 0.0 {
        return target;
    }
    let max_step = speed * dt;
    current + dist.clamp(-max_step, max_step)
}

/// Fraction of `value` along `range`, unclamped. A degenerate range yields
/// 0 below its start and 1 otherwise.
#[inline]
pub fn get_range_pct(range: (f32, f32), value: f32) -> f32 {
    let divisor = range.1 - range.0;
    if divisor.abs() < SMALL_NUMBER {
        return if value >= range.1 { 1.0 } else { 0.0 };
    }
    (value - range.0) / divisor
}

/// Remaps `value` from `input` to `output`, clamping to the output range.
#[inline]
pub fn map_range_clamped(input: (f32, f32), output: (f32, f32), value: f32) -> f32 {
    let pct = get_range_pct(input, value).clamp(0.0, 1.0);
    output.0 + (output.1 - output.0) * pct
}

/// Centimetres per second to miles per hour.
pub const CMS_TO_MPH: f32 = 0.022_369_4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interp_to_snaps_without_speed() {
        assert_eq!(interp_to(0.0_f32, 10.0, 0.016, 0.0), 10.0);
        assert_eq!(interp_to(Vec3::ZERO, Vec3::ONE, 0.016, -1.0), Vec3::ONE);
    }

    #[test]
    fn test_interp_to_is_exponential() {
        let out = interp_to(0.0_f32, 1.0, 0.5, 2.0);
        assert!((out - (1.0 - (-1.0_f32).exp())).abs() < 1e-5);
    }

    #[test]
    fn test_interp_to_rotator_short_way() {
        let out = interp_to(Rotator::new(0.0, 170.0, 0.0), Rotator::new(0.0, -170.0, 0.0), 10.0, 100.0);
        assert!((out.yaw + 170.0).abs() < 0.01);
        let half = interp_to(Rotator::new(0.0, 170.0, 0.0), Rotator::new(0.0, -170.0, 0.0), 0.1, 0.5_f32.ln().abs() * 10.0);
        // Halfway between 170 and -170 going through 180
        assert!((half.yaw.abs() - 180.0).abs() < 0.05);
    }

    #[test]
    fn test_interp_constant_to_caps_step() {
        assert!((interp_constant_to(0.0, 100.0, 0.1, 200.0) - 20.0).abs() < 1e-4);
        assert!((interp_constant_to(0.0, -5.0, 0.1, 200.0) + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_map_range_clamped() {
        // Weight 1 maps to the hit time, weight 0 maps to unblocked
        assert!((map_range_clamped((1.0, 0.0), (0.4, 1.0), 1.0) - 0.4).abs() < 1e-6);
        assert!((map_range_clamped((1.0, 0.0), (0.4, 1.0), 0.0) - 1.0).abs() < 1e-6);
        assert!((map_range_clamped((1.0, 0.0), (0.4, 1.0), 0.5) - 0.7).abs() < 1e-6);
        assert!((map_range_clamped((0.0, 10.0), (0.0, 1.0), 20.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_rotator_wraps() {
        let mid = lerp(Rotator::new(0.0, 170.0, 0.0), Rotator::new(0.0, -170.0, 0.0), 0.5);
        assert!((mid.yaw - 180.0).abs() < 0.01);
    }
}

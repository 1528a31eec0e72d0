//! Response Curves
//!
//! Piecewise-linear lookup tables for the authored response curves
//! (speed to FOV, steering to yaw offset, and so on). Outside the key range
//! the nearest end value holds. An empty curve evaluates to zero, which lets
//! a missing curve contribute nothing.

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize};

use crate::math::InterpValue;

/// `(time, value)` keys in ascending time order, linearly interpolated.
/// Keys are sorted on construction and on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Curve<T> {
    keys: Vec<(f32, T)>,
}

pub type FloatCurve = Curve<f32>;
pub type VectorCurve = Curve<Vec3>;

impl<T> From<Vec<(f32, T)>> for Curve<T> {
    fn from(mut keys: Vec<(f32, T)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Curve<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<(f32, T)>::deserialize(deserializer).map(Self::from)
    }
}

impl<T: InterpValue> Curve<T> {
    pub fn from_keys(keys: Vec<(f32, T)>) -> Self {
        Self::from(keys)
    }

    /// Flat curve that returns `value` everywhere.
    pub fn constant(value: T) -> Self {
        Self { keys: vec![(0.0, value)] }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[(f32, T)] {
        &self.keys
    }

    /// Range of key times, if any.
    pub fn time_range(&self) -> Option<(f32, f32)> {
        Some((self.keys.first()?.0, self.keys.last()?.0))
    }

    pub fn eval(&self, time: f32) -> T {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return T::zero(),
        };
        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }

        for pair in self.keys.windows(2) {
            let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
            if time >= t0 && time < t1 {
                let span = t1 - t0;
                if span <= f32::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * ((time - t0) / span);
            }
        }
        last.1
    }
}

/// Evaluates an optional curve, treating a missing one as zero.
#[inline]
pub fn eval_or_zero<T: InterpValue>(curve: Option<&Curve<T>>, time: f32) -> T {
    curve.map_or_else(T::zero, |c| c.eval(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_curve_is_zero() {
        assert_eq!(FloatCurve::default().eval(3.0), 0.0);
        assert_eq!(eval_or_zero::<f32>(None, 3.0), 0.0);
    }

    #[test]
    fn test_linear_between_keys_and_held_outside() {
        let curve = FloatCurve::from_keys(vec![(10.0, 90.0), (0.0, 70.0)]);
        assert_eq!(curve.eval(-5.0), 70.0);
        assert_eq!(curve.eval(50.0), 90.0);
        assert!((curve.eval(2.5) - 75.0).abs() < 1e-5);
        assert_eq!(curve.time_range(), Some((0.0, 10.0)));
    }

    #[test]
    fn test_vector_curve() {
        let curve = VectorCurve::from_keys(vec![(0.0, Vec3::ZERO), (1.0, Vec3::new(0.0, 0.0, 100.0))]);
        assert!((curve.eval(0.25).z - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_deserializes_from_key_pairs() {
        let curve: FloatCurve = serde_json::from_str("[[0.0, 1.0], [2.0, 3.0]]").unwrap();
        assert!((curve.eval(1.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_deserialized_keys_are_sorted() {
        let curve: FloatCurve = serde_json::from_str("[[10.0, 90.0], [0.0, 70.0]]").unwrap();
        assert_eq!(curve.keys(), &[(0.0, 70.0), (10.0, 90.0)]);
        assert!((curve.eval(5.0) - 80.0).abs() < 1e-5);
    }
}

//! Acceleration-Limited Interpolator
//!
//! Moves toward a goal with bounded acceleration and speed, braking early
//! enough to stop on the goal (trapezoidal velocity profile). Each
//! sub-step compares the distance to goal with the ideal stopping distance
//! `v^2 / (2 * min_deceleration)` and either accelerates, coasts or brakes.
//! Rotators integrate their wrapped delta as a `(roll, pitch, yaw)` vector.

use serde::{Deserialize, Serialize};

use crate::math::{InterpValue, KINDA_SMALL_NUMBER, MAX_SUBSTEP_TIME, SMALL_NUMBER};

/// Don't accelerate when closer than this to the goal.
pub const DEFAULT_HOLD_TOLERANCE: f32 = 1.0;

/// Acceleration limits, in value units per second (squared).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelerationParams {
    pub acceleration: f32,
    pub min_deceleration: f32,
    pub max_speed: f32,
}

impl Default for AccelerationParams {
    fn default() -> Self {
        Self {
            acceleration: 100.0,
            min_deceleration: 100.0,
            max_speed: 500.0,
        }
    }
}

impl AccelerationParams {
    pub const fn new(acceleration: f32, min_deceleration: f32, max_speed: f32) -> Self {
        Self { acceleration, min_deceleration, max_speed }
    }

    /// Preset for distances in world units.
    pub const fn linear() -> Self {
        Self::new(500.0, 500.0, 2000.0)
    }

    /// Preset for angles in degrees.
    pub const fn angular() -> Self {
        Self::new(60.0, 60.0, 360.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccelerationInterpolator<T: InterpValue> {
    pub params: AccelerationParams,
    pub hold_tolerance: f32,
    /// Always non-negative; direction comes from the goal.
    current_speed: f32,
    pending_reset: bool,
    goal_value: T,
    current_value: T,
}

impl<T: InterpValue> Default for AccelerationInterpolator<T> {
    fn default() -> Self {
        Self::with_params(AccelerationParams::default())
    }
}

impl<T: InterpValue> AccelerationInterpolator<T> {
    pub fn with_params(params: AccelerationParams) -> Self {
        Self {
            params,
            hold_tolerance: DEFAULT_HOLD_TOLERANCE,
            current_speed: 0.0,
            pending_reset: true,
            goal_value: T::zero(),
            current_value: T::zero(),
        }
    }

    pub fn eval(&mut self, goal: T, dt: f32) -> T {
        self.goal_value = goal;

        if self.pending_reset {
            self.current_value = goal;
            self.current_speed = 0.0;
            self.pending_reset = false;
        } else {
            let mut remaining = dt;
            while remaining > KINDA_SMALL_NUMBER {
                let step = remaining.min(MAX_SUBSTEP_TIME);
                self.single_step(step);
                remaining -= step;
            }
        }

        self.current_value
    }

    pub fn set_initial_value(&mut self, value: T) {
        self.current_value = value;
        self.current_speed = 0.0;
        self.pending_reset = false;
    }

    #[inline]
    pub fn set_params(&mut self, params: AccelerationParams) {
        self.params = params;
    }

    #[inline]
    pub fn get_current_value(&self) -> T {
        self.current_value
    }

    #[inline]
    pub fn get_current_speed(&self) -> f32 {
        self.current_speed
    }

    #[inline]
    pub fn reset(&mut self) {
        self.pending_reset = true;
    }

    pub fn is_within_hold_tolerance(&self) -> bool {
        (self.goal_value - self.current_value).wrap().magnitude() < self.hold_tolerance
    }

    fn single_step(&mut self, step: f32) {
        let delta = (self.goal_value - self.current_value).wrap();
        let distance = delta.magnitude();

        self.update_speed(distance, step);

        if distance <= SMALL_NUMBER {
            return;
        }
        let direction = delta * (1.0 / distance);
        self.current_value = (self.current_value + direction * (self.current_speed * step)).wrap();
    }

    fn update_speed(&mut self, distance: f32, step: f32) {
        let speed_sq = self.current_speed * self.current_speed;

        let stopping_distance = if self.params.min_deceleration > 0.0 {
            speed_sq / (2.0 * self.params.min_deceleration)
        } else if speed_sq > 0.0 {
            f32::INFINITY
        } else {
            0.0
        };

        let mut new_speed = 0.0;
        if distance < stopping_distance || distance < self.hold_tolerance {
            // Brake just hard enough to land on the goal
            if distance > SMALL_NUMBER {
                let decel = speed_sq / (2.0 * distance);
                new_speed = self.current_speed - decel * step;
            }
        } else if distance > self.hold_tolerance {
            new_speed = self.current_speed + self.params.acceleration * step;
        }

        let max_speed_to_hit_goal = distance / step;
        self.current_speed = new_speed.clamp(0.0, self.params.max_speed.min(max_speed_to_hit_goal).max(0.0));
    }
}

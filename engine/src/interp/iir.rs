//! IIR Interpolator
//!
//! First-order exponential smoothing toward a goal ("ease toward goal at
//! rate k"). Two evaluation paths are offered:
//!
//! - [`IirInterpolator::eval`]: one exponential step over the whole frame.
//! - [`IirInterpolator::eval_substepped`]: fixed slices of at most
//!   [`MAX_SUBSTEP_TIME`], with the goal swept linearly from the previous
//!   frame's goal. A trailing partial slice is rewound and re-integrated on
//!   the next call so that irregular frame times do not bias the result.

use crate::math::{InterpValue, KINDA_SMALL_NUMBER, MAX_SUBSTEP_TIME, interp_to};

/// Default approach speed.
pub const DEFAULT_IIR_INTERP_SPEED: f32 = 6.0;

/// Exponential-decay filter over any [`InterpValue`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IirInterpolator<T: InterpValue> {
    interp_speed: f32,
    current_value: T,
    last_goal_value: T,
    /// Snap to the goal on the next evaluation
    pending_reset: bool,
    /// Re-integrate the trailing partial sub-step on the next call
    pub leftover_rewind: bool,
    leftover_time: f32,
    value_after_last_full_step: T,
}

impl<T: InterpValue> Default for IirInterpolator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_IIR_INTERP_SPEED)
    }
}

impl<T: InterpValue> IirInterpolator<T> {
    pub fn new(interp_speed: f32) -> Self {
        Self {
            interp_speed,
            current_value: T::zero(),
            last_goal_value: T::zero(),
            pending_reset: true,
            leftover_rewind: true,
            leftover_time: 0.0,
            value_after_last_full_step: T::zero(),
        }
    }

    /// Full evaluation in a single time slice.
    pub fn eval(&mut self, goal: T, dt: f32) -> T {
        if self.pending_reset {
            self.perform_reset(goal);
        } else {
            self.current_value = self.single_step(goal, dt);
            self.leftover_time = 0.0;
        }
        self.current_value
    }

    /// Sub-stepped evaluation with partial-interval rewind.
    pub fn eval_substepped(&mut self, goal: T, dt: f32) -> T {
        if self.pending_reset {
            self.perform_reset(goal);
            return self.current_value;
        }

        let mut remaining = dt;

        if self.leftover_rewind && self.leftover_time > 0.0 {
            remaining += self.leftover_time;
            self.current_value = self.value_after_last_full_step;
            self.leftover_time = 0.0;
        }

        if remaining <= KINDA_SMALL_NUMBER {
            self.last_goal_value = goal;
            return self.current_value;
        }

        // Sweep the goal linearly from last frame's goal while sub-stepping
        let goal_rate = (goal - self.last_goal_value).wrap() * (1.0 / remaining);
        let mut lerped_goal = self.last_goal_value;

        while remaining > KINDA_SMALL_NUMBER {
            let step = MAX_SUBSTEP_TIME.min(remaining);

            if self.leftover_rewind && step < MAX_SUBSTEP_TIME {
                self.leftover_time = step;
                self.value_after_last_full_step = self.current_value;
            }

            remaining -= step;
            // The last slice lands exactly on the goal
            lerped_goal = if remaining <= KINDA_SMALL_NUMBER {
                goal
            } else {
                (lerped_goal + goal_rate * step).wrap()
            };

            self.current_value = self.single_step(lerped_goal, step);
        }

        self.last_goal_value = goal;
        self.current_value
    }

    #[inline]
    pub fn set_interp_speed(&mut self, interp_speed: f32) {
        self.interp_speed = interp_speed;
    }

    #[inline]
    pub fn get_interp_speed(&self) -> f32 {
        self.interp_speed
    }

    /// Seeds the current value. Cancels any pending reset, since the reset
    /// would override it.
    pub fn set_initial_value(&mut self, value: T) {
        self.current_value = value;
        self.last_goal_value = value;
        self.leftover_time = 0.0;
        self.pending_reset = false;
    }

    #[inline]
    pub fn get_current_value(&self) -> T {
        self.current_value
    }

    /// The next evaluation snaps to its goal.
    #[inline]
    pub fn reset(&mut self) {
        self.pending_reset = true;
    }

    #[inline]
    pub fn is_pending_reset(&self) -> bool {
        self.pending_reset
    }

    fn single_step(&self, goal: T, step: f32) -> T {
        interp_to(self.current_value, goal, step, self.interp_speed)
    }

    fn perform_reset(&mut self, goal: T) {
        self.current_value = goal;
        self.last_goal_value = goal;
        self.leftover_time = 0.0;
        self.pending_reset = false;
    }
}

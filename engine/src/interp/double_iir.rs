//! Double IIR Interpolator
//!
//! Two cascaded [`IirInterpolator`] stages. The intermediate stage chases
//! the goal and the primary stage chases the intermediate value, which gives
//! a softer departure from rest while keeping a smooth arrival.

use crate::math::{InterpValue, KINDA_SMALL_NUMBER, MAX_SUBSTEP_TIME};

use super::iir::IirInterpolator;

pub const DEFAULT_PRIMARY_INTERP_SPEED: f32 = 4.0;
pub const DEFAULT_INTERMEDIATE_INTERP_SPEED: f32 = 12.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoubleIirInterpolator<T: InterpValue> {
    primary: IirInterpolator<T>,
    intermediate: IirInterpolator<T>,
    last_goal_value: T,
    /// Start the goal sweep from the next goal instead of `last_goal_value`
    pending_goal_reset: bool,
}

impl<T: InterpValue> Default for DoubleIirInterpolator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMARY_INTERP_SPEED, DEFAULT_INTERMEDIATE_INTERP_SPEED)
    }
}

impl<T: InterpValue> DoubleIirInterpolator<T> {
    pub fn new(primary_speed: f32, intermediate_speed: f32) -> Self {
        Self {
            primary: IirInterpolator::new(primary_speed),
            intermediate: IirInterpolator::new(intermediate_speed),
            last_goal_value: T::zero(),
            pending_goal_reset: true,
        }
    }

    /// Updates both stage speeds. Camera models call this every tick so
    /// tunables can change at runtime.
    pub fn set_interp_speeds(&mut self, primary_speed: f32, intermediate_speed: f32) {
        self.primary.set_interp_speed(primary_speed);
        self.intermediate.set_interp_speed(intermediate_speed);
    }

    /// `(primary, intermediate)` speeds.
    #[inline]
    pub fn get_interp_speeds(&self) -> (f32, f32) {
        (self.primary.get_interp_speed(), self.intermediate.get_interp_speed())
    }

    pub fn set_initial_value(&mut self, value: T) {
        self.intermediate.set_initial_value(value);
        self.primary.set_initial_value(value);
        self.last_goal_value = value;
        self.pending_goal_reset = false;
    }

    /// Evaluates both stages over the whole frame. Each stage sub-steps
    /// internally; resets are handled by the stages themselves.
    pub fn eval(&mut self, goal: T, dt: f32) -> T {
        self.pending_goal_reset = false;
        self.last_goal_value = goal;
        self.step_stages(goal, dt)
    }

    /// Sweeps the goal across fixed sub-steps and runs each slice through
    /// both stages.
    pub fn eval_substepped(&mut self, goal: T, dt: f32) -> T {
        if self.pending_goal_reset {
            self.last_goal_value = goal;
            self.pending_goal_reset = false;
        }

        let mut remaining = dt;
        if remaining <= KINDA_SMALL_NUMBER {
            self.last_goal_value = goal;
            return self.step_stages(goal, 0.0);
        }

        let goal_rate = (goal - self.last_goal_value).wrap() * (1.0 / remaining);
        let mut lerped_goal = self.last_goal_value;

        while remaining > KINDA_SMALL_NUMBER {
            let step = MAX_SUBSTEP_TIME.min(remaining);
            remaining -= step;
            // The last slice lands exactly on the goal
            lerped_goal = if remaining <= KINDA_SMALL_NUMBER {
                goal
            } else {
                (lerped_goal + goal_rate * step).wrap()
            };
            self.step_stages(lerped_goal, step);
        }

        self.last_goal_value = goal;
        self.primary.get_current_value()
    }

    /// Both stages snap on the next evaluation.
    pub fn reset(&mut self) {
        self.intermediate.reset();
        self.primary.reset();
        self.pending_goal_reset = true;
    }

    #[inline]
    pub fn get_current_value(&self) -> T {
        self.primary.get_current_value()
    }

    fn step_stages(&mut self, goal: T, dt: f32) -> T {
        let intermediate = self.intermediate.eval_substepped(goal, dt);
        self.primary.eval_substepped(intermediate, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_reset_snaps_both_stages() {
        let mut interp = DoubleIirInterpolator::<Vec3>::default();
        interp.eval(Vec3::ZERO, 0.1);
        interp.eval(Vec3::X * 100.0, 0.1);
        interp.reset();
        assert_eq!(interp.eval(Vec3::Y * 7.0, 0.3), Vec3::Y * 7.0);
        assert_eq!(interp.eval_substepped(Vec3::Y * 7.0, 0.3), Vec3::Y * 7.0);
    }

    #[test]
    fn test_softer_departure_than_single_stage() {
        let mut double = DoubleIirInterpolator::<f32>::new(4.0, 12.0);
        let mut single = IirInterpolator::<f32>::new(4.0);
        double.set_initial_value(0.0);
        single.set_initial_value(0.0);

        let d = double.eval(1.0, 0.02);
        let s = single.eval(1.0, 0.02);
        assert!(d > 0.0);
        assert!(d < s, "double {d} should lag single {s} on departure");
    }

    #[test]
    fn test_converges_to_goal() {
        let mut interp = DoubleIirInterpolator::<f32>::new(4.0, 12.0);
        interp.set_initial_value(0.0);
        let mut value = 0.0;
        for _ in 0..600 {
            value = interp.eval_substepped(5.0, 1.0 / 60.0);
        }
        assert!((value - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_speeds_land_on_goal() {
        let mut interp = DoubleIirInterpolator::<f32>::new(0.0, 0.0);
        interp.set_initial_value(0.0);
        assert_eq!(interp.eval_substepped(7.0, 0.1), 7.0);
    }

    #[test]
    fn test_speeds_round_trip() {
        let mut interp = DoubleIirInterpolator::<f32>::default();
        assert_eq!(interp.get_interp_speeds(), (4.0, 12.0));
        interp.set_interp_speeds(2.0, 3.0);
        assert_eq!(interp.get_interp_speeds(), (2.0, 3.0));
    }
}

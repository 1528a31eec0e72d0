//! Critically Damped Spring Interpolator
//!
//! Approaches a (possibly moving) equilibrium as fast as possible without
//! oscillating. Each step is the closed-form solution of the critically
//! damped oscillator, so there is no iterative integration error:
//!
//! ```text
//! E     = e^(-w*dt)
//! x(dt) = x0 * (w*dt*E + E) + v0 * (dt*E)
//! v(dt) = x0 * (-w^2*dt*E)  + v0 * (E - w*dt*E)
//! ```
//!
//! where `x0`/`v0` are displacement from equilibrium and velocity at the
//! start of the step. Sub-stepped evaluation sweeps the equilibrium across
//! fixed slices and rewinds the trailing partial slice on the next call.

use crate::math::{InterpValue, KINDA_SMALL_NUMBER, MAX_SUBSTEP_TIME};

pub const DEFAULT_NATURAL_FREQUENCY: f32 = 20.0;

/// Per-step coefficients for a given `(w, dt)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringScalars {
    pub e: f32,
    pub e_dt: f32,
    pub e_dt_w: f32,
}

impl SpringScalars {
    pub fn compute(natural_frequency: f32, dt: f32) -> Self {
        let e = (-natural_frequency * dt).exp();
        let e_dt = e * dt;
        Self { e, e_dt, e_dt_w: e_dt * natural_frequency }
    }
}

/// Memoized [`SpringScalars`], valid only for the exact inputs they were
/// computed from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringScalarCache {
    natural_frequency: f32,
    dt: f32,
    scalars: Option<SpringScalars>,
}

impl SpringScalarCache {
    #[inline]
    pub fn is_valid_for(&self, natural_frequency: f32, dt: f32) -> bool {
        self.scalars.is_some() && self.natural_frequency == natural_frequency && self.dt == dt
    }

    pub fn get(&self, natural_frequency: f32, dt: f32) -> Option<SpringScalars> {
        if self.is_valid_for(natural_frequency, dt) { self.scalars } else { None }
    }

    /// Recomputes only on a cache miss.
    pub fn ensure(&mut self, natural_frequency: f32, dt: f32) -> SpringScalars {
        if let Some(scalars) = self.get(natural_frequency, dt) {
            return scalars;
        }
        let scalars = SpringScalars::compute(natural_frequency, dt);
        *self = Self { natural_frequency, dt, scalars: Some(scalars) };
        scalars
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringInterpolator<T: InterpValue> {
    pub natural_frequency: f32,
    current_pos: T,
    current_velocity: T,
    last_equilibrium: T,
    pending_reset: bool,
    pub leftover_rewind: bool,
    leftover_time: f32,
    pos_after_last_full_step: T,
    vel_after_last_full_step: T,
    cache: SpringScalarCache,
}

impl<T: InterpValue> Default for SpringInterpolator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_NATURAL_FREQUENCY)
    }
}

impl<T: InterpValue> SpringInterpolator<T> {
    pub fn new(natural_frequency: f32) -> Self {
        Self {
            natural_frequency,
            current_pos: T::zero(),
            current_velocity: T::zero(),
            last_equilibrium: T::zero(),
            pending_reset: true,
            leftover_rewind: true,
            leftover_time: 0.0,
            pos_after_last_full_step: T::zero(),
            vel_after_last_full_step: T::zero(),
            cache: SpringScalarCache::default(),
        }
    }

    /// Natural frequency `sqrt(k / m)` from a spring constant and mass.
    pub fn from_spring(spring_constant: f32, mass: f32) -> Self {
        Self::new((spring_constant / mass).sqrt())
    }

    /// Full evaluation in a single closed-form step.
    pub fn eval(&mut self, equilibrium: T, dt: f32) -> T {
        if self.pending_reset {
            self.perform_reset(equilibrium);
        } else {
            self.single_step(equilibrium, dt);
            self.last_equilibrium = equilibrium;
            self.leftover_time = 0.0;
        }
        self.current_pos
    }

    /// Sub-stepped evaluation, sweeping the equilibrium across slices.
    pub fn eval_substepped(&mut self, equilibrium: T, dt: f32) -> T {
        if self.pending_reset {
            self.perform_reset(equilibrium);
            return self.current_pos;
        }

        let mut remaining = dt;

        if self.leftover_rewind && self.leftover_time > 0.0 {
            remaining += self.leftover_time;
            self.current_pos = self.pos_after_last_full_step;
            self.current_velocity = self.vel_after_last_full_step;
            self.leftover_time = 0.0;
        }

        if remaining <= KINDA_SMALL_NUMBER {
            self.last_equilibrium = equilibrium;
            return self.current_pos;
        }

        let equilibrium_rate = (equilibrium - self.last_equilibrium).wrap() * (1.0 / remaining);
        let mut lerped_equilibrium = self.last_equilibrium;

        // Almost every slice is a full one
        self.cache.ensure(self.natural_frequency, MAX_SUBSTEP_TIME);

        while remaining > KINDA_SMALL_NUMBER {
            let step = MAX_SUBSTEP_TIME.min(remaining);

            if self.leftover_rewind && step < MAX_SUBSTEP_TIME {
                self.leftover_time = step;
                self.pos_after_last_full_step = self.current_pos;
                self.vel_after_last_full_step = self.current_velocity;
            }

            remaining -= step;
            // The last slice lands exactly on the goal
            lerped_equilibrium = if remaining <= KINDA_SMALL_NUMBER {
                equilibrium
            } else {
                (lerped_equilibrium + equilibrium_rate * step).wrap()
            };

            self.single_step(lerped_equilibrium, step);
        }

        self.last_equilibrium = equilibrium;
        self.current_pos
    }

    #[inline]
    pub fn get_current_value(&self) -> T {
        self.current_pos
    }

    #[inline]
    pub fn get_current_velocity(&self) -> T {
        self.current_velocity
    }

    /// Places the spring at rest on `value` and cancels any pending reset.
    pub fn init(&mut self, value: T) {
        self.current_pos = value;
        self.current_velocity = T::zero();
        self.last_equilibrium = value;
        self.leftover_time = 0.0;
        self.pending_reset = false;
    }

    /// Snap to the equilibrium on the next evaluation.
    #[inline]
    pub fn reset(&mut self) {
        self.pending_reset = true;
    }

    #[inline]
    pub fn scalar_cache(&self) -> &SpringScalarCache {
        &self.cache
    }

    fn single_step(&mut self, equilibrium: T, dt: f32) {
        // A non-positive frequency has no defined response; treat it as instant
        if self.natural_frequency <= 0.0 {
            self.current_pos = equilibrium;
            self.current_velocity = T::zero();
            return;
        }

        let w = self.natural_frequency;
        let s = self
            .cache
            .get(w, dt)
            .unwrap_or_else(|| SpringScalars::compute(w, dt));

        let displacement = (self.current_pos - equilibrium).wrap();
        let velocity = self.current_velocity;

        let new_displacement = displacement * (s.e_dt_w + s.e) + velocity * s.e_dt;
        let new_velocity = displacement * (-s.e_dt_w * w) + velocity * (s.e - s.e_dt_w);

        self.current_pos = (new_displacement + equilibrium).wrap();
        self.current_velocity = new_velocity;
    }

    fn perform_reset(&mut self, equilibrium: T) {
        self.current_pos = equilibrium;
        self.current_velocity = T::zero();
        self.last_equilibrium = equilibrium;
        self.leftover_time = 0.0;
        self.pending_reset = false;
    }
}

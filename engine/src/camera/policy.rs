//! Camera Behaviour Policies
//!
//! The third-person pipeline is fixed; the points where a specialised camera
//! changes behaviour are the hooks on [`CameraBehaviorPolicy`]. Every hook
//! receives the pipeline's [`ThirdPersonState`] so a policy can read and
//! steer the shared interpolators without owning them.
//!
//! The provided method bodies are the plain third-person behaviour, so
//! [`DefaultPolicy`] is an empty impl.

use glam::Vec3;

use super::mode::CameraModeKind;
use super::third_person::ThirdPersonState;
use super::types::ViewTarget;
use crate::math::Rotator;

pub trait CameraBehaviorPolicy: Send {
    /// Mode kind reported by a camera running this policy.
    fn kind(&self) -> CameraModeKind {
        CameraModeKind::ThirdPerson
    }

    /// Runs before anything else in the update.
    fn pre_update(&mut self, _state: &mut ThirdPersonState, _target: &ViewTarget, _dt: f32) {}

    /// Runs after the pipeline's own activation handling.
    fn on_become_active(&mut self, _state: &mut ThirdPersonState, _target: &ViewTarget) {}

    /// Runs when the camera is asked to snap its filters.
    fn on_skip_next_interpolation(&mut self, _state: &mut ThirdPersonState) {}

    /// Chooses `state.auto_follow_mode` and laziness for this tick.
    fn adjust_auto_follow_mode(&mut self, _state: &mut ThirdPersonState, _target: &ViewTarget, _dt: f32) {}

    fn compute_smooth_pivot_rotation(&mut self, state: &mut ThirdPersonState, ideal: Rotator, dt: f32) -> Rotator {
        state.smooth_pivot_rotation(ideal, dt)
    }

    /// Advances the ideal look-at point ahead of a moving target.
    fn compute_predictive_look_at_point(
        &mut self,
        state: &mut ThirdPersonState,
        target: &ViewTarget,
        look_at: Vec3,
        _dt: f32,
    ) -> Vec3 {
        look_at + target.velocity * state.settings.predictive_look_at_time
    }

    /// Smooths the ideal world look-at point.
    fn compute_world_look_at_position(&mut self, state: &mut ThirdPersonState, ideal: Vec3, dt: f32) -> Vec3 {
        state.look_at_interp.eval(ideal, dt)
    }

    fn compute_final_fov(&mut self, state: &ThirdPersonState, _target: &ViewTarget) -> f32 {
        state.settings.mode.fov
    }

    /// Degrees added to the final camera yaw.
    fn compute_yaw_modifier(&mut self, _state: &ThirdPersonState, _target: &ViewTarget, _dt: f32) -> f32 {
        0.0
    }

    /// Degrees added to the final camera roll.
    fn compute_roll_modifier(&mut self, _state: &ThirdPersonState, _target: &ViewTarget, _dt: f32) -> f32 {
        0.0
    }
}

/// Plain third-person behaviour with no modifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPolicy;

impl CameraBehaviorPolicy for DefaultPolicy {}

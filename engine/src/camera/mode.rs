//! Camera Modes
//!
//! A camera mode turns one view target into a point of view each tick. The
//! blend stack owns one persistent instance per `(kind, view target)` pair
//! and drives it through the [`CameraMode`] lifecycle:
//! `on_become_active` -> `update_camera`* -> `on_become_inactive` ->
//! `on_removed_from_stack`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::CollisionQuery;
use super::types::{CameraPov, DepthOfField, ViewTarget};
use crate::math::{KINDA_SMALL_NUMBER, Rotator};

/// Aperture reported when a cine camera does not override it.
pub const DEFAULT_APERTURE: f32 = 22.0;

/// Camera mode families the blend stack can instantiate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraModeKind {
    /// Pass-through camera that keeps the previous POV
    #[default]
    Static,
    ThirdPerson,
    Driving,
}

/// Shape of the transition-alpha to blend-weight mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendFunction {
    Linear,
    #[default]
    Cubic,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl BlendFunction {
    /// Maps a transition alpha in `[0, 1]` to a blend weight.
    pub fn alpha(self, t: f32, exp: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            BlendFunction::Linear => t,
            BlendFunction::Cubic => t * t * (3.0 - 2.0 * t),
            BlendFunction::EaseIn => t.powf(exp),
            BlendFunction::EaseOut => {
                let exp = if exp.abs() <= KINDA_SMALL_NUMBER { 1.0 } else { 1.0 / exp };
                t.powf(exp)
            }
            BlendFunction::EaseInOut => {
                if t < 0.5 {
                    0.5 * (2.0 * t).powf(exp)
                } else {
                    1.0 - 0.5 * (2.0 * (1.0 - t)).powf(exp)
                }
            }
        }
    }
}

/// How a mode blends in when it becomes the top of the stack.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionParams {
    pub blend_time: f32,           // seconds, 0 = cut
    pub blend_function: BlendFunction,
    pub blend_exp: f32,            // exponent for the ease functions
    pub lock_outgoing: bool,       // replay last POV while blending out
}

impl Default for TransitionParams {
    fn default() -> Self {
        Self {
            blend_time: 0.5,
            blend_function: BlendFunction::Cubic,
            blend_exp: 2.0,
            lock_outgoing: false,
        }
    }
}

impl TransitionParams {
    #[inline]
    pub fn blend_alpha(&self, transition_alpha: f32) -> f32 {
        self.blend_function.alpha(transition_alpha, self.blend_exp)
    }
}

/// Cinematic lens settings folded into the POV's depth of field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CineSettings {
    /// Whether the mode reports depth-of-field at all
    pub use_cine_cam: bool,
    pub use_cine_cam_settings: bool,
    pub aperture: f32,
    pub focus_distance_adjustment: f32,
}

impl Default for CineSettings {
    fn default() -> Self {
        Self {
            use_cine_cam: false,
            use_cine_cam_settings: false,
            aperture: 11.0,
            focus_distance_adjustment: 0.0,
        }
    }
}

impl CineSettings {
    /// Writes depth-of-field for a camera at `pov.location` focused on
    /// `focus_point`.
    pub fn apply(&self, focus_point: Vec3, pov: &mut CameraPov) {
        if !self.use_cine_cam {
            return;
        }
        pov.depth_of_field = if self.use_cine_cam_settings {
            DepthOfField {
                fstop: Some(self.aperture),
                focal_distance: Some(focus_point.distance(pov.location) + self.focus_distance_adjustment),
            }
        } else {
            DepthOfField { fstop: Some(DEFAULT_APERTURE), focal_distance: None }
        };
    }
}

/// Settings shared by every camera mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraModeSettings {
    pub fov: f32,
    pub transition: TransitionParams,
    pub cine: CineSettings,
    /// `(min, max)` view pitch applied while the mode is active
    pub view_pitch_override: Option<(f32, f32)>,
}

impl Default for CameraModeSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            transition: TransitionParams::default(),
            cine: CineSettings::default(),
            view_pitch_override: None,
        }
    }
}

/// Everything a mode may read or write during one update.
pub struct CameraUpdateContext<'a> {
    pub view_target: &'a ViewTarget,
    /// Player control rotation, read as input and written back by follow modes
    pub control_rotation: &'a mut Rotator,
    pub collision: &'a dyn CollisionQuery,
    pub delta_time: f32,
}

/// Per-view-target camera behaviour driven by the blend stack.
pub trait CameraMode: Send {
    fn kind(&self) -> CameraModeKind;

    fn settings(&self) -> &CameraModeSettings;

    /// Produces this tick's POV. `pov` arrives holding the previous POV.
    fn update_camera(&mut self, ctx: &mut CameraUpdateContext<'_>, pov: &mut CameraPov);

    /// `camera` is the POV the viewer currently sees.
    fn on_become_active(&mut self, target: &ViewTarget, previous: Option<CameraModeKind>, camera: &CameraPov);

    fn on_become_inactive(&mut self, _next: CameraModeKind) {}

    fn on_removed_from_stack(&mut self) {}

    /// Snap every smoothing filter on the next update.
    fn skip_next_interpolation(&mut self);

    fn is_active(&self) -> bool;

    /// Debug label for the debug channel.
    fn debug_name(&self) -> &'static str {
        match self.kind() {
            CameraModeKind::Static => "static",
            CameraModeKind::ThirdPerson => "third_person",
            CameraModeKind::Driving => "driving",
        }
    }

    /// Entities the last penetration pass collided with.
    fn blocking_targets(&self) -> &[super::types::ViewTargetId] {
        &[]
    }

    #[inline]
    fn transition_time(&self) -> f32 {
        self.settings().transition.blend_time
    }

    #[inline]
    fn should_lock_outgoing_pov(&self) -> bool {
        self.settings().transition.lock_outgoing
    }

    #[inline]
    fn blend_alpha(&self, transition_alpha: f32) -> f32 {
        self.settings().transition.blend_alpha(transition_alpha)
    }
}

/// Fallback mode used when nothing better fits a view target. It holds the
/// incoming POV and only applies its FOV and lens settings.
#[derive(Clone, Debug, Default)]
pub struct StaticCamera {
    pub settings: CameraModeSettings,
    active: bool,
}

impl StaticCamera {
    pub fn new(settings: CameraModeSettings) -> Self {
        Self { settings, active: false }
    }
}

impl CameraMode for StaticCamera {
    fn kind(&self) -> CameraModeKind {
        CameraModeKind::Static
    }

    fn settings(&self) -> &CameraModeSettings {
        &self.settings
    }

    fn update_camera(&mut self, ctx: &mut CameraUpdateContext<'_>, pov: &mut CameraPov) {
        pov.fov = self.settings.fov;
        self.settings.cine.apply(ctx.view_target.location, pov);
    }

    fn on_become_active(&mut self, _target: &ViewTarget, _previous: Option<CameraModeKind>, _camera: &CameraPov) {
        self.active = true;
    }

    fn on_become_inactive(&mut self, _next: CameraModeKind) {
        self.active = false;
    }

    fn skip_next_interpolation(&mut self) {}

    fn is_active(&self) -> bool {
        self.active
    }
}

//! Third-Person Camera
//!
//! Orbit camera around a pivot attached to the view target. Each update:
//!
//! 1. Let the policy pick the auto-follow mode, then detect manual control
//!    input and arm the lazy-follow delay.
//! 2. Compute the unsmoothed pivot transform and clamp its pitch and yaw.
//! 3. Smooth pivot rotation and location through double IIR filters.
//! 4. Offset the camera from the pivot by the (smoothed, curve-adjusted)
//!    camera-to-pivot translation.
//! 5. Optionally aim at a smoothed, predictive look-at point, then apply the
//!    policy's yaw and roll modifiers and FOV.
//! 6. Validate a safe anchor near the target and pull the camera toward it
//!    when geometry is in the way.
//!
//! Behaviour that specialised cameras change is routed through a
//! [`CameraBehaviorPolicy`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::CollisionQuery;
use super::mode::{CameraMode, CameraModeKind, CameraModeSettings, CameraUpdateContext};
use super::penetration::{
    PenetrationAvoidance, PenetrationAvoidanceRay, PenetrationRequest, default_camera_rays,
    default_safe_location_rays,
};
use super::policy::{CameraBehaviorPolicy, DefaultPolicy};
use super::types::{CameraPov, ViewTarget, ViewTargetId};
use crate::curve::VectorCurve;
use crate::interp::{DoubleIirInterpolator, IirInterpolator};
use crate::math::{Rotator, clamp_angle, get_range_pct};

/// Manual input is detected when the control rotation moves by more than
/// this many degrees between updates.
pub const CONTROL_ROTATION_TOLERANCE: f32 = 0.1;

/// How the pivot rotation follows the view target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFollowMode {
    /// Use the control rotation as-is
    #[default]
    None,
    /// Trail the target's heading with configurable laziness
    LazyFollow,
    /// Lock to the target's rotation
    FullFollow,
}

/// Location and orientation pair, used for pivot and camera transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotTransform {
    pub location: Vec3,
    pub rotation: Rotator,
}

impl PivotTransform {
    pub fn new(location: Vec3, rotation: Rotator) -> Self {
        Self { location, rotation }
    }
}

/// Third-person tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThirdPersonSettings {
    pub mode: CameraModeSettings,

    // Pivot
    pub pivot_offset: Vec3,                 // pivot relative to the target, target space
    pub pivot_pitch_limits: (f32, f32),
    pub pivot_yaw_limits: (f32, f32),       // relative to the target's yaw
    pub pivot_location_interp_speeds: (f32, f32),
    pub pivot_rotation_interp_speeds: (f32, f32),

    // Camera to pivot
    pub camera_to_pivot: Vec3,
    pub camera_to_pivot_interp_speeds: (f32, f32),
    /// Extra offset keyed by pivot pitch alpha across `pivot_pitch_limits`
    pub camera_to_pivot_pitch_curve: Option<VectorCurve>,
    pub camera_to_pivot_pitch_curve_scale: f32,
    /// Extra offset keyed by speed alpha across `camera_to_pivot_speed_range`
    pub camera_to_pivot_speed_curve: Option<VectorCurve>,
    pub camera_to_pivot_speed_curve_scale: f32,
    pub camera_to_pivot_speed_range: (f32, f32),

    // Auto follow
    pub auto_follow_mode: AutoFollowMode,
    pub lazy_follow_pitch_limits: (f32, f32),
    pub allow_lazy_follow_pitch_control: bool,
    pub lazy_follow_laziness: f32,          // trailing aim distance, 0 = instant
    pub lazy_follow_delay_after_input: f32, // seconds

    // Look-at
    pub use_look_at_point: bool,
    pub look_at_offset: Vec3,               // target space
    pub look_at_interp_speed: f32,
    pub do_predictive_look_at: bool,
    pub predictive_look_at_time: f32,

    // Penetration avoidance
    pub camera_rays: Vec<PenetrationAvoidanceRay>,
    pub safe_location_rays: Vec<PenetrationAvoidanceRay>,
    pub safe_location_offset: Vec3,
    pub safe_location_interp_speed: f32,
    pub validate_safe_location: bool,
    pub prevent_penetration: bool,
    pub predictive_avoidance: bool,
    pub penetration_blend_in_time: f32,
    pub penetration_blend_out_time: f32,
}

impl Default for ThirdPersonSettings {
    fn default() -> Self {
        Self {
            mode: CameraModeSettings::default(),

            pivot_offset: Vec3::ZERO,
            pivot_pitch_limits: (-80.0, 80.0),
            pivot_yaw_limits: (-179.9, 180.0),
            pivot_location_interp_speeds: (4.0, 12.0),
            pivot_rotation_interp_speeds: (4.0, 7.0),

            camera_to_pivot: Vec3::new(-300.0, 0.0, 0.0),
            camera_to_pivot_interp_speeds: (4.0, 12.0),
            camera_to_pivot_pitch_curve: None,
            camera_to_pivot_pitch_curve_scale: 1.0,
            camera_to_pivot_speed_curve: None,
            camera_to_pivot_speed_curve_scale: 1.0,
            camera_to_pivot_speed_range: (0.0, 1000.0),

            auto_follow_mode: AutoFollowMode::None,
            lazy_follow_pitch_limits: (-50.0, -20.0),
            allow_lazy_follow_pitch_control: false,
            lazy_follow_laziness: 200.0,
            lazy_follow_delay_after_input: 0.7,

            use_look_at_point: false,
            look_at_offset: Vec3::ZERO,
            look_at_interp_speed: 8.0,
            do_predictive_look_at: false,
            predictive_look_at_time: 1.0,

            camera_rays: default_camera_rays(),
            safe_location_rays: default_safe_location_rays(),
            safe_location_offset: Vec3::new(0.0, 0.0, 95.0),
            safe_location_interp_speed: 0.0,
            validate_safe_location: true,
            prevent_penetration: true,
            predictive_avoidance: true,
            penetration_blend_in_time: 0.15,
            penetration_blend_out_time: 0.25,
        }
    }
}

/// Mutable pipeline state shared with the behaviour policy.
#[derive(Clone, Debug)]
pub struct ThirdPersonState {
    pub settings: ThirdPersonSettings,

    pub auto_follow_mode: AutoFollowMode,
    pub laziness: f32,
    /// Seconds left before lazy follow takes over from manual input
    pub lazy_follow_delay_remaining: f32,
    pub look_at_offset_local: Vec3,
    /// Goal for the camera-to-pivot translation filter
    pub camera_to_pivot: Vec3,

    pub pivot_location_interp: DoubleIirInterpolator<Vec3>,
    pub pivot_rotation_interp: DoubleIirInterpolator<Rotator>,
    pub camera_to_pivot_interp: DoubleIirInterpolator<Vec3>,
    pub look_at_interp: IirInterpolator<Vec3>,
    pub safe_location_interp: IirInterpolator<Vec3>,

    pub camera_penetration: PenetrationAvoidance,
    pub safe_location_penetration: PenetrationAvoidance,

    pub last_pivot_to_world: PivotTransform,
    pub last_unsmoothed_pivot_to_world: PivotTransform,
    pub last_camera_to_world: PivotTransform,
    pub last_control_rotation: Rotator,
    pub last_look_at_world: Vec3,
    pub last_safe_location_local: Vec3,

    pub skip_next_interpolation: bool,
    pub skip_next_penetration_blend: bool,
    pub is_active: bool,
}

impl ThirdPersonState {
    pub fn new(settings: ThirdPersonSettings) -> Self {
        let (loc_p, loc_i) = settings.pivot_location_interp_speeds;
        let (rot_p, rot_i) = settings.pivot_rotation_interp_speeds;
        let (c2p_p, c2p_i) = settings.camera_to_pivot_interp_speeds;

        let mut camera_to_pivot_interp = DoubleIirInterpolator::new(c2p_p, c2p_i);
        camera_to_pivot_interp.set_initial_value(settings.camera_to_pivot);

        Self {
            auto_follow_mode: settings.auto_follow_mode,
            laziness: settings.lazy_follow_laziness,
            lazy_follow_delay_remaining: 0.0,
            look_at_offset_local: settings.look_at_offset,
            camera_to_pivot: settings.camera_to_pivot,

            pivot_location_interp: DoubleIirInterpolator::new(loc_p, loc_i),
            pivot_rotation_interp: DoubleIirInterpolator::new(rot_p, rot_i),
            camera_to_pivot_interp,
            look_at_interp: IirInterpolator::new(settings.look_at_interp_speed),
            safe_location_interp: IirInterpolator::new(settings.safe_location_interp_speed),

            camera_penetration: PenetrationAvoidance::new(
                settings.camera_rays.clone(),
                settings.penetration_blend_in_time,
                settings.penetration_blend_out_time,
            ),
            safe_location_penetration: PenetrationAvoidance::new(
                settings.safe_location_rays.clone(),
                settings.penetration_blend_in_time,
                settings.penetration_blend_out_time,
            ),

            last_pivot_to_world: PivotTransform::default(),
            last_unsmoothed_pivot_to_world: PivotTransform::default(),
            last_camera_to_world: PivotTransform::default(),
            last_control_rotation: Rotator::ZERO,
            last_look_at_world: Vec3::ZERO,
            last_safe_location_local: Vec3::ZERO,

            skip_next_interpolation: false,
            skip_next_penetration_blend: false,
            is_active: false,
            settings,
        }
    }

    /// Snaps the pivot-rotation filter when skipping, then evaluates it.
    pub fn smooth_pivot_rotation(&mut self, ideal: Rotator, dt: f32) -> Rotator {
        if self.skip_next_interpolation {
            self.pivot_rotation_interp.reset();
        }
        self.pivot_rotation_interp.eval(ideal, dt)
    }

    /// Resets every owned filter and requests a snapped penetration blend.
    pub fn reset_interpolators(&mut self) {
        self.skip_next_interpolation = true;
        self.pivot_location_interp.reset();
        self.pivot_rotation_interp.reset();
        self.look_at_interp.reset();
        self.safe_location_interp.reset();
        self.camera_to_pivot_interp.reset();
        self.skip_next_penetration_blend = true;
    }

    /// Unsmoothed pivot transform for this tick.
    pub fn compute_pivot_to_world(&self, target: &ViewTarget, control_rotation: Rotator) -> PivotTransform {
        let s = &self.settings;
        let target_location = target.location + Vec3::Z * target.mesh_height_offset;
        let location = target_location + target.rotation.rotate_vector(s.pivot_offset);

        let mut rotation = match self.auto_follow_mode {
            AutoFollowMode::None => control_rotation,
            AutoFollowMode::FullFollow => target.rotation,
            AutoFollowMode::LazyFollow if self.skip_next_interpolation => control_rotation,
            AutoFollowMode::LazyFollow if self.lazy_follow_delay_remaining > 0.0 => control_rotation,
            AutoFollowMode::LazyFollow => {
                let lazy = if self.laziness <= 0.0 {
                    target.rotation
                } else {
                    let last = self.last_unsmoothed_pivot_to_world;
                    let aim_point = last.location - last.rotation.forward() * self.laziness;
                    Rotator::from_direction(location - aim_point)
                };

                if s.allow_lazy_follow_pitch_control {
                    Rotator::new(control_rotation.pitch, lazy.yaw, 0.0)
                } else {
                    let (min, max) = s.lazy_follow_pitch_limits;
                    Rotator::new(clamp_angle(lazy.pitch, min, max), lazy.yaw, lazy.roll)
                }
            }
        };

        let (pitch_min, pitch_max) = s.pivot_pitch_limits;
        let (yaw_min, yaw_max) = s.pivot_yaw_limits;
        let target_yaw = target.rotation.yaw;
        rotation.pitch = clamp_angle(rotation.pitch, pitch_min, pitch_max);
        rotation.yaw = clamp_angle(rotation.yaw, target_yaw + yaw_min, target_yaw + yaw_max);
        rotation.roll = 0.0;

        PivotTransform::new(location, rotation)
    }

    /// Camera location for a smoothed pivot, including the curve offsets.
    pub fn compute_camera_location(&self, target: &ViewTarget, pivot: &PivotTransform) -> Vec3 {
        let s = &self.settings;
        let mut offset = self.camera_to_pivot_interp.get_current_value();

        if let Some(curve) = &s.camera_to_pivot_pitch_curve {
            let alpha = get_range_pct(s.pivot_pitch_limits, pivot.rotation.pitch);
            offset += curve.eval(alpha) * s.camera_to_pivot_pitch_curve_scale;
        }
        if let Some(curve) = &s.camera_to_pivot_speed_curve {
            let alpha = get_range_pct(s.camera_to_pivot_speed_range, target.velocity.length()).clamp(0.0, 1.0);
            offset += curve.eval(alpha) * s.camera_to_pivot_speed_curve_scale;
        }

        pivot.location + pivot.rotation.rotate_vector(offset)
    }

    /// Validates the safe anchor, then pulls `desired` toward it when
    /// obstructed.
    fn prevent_penetration(&mut self, collision: &dyn CollisionQuery, target: &ViewTarget, desired: Vec3, dt: f32) -> Vec3 {
        let s = &self.settings;
        let mesh_offset = target.rotation.unrotate_vector(Vec3::Z * target.mesh_height_offset);
        let ideal_safe_local = s.safe_location_offset + mesh_offset;

        self.last_safe_location_local = self.safe_location_interp.eval(ideal_safe_local, dt);
        let ideal_safe = target.transform_position(self.last_safe_location_local);

        let mut safe = ideal_safe;
        if s.validate_safe_location {
            // The anchor is re-validated from scratch each tick
            self.safe_location_penetration.set_blocked_pct(1.0);
            safe = self.safe_location_penetration.evaluate(
                collision,
                &PenetrationRequest {
                    target: target.id,
                    safe_location: target.location,
                    ideal_location: ideal_safe,
                    delta_time: dt,
                    single_ray_only: true,
                    skip_blend: self.skip_next_penetration_blend,
                },
            );
        }

        let single_ray_only = !s.predictive_avoidance || !self.is_active;
        let location = self.camera_penetration.evaluate(
            collision,
            &PenetrationRequest {
                target: target.id,
                safe_location: safe,
                ideal_location: desired,
                delta_time: dt,
                single_ray_only,
                skip_blend: self.skip_next_penetration_blend,
            },
        );
        self.skip_next_penetration_blend = false;
        location
    }
}

/// Third-person camera mode: shared pipeline plus a behaviour policy.
pub struct ThirdPersonCamera<P: CameraBehaviorPolicy = DefaultPolicy> {
    pub state: ThirdPersonState,
    policy: P,
}

impl ThirdPersonCamera<DefaultPolicy> {
    pub fn new(settings: ThirdPersonSettings) -> Self {
        Self::with_policy(settings, DefaultPolicy)
    }
}

impl<P: CameraBehaviorPolicy> ThirdPersonCamera<P> {
    pub fn with_policy(settings: ThirdPersonSettings, policy: P) -> Self {
        Self { state: ThirdPersonState::new(settings), policy }
    }

    #[inline]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[inline]
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Blocked fraction of the camera penetration pass.
    #[inline]
    pub fn get_penetration_blocked_pct(&self) -> f32 {
        self.state.camera_penetration.blocked_pct()
    }
}

impl<P: CameraBehaviorPolicy> CameraMode for ThirdPersonCamera<P> {
    fn kind(&self) -> CameraModeKind {
        self.policy.kind()
    }

    fn settings(&self) -> &CameraModeSettings {
        &self.state.settings.mode
    }

    fn update_camera(&mut self, ctx: &mut CameraUpdateContext<'_>, pov: &mut CameraPov) {
        let target = ctx.view_target;
        let dt = ctx.delta_time;
        let state = &mut self.state;

        self.policy.pre_update(state, target, dt);
        self.policy.adjust_auto_follow_mode(state, target, dt);

        let control = *ctx.control_rotation;
        if state.auto_follow_mode == AutoFollowMode::LazyFollow
            && !state.last_control_rotation.equals(control, CONTROL_ROTATION_TOLERANCE)
        {
            state.lazy_follow_delay_remaining = state.settings.lazy_follow_delay_after_input;
        } else if state.lazy_follow_delay_remaining > 0.0 {
            state.lazy_follow_delay_remaining -= dt;
        }

        let pivot = state.compute_pivot_to_world(target, control);
        state.last_unsmoothed_pivot_to_world = pivot;
        *ctx.control_rotation = pivot.rotation;

        let smoothed_rotation = self.policy.compute_smooth_pivot_rotation(state, pivot.rotation, dt);
        if state.skip_next_interpolation {
            state.pivot_location_interp.reset();
        }
        let smoothed_location = state.pivot_location_interp.eval(pivot.location, dt);
        let smoothed = PivotTransform::new(smoothed_location, smoothed_rotation);
        state.last_pivot_to_world = smoothed;

        let camera_to_pivot = state.camera_to_pivot;
        state.camera_to_pivot_interp.eval(camera_to_pivot, dt);
        let camera_location = state.compute_camera_location(target, &smoothed);

        let mut rotation = smoothed.rotation;
        if state.settings.use_look_at_point {
            let mut ideal = target.transform_position(state.look_at_offset_local);
            if state.settings.do_predictive_look_at {
                ideal = self.policy.compute_predictive_look_at_point(state, target, ideal, dt);
            }
            state.last_look_at_world = self.policy.compute_world_look_at_position(state, ideal, dt);
            rotation = Rotator::from_direction(state.last_look_at_world - camera_location);
        }
        rotation.yaw += self.policy.compute_yaw_modifier(state, target, dt);
        rotation.roll += self.policy.compute_roll_modifier(state, target, dt);

        pov.rotation = rotation;
        pov.fov = self.policy.compute_final_fov(state, target);
        pov.location = if state.settings.prevent_penetration {
            state.prevent_penetration(ctx.collision, target, camera_location, dt)
        } else {
            camera_location
        };

        state.last_camera_to_world = PivotTransform::new(pov.location, pov.rotation);
        state.last_control_rotation = *ctx.control_rotation;
        state.settings.mode.cine.apply(target.location, pov);
        state.skip_next_interpolation = false;

        log::trace!(
            "{:?}: target={} pivot=({:.1}, {:.1}, {:.1}) yaw={:.2} blocked={:.3}",
            self.policy.kind(),
            target.id,
            smoothed.location.x,
            smoothed.location.y,
            smoothed.location.z,
            pov.rotation.yaw,
            state.camera_penetration.blocked_pct()
        );
    }

    fn on_become_active(&mut self, target: &ViewTarget, _previous: Option<CameraModeKind>, camera: &CameraPov) {
        self.state.is_active = true;
        self.skip_next_interpolation();
        self.state.last_camera_to_world = PivotTransform::new(camera.location, camera.rotation);
        self.state.lazy_follow_delay_remaining = 0.0;
        self.policy.on_become_active(&mut self.state, target);
    }

    fn on_become_inactive(&mut self, _next: CameraModeKind) {
        self.state.is_active = false;
    }

    fn skip_next_interpolation(&mut self) {
        self.state.reset_interpolators();
        self.policy.on_skip_next_interpolation(&mut self.state);
    }

    fn is_active(&self) -> bool {
        self.state.is_active
    }

    fn blocking_targets(&self) -> &[ViewTargetId] {
        self.state.camera_penetration.blocking_targets()
    }
}

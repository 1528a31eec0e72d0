//! Driving Camera
//!
//! Third-person pipeline specialised for vehicles through [`DrivingPolicy`].
//! On top of the base camera it tracks:
//!
//! - **Auto-follow selection**: lazy follow above a speed threshold, reverse
//!   laziness while braking backwards, full follow during handbrake turns
//!   and for a short hold after the handbrake is released.
//! - **Pivot rotation transitions**: dedicated interpolation speeds while
//!   swinging between forward and reverse follow, or while handing control
//!   back from manual input, then a timed blend back to the normal speeds.
//! - **Predictive look-at**: a look-at point pushed ahead of the vehicle by
//!   its speed, with special cases for reverse and manual control.
//! - **Speed and steering modifiers** for FOV, yaw, roll, a lateral look-at
//!   offset and an airborne camera offset.
//!
//! All speeds are world units (cm) per second; curve ranges keyed on speed
//! are in mph.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mode::CameraModeKind;
use super::policy::CameraBehaviorPolicy;
use super::third_person::{AutoFollowMode, ThirdPersonCamera, ThirdPersonSettings, ThirdPersonState};
use super::types::{DrivingState, ViewTarget};
use crate::curve::FloatCurve;
use crate::interp::{DoubleIirInterpolator, IirInterpolator};
use crate::math::{
    CMS_TO_MPH, KINDA_SMALL_NUMBER, Rotator, get_range_pct, interp_constant_to, lerp, normalize_axis,
};

/// Driving camera mode.
pub type DrivingCamera = ThirdPersonCamera<DrivingPolicy>;

/// Builds a driving camera from its settings.
pub fn driving_camera(settings: DrivingSettings) -> DrivingCamera {
    let DrivingSettings { third_person, tuning } = settings;
    ThirdPersonCamera::with_policy(third_person, DrivingPolicy::new(tuning))
}

/// Driving camera settings: the base pipeline plus vehicle tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivingSettings {
    pub third_person: ThirdPersonSettings,
    pub tuning: DrivingTuning,
}

impl Default for DrivingSettings {
    fn default() -> Self {
        Self {
            third_person: ThirdPersonSettings {
                camera_to_pivot: Vec3::new(-600.0, 0.0, 200.0),
                auto_follow_mode: AutoFollowMode::LazyFollow,
                use_look_at_point: true,
                look_at_offset: Vec3::new(0.0, 0.0, 100.0),
                do_predictive_look_at: true,
                ..Default::default()
            },
            tuning: DrivingTuning::default(),
        }
    }
}

/// Vehicle-specific tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivingTuning {
    // Auto follow
    pub driving_lazy_follow_laziness: f32,
    pub reverse_lazy_follow_laziness: f32,
    pub forward_velocity_threshold: f32,
    pub reverse_velocity_threshold: f32,
    pub lazy_follow_speed_threshold: f32,
    pub handbrake_full_follow_post_release_time: f32,

    // Look-at
    pub min_look_at_point_distance: f32,
    pub look_at_world_interp_speeds: (f32, f32),
    pub driving_look_at_world_interp_speeds: (f32, f32),
    pub look_at_world_interp_max_speed_scale: f32,
    pub look_at_world_interp_scale_range: (f32, f32),     // mph
    pub look_at_reverse_offset: f32,
    pub look_at_forward_transition_offset: f32,
    pub look_at_vector_multiplier_interp_speeds: (f32, f32),
    pub look_at_manual_speed_transition_time: f32,
    pub look_at_lazy_speed_transition_time: f32,
    pub look_at_manual_speed_transition_scalar: f32,

    // Lateral look-at offset
    /// Sharp-steering time to lateral offset
    pub steering_to_lateral_offset_curve: Option<FloatCurve>,
    pub steering_to_lateral_offset_scales: (f32, f32),    // (time, offset)
    pub lateral_offset_steering_threshold: f32,
    pub lateral_offset_rise_fall_speeds: (f32, f32),

    // Pivot rotation speeds
    pub driving_pivot_rot_interp_speeds: (f32, f32),
    pub full_follow_pivot_rot_interp_speeds: (f32, f32),
    pub manual_to_auto_pivot_rot_interp_speeds: (f32, f32),
    pub manual_to_auto_yaw_threshold: f32,
    pub forward_to_reverse_pivot_rot_interp_speeds: (f32, f32),
    pub reverse_to_forward_pivot_rot_interp_speeds: (f32, f32),
    pub forward_reverse_yaw_threshold: f32,
    pub pivot_rot_speed_blend_time: f32,

    // FOV
    /// Speed alpha to FOV
    pub fov_speed_curve: Option<FloatCurve>,
    pub fov_speed_range: (f32, f32),                      // mph

    // Yaw modifier
    /// Speed alpha to yaw multiplier applied to steering
    pub speed_to_yaw_curve: Option<FloatCurve>,
    pub speed_to_yaw_scale: f32,
    pub speed_to_yaw_speed_range: (f32, f32),             // mph
    pub yaw_modifier_interp_speed: f32,
    pub handbrake_yaw_modifier: f32,

    // Roll modifier
    /// Speed alpha to roll multiplier applied to steering
    pub speed_to_roll_curve: Option<FloatCurve>,
    pub speed_to_roll_scale: f32,
    pub speed_to_roll_speed_range: (f32, f32),            // mph
    pub roll_modifier_interp_speed: f32,
    pub roll_modifier_rise_fall_speeds: (f32, f32),
    pub handbrake_roll_modifier: f32,

    // Airborne
    pub aerial_camera_to_pivot_offset: Vec3,
    pub aerial_offset_interp_speeds: (f32, f32),
    pub aerial_offset_air_speeds: (f32, f32),
    pub aerial_offset_ground_speeds: (f32, f32),
}

impl Default for DrivingTuning {
    fn default() -> Self {
        Self {
            driving_lazy_follow_laziness: 0.0,
            reverse_lazy_follow_laziness: 12.0,
            forward_velocity_threshold: 100.0,
            reverse_velocity_threshold: -100.0,
            lazy_follow_speed_threshold: 100.0,
            handbrake_full_follow_post_release_time: 1.0,

            min_look_at_point_distance: 250.0,
            look_at_world_interp_speeds: (8.0, 8.0),
            driving_look_at_world_interp_speeds: (12.0, 20.0),
            look_at_world_interp_max_speed_scale: 1.0,
            look_at_world_interp_scale_range: (40.0, 80.0),
            look_at_reverse_offset: 0.0,
            look_at_forward_transition_offset: 0.0,
            look_at_vector_multiplier_interp_speeds: (3.0, 6.0),
            look_at_manual_speed_transition_time: 0.5,
            look_at_lazy_speed_transition_time: 1.0,
            look_at_manual_speed_transition_scalar: 5.0,

            steering_to_lateral_offset_curve: None,
            steering_to_lateral_offset_scales: (1.0, 1.0),
            lateral_offset_steering_threshold: 0.75,
            lateral_offset_rise_fall_speeds: (200.0, 40.0),

            driving_pivot_rot_interp_speeds: (12.0, 20.0),
            full_follow_pivot_rot_interp_speeds: (12.0, 20.0),
            manual_to_auto_pivot_rot_interp_speeds: (2.0, 4.0),
            manual_to_auto_yaw_threshold: 10.0,
            forward_to_reverse_pivot_rot_interp_speeds: (12.0, 20.0),
            reverse_to_forward_pivot_rot_interp_speeds: (12.0, 20.0),
            forward_reverse_yaw_threshold: 10.0,
            pivot_rot_speed_blend_time: 1.0,

            fov_speed_curve: None,
            fov_speed_range: (0.0, 100.0),

            speed_to_yaw_curve: None,
            speed_to_yaw_scale: 1.0,
            speed_to_yaw_speed_range: (0.0, 100.0),
            yaw_modifier_interp_speed: 3.0,
            handbrake_yaw_modifier: 0.0,

            speed_to_roll_curve: None,
            speed_to_roll_scale: 1.0,
            speed_to_roll_speed_range: (0.0, 100.0),
            roll_modifier_interp_speed: 3.0,
            roll_modifier_rise_fall_speeds: (0.5, 2.0),
            handbrake_roll_modifier: 0.0,

            aerial_camera_to_pivot_offset: Vec3::ZERO,
            aerial_offset_interp_speeds: (4.0, 8.0),
            aerial_offset_air_speeds: (4.0, 8.0),
            aerial_offset_ground_speeds: (4.0, 8.0),
        }
    }
}

/// Base-pipeline values captured the first time the camera activates.
/// Per-vehicle overrides are applied on top of these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrivingDefaults {
    pub camera_to_pivot: Vec3,
    pub look_at_offset: Vec3,
    pub lateral_look_at_offset: f32,
}

/// Driving behaviour plugged into the third-person pipeline.
#[derive(Clone, Debug)]
pub struct DrivingPolicy {
    pub tuning: DrivingTuning,
    defaults: Option<DrivingDefaults>,
    adjusted_camera_to_pivot: Vec3,
    driving: DrivingState,
    time_spent_sharp_steering: f32,

    look_at_world_interp: DoubleIirInterpolator<Vec3>,
    look_at_multiplier_interp: DoubleIirInterpolator<f32>,
    yaw_modifier_interp: IirInterpolator<f32>,
    roll_modifier_interp: IirInterpolator<f32>,
    aerial_offset_interp: DoubleIirInterpolator<Vec3>,
    previous_steering_magnitude: f32,

    // Follow mode selection
    handbrake_release_remaining: f32,
    prev_handbrake_on: bool,
    reverse_follow_active: bool,
    prev_reverse_follow_active: bool,

    // Pivot rotation transitions
    forward_reverse_transition_active: bool,
    transition_rotation_started: bool,
    exiting_transitional_speeds: bool,
    speed_blend_elapsed: f32,
    active_transitional_speeds: (f32, f32),
    using_manual_cam: bool,
    manual_to_auto_transition_active: bool,
    time_in_manual_control: f32,
    time_in_automatic_control: f32,
}

impl DrivingPolicy {
    pub fn new(tuning: DrivingTuning) -> Self {
        let (look_p, look_i) = tuning.look_at_world_interp_speeds;
        let (mul_p, mul_i) = tuning.look_at_vector_multiplier_interp_speeds;
        let (air_p, air_i) = tuning.aerial_offset_interp_speeds;

        Self {
            defaults: None,
            adjusted_camera_to_pivot: Vec3::ZERO,
            driving: DrivingState::default(),
            time_spent_sharp_steering: 0.0,

            look_at_world_interp: DoubleIirInterpolator::new(look_p, look_i),
            look_at_multiplier_interp: DoubleIirInterpolator::new(mul_p, mul_i),
            yaw_modifier_interp: IirInterpolator::new(tuning.yaw_modifier_interp_speed),
            roll_modifier_interp: IirInterpolator::new(tuning.roll_modifier_interp_speed),
            aerial_offset_interp: DoubleIirInterpolator::new(air_p, air_i),
            previous_steering_magnitude: 0.0,

            handbrake_release_remaining: 0.0,
            prev_handbrake_on: false,
            reverse_follow_active: false,
            prev_reverse_follow_active: false,

            forward_reverse_transition_active: false,
            transition_rotation_started: false,
            exiting_transitional_speeds: false,
            speed_blend_elapsed: 0.0,
            active_transitional_speeds: (0.0, 0.0),
            using_manual_cam: false,
            manual_to_auto_transition_active: false,
            time_in_manual_control: 0.0,
            time_in_automatic_control: 0.0,
            tuning,
        }
    }

    /// Captures the base-pipeline defaults once. Later calls return the
    /// values from the first capture.
    pub fn capture_defaults(&mut self, state: &ThirdPersonState) -> DrivingDefaults {
        *self.defaults.get_or_insert_with(|| DrivingDefaults {
            camera_to_pivot: state.camera_to_pivot,
            look_at_offset: state.look_at_offset_local,
            lateral_look_at_offset: state.look_at_offset_local.y,
        })
    }

    #[inline]
    pub fn defaults(&self) -> Option<&DrivingDefaults> {
        self.defaults.as_ref()
    }

    #[inline]
    pub fn is_reverse_follow_active(&self) -> bool {
        self.reverse_follow_active
    }

    #[inline]
    pub fn is_forward_reverse_transition_active(&self) -> bool {
        self.forward_reverse_transition_active
    }

    #[inline]
    pub fn is_manual_to_auto_transition_active(&self) -> bool {
        self.manual_to_auto_transition_active
    }

    #[inline]
    pub fn is_handbrake_hold_active(&self) -> bool {
        self.handbrake_release_remaining > 0.0
    }

    /// `(primary, intermediate)` speeds of the world look-at filter.
    #[inline]
    pub fn get_look_at_interp_speeds(&self) -> (f32, f32) {
        self.look_at_world_interp.get_interp_speeds()
    }

    fn speed_mph(target: &ViewTarget) -> f32 {
        target.velocity.length() * CMS_TO_MPH
    }

    fn speed_alpha(range: (f32, f32), target: &ViewTarget) -> f32 {
        get_range_pct(range, Self::speed_mph(target)).clamp(0.0, 1.0)
    }

    /// Picks this tick's pivot rotation speeds and pushes them into the
    /// pipeline's rotation filter.
    fn update_pivot_rot_interp_speeds(&mut self, state: &mut ThirdPersonState, goal: Rotator, dt: f32) {
        let t = &self.tuning;
        let remaining_yaw = normalize_axis(state.pivot_rotation_interp.get_current_value().yaw - goal.yaw).abs();

        if self.manual_to_auto_transition_active && remaining_yaw <= t.manual_to_auto_yaw_threshold {
            self.manual_to_auto_transition_active = false;
            self.exiting_transitional_speeds = true;
            self.speed_blend_elapsed = 0.0;
        }

        if self.forward_reverse_transition_active {
            if !self.transition_rotation_started && remaining_yaw > t.forward_reverse_yaw_threshold {
                self.transition_rotation_started = true;
            }
            if self.transition_rotation_started && remaining_yaw <= t.forward_reverse_yaw_threshold {
                self.forward_reverse_transition_active = false;
                self.transition_rotation_started = false;
                self.exiting_transitional_speeds = true;
                self.speed_blend_elapsed = 0.0;
            }
        }

        let mut goal_speeds = state.pivot_rotation_interp.get_interp_speeds();
        self.check_for_rotational_transition_triggers(state, &mut goal_speeds);

        let t = &self.tuning;
        if !self.forward_reverse_transition_active && !self.manual_to_auto_transition_active {
            goal_speeds = if state.laziness <= 0.0 {
                t.full_follow_pivot_rot_interp_speeds
            } else {
                t.driving_pivot_rot_interp_speeds
            };
        }

        let (primary, intermediate) = if self.exiting_transitional_speeds {
            self.speed_blend_elapsed += dt;
            let alpha = get_range_pct((0.0, t.pivot_rot_speed_blend_time), self.speed_blend_elapsed).clamp(0.0, 1.0);
            if self.speed_blend_elapsed >= t.pivot_rot_speed_blend_time {
                self.exiting_transitional_speeds = false;
            }
            (
                lerp(self.active_transitional_speeds.0, goal_speeds.0, alpha),
                lerp(self.active_transitional_speeds.1, goal_speeds.1, alpha),
            )
        } else {
            goal_speeds
        };
        state.pivot_rotation_interp.set_interp_speeds(primary, intermediate);
    }

    fn check_for_rotational_transition_triggers(&mut self, state: &ThirdPersonState, goal_speeds: &mut (f32, f32)) {
        if self.prev_reverse_follow_active != self.reverse_follow_active {
            self.trigger_forward_reverse_transition(goal_speeds);
        }
        self.prev_reverse_follow_active = self.reverse_follow_active;

        let was_using_manual_cam = self.using_manual_cam;
        self.using_manual_cam = state.lazy_follow_delay_remaining > 0.0;
        if was_using_manual_cam && !self.using_manual_cam {
            self.trigger_manual_to_auto_transition(goal_speeds);
        }
    }

    fn trigger_forward_reverse_transition(&mut self, goal_speeds: &mut (f32, f32)) {
        // Manual hand-back owns the rotation speeds until it finishes
        if self.manual_to_auto_transition_active {
            return;
        }
        *goal_speeds = if self.reverse_follow_active {
            self.tuning.forward_to_reverse_pivot_rot_interp_speeds
        } else {
            self.tuning.reverse_to_forward_pivot_rot_interp_speeds
        };
        self.active_transitional_speeds = *goal_speeds;
        self.forward_reverse_transition_active = true;
        log::debug!("driving camera: forward/reverse transition (reverse = {})", self.reverse_follow_active);
    }

    fn trigger_manual_to_auto_transition(&mut self, goal_speeds: &mut (f32, f32)) {
        *goal_speeds = self.tuning.manual_to_auto_pivot_rot_interp_speeds;
        self.active_transitional_speeds = *goal_speeds;
        self.forward_reverse_transition_active = false;
        self.manual_to_auto_transition_active = true;
        log::debug!("driving camera: manual to auto transition");
    }

    /// Eases the look-at filter speeds between manual and automatic control.
    fn blend_look_at_speeds(&mut self, from_scale: f32, to_scale: f32, alpha: f32) {
        let (primary, intermediate) = self.look_at_world_interp.get_interp_speeds();
        self.look_at_world_interp.set_interp_speeds(
            lerp(primary * from_scale, primary * to_scale, alpha),
            lerp(intermediate * from_scale, intermediate * to_scale, alpha),
        );
    }
}

/// Cosine of the angle between two vectors projected onto the ground plane.
fn cosine_angle_2d(a: Vec3, b: Vec3) -> f32 {
    let a = Vec3::new(a.x, a.y, 0.0).normalize_or_zero();
    let b = Vec3::new(b.x, b.y, 0.0).normalize_or_zero();
    a.dot(b)
}

#[inline]
fn is_nearly_zero(v: Vec3, tolerance: f32) -> bool {
    v.abs().max_element() <= tolerance
}

impl CameraBehaviorPolicy for DrivingPolicy {
    fn kind(&self) -> CameraModeKind {
        CameraModeKind::Driving
    }

    fn pre_update(&mut self, state: &mut ThirdPersonState, target: &ViewTarget, dt: f32) {
        if let Some(vehicle) = &target.vehicle {
            self.driving = vehicle.driving;
            self.time_spent_sharp_steering = vehicle.time_spent_sharp_steering;
        }
        let t = &self.tuning;

        // Faster look-at tracking at speed
        let alpha = Self::speed_alpha(t.look_at_world_interp_scale_range, target);
        let (base_p, base_i) = t.driving_look_at_world_interp_speeds;
        let scale = t.look_at_world_interp_max_speed_scale;
        self.look_at_world_interp
            .set_interp_speeds(lerp(base_p, base_p * scale, alpha), lerp(base_i, base_i * scale, alpha));

        let steering = self.driving.steering;
        let (rise, fall) = t.lateral_offset_rise_fall_speeds;
        let offset_y = state.look_at_offset_local.y;
        state.look_at_offset_local.y = match &t.steering_to_lateral_offset_curve {
            Some(curve) if steering.abs() >= t.lateral_offset_steering_threshold => {
                let direction = if steering > 0.0 { 1.0 } else { -1.0 };
                let (time_scale, offset_scale) = t.steering_to_lateral_offset_scales;
                let goal = curve.eval(self.time_spent_sharp_steering / time_scale) * offset_scale * direction;
                interp_constant_to(offset_y, goal, dt, rise)
            }
            _ => {
                let rest = self.defaults.map_or(0.0, |d| d.lateral_look_at_offset);
                interp_constant_to(offset_y, rest, dt, fall)
            }
        };

        let (speeds, goal) = if self.driving.no_wheels_on_ground {
            (t.aerial_offset_air_speeds, self.adjusted_camera_to_pivot + t.aerial_camera_to_pivot_offset)
        } else {
            (t.aerial_offset_ground_speeds, self.adjusted_camera_to_pivot)
        };
        self.aerial_offset_interp.set_interp_speeds(speeds.0, speeds.1);
        state.camera_to_pivot = self.aerial_offset_interp.eval(goal, dt);
    }

    fn on_become_active(&mut self, state: &mut ThirdPersonState, target: &ViewTarget) {
        let defaults = self.capture_defaults(state);
        let t = &self.tuning;

        state.laziness = t.driving_lazy_follow_laziness;
        let (look_p, look_i) = t.driving_look_at_world_interp_speeds;
        self.look_at_world_interp.set_interp_speeds(look_p, look_i);
        let (rot_p, rot_i) = t.driving_pivot_rot_interp_speeds;
        state.pivot_rotation_interp.set_interp_speeds(rot_p, rot_i);

        let vehicle = target.vehicle.unwrap_or_default();
        self.adjusted_camera_to_pivot = defaults.camera_to_pivot + vehicle.camera_to_pivot_override.unwrap_or(Vec3::ZERO);
        state.camera_to_pivot = self.adjusted_camera_to_pivot;
        state.look_at_offset_local = defaults.look_at_offset + vehicle.look_at_offset_override.unwrap_or(Vec3::ZERO);

        self.aerial_offset_interp.set_initial_value(self.adjusted_camera_to_pivot);
        self.aerial_offset_interp.reset();
    }

    fn on_skip_next_interpolation(&mut self, _state: &mut ThirdPersonState) {
        self.look_at_world_interp.reset();
    }

    fn adjust_auto_follow_mode(&mut self, state: &mut ThirdPersonState, target: &ViewTarget, dt: f32) {
        let t = &self.tuning;
        let d = self.driving;
        let braking = d.brake > KINDA_SMALL_NUMBER;
        let drifting = target.vehicle.is_some_and(|v| v.is_drifting);

        if self.handbrake_release_remaining > 0.0 {
            self.handbrake_release_remaining = (self.handbrake_release_remaining - dt).max(0.0);
        }
        if !d.handbrake_on && self.prev_handbrake_on {
            self.handbrake_release_remaining = t.handbrake_full_follow_post_release_time;
        }

        state.auto_follow_mode = if d.forward_speed.abs() > t.lazy_follow_speed_threshold {
            AutoFollowMode::LazyFollow
        } else {
            AutoFollowMode::None
        };

        if d.forward_speed <= t.reverse_velocity_threshold && braking {
            state.laziness = t.reverse_lazy_follow_laziness;
            self.reverse_follow_active = true;
        } else if (d.handbrake_on && d.forward_speed > t.forward_velocity_threshold)
            || (d.forward_speed < KINDA_SMALL_NUMBER && !self.reverse_follow_active)
        {
            state.laziness = 0.0;
        } else if !drifting
            && !d.handbrake_on
            && d.forward_speed > t.forward_velocity_threshold
            && self.handbrake_release_remaining <= 0.0
        {
            state.laziness = t.driving_lazy_follow_laziness;
            self.reverse_follow_active = false;
        }

        self.prev_handbrake_on = d.handbrake_on;
    }

    fn compute_smooth_pivot_rotation(&mut self, state: &mut ThirdPersonState, ideal: Rotator, dt: f32) -> Rotator {
        self.update_pivot_rot_interp_speeds(state, ideal, dt);
        state.smooth_pivot_rotation(ideal, dt)
    }

    fn compute_predictive_look_at_point(
        &mut self,
        state: &mut ThirdPersonState,
        target: &ViewTarget,
        look_at: Vec3,
        dt: f32,
    ) -> Vec3 {
        let manual_time = self.tuning.look_at_manual_speed_transition_time;
        let lazy_time = self.tuning.look_at_lazy_speed_transition_time;
        let manual_scalar = self.tuning.look_at_manual_speed_transition_scalar;
        let min_distance = self.tuning.min_look_at_point_distance;
        let reverse_offset = self.tuning.look_at_reverse_offset;

        let multiplier = if state.lazy_follow_delay_remaining > 0.0 {
            // Manual control: collapse the look-at speeds so the vehicle stays framed
            self.time_in_automatic_control = 0.0;
            self.time_in_manual_control += dt;
            if self.time_in_manual_control > manual_time {
                self.look_at_world_interp.set_interp_speeds(0.0, 0.0);
            } else {
                let alpha = get_range_pct((0.0, manual_time), self.time_in_manual_control).clamp(0.0, 1.0);
                self.blend_look_at_speeds(1.0, manual_scalar, alpha);
            }
            min_distance
        } else {
            self.time_in_manual_control = 0.0;
            self.time_in_automatic_control += dt;
            let leaving_manual = self.time_in_automatic_control < lazy_time;
            if leaving_manual {
                let alpha = get_range_pct((0.0, lazy_time), self.time_in_automatic_control).clamp(0.0, 1.0);
                self.blend_look_at_speeds(manual_scalar, 1.0, alpha);
            }

            if self.reverse_follow_active {
                // Trying to drive forward out of reverse keeps the point close
                let throttle_scale = if self.driving.throttle > 0.0 { 0.0 } else { 1.0 };
                let steering_offset = (1.0 - self.driving.steering.abs()) * reverse_offset;
                if self.forward_reverse_transition_active || leaving_manual {
                    min_distance - steering_offset * throttle_scale
                } else {
                    let cosine = cosine_angle_2d(target.rotation.forward(), state.last_pivot_to_world.rotation.forward());
                    let camera_angle_offset = cosine.abs() * reverse_offset;
                    min_distance - steering_offset.min(camera_angle_offset) * throttle_scale
                }
            } else if self.forward_reverse_transition_active {
                min_distance + self.tuning.look_at_forward_transition_offset
            } else {
                target.velocity.length().max(min_distance)
            }
        };

        let smoothed = self.look_at_multiplier_interp.eval(multiplier, dt);
        look_at + target.rotation.forward() * smoothed * state.settings.predictive_look_at_time
    }

    fn compute_world_look_at_position(&mut self, _state: &mut ThirdPersonState, ideal: Vec3, dt: f32) -> Vec3 {
        self.look_at_world_interp.eval(ideal, dt)
    }

    fn compute_final_fov(&mut self, state: &ThirdPersonState, target: &ViewTarget) -> f32 {
        match &self.tuning.fov_speed_curve {
            Some(curve) => curve.eval(Self::speed_alpha(self.tuning.fov_speed_range, target)),
            None => state.settings.mode.fov,
        }
    }

    fn compute_yaw_modifier(&mut self, _state: &ThirdPersonState, target: &ViewTarget, dt: f32) -> f32 {
        let (Some(curve), Some(vehicle)) = (&self.tuning.speed_to_yaw_curve, &target.vehicle) else {
            return 0.0;
        };
        let steering = vehicle.driving.steering;
        let alpha = Self::speed_alpha(self.tuning.speed_to_yaw_speed_range, target);
        let mut goal = steering * curve.eval(alpha) * self.tuning.speed_to_yaw_scale;
        if vehicle.driving.handbrake_on && !is_nearly_zero(target.velocity, KINDA_SMALL_NUMBER) {
            goal += self.tuning.handbrake_yaw_modifier * steering;
        }
        self.yaw_modifier_interp.eval(goal, dt)
    }

    fn compute_roll_modifier(&mut self, _state: &ThirdPersonState, target: &ViewTarget, dt: f32) -> f32 {
        let (Some(curve), Some(vehicle)) = (&self.tuning.speed_to_roll_curve, &target.vehicle) else {
            return 0.0;
        };
        let steering = vehicle.driving.steering;
        let magnitude = steering.abs();
        let (rise, fall) = self.tuning.roll_modifier_rise_fall_speeds;
        if magnitude > self.previous_steering_magnitude {
            self.roll_modifier_interp.set_interp_speed(rise);
        } else if magnitude < self.previous_steering_magnitude {
            self.roll_modifier_interp.set_interp_speed(fall);
        }
        self.previous_steering_magnitude = magnitude;

        let alpha = Self::speed_alpha(self.tuning.speed_to_roll_speed_range, target);
        let mut goal = steering * curve.eval(alpha) * self.tuning.speed_to_roll_scale;
        if vehicle.driving.handbrake_on && !is_nearly_zero(target.velocity, 10.0) {
            goal += self.tuning.handbrake_roll_modifier * steering;
        }
        self.roll_modifier_interp.eval(goal, dt)
    }
}

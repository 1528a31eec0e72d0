//! Camera Rig Configuration
//!
//! Every tunable of the rig in one serde document. Partial files are fine:
//! each struct is `#[serde(default)]`, so a config only needs the values it
//! changes. The format is chosen from the file extension.
//!
//! ```toml
//! [blend_stack]
//! teleport_distance = 5000.0
//!
//! [third_person]
//! camera_to_pivot = [-350.0, 0.0, 40.0]
//!
//! [driving.tuning]
//! min_look_at_point_distance = 300.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::blend_stack::{BlendStackSettings, CameraBlendStack, CameraModeFactory, DefaultModeSelector};
use crate::camera::driving::{DrivingSettings, DrivingTuning, driving_camera};
use crate::camera::mode::{CameraMode, CameraModeKind, CameraModeSettings, StaticCamera};
use crate::camera::penetration::PenetrationAvoidanceRay;
use crate::camera::third_person::{ThirdPersonCamera, ThirdPersonSettings};
use crate::error::ConfigError;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("toml") => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Complete camera rig configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRigConfig {
    pub blend_stack: BlendStackSettings,
    pub static_camera: CameraModeSettings,
    pub third_person: ThirdPersonSettings,
    pub driving: DrivingSettings,
}

impl CameraRigConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format =
            ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnknownFormat { path: path.to_path_buf() })?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        log::info!("loaded camera rig config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates config text.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects non-finite values and negative times, speeds and distances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_blend_stack(&self.blend_stack)?;
        validate_mode("static_camera", &self.static_camera)?;
        validate_third_person("third_person", &self.third_person)?;
        validate_third_person("driving.third_person", &self.driving.third_person)?;
        validate_driving_tuning("driving.tuning", &self.driving.tuning)
    }

    /// Builds a blend stack that creates its modes from this config.
    pub fn into_blend_stack(self) -> CameraBlendStack {
        let settings = self.blend_stack;
        CameraBlendStack::new(settings, self, DefaultModeSelector)
    }
}

impl CameraModeFactory for CameraRigConfig {
    fn create(&self, kind: CameraModeKind) -> Box<dyn CameraMode> {
        match kind {
            CameraModeKind::Static => Box::new(StaticCamera::new(self.static_camera)),
            CameraModeKind::ThirdPerson => Box::new(ThirdPersonCamera::new(self.third_person.clone())),
            CameraModeKind::Driving => Box::new(driving_camera(self.driving.clone())),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not finite", value)))
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::invalid(field, format!("{} is negative", value)));
    }
    Ok(())
}

fn non_negative_pair(field: &str, (a, b): (f32, f32)) -> Result<(), ConfigError> {
    non_negative(field, a)?;
    non_negative(field, b)
}

fn range(field: &str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    finite(field, min)?;
    finite(field, max)?;
    if min > max {
        return Err(ConfigError::invalid(field, format!("min {} exceeds max {}", min, max)));
    }
    Ok(())
}

fn validate_blend_stack(settings: &BlendStackSettings) -> Result<(), ConfigError> {
    non_negative("blend_stack.teleport_distance", settings.teleport_distance)?;
    non_negative("blend_stack.hide_player_padding", settings.hide_player_padding)?;
    range("blend_stack.default_view_pitch_limits", settings.default_view_pitch_limits)?;
    if !(settings.max_physics_delta_time.is_finite() && settings.max_physics_delta_time > 0.0) {
        return Err(ConfigError::invalid(
            "blend_stack.max_physics_delta_time",
            format!("{} must be positive", settings.max_physics_delta_time),
        ));
    }
    Ok(())
}

fn validate_mode(prefix: &str, settings: &CameraModeSettings) -> Result<(), ConfigError> {
    if !(settings.fov.is_finite() && settings.fov > 0.0 && settings.fov < 180.0) {
        return Err(ConfigError::invalid(
            format!("{}.fov", prefix),
            format!("{} is outside (0, 180)", settings.fov),
        ));
    }
    non_negative(&format!("{}.transition.blend_time", prefix), settings.transition.blend_time)?;
    non_negative(&format!("{}.transition.blend_exp", prefix), settings.transition.blend_exp)?;
    non_negative(&format!("{}.cine.aperture", prefix), settings.cine.aperture)?;
    finite(&format!("{}.cine.focus_distance_adjustment", prefix), settings.cine.focus_distance_adjustment)?;
    if let Some(limits) = settings.view_pitch_override {
        range(&format!("{}.view_pitch_override", prefix), limits)?;
    }
    Ok(())
}

fn validate_rays(field: &str, rays: &[PenetrationAvoidanceRay]) -> Result<(), ConfigError> {
    for (i, ray) in rays.iter().enumerate() {
        let field = format!("{}[{}]", field, i);
        non_negative(&format!("{}.radius", field), ray.radius)?;
        finite(&format!("{}.world_weight", field), ray.world_weight)?;
        if ray.trace_interval < 0 {
            return Err(ConfigError::invalid(format!("{}.trace_interval", field), "negative frame count"));
        }
    }
    Ok(())
}

fn validate_third_person(prefix: &str, s: &ThirdPersonSettings) -> Result<(), ConfigError> {
    let field = |name: &str| format!("{}.{}", prefix, name);

    validate_mode(&field("mode"), &s.mode)?;
    range(&field("pivot_pitch_limits"), s.pivot_pitch_limits)?;
    range(&field("pivot_yaw_limits"), s.pivot_yaw_limits)?;
    range(&field("lazy_follow_pitch_limits"), s.lazy_follow_pitch_limits)?;
    range(&field("camera_to_pivot_speed_range"), s.camera_to_pivot_speed_range)?;
    non_negative_pair(&field("pivot_location_interp_speeds"), s.pivot_location_interp_speeds)?;
    non_negative_pair(&field("pivot_rotation_interp_speeds"), s.pivot_rotation_interp_speeds)?;
    non_negative_pair(&field("camera_to_pivot_interp_speeds"), s.camera_to_pivot_interp_speeds)?;
    non_negative(&field("lazy_follow_laziness"), s.lazy_follow_laziness)?;
    non_negative(&field("lazy_follow_delay_after_input"), s.lazy_follow_delay_after_input)?;
    non_negative(&field("look_at_interp_speed"), s.look_at_interp_speed)?;
    non_negative(&field("predictive_look_at_time"), s.predictive_look_at_time)?;
    non_negative(&field("safe_location_interp_speed"), s.safe_location_interp_speed)?;
    non_negative(&field("penetration_blend_in_time"), s.penetration_blend_in_time)?;
    non_negative(&field("penetration_blend_out_time"), s.penetration_blend_out_time)?;
    validate_rays(&field("camera_rays"), &s.camera_rays)?;
    validate_rays(&field("safe_location_rays"), &s.safe_location_rays)
}

fn validate_driving_tuning(prefix: &str, t: &DrivingTuning) -> Result<(), ConfigError> {
    let field = |name: &str| format!("{}.{}", prefix, name);

    non_negative(&field("driving_lazy_follow_laziness"), t.driving_lazy_follow_laziness)?;
    non_negative(&field("reverse_lazy_follow_laziness"), t.reverse_lazy_follow_laziness)?;
    finite(&field("forward_velocity_threshold"), t.forward_velocity_threshold)?;
    finite(&field("reverse_velocity_threshold"), t.reverse_velocity_threshold)?;
    non_negative(&field("lazy_follow_speed_threshold"), t.lazy_follow_speed_threshold)?;
    non_negative(&field("handbrake_full_follow_post_release_time"), t.handbrake_full_follow_post_release_time)?;

    non_negative(&field("min_look_at_point_distance"), t.min_look_at_point_distance)?;
    non_negative_pair(&field("look_at_world_interp_speeds"), t.look_at_world_interp_speeds)?;
    non_negative_pair(&field("driving_look_at_world_interp_speeds"), t.driving_look_at_world_interp_speeds)?;
    non_negative(&field("look_at_world_interp_max_speed_scale"), t.look_at_world_interp_max_speed_scale)?;
    range(&field("look_at_world_interp_scale_range"), t.look_at_world_interp_scale_range)?;
    non_negative_pair(
        &field("look_at_vector_multiplier_interp_speeds"),
        t.look_at_vector_multiplier_interp_speeds,
    )?;
    non_negative(&field("look_at_manual_speed_transition_time"), t.look_at_manual_speed_transition_time)?;
    non_negative(&field("look_at_lazy_speed_transition_time"), t.look_at_lazy_speed_transition_time)?;
    non_negative(&field("look_at_manual_speed_transition_scalar"), t.look_at_manual_speed_transition_scalar)?;

    non_negative(&field("lateral_offset_steering_threshold"), t.lateral_offset_steering_threshold)?;
    non_negative_pair(&field("lateral_offset_rise_fall_speeds"), t.lateral_offset_rise_fall_speeds)?;

    non_negative_pair(&field("driving_pivot_rot_interp_speeds"), t.driving_pivot_rot_interp_speeds)?;
    non_negative_pair(&field("full_follow_pivot_rot_interp_speeds"), t.full_follow_pivot_rot_interp_speeds)?;
    non_negative_pair(&field("manual_to_auto_pivot_rot_interp_speeds"), t.manual_to_auto_pivot_rot_interp_speeds)?;
    non_negative_pair(
        &field("forward_to_reverse_pivot_rot_interp_speeds"),
        t.forward_to_reverse_pivot_rot_interp_speeds,
    )?;
    non_negative_pair(
        &field("reverse_to_forward_pivot_rot_interp_speeds"),
        t.reverse_to_forward_pivot_rot_interp_speeds,
    )?;
    non_negative(&field("manual_to_auto_yaw_threshold"), t.manual_to_auto_yaw_threshold)?;
    non_negative(&field("forward_reverse_yaw_threshold"), t.forward_reverse_yaw_threshold)?;
    non_negative(&field("pivot_rot_speed_blend_time"), t.pivot_rot_speed_blend_time)?;

    range(&field("fov_speed_range"), t.fov_speed_range)?;
    range(&field("speed_to_yaw_speed_range"), t.speed_to_yaw_speed_range)?;
    range(&field("speed_to_roll_speed_range"), t.speed_to_roll_speed_range)?;
    non_negative(&field("yaw_modifier_interp_speed"), t.yaw_modifier_interp_speed)?;
    non_negative(&field("roll_modifier_interp_speed"), t.roll_modifier_interp_speed)?;
    non_negative_pair(&field("roll_modifier_rise_fall_speeds"), t.roll_modifier_rise_fall_speeds)?;

    non_negative_pair(&field("aerial_offset_interp_speeds"), t.aerial_offset_interp_speeds)?;
    non_negative_pair(&field("aerial_offset_air_speeds"), t.aerial_offset_air_speeds)?;
    non_negative_pair(&field("aerial_offset_ground_speeds"), t.aerial_offset_ground_speeds)
}

//! Config Tests - Loading Rig Configuration From Disk

use std::io::Write;

use city_camera_engine::camera::{CameraModeKind, NoCollision, ViewTarget};
use city_camera_engine::config::CameraRigConfig;
use city_camera_engine::error::ConfigError;
use city_camera_engine::math::{Rotator, Vec3};

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_json_round_trip() {
    let mut config = CameraRigConfig::default();
    config.blend_stack.teleport_distance = 2500.0;
    config.third_person.lazy_follow_laziness = 120.0;
    config.driving.tuning.handbrake_full_follow_post_release_time = 2.0;

    let file = write_temp(".json", &serde_json::to_string_pretty(&config).unwrap());
    let loaded = CameraRigConfig::load(file.path()).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_load_partial_toml() {
    let file = write_temp(
        ".toml",
        r#"
        [static_camera]
        fov = 60.0

        [third_person.mode.transition]
        blend_time = 0.25
        blend_function = "ease_in_out"

        [driving.tuning]
        reverse_lazy_follow_laziness = 20.0
        "#,
    );
    let config = CameraRigConfig::load(file.path()).unwrap();

    assert_eq!(config.static_camera.fov, 60.0);
    assert_eq!(config.third_person.mode.transition.blend_time, 0.25);
    assert_eq!(config.third_person.mode.fov, 75.0);
    assert_eq!(config.driving.tuning.reverse_lazy_follow_laziness, 20.0);
    assert_eq!(config.driving.tuning.forward_velocity_threshold, 100.0);
}

#[test]
fn test_authored_curve_keys_are_sorted() {
    let file = write_temp(
        ".toml",
        r#"
        [driving.tuning]
        fov_speed_curve = [[1.0, 90.0], [0.0, 70.0]]
        "#,
    );
    let config = CameraRigConfig::load(file.path()).unwrap();
    let curve = config.driving.tuning.fov_speed_curve.unwrap();

    assert_eq!(curve.keys(), &[(0.0, 70.0), (1.0, 90.0)]);
    assert!((curve.eval(0.5) - 80.0).abs() < 1e-4);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = write_temp(".yaml", "blend_stack: {}");
    assert!(matches!(CameraRigConfig::load(file.path()), Err(ConfigError::UnknownFormat { .. })));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(CameraRigConfig::load(&path), Err(ConfigError::Io { .. })));
}

#[test]
fn test_malformed_files_report_parser() {
    let json = write_temp(".json", "{ \"blend_stack\": ");
    assert!(matches!(CameraRigConfig::load(json.path()), Err(ConfigError::Json(_))));

    let toml = write_temp(".toml", "[blend_stack\nteleport_distance = 1");
    assert!(matches!(CameraRigConfig::load(toml.path()), Err(ConfigError::Toml(_))));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = write_temp(".toml", "[driving.tuning]\nyaw_modifier_interp_speed = -3.0\n");
    match CameraRigConfig::load(file.path()) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "driving.tuning.yaw_modifier_interp_speed"),
        other => panic!("expected invalid value, got {:?}", other),
    }
}

// ============================================================================
// Loaded config drives the rig
// ============================================================================

#[test]
fn test_loaded_config_builds_working_stack() {
    let file = write_temp(
        ".toml",
        r#"
        [third_person]
        camera_to_pivot = [-400.0, 0.0, 0.0]
        prevent_penetration = false
        "#,
    );
    let mut stack = CameraRigConfig::load(file.path()).unwrap().into_blend_stack();
    let player = ViewTarget {
        capsule: Some(city_camera_engine::camera::Capsule { radius: 40.0, half_height: 90.0 }),
        ..ViewTarget::new(1, Vec3::ZERO, Rotator::ZERO)
    };
    stack.set_view_target(Some(1));

    let pov = stack.update_view_target(&vec![player], &NoCollision, 1.0 / 60.0);

    assert_eq!(stack.current_mode(), Some(CameraModeKind::ThirdPerson));
    assert!((pov.location - Vec3::new(-400.0, 0.0, 0.0)).length() < 1e-2, "{:?}", pov.location);
}

//! Camera Tests - Driving Scenarios, Penetration and the Full Rig
//!
//! End-to-end checks through the public API: driving auto-follow
//! decisions, penetration blending against a real box world, and a
//! config-built blend stack following a character into a vehicle.

use glam::Vec3;
use city_camera_engine::camera::{
    AutoFollowMode, BoxWorld, CameraMode, CameraModeKind, CameraPov, CameraUpdateContext, Capsule, CollisionQuery,
    DrivingCamera, DrivingSettings, DrivingState, NoCollision, Obstacle, PenetrationAvoidance, PenetrationRequest,
    SweepHit, SweepQuery, VehicleInfo, ViewTarget, default_camera_rays, driving_camera,
};
use city_camera_engine::config::CameraRigConfig;
use city_camera_engine::math::Rotator;

const DT: f32 = 1.0 / 60.0;

fn vehicle(driving: DrivingState) -> ViewTarget {
    ViewTarget {
        vehicle: Some(VehicleInfo { driving, ..Default::default() }),
        ..ViewTarget::new(7, Vec3::ZERO, Rotator::ZERO)
    }
}

fn character(location: Vec3) -> ViewTarget {
    ViewTarget {
        capsule: Some(Capsule { radius: 40.0, half_height: 90.0 }),
        ..ViewTarget::new(1, location, Rotator::ZERO)
    }
}

fn tick(camera: &mut DrivingCamera, target: &ViewTarget, control: &mut Rotator, world: &dyn CollisionQuery) -> CameraPov {
    let mut pov = CameraPov::default();
    let mut ctx = CameraUpdateContext { view_target: target, control_rotation: control, collision: world, delta_time: DT };
    camera.update_camera(&mut ctx, &mut pov);
    pov
}

fn active_driving_camera() -> DrivingCamera {
    let mut settings = DrivingSettings::default();
    settings.tuning.driving_lazy_follow_laziness = 250.0;
    let mut camera = driving_camera(settings);
    camera.on_become_active(&vehicle(DrivingState::default()), None, &CameraPov::default());
    camera
}

// ============================================================================
// Driving auto-follow
// ============================================================================

#[test]
fn test_driving_off_the_line_enters_lazy_follow() {
    let mut camera = active_driving_camera();
    let mut control = Rotator::ZERO;

    tick(&mut camera, &vehicle(DrivingState::default()), &mut control, &NoCollision);
    assert_eq!(camera.state.auto_follow_mode, AutoFollowMode::None);
    assert_eq!(camera.state.laziness, 0.0);

    let moving = vehicle(DrivingState { forward_speed: 500.0, throttle: 1.0, ..Default::default() });
    tick(&mut camera, &moving, &mut control, &NoCollision);
    assert_eq!(camera.state.auto_follow_mode, AutoFollowMode::LazyFollow);
    assert_eq!(camera.state.laziness, 250.0);
}

#[test]
fn test_handbrake_at_speed_forces_full_follow() {
    let mut camera = active_driving_camera();
    let mut control = Rotator::ZERO;

    let moving = vehicle(DrivingState { forward_speed: 500.0, ..Default::default() });
    tick(&mut camera, &moving, &mut control, &NoCollision);
    assert_eq!(camera.state.laziness, 250.0);

    let handbrake = vehicle(DrivingState { forward_speed: 500.0, handbrake_on: true, ..Default::default() });
    tick(&mut camera, &handbrake, &mut control, &NoCollision);
    assert_eq!(camera.state.laziness, 0.0);
    assert_eq!(camera.state.auto_follow_mode, AutoFollowMode::LazyFollow);
}

#[test]
fn test_driving_camera_frames_vehicle_from_behind() {
    let mut camera = active_driving_camera();
    let mut control = Rotator::ZERO;

    let pov = tick(&mut camera, &vehicle(DrivingState::default()), &mut control, &NoCollision);

    assert!(pov.location.x < -500.0, "camera should sit well behind: {:?}", pov.location);
    assert!(pov.location.z > 0.0);
    // Looking down toward the look-at point above the vehicle origin
    assert!(pov.rotation.pitch < 0.0);
    assert!(pov.rotation.yaw.abs() < 1e-3);
}

// ============================================================================
// Penetration avoidance
// ============================================================================

fn request(dt: f32) -> PenetrationRequest {
    PenetrationRequest {
        target: 1,
        safe_location: Vec3::ZERO,
        ideal_location: Vec3::new(-300.0, 0.0, 0.0),
        delta_time: dt,
        single_ray_only: false,
        skip_blend: false,
    }
}

#[test]
fn test_penetration_closing_in_is_rate_limited() {
    let mut avoidance = PenetrationAvoidance::new(default_camera_rays(), 0.15, 0.25);
    // Obstruction only the thin feelers reach
    let graze = |q: &SweepQuery| if q.radius < 10.0 { Some(SweepHit::new(0.3, None)) } else { None };

    let mut last = avoidance.blocked_pct();
    for _ in 0..60 {
        avoidance.evaluate(&graze, &request(DT));
        let pct = avoidance.blocked_pct();
        assert!(pct <= last);
        assert!(last - pct <= DT / 0.15 + 1e-5, "dropped {} in one tick", last - pct);
        assert!(pct >= 0.3 - 1e-4);
        last = pct;
    }
    assert!((last - 0.3).abs() < 1e-3);
}

#[test]
fn test_penetration_recovers_when_clear() {
    let mut avoidance = PenetrationAvoidance::new(default_camera_rays(), 0.15, 0.25);
    let wall = |_: &SweepQuery| Some(SweepHit::new(0.2, None));
    avoidance.evaluate(&wall, &request(DT));
    assert!((avoidance.blocked_pct() - 0.2).abs() < 1e-5);

    let mut last = avoidance.blocked_pct();
    for _ in 0..120 {
        avoidance.evaluate(&NoCollision, &request(DT));
        let pct = avoidance.blocked_pct();
        assert!(pct >= last);
        assert!(pct - last <= DT / 0.25 + 1e-5);
        last = pct;
    }
    assert!(last > 0.99);
}

#[test]
fn test_penetration_against_box_world() {
    let world = BoxWorld::new(vec![Obstacle {
        min: Vec3::new(-160.0, -500.0, -500.0),
        max: Vec3::new(-140.0, 500.0, 500.0),
        owner: Some(42),
    }]);
    let mut avoidance = PenetrationAvoidance::new(default_camera_rays(), 0.15, 0.25);

    let out = avoidance.evaluate(&world, &request(DT));

    // The primary ray hits the slab, so the camera snaps in front of it
    assert!(out.x > -150.0, "camera left inside the wall: {:?}", out);
    assert!(out.x < 0.0);
    assert!(avoidance.blocking_targets().contains(&42));
}

// ============================================================================
// Full rig
// ============================================================================

#[test]
fn test_rig_follows_character_into_vehicle() {
    let mut stack = CameraRigConfig::default().into_blend_stack();
    stack.set_view_target(Some(1));
    stack.set_player_character(Some(1));

    let mut target = character(Vec3::new(0.0, 0.0, 100.0));
    for _ in 0..30 {
        stack.update_view_target(&vec![target], &NoCollision, DT);
    }
    assert_eq!(stack.current_mode(), Some(CameraModeKind::ThirdPerson));
    assert_eq!(stack.stack_len(), 1);
    assert!(!stack.is_player_hidden());

    // Same entity now reports a vehicle: the driving camera blends in
    target.vehicle = Some(VehicleInfo::default());
    let pov = stack.update_view_target(&vec![target], &NoCollision, DT);
    assert_eq!(stack.current_mode(), Some(CameraModeKind::Driving));
    assert_eq!(stack.stack_len(), 2);
    assert!(pov.location.is_finite());

    let entries = stack.debug_entries();
    let total: f32 = entries.iter().map(|e| e.blend_weight).sum();
    assert!(total > 0.0);

    for _ in 0..40 {
        stack.update_view_target(&vec![target], &NoCollision, DT);
    }
    assert_eq!(stack.stack_len(), 1);
}

//! City Camera Engine Library
//!
//! Gameplay camera rig for third-person characters and vehicles: smoothing
//! filters, a pivot-based follow camera with penetration avoidance, a
//! driving camera with its auto-follow state machine, and a blend stack
//! that picks and cross-fades camera modes per view target.
//!
//! # Modules
//!
//! - [`math`] - Rotator, angle wrapping and scalar interpolation helpers
//! - [`interp`] - IIR, double IIR, spring and acceleration-limited filters
//! - [`curve`] - Piecewise-linear response curves
//! - [`camera`] - Camera modes, penetration avoidance and the blend stack
//! - [`config`] - Serde rig configuration loaded from JSON or TOML
//! - [`error`] - Configuration errors
//!
//! # Example
//!
//! ```ignore
//! use city_camera_engine::camera::{NoCollision, ViewTarget, Capsule};
//! use city_camera_engine::config::CameraRigConfig;
//! use city_camera_engine::math::{Rotator, Vec3};
//!
//! let mut stack = CameraRigConfig::load("rig.toml")?.into_blend_stack();
//! let mut player = ViewTarget::new(1, Vec3::ZERO, Rotator::ZERO);
//! player.capsule = Some(Capsule { radius: 40.0, half_height: 90.0 });
//!
//! stack.set_view_target(Some(1));
//! stack.set_player_character(Some(1));
//! let pov = stack.update_view_target(&vec![player], &NoCollision, 1.0 / 60.0);
//! ```

pub mod camera;
pub mod config;
pub mod curve;
pub mod error;
pub mod interp;
pub mod math;

pub use camera::{CameraBlendStack, CameraMode, CameraModeKind, CameraPov, CollisionQuery, ViewTarget, ViewTargetId};
pub use config::CameraRigConfig;
pub use error::ConfigError;

//! Camera Module
//!
//! Gameplay camera rig: per-target camera modes blended by a stack. The rig
//! is host agnostic. View targets come in as plain value snapshots, world
//! geometry is reached through a [`CollisionQuery`] collaborator, and the
//! result is a [`CameraPov`].
//!
//! # Submodules
//!
//! - [`types`] - View target snapshots and the POV record
//! - [`collision`] - Sphere sweep collaborator and a small box world
//! - [`penetration`] - Multi-ray penetration avoidance
//! - [`mode`] - Camera mode trait, blend functions, static camera
//! - [`policy`] - Behaviour hooks for specialised third-person cameras
//! - [`third_person`] - Pivot-based follow camera
//! - [`driving`] - Vehicle camera built on the third-person pipeline
//! - [`blend_stack`] - Mode selection and POV blending

pub mod blend_stack;
pub mod collision;
pub mod driving;
pub mod mode;
pub mod penetration;
pub mod policy;
pub mod third_person;
pub mod types;

pub use blend_stack::{
    BlendStackSettings, CameraBlendStack, CameraModeFactory, CameraModeSelector, CameraStackEntryInfo,
    DefaultModeSelector, InstanceKey, ViewTargetSource, blend_rots,
};
pub use collision::{BoxWorld, CollisionQuery, NoCollision, Obstacle, SweepHit, SweepQuery};
pub use driving::{DrivingCamera, DrivingPolicy, DrivingSettings, DrivingTuning, driving_camera};
pub use mode::{
    BlendFunction, CameraMode, CameraModeKind, CameraModeSettings, CameraUpdateContext, CineSettings, StaticCamera,
    TransitionParams,
};
pub use penetration::{
    PenetrationAvoidance, PenetrationAvoidanceRay, PenetrationRequest, default_camera_rays,
    default_safe_location_rays,
};
pub use policy::{CameraBehaviorPolicy, DefaultPolicy};
pub use third_person::{AutoFollowMode, ThirdPersonCamera, ThirdPersonSettings, ThirdPersonState};
pub use types::{CameraPov, Capsule, DepthOfField, DrivingState, VehicleInfo, ViewTarget, ViewTargetId};

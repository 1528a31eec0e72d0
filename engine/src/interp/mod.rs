//! Interpolator Module
//!
//! Smoothing filters used by the camera models. All of them are generic over
//! [`InterpValue`](crate::math::InterpValue), which covers `f32`, `Vec3` and
//! [`Rotator`](crate::math::Rotator).
//!
//! # Submodules
//!
//! - [`iir`] - Single-stage exponential filter with sub-stepping and rewind
//! - [`double_iir`] - Two cascaded IIR stages
//! - [`spring`] - Closed-form critically damped spring
//! - [`acceleration`] - Acceleration and speed limited approach

pub mod acceleration;
pub mod double_iir;
pub mod iir;
pub mod spring;

pub use acceleration::{AccelerationInterpolator, AccelerationParams};
pub use double_iir::DoubleIirInterpolator;
pub use iir::IirInterpolator;
pub use spring::{SpringInterpolator, SpringScalarCache, SpringScalars};

static_assertions::assert_impl_all!(IirInterpolator<glam::Vec3>: Copy, Send, Sync);
static_assertions::assert_impl_all!(DoubleIirInterpolator<crate::math::Rotator>: Copy, Send, Sync);
static_assertions::assert_impl_all!(SpringInterpolator<f32>: Copy, Send, Sync);

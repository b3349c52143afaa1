//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Reading and normalising analog axes
//! - Sampling a fixed number of axes into an [`sampler::AxisVector`]

pub mod device;
pub mod sampler;

pub use device::{EvdevGamepad, InputDevice};
pub use sampler::{AxisVector, Sampler};

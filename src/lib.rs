//! # Gamepad UDP Bridge Library
//!
//! Stream gamepad axis readings to a remote host over UDP.
//!
//! This library provides the sampling and dispatch loop: it polls a gamepad
//! at a fixed period, encodes a fixed set of axes as a JSON array and sends
//! each sample as one best-effort datagram.

pub mod bridge;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod feed;
pub mod net;
pub mod payload;
pub mod presenter;

//! # Network Module
//!
//! Outbound datagram path to the remote endpoint.
//!
//! This module handles:
//! - Owning the UDP socket for the lifetime of the bridge
//! - Enabling and disabling sending
//! - Sequence numbering and per-send latency measurement
//! - Absorbing send failures without stalling the caller

pub mod dispatcher;
pub mod transport;

pub use dispatcher::{DispatchStats, Dispatcher, SendMode, SendOutcome};
pub use transport::{bind_addr_for, DatagramTransport, UdpTransport};

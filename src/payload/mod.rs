//! # Payload Module
//!
//! Wire format for axis datagrams.
//!
//! Each datagram is the UTF-8 text of a compact JSON array holding one number
//! per axis, in axis order, for example `[0.12,-0.98]`. There is no header,
//! length prefix or sequence number on the wire.

pub mod encoder;

pub use encoder::{encode, encode_with_limit, Payload, DEFAULT_MAX_PAYLOAD_BYTES};

//! # Error Types
//!
//! Custom error types for the gamepad UDP bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Missing or invalid remote endpoint
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    /// Input device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable input device was found
    #[error("No gamepad with analog axes found")]
    ControllerNotFound,

    /// The input device stopped answering reads
    #[error("Gamepad lost after {0} consecutive read failures")]
    DeviceLost(u32),

    /// An axis value that cannot be represented on the wire
    #[error("Axis {index} has non-finite value {value}")]
    NonFiniteAxis { index: usize, value: f64 },

    /// Payload serialization errors
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Payload would not fit in a single datagram
    #[error("Payload of {len} bytes exceeds datagram limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },

    /// Send attempted after the socket was released
    #[error("Socket already closed")]
    SocketClosed,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

//! # Payload Encoder
//!
//! Encodes an [`AxisVector`] into a JSON array datagram.

use bytes::Bytes;

use crate::controller::sampler::{round_axis, AxisVector};
use crate::error::{BridgeError, Result};

/// Largest payload that reliably fits one datagram without fragmentation
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1200;

/// Immutable encoded datagram body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Bytes,
}

impl Payload {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload text; always valid UTF-8 since it is produced by the encoder.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode axes with the default datagram size limit
///
/// # Errors
///
/// - `NonFiniteAxis`: a component is NaN or infinite (JSON has no encoding for them)
/// - `PayloadTooLarge`: encoded text exceeds [`DEFAULT_MAX_PAYLOAD_BYTES`]
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::controller::sampler::AxisVector;
/// use gamepad_udp_bridge::payload::encode;
///
/// let payload = encode(&AxisVector::from_values(vec![0.12, -0.98]))?;
/// assert_eq!(payload.as_str(), "[0.12,-0.98]");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn encode(axes: &AxisVector) -> Result<Payload> {
    encode_with_limit(axes, DEFAULT_MAX_PAYLOAD_BYTES)
}

/// Encode axes, rejecting payloads longer than `max_len` bytes
///
/// Output is deterministic: equal vectors always give identical bytes.
/// Every component is clamped and rounded with [`round_axis`] first, so the
/// shortest round-trip form never switches to exponent notation.
pub fn encode_with_limit(axes: &AxisVector, max_len: usize) -> Result<Payload> {
    if let Some((index, &value)) = axes
        .values()
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite())
    {
        return Err(BridgeError::NonFiniteAxis { index, value });
    }

    let rounded: Vec<f64> = axes.values().iter().copied().map(round_axis).collect();
    let encoded = serde_json::to_vec(&rounded)?;

    if encoded.len() > max_len {
        return Err(BridgeError::PayloadTooLarge {
            len: encoded.len(),
            max: max_len,
        });
    }

    Ok(Payload {
        bytes: Bytes::from(encoded),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(values: &[f64]) -> AxisVector {
        AxisVector::from_values(values.to_vec())
    }

    #[test]
    fn test_encode_wire_format() {
        let payload = encode(&axes(&[0.12, -0.98])).unwrap();
        assert_eq!(payload.as_bytes(), b"[0.12,-0.98]");
        assert_eq!(payload.len(), 12);
    }

    #[test]
    fn test_encode_centered() {
        let payload = encode(&AxisVector::new(2)).unwrap();
        assert_eq!(payload.as_str(), "[0.0,0.0]");
    }

    #[test]
    fn test_encode_full_deflection() {
        let payload = encode(&axes(&[1.0, -1.0])).unwrap();
        assert_eq!(payload.as_str(), "[1.0,-1.0]");
    }

    #[test]
    fn test_encode_small_values_avoid_exponent() {
        let payload = encode(&axes(&[0.01, -0.01])).unwrap();
        assert_eq!(payload.as_str(), "[0.01,-0.01]");
        assert!(!payload.as_str().contains('e'));
    }

    #[test]
    fn test_encode_sub_hundredth_values_stay_fixed_point() {
        let payload = encode(&axes(&[0.00001, -0.0000003, 0.0049])).unwrap();
        assert_eq!(payload.as_str(), "[0.0,0.0,0.0]");
        assert!(!payload.as_str().contains('e'));
    }

    #[test]
    fn test_encode_rounds_and_clamps_raw_values() {
        let payload = encode(&axes(&[0.123456, -1.5, 0.996])).unwrap();
        assert_eq!(payload.as_str(), "[0.12,-1.0,1.0]");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let v = axes(&[0.37, -0.5]);
        assert_eq!(encode(&v).unwrap(), encode(&v).unwrap());
    }

    #[test]
    fn test_encode_distinct_vectors_differ() {
        let a = encode(&axes(&[0.37, -0.5])).unwrap();
        let b = encode(&axes(&[0.37, -0.51])).unwrap();
        let c = encode(&axes(&[-0.5, 0.37])).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_encode_parses_back_as_json_array() {
        let payload = encode(&axes(&[0.25, -0.75])).unwrap();
        let decoded: Vec<f64> = serde_json::from_slice(payload.as_bytes()).unwrap();
        assert_eq!(decoded, vec![0.25, -0.75]);
    }

    #[test]
    fn test_encode_rejects_nan() {
        match encode(&axes(&[0.1, f64::NAN])) {
            Err(BridgeError::NonFiniteAxis { index, value }) => {
                assert_eq!(index, 1);
                assert!(value.is_nan());
            }
            other => panic!("Expected NonFiniteAxis, got: {:?}", other),
        }
    }

    #[test]
    fn test_encode_rejects_infinity() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY] {
            match encode(&axes(&[bad, 0.0])) {
                Err(BridgeError::NonFiniteAxis { index, .. }) => assert_eq!(index, 0),
                other => panic!("Expected NonFiniteAxis, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_encode_respects_limit() {
        let v = axes(&[0.12, -0.98]);
        assert!(encode_with_limit(&v, 12).is_ok());

        match encode_with_limit(&v, 11) {
            Err(BridgeError::PayloadTooLarge { len, max }) => {
                assert_eq!(len, 12);
                assert_eq!(max, 11);
            }
            other => panic!("Expected PayloadTooLarge, got: {:?}", other),
        }
    }

    #[test]
    fn test_payload_display_matches_text() {
        let payload = encode(&axes(&[0.5])).unwrap();
        assert_eq!(payload.to_string(), "[0.5]");
        assert!(!payload.is_empty());
    }
}

//! # Axis Sampler Module
//!
//! Reads a fixed number of axes from an [`InputDevice`] into an [`AxisVector`].
//!
//! Values are clamped to [-1.0, 1.0] and rounded to two decimals, which is
//! the precision shown to the operator and put on the wire. When the device
//! reports fewer axes than the vector holds, the missing slots keep their
//! previous reading instead of being zeroed.

use tracing::warn;

use super::device::InputDevice;
use crate::error::Result;

/// Number of decimal places kept per axis reading
pub const AXIS_DECIMALS: i32 = 2;

/// Fixed-length vector of axis readings in [-1.0, 1.0]
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::controller::sampler::AxisVector;
///
/// let axes = AxisVector::new(2);
/// assert_eq!(axes.values(), &[0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AxisVector {
    values: Vec<f64>,
}

impl AxisVector {
    /// Creates a vector of `len` centered axes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { values: vec![0.0; len] }
    }

    /// Creates a vector from raw values, stored as given.
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Overwrites slot `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

/// Clamps to [-1.0, 1.0], rounds to [`AXIS_DECIMALS`] places and folds -0.0 into 0.0.
///
/// Non-finite input is passed through unchanged so the encoder can reject it.
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::controller::sampler::quantize_axis;
///
/// assert_eq!(quantize_axis(0.123), 0.12);
/// assert_eq!(quantize_axis(-1.7), -1.0);
/// assert_eq!(quantize_axis(-0.001).to_bits(), 0.0f64.to_bits());
/// ```
#[must_use]
pub fn quantize_axis(raw: f32) -> f64 {
    round_axis(f64::from(raw))
}

/// [`quantize_axis`] for values already widened to `f64`
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::controller::sampler::round_axis;
///
/// assert_eq!(round_axis(0.00001), 0.0);
/// assert_eq!(round_axis(0.567), 0.57);
/// ```
#[must_use]
pub fn round_axis(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(AXIS_DECIMALS);
    let rounded = (value.clamp(-1.0, 1.0) * scale).round() / scale;
    // -0.0 + 0.0 == +0.0
    rounded + 0.0
}

/// Samples a device into a persistent [`AxisVector`]
pub struct Sampler {
    device: Box<dyn InputDevice>,
    axes: AxisVector,
    short_read_reported: Option<usize>,
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("device", &self.device.name())
            .field("axes", &self.axes)
            .finish_non_exhaustive()
    }
}

impl Sampler {
    /// Creates a sampler producing vectors of `axis_count` values.
    pub fn new(device: Box<dyn InputDevice>, axis_count: usize) -> Self {
        Self {
            device,
            axes: AxisVector::new(axis_count),
            short_read_reported: None,
        }
    }

    /// Reads the device into the held vector.
    ///
    /// # Errors
    ///
    /// Returns the device error if `refresh` fails; the held vector is left
    /// untouched, so [`Sampler::axes`] still returns the previous reading.
    pub fn sample(&mut self) -> Result<&AxisVector> {
        self.device.refresh()?;

        let available = self.device.axis_count();
        let wanted = self.axes.len();

        if available < wanted {
            if self.short_read_reported != Some(available) {
                warn!(
                    "Gamepad reports {} axes, expected {}; keeping last values for the rest",
                    available, wanted
                );
                self.short_read_reported = Some(available);
            }
        } else {
            self.short_read_reported = None;
        }

        for index in 0..available.min(wanted) {
            self.axes.set(index, quantize_axis(self.device.axis_value(index)));
        }

        Ok(&self.axes)
    }

    /// Latest reading, possibly stale
    #[must_use]
    pub fn axes(&self) -> &AxisVector {
        &self.axes
    }

    /// Name of the underlying device
    pub fn device_name(&self) -> String {
        self.device.name()
    }
}

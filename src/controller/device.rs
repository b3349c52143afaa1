//! # Gamepad Device Module
//!
//! Input device abstraction and its Linux evdev backend.
//!
//! ## Device Selection
//!
//! The first `/dev/input/event*` node (in sorted order) that exposes both an
//! `ABS_X` absolute axis and a gamepad/joystick button (`BTN_SOUTH` or
//! `BTN_TRIGGER`) is used. This skips motion sensors and touchpads, which
//! report `ABS_X` but no gamepad buttons.
//!
//! ## Axis Order
//!
//! Axes are indexed in ascending evdev code order (`ABS_X`, `ABS_Y`, `ABS_Z`,
//! `ABS_RX`, ...), so index 0 and 1 are the left stick on common pads.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// Source of continuous axis readings.
///
/// `axis_value` must be cheap and non-blocking; any I/O belongs in `refresh`.
#[cfg_attr(test, mockall::automock)]
pub trait InputDevice: Send {
    /// Human readable device name
    fn name(&self) -> String;

    /// Number of axes the device currently reports
    fn axis_count(&self) -> usize;

    /// Value of axis `index` in [-1.0, 1.0]
    fn axis_value(&self, index: usize) -> f32;

    /// Pull the latest state from the driver
    fn refresh(&mut self) -> Result<()>;
}

/// Gamepad opened through evdev
pub struct EvdevGamepad {
    device: Device,
    device_path: String,
    axes: Vec<AbsoluteAxisType>,
    values: Vec<f32>,
}

impl std::fmt::Debug for EvdevGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevGamepad")
            .field("device_path", &self.device_path)
            .field("axes", &self.axes)
            .finish_non_exhaustive()
    }
}

impl EvdevGamepad {
    /// Detect and open the first available gamepad
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: No device with gamepad axes and buttons found
    /// - `Controller`: `/dev/input` missing or unreadable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gamepad_udp_bridge::controller::device::{EvdevGamepad, InputDevice};
    ///
    /// let pad = EvdevGamepad::open()?;
    /// println!("{} axes on {}", pad.axis_count(), pad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(BridgeError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| BridgeError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection when multiple pads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if is_gamepad(&device) {
                        return Self::from_device(device, path.to_string_lossy().to_string());
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(BridgeError::ControllerNotFound)
    }

    /// Open a specific event node
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(|e| {
            BridgeError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;

        if !is_gamepad(&device) {
            return Err(BridgeError::Controller(format!(
                "{} does not look like a gamepad",
                path.display()
            )));
        }

        Self::from_device(device, path.to_string_lossy().to_string())
    }

    fn from_device(device: Device, device_path: String) -> Result<Self> {
        let axes: Vec<AbsoluteAxisType> = device
            .supported_absolute_axes()
            .map(|set| set.iter().collect())
            .unwrap_or_default();

        info!(
            "Using gamepad '{}' at {} with {} axes",
            device.name().unwrap_or("unnamed"),
            device_path,
            axes.len()
        );

        let mut pad = Self {
            device,
            device_path,
            values: vec![0.0; axes.len()],
            axes,
        };
        pad.refresh()?;
        Ok(pad)
    }

    /// The `/dev/input/eventX` path this pad was opened from
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl InputDevice for EvdevGamepad {
    fn name(&self) -> String {
        self.device.name().unwrap_or("unnamed").to_string()
    }

    fn axis_count(&self) -> usize {
        self.axes.len()
    }

    fn axis_value(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn refresh(&mut self) -> Result<()> {
        let state = self
            .device
            .get_abs_state()
            .map_err(|e| BridgeError::Controller(format!("Failed to read axes: {}", e)))?;

        for (slot, axis) in self.values.iter_mut().zip(&self.axes) {
            let info = &state[axis.0 as usize];
            *slot = normalize_axis(info.value, info.minimum, info.maximum);
        }

        Ok(())
    }
}

fn is_gamepad(device: &Device) -> bool {
    let has_stick = device
        .supported_absolute_axes()
        .map_or(false, |axes| axes.contains(AbsoluteAxisType::ABS_X));
    let has_buttons = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER));
    has_stick && has_buttons
}

/// Maps a raw evdev reading in `[minimum, maximum]` to [-1.0, 1.0].
///
/// A degenerate range (`maximum <= minimum`) yields 0.0.
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::controller::device::normalize_axis;
///
/// assert_eq!(normalize_axis(0, 0, 255), -1.0);
/// assert_eq!(normalize_axis(255, 0, 255), 1.0);
/// assert_eq!(normalize_axis(0, -32768, 32767).abs() < 0.001, true);
/// ```
#[must_use]
pub fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = (maximum as f64) - (minimum as f64);
    let scaled = ((value as f64) - (minimum as f64)) / span * 2.0 - 1.0;
    scaled.clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_axis_endpoints() {
        assert_eq!(normalize_axis(0, 0, 255), -1.0);
        assert_eq!(normalize_axis(255, 0, 255), 1.0);
        assert_eq!(normalize_axis(-32768, -32768, 32767), -1.0);
        assert_eq!(normalize_axis(32767, -32768, 32767), 1.0);
    }

    #[test]
    fn test_normalize_axis_center() {
        assert!(normalize_axis(128, 0, 255).abs() < 0.01);
        assert!(normalize_axis(0, -32768, 32767).abs() < 0.001);
    }

    #[test]
    fn test_normalize_axis_clamps_out_of_range() {
        assert_eq!(normalize_axis(300, 0, 255), 1.0);
        assert_eq!(normalize_axis(-20, 0, 255), -1.0);
    }

    #[test]
    fn test_normalize_axis_degenerate_range() {
        assert_eq!(normalize_axis(10, 5, 5), 0.0);
        assert_eq!(normalize_axis(10, 10, 0), 0.0);
    }

    #[test]
    fn test_open_path_nonexistent() {
        let result = EvdevGamepad::open_path("/dev/input/nonexistent_event_12345");
        match result {
            Err(BridgeError::Controller(msg)) => {
                assert!(msg.contains("nonexistent_event_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Controller error, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_open_with_real_hardware() {
        let pad = EvdevGamepad::open().expect("Should detect a connected gamepad");
        assert!(pad.device_path().starts_with("/dev/input/event"));
        assert!(pad.axis_count() >= 2);

        for i in 0..pad.axis_count() {
            let value = pad.axis_value(i);
            assert!((-1.0..=1.0).contains(&value));
        }
    }
}

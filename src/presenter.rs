//! # Status Presenter Module
//!
//! Read-only consumers of the loop state.

use tracing::{debug, info};

use crate::controller::sampler::AxisVector;
use crate::feed::FeedRecorder;

/// Renders the current axes, sending state and packet feed
pub trait Presenter: Send {
    fn present(&mut self, axes: &AxisVector, enabled: bool, feed: &FeedRecorder);

    /// Release display resources; may be called more than once
    fn close(&mut self);
}

/// Presenter that writes status changes to the log
///
/// A status line is emitted only when the axes or the sending state change,
/// so an idle pad does not flood the log at the loop rate.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last_axes: Option<AxisVector>,
    last_enabled: Option<bool>,
    last_feed_sequence: Option<u64>,
    closed: bool,
    lines_written: usize,
    feed_renders: usize,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of status lines emitted so far
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Number of times the packet feed was written out
    pub fn feed_renders(&self) -> usize {
        self.feed_renders
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Formats axes as `Axis 0: 0.12 | Axis 1: -0.98`
pub fn format_axes(axes: &AxisVector) -> String {
    axes.values()
        .iter()
        .enumerate()
        .map(|(i, v)| format!("Axis {}: {:.2}", i, v))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Formats every feed entry, newest first, one per line
pub fn format_feed(feed: &FeedRecorder) -> Vec<String> {
    feed.entries()
        .map(|e| format!("{} at {}", e.description, e.recorded_at.format("%H:%M:%S%.3f")))
        .collect()
}

impl Presenter for LogPresenter {
    fn present(&mut self, axes: &AxisVector, enabled: bool, feed: &FeedRecorder) {
        if self.closed {
            return;
        }

        let changed = self.last_axes.as_ref() != Some(axes) || self.last_enabled != Some(enabled);
        if changed {
            let status = if enabled { "Sending Packets" } else { "Not Sending Packets" };
            info!("{} | {}", format_axes(axes), status);
            self.last_axes = Some(axes.clone());
            self.last_enabled = Some(enabled);
            self.lines_written += 1;
        }

        let newest = feed.newest().map(|e| e.sequence);
        if newest.is_some() && newest != self.last_feed_sequence {
            info!("Packet feed ({} of {}, newest first):", feed.len(), feed.capacity());
            for line in format_feed(feed) {
                info!("  {}", line);
            }
            self.last_feed_sequence = newest;
            self.feed_renders += 1;
        }
    }

    fn close(&mut self) {
        if !self.closed {
            debug!("Presenter closed after {} status lines", self.lines_written);
            self.closed = true;
        }
    }
}

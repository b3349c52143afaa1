//! # Packet Feed Module
//!
//! Bounded, newest-first log of sent packets for display.
//!
//! The feed is informational only; nothing reads it back into the send path.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Default number of entries kept
pub const DEFAULT_FEED_CAPACITY: usize = 10;

/// One line in the feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub sequence: u64,
    pub description: String,
    pub recorded_at: DateTime<Local>,
}

/// Rolling log of recent packets
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::feed::FeedRecorder;
///
/// let mut feed = FeedRecorder::new(2);
/// feed.record(1, "Packet 1: [0.0,0.0]");
/// feed.record(2, "Packet 2: [0.1,0.0]");
/// feed.record(3, "Packet 3: [0.2,0.0]");
///
/// let seqs: Vec<u64> = feed.entries().map(|e| e.sequence).collect();
/// assert_eq!(seqs, vec![3, 2]);
/// ```
#[derive(Debug, Clone)]
pub struct FeedRecorder {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl Default for FeedRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl FeedRecorder {
    /// Creates an empty feed holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest entry once over capacity
    pub fn record(&mut self, sequence: u64, description: impl Into<String>) {
        self.entries.push_front(FeedEntry {
            sequence,
            description: description.into(),
            recorded_at: Local::now(),
        });
        if self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn newest(&self) -> Option<&FeedEntry> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences(feed: &FeedRecorder) -> Vec<u64> {
        feed.entries().map(|e| e.sequence).collect()
    }

    #[test]
    fn test_new_feed_is_empty() {
        let feed = FeedRecorder::default();
        assert!(feed.is_empty());
        assert_eq!(feed.capacity(), DEFAULT_FEED_CAPACITY);
        assert!(feed.newest().is_none());
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let mut feed = FeedRecorder::new(0);
        assert_eq!(feed.capacity(), 1);
        feed.record(1, "a");
        feed.record(2, "b");
        assert_eq!(sequences(&feed), vec![2]);
    }

    #[test]
    fn test_newest_first_order() {
        let mut feed = FeedRecorder::new(5);
        for seq in 1..=3 {
            feed.record(seq, format!("Packet {}", seq));
        }
        assert_eq!(sequences(&feed), vec![3, 2, 1]);
        assert_eq!(feed.newest().unwrap().description, "Packet 3");
    }

    #[test]
    fn test_bound_holds_after_every_insert() {
        let capacity = 4;
        let mut feed = FeedRecorder::new(capacity);

        for seq in 1..=25u64 {
            feed.record(seq, format!("Packet {}", seq));
            assert!(feed.len() <= capacity);

            let expected: Vec<u64> = (1..=seq).rev().take(capacity).collect();
            assert_eq!(sequences(&feed), expected);
        }
    }

    #[test]
    fn test_default_capacity_keeps_last_ten() {
        let mut feed = FeedRecorder::default();
        for seq in 1..=12 {
            feed.record(seq, "x");
        }
        assert_eq!(feed.len(), 10);
        assert_eq!(sequences(&feed).first(), Some(&12));
        assert_eq!(sequences(&feed).last(), Some(&3));
    }

    #[test]
    fn test_clear() {
        let mut feed = FeedRecorder::new(3);
        feed.record(1, "a");
        feed.clear();
        assert!(feed.is_empty());
    }
}

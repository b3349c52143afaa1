//! # Datagram Dispatcher
//!
//! Owns the outbound socket, the enabled flag and the sequence counter.
//!
//! Sends are best effort: a failed send is logged, reported in the returned
//! [`SendOutcome`] and never retried. The next sample supersedes it.

use chrono::{DateTime, Local};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::transport::DatagramTransport;
use crate::controller::sampler::AxisVector;
use crate::error::{BridgeError, Result};
use crate::payload::{encode_with_limit, Payload, DEFAULT_MAX_PAYLOAD_BYTES};

/// First sequence number handed out
pub const FIRST_SEQUENCE: u64 = 1;

/// How the enabled flag behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Sending is switched on and off by toggle signals
    Toggled { start_enabled: bool },
    /// Sending is always on; toggles are ignored
    AlwaysOn,
}

/// Result of one dispatch attempt
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Attempt number, starting at [`FIRST_SEQUENCE`]
    pub sequence: u64,
    /// Time spent in the send call
    pub elapsed: Duration,
    /// Wall clock time of the attempt
    pub sent_at: DateTime<Local>,
    pub success: bool,
    pub error: Option<String>,
    /// Encoded payload, absent when encoding failed
    pub payload: Option<Payload>,
}

impl SendOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Feed line for a successful send, e.g. `Packet 3: [0.12,-0.98]`
    #[must_use]
    pub fn feed_description(&self) -> Option<String> {
        match (&self.payload, self.success) {
            (Some(payload), true) => Some(format!("Packet {}: {}", self.sequence, payload)),
            _ => None,
        }
    }
}

/// Running totals kept by the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Sends axis payloads to a fixed remote address
pub struct Dispatcher {
    transport: Option<Box<dyn DatagramTransport>>,
    target: SocketAddr,
    mode: SendMode,
    enabled: bool,
    next_sequence: u64,
    max_payload_bytes: usize,
    stats: DispatchStats,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .field("enabled", &self.enabled)
            .field("next_sequence", &self.next_sequence)
            .field("open", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher that takes ownership of `transport`
    ///
    /// The transport is closed exactly once, by [`Dispatcher::shutdown`] or on drop.
    pub fn new(transport: Box<dyn DatagramTransport>, target: SocketAddr, mode: SendMode) -> Self {
        let enabled = match mode {
            SendMode::Toggled { start_enabled } => start_enabled,
            SendMode::AlwaysOn => true,
        };

        Self {
            transport: Some(transport),
            target,
            mode,
            enabled,
            next_sequence: FIRST_SEQUENCE,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            stats: DispatchStats::default(),
        }
    }

    /// Override the payload size limit
    #[must_use]
    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Encode and send one sample
    ///
    /// Returns `None` without touching the network when sending is disabled.
    /// Otherwise consumes one sequence number and reports the attempt; encode
    /// and send failures come back as an unsuccessful outcome, never as an error.
    pub async fn dispatch(&mut self, axes: &AxisVector) -> Option<SendOutcome> {
        if !self.enabled {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.stats.attempts += 1;
        let sent_at = Local::now();

        let payload = match encode_with_limit(axes, self.max_payload_bytes) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("({}) Could not encode axes: {}", sequence, e);
                return Some(self.failed(sequence, Duration::ZERO, sent_at, e, None));
            }
        };

        let start = Instant::now();
        let result = self.transmit(&payload).await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                self.stats.successes += 1;
                info!(
                    "({}) Packet took {} microseconds to send",
                    sequence,
                    elapsed.as_nanos() as f64 / 1000.0
                );
                debug!("({}) Sent {} to {}", sequence, payload, self.target);
                Some(SendOutcome {
                    sequence,
                    elapsed,
                    sent_at,
                    success: true,
                    error: None,
                    payload: Some(payload),
                })
            }
            Err(e) => {
                warn!("({}) Error sending data: {}", sequence, e);
                Some(self.failed(sequence, elapsed, sent_at, e, Some(payload)))
            }
        }
    }

    async fn transmit(&mut self, payload: &Payload) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(BridgeError::SocketClosed)?;
        let sent = transport.send_to(payload.as_bytes(), self.target).await?;

        if sent != payload.len() {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, payload.len()),
            )));
        }

        Ok(())
    }

    fn failed(
        &mut self,
        sequence: u64,
        elapsed: Duration,
        sent_at: DateTime<Local>,
        error: BridgeError,
        payload: Option<Payload>,
    ) -> SendOutcome {
        self.stats.failures += 1;
        SendOutcome {
            sequence,
            elapsed,
            sent_at,
            success: false,
            error: Some(error.to_string()),
            payload,
        }
    }

    /// Flip the enabled flag; ignored in [`SendMode::AlwaysOn`]
    pub fn toggle(&mut self) {
        match self.mode {
            SendMode::Toggled { .. } => {
                self.enabled = !self.enabled;
                info!(
                    "{}",
                    if self.enabled { "Sending packets" } else { "Not sending packets" }
                );
            }
            SendMode::AlwaysOn => debug!("Toggle ignored: sending is always on"),
        }
    }

    /// Redirect future sends to a different address
    #[cfg(test)]
    pub(crate) fn set_target(&mut self, target: SocketAddr) {
        info!("Retargeting datagrams from {} to {}", self.target, target);
        self.target = target;
    }

    /// Release the socket
    ///
    /// Safe to call more than once; only the first call closes the transport.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!(
                "Socket closed after {} attempts ({} sent, {} failed)",
                self.stats.attempts, self.stats.successes, self.stats.failures
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn mode(&self) -> SendMode {
        self.mode
    }

    /// Sequence number the next attempt will use
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    #[must_use]
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::mocks::MockTransport;
    use crate::net::transport::UdpTransport;
    use std::io;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    fn target() -> SocketAddr {
        "127.0.0.1:5005".parse().unwrap()
    }

    fn mock_dispatcher(mode: SendMode) -> (Dispatcher, MockTransport) {
        let mock = MockTransport::new();
        let dispatcher = Dispatcher::new(Box::new(mock.clone()), target(), mode);
        (dispatcher, mock)
    }

    fn sample() -> AxisVector {
        AxisVector::from_values(vec![0.12, -0.98])
    }

    #[test]
    fn test_default_states() {
        let (off, _) = mock_dispatcher(SendMode::Toggled { start_enabled: false });
        assert!(!off.is_enabled());
        assert_eq!(off.next_sequence(), FIRST_SEQUENCE);

        let (on, _) = mock_dispatcher(SendMode::Toggled { start_enabled: true });
        assert!(on.is_enabled());

        let (always, _) = mock_dispatcher(SendMode::AlwaysOn);
        assert!(always.is_enabled());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let (mut dispatcher, _) = mock_dispatcher(SendMode::Toggled { start_enabled: false });
        dispatcher.toggle();
        assert!(dispatcher.is_enabled());
        dispatcher.toggle();
        assert!(!dispatcher.is_enabled());
    }

    #[test]
    fn test_toggle_ignored_when_always_on() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);
        dispatcher.toggle();
        assert!(dispatcher.is_enabled());
        assert!(mock.get_sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_skipped_when_disabled() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::Toggled { start_enabled: false });

        for _ in 0..3 {
            assert!(dispatcher.dispatch(&sample()).await.is_none());
        }

        assert_eq!(dispatcher.next_sequence(), 1);
        assert!(mock.get_sent().is_empty());
        assert_eq!(dispatcher.stats(), DispatchStats::default());
    }

    #[tokio::test]
    async fn test_dispatch_sends_payload_to_target() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);

        let outcome = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.sequence, 1);
        assert!(outcome.error.is_none());
        assert_eq!(
            outcome.feed_description().as_deref(),
            Some("Packet 1: [0.12,-0.98]")
        );

        let sent = mock.get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, b"[0.12,-0.98]".to_vec());
        assert_eq!(sent[0].1, target());
    }

    #[tokio::test]
    async fn test_sequence_increments_per_attempt() {
        let (mut dispatcher, _) = mock_dispatcher(SendMode::AlwaysOn);

        let mut sequences = Vec::new();
        for _ in 0..5 {
            sequences.push(dispatcher.dispatch(&sample()).await.unwrap().sequence);
        }

        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
        assert_eq!(dispatcher.next_sequence(), 6);
    }

    #[tokio::test]
    async fn test_send_failure_is_soft() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);
        mock.set_send_error(Some(io::ErrorKind::ConnectionRefused));

        let failed = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.sequence, 1);
        assert!(failed.error.as_deref().unwrap().contains("Mock send error"));
        assert!(failed.feed_description().is_none());

        mock.set_send_error(None);
        let ok = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.sequence, 2);

        assert_eq!(
            dispatcher.stats(),
            DispatchStats { attempts: 2, successes: 1, failures: 1 }
        );
        assert_eq!(mock.get_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_non_finite_axis_is_failed_attempt_without_send() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);

        let outcome = dispatcher
            .dispatch(&AxisVector::from_values(vec![f64::NAN, 0.0]))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert!(outcome.payload.is_none());
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert!(outcome.error.as_deref().unwrap().contains("non-finite"));
        assert!(mock.get_sent().is_empty());
        assert_eq!(dispatcher.next_sequence(), 2);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_failed_attempt() {
        let (dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);
        let mut dispatcher = dispatcher.with_max_payload_bytes(4);

        let outcome = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(!outcome.is_success());
        assert!(mock.get_sent().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_once() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);

        assert!(dispatcher.shutdown().is_ok());
        assert!(dispatcher.shutdown().is_ok());
        assert!(dispatcher.is_closed());
        assert_eq!(mock.close_count(), 1);

        drop(dispatcher);
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_drop_closes_transport() {
        let (dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);
        drop(dispatcher);
        assert_eq!(mock.close_count(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_fails_softly() {
        let (mut dispatcher, mock) = mock_dispatcher(SendMode::AlwaysOn);
        dispatcher.shutdown().unwrap();

        let outcome = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.error.as_deref().unwrap().contains("closed"));
        assert!(mock.get_sent().is_empty());
    }

    #[tokio::test]
    async fn test_sequence_matches_received_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut dispatcher = Dispatcher::new(
            Box::new(transport),
            receiver.local_addr().unwrap(),
            SendMode::Toggled { start_enabled: true },
        );

        let mut buf = [0u8; 1500];
        for n in 1..=5u64 {
            let axes = AxisVector::from_values(vec![n as f64 / 10.0, -0.5]);
            let outcome = dispatcher.dispatch(&axes).await.unwrap();
            assert!(outcome.is_success());
            assert_eq!(outcome.sequence, n);

            let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
                .await
                .expect("datagram not received")
                .unwrap();
            let decoded: Vec<f64> = serde_json::from_slice(&buf[..len]).unwrap();
            assert_eq!(decoded, vec![n as f64 / 10.0, -0.5]);
        }
    }

    #[tokio::test]
    async fn test_disabled_dispatch_sends_nothing_on_wire() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut dispatcher = Dispatcher::new(
            Box::new(transport),
            receiver.local_addr().unwrap(),
            SendMode::Toggled { start_enabled: false },
        );

        for _ in 0..3 {
            assert!(dispatcher.dispatch(&sample()).await.is_none());
        }
        assert_eq!(dispatcher.next_sequence(), 1);

        let mut buf = [0u8; 64];
        let received = timeout(Duration::from_millis(100), receiver.recv_from(&mut buf)).await;
        assert!(received.is_err(), "no datagram should arrive while disabled");
    }

    #[tokio::test]
    async fn test_misconfigured_target_then_reachable_target() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();

        // IPv6 destination from an IPv4 socket is rejected by the OS
        let mut dispatcher = Dispatcher::new(
            Box::new(transport),
            "[::1]:5005".parse().unwrap(),
            SendMode::AlwaysOn,
        );

        let failed = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(!failed.is_success());
        assert!(failed.error.is_some());

        dispatcher.set_target(receiver.local_addr().unwrap());
        let ok = dispatcher.dispatch(&sample()).await.unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.sequence, 2);

        let mut buf = [0u8; 64];
        let (len, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("datagram not received")
            .unwrap();
        assert_eq!(&buf[..len], b"[0.12,-0.98]");
    }
}

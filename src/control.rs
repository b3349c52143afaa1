//! # Control Signals Module
//!
//! Operator commands consumed by the driver loop.
//!
//! Producers (Ctrl+C, stdin commands) run in the background and push
//! [`ControlSignal`]s into a channel. The loop drains that channel without
//! blocking at the top of every iteration.
//!
//! ## Stdin Commands
//!
//! | Input | Signal |
//! |-------|--------|
//! | empty line, `t`, `toggle`, `space` | ToggleSending |
//! | `q`, `quit`, `exit`, `esc` | Terminate |

use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands the loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Flip the sending state
    ToggleSending,
    /// Leave the loop and release resources
    Terminate,
}

/// Non-blocking source of control signals
pub trait ControlSurface: Send {
    /// Drain every signal that arrived since the last call
    fn poll(&mut self) -> Vec<ControlSignal>;
}

/// Control surface fed by an unbounded channel
#[derive(Debug)]
pub struct ChannelControl {
    rx: UnboundedReceiver<ControlSignal>,
}

impl ChannelControl {
    /// Create the surface and the sender producers push into
    pub fn channel() -> (UnboundedSender<ControlSignal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl ControlSurface for ChannelControl {
    fn poll(&mut self) -> Vec<ControlSignal> {
        let mut signals = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(signal) => signals.push(signal),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        signals
    }
}

/// Map one line of operator input to a signal
///
/// # Examples
///
/// ```
/// use gamepad_udp_bridge::control::{parse_command, ControlSignal};
///
/// assert_eq!(parse_command(""), Some(ControlSignal::ToggleSending));
/// assert_eq!(parse_command("Q"), Some(ControlSignal::Terminate));
/// assert_eq!(parse_command("hello"), None);
/// ```
pub fn parse_command(line: &str) -> Option<ControlSignal> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "t" | "toggle" | "space" => Some(ControlSignal::ToggleSending),
        "q" | "quit" | "exit" | "esc" => Some(ControlSignal::Terminate),
        _ => None,
    }
}

/// Forward Ctrl+C as [`ControlSignal::Terminate`]
pub fn spawn_interrupt_listener(tx: UnboundedSender<ControlSignal>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Keyboard interrupt received. Exiting...");
                let _ = tx.send(ControlSignal::Terminate);
            }
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    })
}

/// Read operator commands from stdin on a detached thread
///
/// A pending read never holds up runtime shutdown. End of input stops the
/// listener; it never terminates the loop by itself.
pub fn spawn_stdin_listener(
    tx: UnboundedSender<ControlSignal>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => match parse_command(&line) {
                        Some(signal) => {
                            if tx.send(signal).is_err() {
                                return;
                            }
                        }
                        None => info!("Unknown command '{}' (Enter toggles, q quits)", line.trim()),
                    },
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        return;
                    }
                }
            }
            debug!("stdin closed, command input disabled");
        })
}

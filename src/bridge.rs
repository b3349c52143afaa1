//! # Bridge Driver Loop
//!
//! Fixed-period loop tying the sampler, dispatcher, feed and presenter together.
//!
//! ## Iteration Order
//!
//! 1. Drain control signals (toggle, terminate)
//! 2. Sample the gamepad
//! 3. Present the current state
//! 4. Dispatch, if sending is enabled
//! 5. Record successful sends in the feed
//! 6. Sleep for what is left of the period
//!
//! ## States
//!
//! `Idle` -> `Running` -> `ShuttingDown`. A terminate signal is observed at
//! the top of the next iteration. Send failures and short device reads never
//! leave `Running`; only termination or a device that keeps failing does.
//! The socket and presenter are released on every exit path.
//!
//! The period is a soft target: if an iteration overruns, the next one starts
//! immediately and the lost time is not made up.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::control::{ControlSignal, ControlSurface};
use crate::controller::sampler::Sampler;
use crate::error::{BridgeError, Result};
use crate::feed::FeedRecorder;
use crate::net::dispatcher::{DispatchStats, Dispatcher};
use crate::presenter::Presenter;

/// Default loop period
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(250);

/// Default number of consecutive device read failures tolerated
pub const DEFAULT_MAX_READ_FAILURES: u32 = 40;

/// Lifecycle of the driver loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Running,
    ShuttingDown,
}

/// Whether the loop should keep going after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Loop tuning
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    pub period: Duration,
    /// Record successful sends in the feed
    pub feed_enabled: bool,
    pub feed_capacity: usize,
    pub max_read_failures: u32,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            feed_enabled: true,
            feed_capacity: crate::feed::DEFAULT_FEED_CAPACITY,
            max_read_failures: DEFAULT_MAX_READ_FAILURES,
        }
    }
}

impl From<&Config> for BridgeOptions {
    fn from(config: &Config) -> Self {
        Self {
            period: config.bridge.period(),
            feed_enabled: config.bridge.feed_enabled,
            feed_capacity: config.feed.max_items,
            max_read_failures: config.controller.max_read_failures,
        }
    }
}

/// Totals reported when the loop exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSummary {
    pub iterations: u64,
    pub stats: DispatchStats,
}

/// The sampling and dispatch loop
pub struct Bridge {
    sampler: Sampler,
    dispatcher: Dispatcher,
    feed: FeedRecorder,
    control: Box<dyn ControlSurface>,
    presenter: Option<Box<dyn Presenter>>,
    options: BridgeOptions,
    state: BridgeState,
    read_failures: u32,
    iterations: u64,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    pub fn new(
        sampler: Sampler,
        dispatcher: Dispatcher,
        control: Box<dyn ControlSurface>,
        options: BridgeOptions,
    ) -> Self {
        Self {
            sampler,
            dispatcher,
            feed: FeedRecorder::new(options.feed_capacity),
            control,
            presenter: None,
            options,
            state: BridgeState::Idle,
            read_failures: 0,
            iterations: 0,
        }
    }

    /// Attach a presenter that is shown the state every iteration
    #[must_use]
    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Run until terminated, then release resources
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceLost`] if the gamepad fails
    /// `max_read_failures` reads in a row. Resources are released first.
    pub async fn run(mut self) -> Result<BridgeSummary> {
        info!(
            "Starting bridge loop to {} every {} ms ({})",
            self.dispatcher.target(),
            self.options.period.as_millis(),
            if self.dispatcher.is_enabled() { "sending" } else { "not sending" }
        );
        self.state = BridgeState::Running;

        let result = loop {
            let started = Instant::now();

            match self.step().await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break Ok(()),
                Err(e) => break Err(e),
            }

            let remaining = self.options.period.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        };

        if let Err(e) = &result {
            info!("Bridge stopping: {}", e);
        }
        self.shutdown();

        result.map(|()| self.summary())
    }

    /// One loop iteration without the trailing sleep
    pub async fn step(&mut self) -> Result<Flow> {
        match self.state {
            BridgeState::ShuttingDown => return Ok(Flow::Stop),
            BridgeState::Idle => self.state = BridgeState::Running,
            BridgeState::Running => {}
        }

        let mut terminate = false;
        for signal in self.control.poll() {
            match signal {
                ControlSignal::ToggleSending => self.dispatcher.toggle(),
                ControlSignal::Terminate => terminate = true,
            }
        }
        if terminate {
            info!("Exiting program...");
            return Ok(Flow::Stop);
        }

        match self.sampler.sample() {
            Ok(_) => self.read_failures = 0,
            Err(e) => {
                self.read_failures += 1;
                warn!(
                    "Gamepad read failed ({}/{}): {}",
                    self.read_failures, self.options.max_read_failures, e
                );
                if self.read_failures >= self.options.max_read_failures {
                    return Err(BridgeError::DeviceLost(self.read_failures));
                }
            }
        }

        if let Some(presenter) = self.presenter.as_mut() {
            presenter.present(self.sampler.axes(), self.dispatcher.is_enabled(), &self.feed);
        }

        if let Some(outcome) = self.dispatcher.dispatch(self.sampler.axes()).await {
            if self.options.feed_enabled {
                if let Some(description) = outcome.feed_description() {
                    self.feed.record(outcome.sequence, description);
                }
            }
        }

        self.iterations += 1;
        Ok(Flow::Continue)
    }

    /// Release the socket and presenter; later calls do nothing
    pub fn shutdown(&mut self) {
        if self.state == BridgeState::ShuttingDown {
            return;
        }
        self.state = BridgeState::ShuttingDown;

        if let Err(e) = self.dispatcher.shutdown() {
            warn!("Failed to close socket: {}", e);
        }
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.close();
        }

        info!(
            "Bridge stopped after {} iterations, {} packets sent",
            self.iterations,
            self.dispatcher.stats().successes
        );
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn feed(&self) -> &FeedRecorder {
        &self.feed
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn summary(&self) -> BridgeSummary {
        BridgeSummary {
            iterations: self.iterations,
            stats: self.dispatcher.stats(),
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

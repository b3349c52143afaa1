//! # Gamepad UDP Bridge
//!
//! Stream gamepad axis readings to a remote host as UDP datagrams.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamepad_udp_bridge::bridge::{Bridge, BridgeOptions};
use gamepad_udp_bridge::config::{Config, Endpoint, CONFIG_ENV_VAR};
use gamepad_udp_bridge::control::{spawn_interrupt_listener, spawn_stdin_listener, ChannelControl};
use gamepad_udp_bridge::controller::{EvdevGamepad, InputDevice, Sampler};
use gamepad_udp_bridge::net::{bind_addr_for, Dispatcher, SendMode, UdpTransport};
use gamepad_udp_bridge::presenter::LogPresenter;

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "gamepad-udp-bridge.log";

/// Main entry point for the bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load the optional TOML tuning file (CLI argument or `BRIDGE_CONFIG`)
///    - Set up logging with tracing subscriber
///    - Read `JETSON_IP` / `JETSON_PORT` (environment, then `.env`) and resolve once
///    - Open the first gamepad and bind the UDP socket
///
/// 2. **Main Loop**
///    - Sample axes, log status changes, send when enabled
///    - Enter on stdin toggles sending, `q` or Ctrl+C quits
///
/// 3. **Graceful Shutdown**
///    - Close the socket on every exit path
///    - Log total packet count
///
/// Any startup failure is logged once and the process exits with status 1
/// without entering the loop.
///
/// # Examples
///
/// ```bash
/// JETSON_IP=192.168.1.50 JETSON_PORT=5005 cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> ExitCode {
    let config = config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV_VAR).ok())
        .map(Config::load)
        .unwrap_or_else(|| Ok(Config::default()));

    let log_dir = config
        .as_ref()
        .map(|c| c.logging.log_dir.clone())
        .unwrap_or_default();
    let _log_guard = init_logging(&log_dir);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: gamepad_udp_bridge::error::Result<Config>) -> Result<()> {
    let config = config.context("Failed to load configuration")?;

    info!("Gamepad UDP Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let endpoint = Endpoint::from_env()
        .context("Jetson IP or port is not set. Please check your environment or .env file")?;
    let target = endpoint.resolve().await?;
    info!("Streaming to {} ({})", endpoint, target);

    let device: Box<dyn InputDevice> = if config.controller.device_path.is_empty() {
        Box::new(EvdevGamepad::open().context("Failed to open gamepad")?)
    } else {
        Box::new(
            EvdevGamepad::open_path(&config.controller.device_path)
                .context("Failed to open configured gamepad")?,
        )
    };
    let sampler = Sampler::new(device, config.controller.axis_count);
    info!(
        "Sampling {} axes from '{}'",
        config.controller.axis_count,
        sampler.device_name()
    );

    let configured: SocketAddr = config
        .network
        .bind_addr
        .parse()
        .context("Invalid bind address")?;
    let transport = UdpTransport::bind(bind_addr_for(configured, target))
        .await
        .context("Failed to bind UDP socket")?;
    info!("UDP socket bound on {}", transport.local_addr());

    let mode = if config.bridge.feed_enabled {
        SendMode::Toggled {
            start_enabled: config.bridge.start_enabled,
        }
    } else {
        SendMode::AlwaysOn
    };
    let dispatcher = Dispatcher::new(Box::new(transport), target, mode)
        .with_max_payload_bytes(config.network.max_payload_bytes);

    let (tx, control) = ChannelControl::channel();
    spawn_interrupt_listener(tx.clone());
    if let Err(e) = spawn_stdin_listener(tx) {
        warn!("Command input unavailable: {}", e);
    }
    match mode {
        SendMode::Toggled { .. } => {
            info!("Press Enter to start/stop sending, q + Enter or Ctrl+C to exit")
        }
        SendMode::AlwaysOn => info!("Sending continuously, q + Enter or Ctrl+C to exit"),
    }

    let summary = Bridge::new(sampler, dispatcher, Box::new(control), BridgeOptions::from(&config))
        .with_presenter(Box::new(LogPresenter::new()))
        .run()
        .await?;

    info!(
        "Total packets sent: {} ({} failed)",
        summary.stats.successes, summary.stats.failures
    );
    Ok(())
}

/// CLI argument wins over the environment variable
fn config_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    arg.or(env)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

fn init_logging(log_dir: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

//! Bridge Daemon
//!
//! Runs the avatar command bridge without a graphical engine: the TCP
//! listener on its I/O thread plus a headless render thread that blends
//! attributes and logs frames.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 127.0.0.1:5555 with config from ~/.config/desktop-mate/bridge.toml
//! bridge-daemon
//!
//! # Custom port, blinking on
//! bridge-daemon --port 6000 --auto-blink true
//!
//! # With verbose logging
//! RUST_LOG=debug bridge-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `BRIDGE_HOST` / `BRIDGE_PORT`: listen address
//! - `BRIDGE_CONFIG`: config file path
//! - `BRIDGE_TRANSITION_SPEED`, `BRIDGE_TICK_RATE`, `BRIDGE_JOIN_TIMEOUT`
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: stop the listener, then the render thread

mod render;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use bridge_core::{
    default_config_path, load_config_from_path, AvatarController, BridgeConfig, CommandQueue,
    ConfigSource, ConnectionManager, ControllerSettings, FsAssetLoader,
};

#[derive(Parser, Debug)]
#[command(name = "bridge-daemon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// TCP port to listen on
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Configuration file
    #[arg(short = 'c', long, env = "BRIDGE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Render ticks per second
    #[arg(long, value_name = "HZ")]
    tick_rate: Option<u32>,

    /// Start with auto-blink on or off
    #[arg(long, value_name = "BOOL")]
    auto_blink: Option<bool>,

    /// Start with head movement on or off
    #[arg(long, value_name = "BOOL")]
    head_movement: Option<bool>,
}

impl Args {
    fn apply(&self, config: &mut BridgeConfig) {
        let mut overridden = false;
        if let Some(host) = &self.host {
            config.transport.host.clone_from(host);
            overridden = true;
        }
        if let Some(port) = self.port {
            config.transport.port = port;
            overridden = true;
        }
        if let Some(rate) = self.tick_rate {
            config.tick_rate_hz = rate;
            overridden = true;
        }
        if let Some(enabled) = self.auto_blink {
            config.auto_blink.enabled = enabled;
            overridden = true;
        }
        if let Some(enabled) = self.head_movement {
            config.head_movement.enabled = enabled;
            overridden = true;
        }
        if overridden {
            config.set_source(ConfigSource::Cli);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bridge_daemon=info".parse()?)
                .add_directive("bridge_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path.as_deref())
        .context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid command-line override")?;

    info!(
        addr = %config.transport.listen_addr(),
        tick_rate_hz = config.tick_rate_hz,
        source = %config.source(),
        "Starting bridge daemon"
    );

    let queue = Arc::new(CommandQueue::new());
    let mut manager = ConnectionManager::start(
        &config.transport,
        AvatarController::command_handler(queue.sender()),
    )
    .with_context(|| format!("Failed to listen on {}", config.transport.listen_addr()))?;

    let controller = AvatarController::new(
        ControllerSettings::from(&config),
        queue,
        Arc::new(manager.handle()),
    )
    .with_asset_loader(Box::new(FsAssetLoader::new()));

    let running = Arc::new(AtomicBool::new(true));
    let render_thread = render::spawn(controller, config.tick_rate_hz, Arc::clone(&running))
        .context("Failed to spawn render thread")?;

    info!(addr = %manager.local_addr(), "Ready for controller connections");

    wait_for_shutdown().await;

    info!("Performing graceful shutdown...");
    manager.stop();
    running.store(false, Ordering::SeqCst);

    match render_thread.join() {
        Ok(controller) => info!(
            commands = controller.commands_handled(),
            "Bridge daemon stopped cleanly"
        ),
        Err(_) => error!("Render thread panicked"),
    }
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

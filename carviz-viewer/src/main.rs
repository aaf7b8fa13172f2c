//! carviz viewer - entry point.
//!
//! ```text
//! carviz-viewer                    Connect with defaults
//! carviz-viewer --config <path>    Use custom config TOML
//! carviz-viewer --server <addr>    Override the server address
//! carviz-viewer --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use carviz_core::{
    IntervalRefresh, LoopbackMedia, MediaSession, SessionState, Status, StatusBoard, StatusSink,
    TelemetryLoop, ViewerSession,
};

use carviz_viewer::config::ViewerConfig;
use carviz_viewer::connection;
use carviz_viewer::mirror::spawn_mirror;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "carviz-viewer", about = "carviz ball tracking viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "carviz-viewer.toml")]
    config: PathBuf,

    /// Server address (overrides config). Example: 127.0.0.1:8080
    #[arg(short, long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.server_address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("carviz-viewer v{}", env!("CARGO_PKG_VERSION"));

    let status = Arc::new(StatusBoard::new());

    // ── 1. Connect ──────────────────────────────────────────────

    let conn = match connection::connect(&config.network).await {
        Ok(conn) => conn,
        Err(e) => {
            status.publish(Status::Error(e.to_string()));
            return Err(e);
        }
    };

    // ── 2. Media and the surface showing it ────────────────────

    let media = LoopbackMedia::new();
    let (surface, mirror) = spawn_mirror(config.simulation.clone(), media.events());
    let telemetry = TelemetryLoop::new(
        surface,
        IntervalRefresh::from_hz(config.display.refresh_hz),
        config.display.sample_width,
        config.display.sample_height,
    );

    // ── 3. Run until the stream ends ────────────────────────────

    let session = ViewerSession::new(
        media,
        config.session.answer_policy,
        telemetry,
        Arc::clone(&status),
    );

    let report = tokio::select! {
        report = session.run(conn) => Some(report),
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, disconnecting");
            None
        }
    };
    mirror.abort();

    match report {
        Some(report) => {
            info!(
                ticks = report.telemetry.ticks,
                sent = report.telemetry.sent,
                "session finished: {}",
                status.current()
            );
            match report.final_state {
                SessionState::Errored { reason } => {
                    error!("session failed: {reason}");
                    Err(reason.into())
                }
                SessionState::OfferSent { .. } => {
                    warn!("stream ended before the server answered");
                    Ok(())
                }
                _ => Ok(()),
            }
        }
        None => Ok(()),
    }
}

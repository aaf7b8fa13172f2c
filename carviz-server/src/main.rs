//! carviz server - entry point.
//!
//! ```text
//! carviz-server                    Serve with defaults
//! carviz-server --config <path>    Load a custom config TOML
//! carviz-server --bind <addr>      Override the listen address
//! carviz-server --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use carviz_server::config::ServerConfig;
use carviz_server::service::PeerService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "carviz-server", about = "carviz ball stream server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "carviz-server.toml")]
    config: PathBuf,

    /// Listen address (overrides config). Example: 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ServerConfig::load(&cli.config);
    if let Some(addr) = cli.bind {
        config.network.bind_address = addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("carviz-server v{}", env!("CARGO_PKG_VERSION"));
    info!("bind address: {}", config.network.bind_address);
    info!(
        "simulation: {}x{} @ {} fps",
        config.simulation.width, config.simulation.height, config.simulation.fps
    );

    let service = PeerService::new(config);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}

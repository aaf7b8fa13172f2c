//! TCP connection to the server.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::info;

use carviz_core::{Connection, ConnectionInfo};

use crate::config::NetworkConfig;

/// Connect to the configured server within the configured timeout.
pub async fn connect(
    config: &NetworkConfig,
) -> Result<Connection<TcpStream>, Box<dyn std::error::Error>> {
    let info = ConnectionInfo::parse(&config.server_address)
        .ok_or_else(|| format!("invalid server address: {}", config.server_address))?;
    let timeout = Duration::from_millis(config.timeout_ms);

    info!("connecting to server at {info}");
    let conn = tokio::time::timeout(timeout, Connection::connect(&info))
        .await
        .map_err(|_| format!("timed out connecting to {info}"))??;
    Ok(conn)
}

//! Viewer-facing accept loop.
//!
//! Each accepted viewer gets its own [`PeerHandler`] (and with it its
//! own ball simulation) running in a Tokio task. Stopping the service
//! aborts every session, which stops their simulators.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use carviz_core::{Connection, LoopbackResponder, PeerHandler};

use crate::config::ServerConfig;

// ── PeerService ──────────────────────────────────────────────────

/// The top-level server service.
pub struct PeerService {
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl PeerService {
    /// Create a new service with the given config.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Bind the configured address and serve until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr: SocketAddr = self.config.network.bind_address.parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await;
        Ok(())
    }

    /// Serve viewers accepted on `listener` until stopped.
    pub async fn serve(&self, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("carviz server listening on {addr}"),
            Err(e) => warn!("listening on unknown address: {e}"),
        }
        let max = self.config.network.max_connections.max(1);
        let mut sessions = JoinSet::new();

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                Some(done) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = done {
                        if !e.is_cancelled() {
                            error!("session task failed: {e}");
                        }
                    }
                    continue;
                }
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            if sessions.len() >= max {
                warn!("refusing {peer}: {max} viewers already connected");
                drop(stream);
                continue;
            }
            if let Err(e) = stream.set_nodelay(true) {
                warn!("set_nodelay failed for {peer}: {e}");
            }

            info!("viewer connected from {peer}");
            let handler = PeerHandler::new(LoopbackResponder, self.config.simulation.clone());
            sessions.spawn(async move {
                // errors are logged by the handler
                let _ = handler.serve(Connection::new(stream)).await;
                info!("session with {peer} ended");
            });
        }

        sessions.shutdown().await;
        info!("carviz server stopped");
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use carviz_core::{AppMessage, ConnectionInfo, Fixed3, LoopbackMedia, MediaSession};
    use futures::{SinkExt, StreamExt};

    async fn spawn_service(config: ServerConfig) -> (Arc<PeerService>, ConnectionInfo, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let svc = Arc::new(PeerService::new(config));
        let task = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.serve(listener).await }
        });
        (svc, ConnectionInfo::new(addr.ip().to_string(), addr.port()), task)
    }

    #[test]
    fn stop_handle_works() {
        let svc = PeerService::new(ServerConfig::default());
        assert!(svc.is_running());
        let handle = svc.stop_handle();
        svc.stop();
        assert!(!handle.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn answers_offer_and_scores_report() {
        let (svc, info, task) = spawn_service(ServerConfig::default()).await;
        let (mut reader, mut writer) = Connection::connect(&info).await.unwrap().into_split();

        let offer = LoopbackMedia::new().create_offer().await.unwrap();
        writer.send(AppMessage::SdpOffer { sdp: offer }).await.unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), reader.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(reply, AppMessage::SdpAnswer { .. }));

        writer
            .send(AppMessage::DetectedCenter {
                x: Fixed3::from_f64(320.0),
                y: Fixed3::from_f64(240.0),
            })
            .await
            .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), reader.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(reply, AppMessage::L2Error { val } if val >= 0.0));

        svc.stop();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("service did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn refuses_viewers_beyond_limit() {
        let mut config = ServerConfig::default();
        config.network.max_connections = 1;
        let (svc, info, _task) = spawn_service(config).await;

        let (mut first_reader, mut first_writer) =
            Connection::connect(&info).await.unwrap().into_split();
        let offer = LoopbackMedia::new().create_offer().await.unwrap();
        first_writer.send(AppMessage::SdpOffer { sdp: offer }).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), first_reader.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap()
            .unwrap();

        let (mut second_reader, _second_writer) =
            Connection::connect(&info).await.unwrap().into_split();
        let next = tokio::time::timeout(Duration::from_secs(5), second_reader.next())
            .await
            .expect("timeout");
        assert!(next.is_none());
        svc.stop();
    }
}

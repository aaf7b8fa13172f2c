//! Peer side of a session: answers offers and scores reported centres.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::error::CarvizError;
use crate::media::MediaResponder;
use crate::message::AppMessage;
use crate::network::Connection;
use crate::sim::{BallSimulator, SimConfig, l2_error};

/// Counters for one served connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStats {
    pub offers: u64,
    pub reports: u64,
    pub malformed: u64,
    pub ignored: u64,
}

/// Per-connection peer state.
///
/// Each offer (re)starts the ball simulator; every `detected-center`
/// report is answered with its distance from the live ball centre.
pub struct PeerHandler<R> {
    responder: R,
    sim: BallSimulator,
    stats: PeerStats,
}

impl<R: MediaResponder> PeerHandler<R> {
    pub fn new(responder: R, sim_config: SimConfig) -> Self {
        Self {
            responder,
            sim: BallSimulator::new(sim_config),
            stats: PeerStats::default(),
        }
    }

    pub fn simulator(&self) -> &BallSimulator {
        &self.sim
    }

    pub fn stats(&self) -> PeerStats {
        self.stats
    }

    /// Handle one inbound message, returning the reply to send.
    ///
    /// Messages the peer never receives in a well-behaved session are
    /// logged and produce no reply. A failure to answer an offer is
    /// returned as an error.
    pub async fn handle(&mut self, message: AppMessage) -> Result<Option<AppMessage>, CarvizError> {
        match message {
            AppMessage::SdpOffer { sdp } => {
                self.stats.offers += 1;
                self.sim.start();
                let answer = self.responder.answer(&sdp).await?;
                info!("answered sdp offer");
                Ok(Some(AppMessage::SdpAnswer { sdp: answer }))
            }
            AppMessage::DetectedCenter { x, y } => {
                self.stats.reports += 1;
                let val = l2_error(self.sim.current_center(), x.to_f64(), y.to_f64());
                debug!(%x, %y, val, "scored detected center");
                Ok(Some(AppMessage::L2Error { val }))
            }
            other => {
                self.stats.ignored += 1;
                warn!(kind = %other.kind(), "ignoring unexpected message");
                Ok(None)
            }
        }
    }

    /// Serve one connection until it closes.
    ///
    /// The simulator is stopped on return, whatever the outcome.
    pub async fn serve<T>(mut self, conn: Connection<T>) -> Result<PeerStats, CarvizError>
    where
        T: AsyncRead + AsyncWrite + Send,
    {
        let result = self.serve_inner(conn).await;
        self.sim.stop();
        match &result {
            Ok(()) => info!(stats = ?self.stats, "viewer disconnected"),
            Err(e) => error!("connection failed: {e}"),
        }
        result.map(|()| self.stats)
    }

    async fn serve_inner<T>(&mut self, conn: Connection<T>) -> Result<(), CarvizError>
    where
        T: AsyncRead + AsyncWrite + Send,
    {
        let (mut reader, mut writer) = conn.into_split();
        while let Some(decoded) = reader.next().await {
            let message = match decoded? {
                Ok(message) => message,
                Err(segment) => {
                    self.stats.malformed += 1;
                    warn!("{segment}");
                    continue;
                }
            };
            if let Some(reply) = self.handle(message).await? {
                writer.send(reply).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{LoopbackMedia, LoopbackResponder, MediaSession};
    use crate::message::Fixed3;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn offer_starts_simulator_and_answers() {
        let mut handler = PeerHandler::new(LoopbackResponder, SimConfig::default());
        assert!(!handler.simulator().is_running());

        let offer = LoopbackMedia::new().create_offer().await.unwrap();
        let reply = handler.handle(AppMessage::SdpOffer { sdp: offer }).await.unwrap();

        match reply {
            Some(AppMessage::SdpAnswer { sdp }) => assert!(sdp.contains("H264/90000")),
            other => panic!("expected answer, got {other:?}"),
        }
        assert!(handler.simulator().is_running());
        assert_eq!(handler.stats().offers, 1);
    }

    #[tokio::test]
    async fn report_is_scored_against_ball() {
        let mut handler = PeerHandler::new(LoopbackResponder, SimConfig::default());
        let offer = LoopbackMedia::new().create_offer().await.unwrap();
        handler.handle(AppMessage::SdpOffer { sdp: offer }).await.unwrap();

        let (cx, cy) = handler.simulator().current_center().unwrap();
        let reply = handler
            .handle(AppMessage::DetectedCenter {
                x: Fixed3::from_thousandths(i64::from(cx) * 1000 + 3000),
                y: Fixed3::from_thousandths(i64::from(cy) * 1000 + 4000),
            })
            .await
            .unwrap();
        assert_eq!(reply, Some(AppMessage::L2Error { val: 5.0 }));
    }

    #[tokio::test]
    async fn report_without_simulator_scores_zero() {
        let mut handler = PeerHandler::new(LoopbackResponder, SimConfig::default());
        let reply = handler
            .handle(AppMessage::DetectedCenter {
                x: Fixed3::from_f64(10.0),
                y: Fixed3::from_f64(20.0),
            })
            .await
            .unwrap();
        assert_eq!(reply, Some(AppMessage::L2Error { val: 0.0 }));
    }

    #[tokio::test]
    async fn unexpected_messages_get_no_reply() {
        let mut handler = PeerHandler::new(LoopbackResponder, SimConfig::default());
        let reply = handler.handle(AppMessage::L2Error { val: 1.0 }).await.unwrap();
        assert_eq!(reply, None);
        assert_eq!(handler.stats().ignored, 1);
    }

    #[tokio::test]
    async fn serve_replies_and_skips_garbage() {
        let offer = LoopbackMedia::new().create_offer().await.unwrap();
        let mut inbound = AppMessage::SdpOffer { sdp: offer }.to_json().unwrap();
        inbound.extend_from_slice(b"eol{not json}eol");

        let (client, server) = tokio::io::duplex(8192);
        let handler = PeerHandler::new(LoopbackResponder, SimConfig::default());
        let task = tokio::spawn(handler.serve(Connection::new(server)));

        let (mut reader, mut writer) = Connection::new(client).into_split();
        writer.get_mut().write_all(&inbound).await.unwrap();

        let reply = reader.next().await.unwrap().unwrap().unwrap();
        assert!(matches!(reply, AppMessage::SdpAnswer { .. }));

        writer
            .send(AppMessage::DetectedCenter {
                x: Fixed3::from_f64(1.0),
                y: Fixed3::from_f64(1.0),
            })
            .await
            .unwrap();
        let reply = reader.next().await.unwrap().unwrap().unwrap();
        assert!(matches!(reply, AppMessage::L2Error { val } if val > 0.0));

        drop(writer);
        drop(reader);
        let stats = task.await.unwrap().unwrap();
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.malformed, 1);
    }
}

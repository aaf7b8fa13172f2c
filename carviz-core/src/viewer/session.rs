//! Runs one viewer session over an open stream.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::media::MediaSession;
use crate::network::Connection;
use crate::state::{AnswerPolicy, SessionState};
use crate::status::{Status, StatusSink};
use crate::viewer::reader::run_reader;
use crate::viewer::signaling::SignalingSession;
use crate::viewer::telemetry::{RefreshSignal, TelemetryLoop, TelemetryStats};
use crate::vision::DisplaySurface;

/// Outcome of [`ViewerSession::run`].
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub final_state: SessionState,
    pub telemetry: TelemetryStats,
}

/// Viewer side of one connection.
///
/// # Lifetime
///
/// [`run`](Self::run) writes the offer, then drives the read loop and
/// the telemetry loop concurrently until the stream closes or fails.
/// There is no handshake timeout: a peer that never answers leaves the
/// session in `OfferSent` until the stream ends.
pub struct ViewerSession<M, S, R, St> {
    signaling: SignalingSession<M>,
    telemetry: TelemetryLoop<S, R>,
    status: St,
}

impl<M, S, R, St> ViewerSession<M, S, R, St>
where
    M: MediaSession,
    S: DisplaySurface,
    R: RefreshSignal,
    St: StatusSink,
{
    pub fn new(
        media: M,
        policy: AnswerPolicy,
        telemetry: TelemetryLoop<S, R>,
        status: St,
    ) -> Self {
        Self {
            signaling: SignalingSession::new(media, policy),
            telemetry,
            status,
        }
    }

    /// Observe session state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.signaling.subscribe()
    }

    pub async fn run<T>(self, conn: Connection<T>) -> SessionReport
    where
        T: AsyncRead + AsyncWrite + Send,
    {
        let Self {
            mut signaling,
            mut telemetry,
            status,
        } = self;
        let (mut reader, mut writer) = conn.into_split();
        status.publish(Status::Connected);

        if let Err(e) = signaling.start(&mut writer).await {
            error!("could not send offer: {e}");
            signaling.fail(e.to_string());
            status.publish(Status::Error(e.to_string()));
            return SessionReport {
                final_state: signaling.state(),
                telemetry: telemetry.stats(),
            };
        }
        status.publish(Status::OfferSent);

        let media = signaling.media_events();
        let mut read_result = None;
        let mut write_error = None;
        {
            let read = run_reader(&mut reader, &mut signaling, &status);
            let write = telemetry.run(media, &mut writer);
            tokio::pin!(read, write);

            tokio::select! {
                result = &mut read => read_result = Some(result),
                result = &mut write => {
                    match result {
                        // telemetry finished; keep reading until the stream ends
                        Ok(_) => read_result = Some(read.await),
                        Err(e) => write_error = Some(e),
                    }
                }
            }
        }
        // the reader has already moved the state and published the status
        if let Some(Err(e)) = read_result {
            debug!(state = %signaling.state(), "read loop ended: {e}");
        }
        if let Some(e) = write_error {
            error!("telemetry write failed: {e}");
            if signaling.fail(e.to_string()) {
                status.publish(Status::Disconnected(e.to_string()));
            }
        }

        let report = SessionReport {
            final_state: signaling.state(),
            telemetry: telemetry.stats(),
        };
        info!(
            state = %report.final_state,
            sent = report.telemetry.sent,
            "viewer session ended"
        );
        report
    }
}

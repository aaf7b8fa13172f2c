//! Background read loop: decodes inbound segments and dispatches them.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tracing::{debug, error, warn};

use crate::error::CarvizError;
use crate::media::MediaSession;
use crate::message::AppMessage;
use crate::network::MessageReader;
use crate::status::{Status, StatusSink};
use crate::viewer::signaling::SignalingSession;

/// Read until the stream ends.
///
/// - `sdp-answer` goes to the signaling session.
/// - `l2-error` is published as a status update.
/// - A malformed segment is reported and skipped.
///
/// End of stream closes the session and returns `Ok`. A read or
/// framing error, or an answer the media layer rejects, moves the
/// session to `Errored` and is returned.
pub async fn run_reader<R, M, S>(
    reader: &mut MessageReader<R>,
    signaling: &mut SignalingSession<M>,
    status: &S,
) -> Result<(), CarvizError>
where
    R: AsyncRead + Unpin,
    M: MediaSession,
    S: StatusSink + ?Sized,
{
    loop {
        let decoded = match reader.next().await {
            None => {
                signaling.close();
                status.publish(Status::StreamClosed);
                return Ok(());
            }
            Some(Err(e)) => {
                error!("read failed: {e}");
                signaling.fail(e.to_string());
                status.publish(Status::Disconnected(e.to_string()));
                return Err(e);
            }
            Some(Ok(decoded)) => decoded,
        };

        let message = match decoded {
            Ok(message) => message,
            Err(segment) => {
                warn!("{segment}");
                status.publish(Status::MalformedMessage(segment.reason));
                continue;
            }
        };
        debug!(kind = %message.kind(), "received");

        match message {
            AppMessage::SdpAnswer { sdp } => match signaling.on_answer(&sdp).await {
                Ok(Some(_)) => status.publish(Status::HandshakeCompleted),
                Ok(None) => {}
                Err(e) => {
                    error!("could not apply answer: {e}");
                    status.publish(Status::Error(e.to_string()));
                    return Err(e);
                }
            },
            AppMessage::L2Error { val } => status.publish(Status::L2Error(val)),
            other => warn!(kind = %other.kind(), "ignoring unexpected message"),
        }
    }
}

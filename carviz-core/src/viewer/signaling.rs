//! One-shot offer/answer exchange over the message stream.

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CarvizError;
use crate::media::{MediaEvent, MediaSession};
use crate::message::AppMessage;
use crate::network::MessageWriter;
use crate::state::{AnswerOutcome, AnswerPolicy, SessionState};

/// Drives [`SessionState`] and hands descriptions to the media layer.
///
/// The state is published on a `watch` channel so the runner, tests
/// and any UI can observe transitions.
pub struct SignalingSession<M> {
    media: M,
    policy: AnswerPolicy,
    state: watch::Sender<SessionState>,
}

impl<M: MediaSession> SignalingSession<M> {
    pub fn new(media: M, policy: AnswerPolicy) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            media,
            policy,
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn policy(&self) -> AnswerPolicy {
        self.policy
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    /// Playback events of the underlying media session.
    pub fn media_events(&self) -> watch::Receiver<MediaEvent> {
        self.media.events()
    }

    /// Create the local offer and write it to the peer.
    ///
    /// Valid from `Idle`; the state moves to `OfferSent` once the
    /// offer has been flushed.
    pub async fn start<W>(&mut self, writer: &mut MessageWriter<W>) -> Result<(), CarvizError>
    where
        W: AsyncWrite + Unpin,
    {
        if *self.state.borrow() != SessionState::Idle {
            return Err(CarvizError::ProtocolViolation(
                "cannot send offer: not in Idle state",
            ));
        }
        let sdp = self.media.create_offer().await?;
        writer.send(AppMessage::SdpOffer { sdp }).await?;

        let mut next = self.state();
        next.offer_sent()?;
        self.state.send_replace(next);
        info!("sdp offer sent");
        Ok(())
    }

    /// Handle an answer from the peer.
    ///
    /// Returns `Ok(None)` when the answer was ignored (ended session,
    /// or a repeat answer under [`AnswerPolicy::Strict`]). A failure to
    /// apply the answer is fatal: the session moves to `Errored`.
    pub async fn on_answer(&mut self, sdp: &str) -> Result<Option<AnswerOutcome>, CarvizError> {
        let current = self.state();
        if let Err(e) = current.check_answer(self.policy) {
            warn!(state = %current, "ignoring sdp answer: {e}");
            return Ok(None);
        }

        if let Err(e) = self.media.apply_answer(sdp).await {
            self.fail(e.to_string());
            return Err(e);
        }

        let mut next = self.state();
        let outcome = next.answer_applied(self.policy)?;
        self.state.send_replace(next);
        match outcome {
            AnswerOutcome::Completed => info!("handshake completed"),
            AnswerOutcome::Replaced => info!("remote description replaced"),
            AnswerOutcome::Unsolicited => warn!("applied an answer before any offer was sent"),
        }
        Ok(Some(outcome))
    }

    /// Orderly end of stream. Returns `false` if already terminal.
    pub fn close(&self) -> bool {
        let changed = self.state.send_if_modified(|s| s.close());
        if changed {
            debug!("session closed");
        }
        changed
    }

    /// Abnormal end. Returns `false` if already terminal.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let changed = self.state.send_if_modified(|s| s.fail(reason.clone()));
        if changed {
            debug!("session errored: {reason}");
        }
        changed
    }
}

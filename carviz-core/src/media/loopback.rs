//! In-process stand-ins for the media engine.
//!
//! They exchange minimal but well-formed SDP so the binaries and tests
//! run the full handshake without a real WebRTC stack. The answer
//! always pins the video to H.264.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::error::CarvizError;
use crate::media::{MediaEvent, MediaResponder, MediaSession};

const FORCED_CODEC: &str = "H264/90000";

fn session_id() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn check_description(sdp: &str) -> Result<(), CarvizError> {
    if !sdp.starts_with("v=0") {
        return Err(CarvizError::Media("not a session description".into()));
    }
    if !sdp.lines().any(|l| l.starts_with("m=video")) {
        return Err(CarvizError::Media("no video section".into()));
    }
    Ok(())
}

/// Payload type the description maps to the forced codec.
fn forced_payload_type(sdp: &str) -> Option<u8> {
    sdp.lines().find_map(|line| {
        let (pt, codec) = line.strip_prefix("a=rtpmap:")?.split_once(' ')?;
        if codec.trim().eq_ignore_ascii_case(FORCED_CODEC) {
            pt.parse().ok()
        } else {
            None
        }
    })
}

// ── LoopbackMedia ─────────────────────────────────────────────────

/// Viewer-side stand-in: offers to receive VP8 or H.264 video and
/// reports playback as soon as an answer is applied.
#[derive(Debug)]
pub struct LoopbackMedia {
    events: watch::Sender<MediaEvent>,
    remote: Option<String>,
}

impl LoopbackMedia {
    pub fn new() -> Self {
        let (events, _) = watch::channel(MediaEvent::Pending);
        Self {
            events,
            remote: None,
        }
    }

    /// The most recently applied answer.
    pub fn remote_description(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    /// Signal that the inbound track ended.
    pub fn end_video(&self) {
        self.events.send_replace(MediaEvent::VideoEnded);
    }
}

impl Default for LoopbackMedia {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSession for LoopbackMedia {
    async fn create_offer(&mut self) -> Result<String, CarvizError> {
        Ok(format!(
            "v=0\r\n\
             o=- {} 2 IN IP4 127.0.0.1\r\n\
             s=-\r\n\
             t=0 0\r\n\
             m=video 9 UDP/TLS/RTP/SAVPF 96 102\r\n\
             a=rtpmap:96 VP8/90000\r\n\
             a=rtpmap:102 {FORCED_CODEC}\r\n\
             a=recvonly\r\n",
            session_id()
        ))
    }

    async fn apply_answer(&mut self, sdp: &str) -> Result<(), CarvizError> {
        check_description(sdp)?;
        debug!("applied remote description ({} bytes)", sdp.len());
        self.remote = Some(sdp.to_string());
        self.events.send_replace(MediaEvent::VideoPlaying);
        Ok(())
    }

    fn events(&self) -> watch::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

// ── LoopbackResponder ─────────────────────────────────────────────

/// Peer-side stand-in: answers with a send-only H.264 video section.
#[derive(Debug, Default)]
pub struct LoopbackResponder;

#[async_trait]
impl MediaResponder for LoopbackResponder {
    async fn answer(&mut self, offer_sdp: &str) -> Result<String, CarvizError> {
        check_description(offer_sdp)?;
        let pt = forced_payload_type(offer_sdp)
            .ok_or_else(|| CarvizError::Media(format!("offer does not support {FORCED_CODEC}")))?;
        Ok(format!(
            "v=0\r\n\
             o=- {} 2 IN IP4 127.0.0.1\r\n\
             s=-\r\n\
             t=0 0\r\n\
             m=video 9 UDP/TLS/RTP/SAVPF {pt}\r\n\
             a=rtpmap:{pt} {FORCED_CODEC}\r\n\
             a=sendonly\r\n",
            session_id()
        ))
    }
}

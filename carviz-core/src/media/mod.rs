//! Seams to the media engine.
//!
//! The engine itself (codecs, RTP, ICE) lives elsewhere. carviz only
//! carries its session descriptions and listens for the moment video
//! starts playing.

pub mod loopback;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::CarvizError;

pub use loopback::{LoopbackMedia, LoopbackResponder};

/// Playback state of the inbound video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaEvent {
    /// Negotiation in progress or not started.
    #[default]
    Pending,
    /// Frames are being rendered.
    VideoPlaying,
    /// The track ended.
    VideoEnded,
}

/// Viewer side of negotiation: produces the offer, applies the answer.
#[async_trait]
pub trait MediaSession: Send {
    /// Create the local description to offer.
    async fn create_offer(&mut self) -> Result<String, CarvizError>;

    /// Apply the remote description answered by the peer.
    async fn apply_answer(&mut self, sdp: &str) -> Result<(), CarvizError>;

    /// Observe playback; the telemetry loop waits for `VideoPlaying`.
    fn events(&self) -> watch::Receiver<MediaEvent>;
}

/// Peer side of negotiation: answers an offer.
#[async_trait]
pub trait MediaResponder: Send {
    async fn answer(&mut self, offer_sdp: &str) -> Result<String, CarvizError>;
}

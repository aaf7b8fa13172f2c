//! Human-readable status surface.
//!
//! The phrases produced by [`Status`]'s `Display` impl are what the
//! user sees; nothing parses them.

use std::fmt;

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::message::round_decimal;

/// One status update.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// The stream to the peer is open.
    Connected,
    /// Our offer was written.
    OfferSent,
    /// An answer was applied.
    HandshakeCompleted,
    /// The peer reported the distance between our centre and the truth.
    L2Error(f64),
    /// A segment was dropped because it did not parse.
    MalformedMessage(String),
    /// The peer closed the stream.
    StreamClosed,
    /// The stream failed.
    Disconnected(String),
    /// Any other fatal failure.
    Error(String),
}

impl Status {
    /// Returns `true` for statuses that end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Status::StreamClosed | Status::Disconnected(_) | Status::Error(_)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Connected => write!(f, "Connected"),
            Status::OfferSent => write!(f, "Sent sdp offer"),
            Status::HandshakeCompleted => {
                write!(f, "Hand shake completed; connection established")
            }
            Status::L2Error(val) if val.is_finite() => {
                let hundredths = round_decimal(*val, 2);
                let sign = if hundredths < 0 { "-" } else { "" };
                let abs = hundredths.unsigned_abs();
                write!(f, "Reported L2 Error: {sign}{}.{:02}", abs / 100, abs % 100)
            }
            Status::L2Error(val) => write!(f, "Reported L2 Error: {val}"),
            Status::MalformedMessage(reason) => write!(f, "Dropped malformed message: {reason}"),
            Status::StreamClosed => write!(f, "stream closed"),
            Status::Disconnected(reason) => write!(f, "Server disconnected: {reason}"),
            Status::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

// ── StatusSink ────────────────────────────────────────────────────

/// Receives status updates. Must not block.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: Status);
}

impl<S: StatusSink + ?Sized> StatusSink for std::sync::Arc<S> {
    fn publish(&self, status: Status) {
        (**self).publish(status)
    }
}

impl StatusSink for mpsc::UnboundedSender<Status> {
    fn publish(&self, status: Status) {
        let _ = self.send(status);
    }
}

/// Latest-wins status line, like a label on screen.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(String::new());
        Self { tx }
    }

    /// Follow the status line.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    /// The text currently shown.
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusBoard {
    fn publish(&self, status: Status) {
        let text = status.to_string();
        info!(status = %text, "status");
        self.tx.send_replace(text);
    }
}

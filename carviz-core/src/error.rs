//! Domain-specific error types for the carviz protocol.
//!
//! All fallible operations return `Result<T, CarvizError>`.
//! A malformed segment on the wire is not a `CarvizError`: it is a
//! [`SegmentError`] carried as a stream item so the reader keeps going.

use thiserror::Error;

/// The canonical error type for carviz.
#[derive(Debug, Error)]
pub enum CarvizError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A message or transition violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Framing Errors ───────────────────────────────────────────
    /// The buffered segment grew past the codec limit without a marker.
    #[error("segment too large: {size} bytes without a boundary marker (max {max})")]
    SegmentTooLarge { size: usize, max: usize },

    /// An outbound payload contains the boundary marker and would split
    /// into two segments on the receiving side.
    #[error("payload of {kind} message contains the boundary marker")]
    MarkerCollision { kind: &'static str },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Serialization Errors ─────────────────────────────────────
    /// Encoding of a message failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    // ── Media Errors ─────────────────────────────────────────────
    /// The media layer rejected a session description.
    #[error("media error: {0}")]
    Media(String),

    // ── Frame Errors ─────────────────────────────────────────────
    /// A pixel buffer does not match its declared dimensions.
    #[error("invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── SegmentError ──────────────────────────────────────────────────

/// A complete framed segment that did not parse as a known message.
///
/// Only the offending segment is lost; the bytes after it decode
/// normally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed segment ({reason}): {preview}")]
pub struct SegmentError {
    /// Why parsing failed.
    pub reason: String,
    /// The start of the segment text, lossily decoded.
    pub preview: String,
}

impl SegmentError {
    const PREVIEW_LEN: usize = 64;

    pub(crate) fn new(segment: &[u8], reason: impl Into<String>) -> Self {
        let end = segment.len().min(Self::PREVIEW_LEN);
        Self {
            reason: reason.into(),
            preview: String::from_utf8_lossy(&segment[..end]).into_owned(),
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for CarvizError {
    fn from(s: String) -> Self {
        CarvizError::Other(s)
    }
}

impl From<&str> for CarvizError {
    fn from(s: &str) -> Self {
        CarvizError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CarvizError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CarvizError::ChannelClosed
    }
}

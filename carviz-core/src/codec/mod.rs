//! `eol`-delimited JSON framing for `tokio_util`.
//!
//! ```text
//! {"type":"sdp-offer","sdp":"..."}eol{"type":"detected-center","x":1.000,"y":2.000}eol
//! ```
//!
//! The marker is not escaped. Payloads that would contain it are
//! refused by the encoder instead of being split by the receiver.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::{CarvizError, SegmentError};
use crate::message::AppMessage;

/// Boundary marker written after every message.
pub const BOUNDARY_MARKER: &[u8] = b"eol";

/// Largest segment the decoder will buffer while waiting for a marker.
pub const MAX_SEGMENT_SIZE: usize = 1024 * 1024;

/// One decoded segment: a message, or the reason that segment was dropped.
pub type Decoded = Result<AppMessage, SegmentError>;

fn find_marker(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(BOUNDARY_MARKER.len())
        .position(|window| window == BOUNDARY_MARKER)
}

fn parse_segment(segment: &[u8]) -> Decoded {
    let text = std::str::from_utf8(segment)
        .map_err(|e| SegmentError::new(segment, format!("invalid utf-8: {e}")))?;
    AppMessage::from_json(text.as_bytes()).map_err(|e| SegmentError::new(segment, e.to_string()))
}

// ── MessageCodec ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MessageCodec {
    /// Bytes at the front of the buffer already known to hold no marker.
    scanned: usize,
    max_segment: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_max_segment(MAX_SEGMENT_SIZE)
    }

    pub fn with_max_segment(max_segment: usize) -> Self {
        Self {
            scanned: 0,
            max_segment,
        }
    }

    pub fn max_segment(&self) -> usize {
        self.max_segment
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Decoded;
    type Error = CarvizError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let start = self.scanned.min(src.len());
            let Some(offset) = find_marker(&src[start..]) else {
                if src.len() > self.max_segment {
                    return Err(CarvizError::SegmentTooLarge {
                        size: src.len(),
                        max: self.max_segment,
                    });
                }
                // A marker may straddle the next read; rescan its prefix.
                self.scanned = src.len().saturating_sub(BOUNDARY_MARKER.len() - 1);
                return Ok(None);
            };

            let segment = src.split_to(start + offset);
            src.advance(BOUNDARY_MARKER.len());
            self.scanned = 0;

            if segment.is_empty() {
                continue;
            }
            return Ok(Some(parse_segment(&segment)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if !src.is_empty() {
            warn!(
                "discarding {} bytes of incomplete trailing segment at end of stream",
                src.len()
            );
            src.clear();
            self.scanned = 0;
        }
        Ok(None)
    }
}

impl Encoder<AppMessage> for MessageCodec {
    type Error = CarvizError;

    fn encode(&mut self, item: AppMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.to_json()?;
        if find_marker(&payload).is_some() {
            return Err(CarvizError::MarkerCollision {
                kind: item.kind().wire_name(),
            });
        }
        dst.reserve(payload.len() + BOUNDARY_MARKER.len());
        dst.put_slice(&payload);
        dst.put_slice(BOUNDARY_MARKER);
        Ok(())
    }
}

// ── FrameBuffer ───────────────────────────────────────────────────

/// Push-style incremental decoder for callers that receive raw chunks
/// instead of reading from an `AsyncRead`.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
    codec: MessageCodec,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every segment it completed, in order.
    ///
    /// An `Err` means the buffer overflowed; the stream cannot be
    /// resynchronised after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Decoded>, CarvizError> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(item) = self.codec.decode(&mut self.buf)? {
            out.push(item);
        }
        Ok(out)
    }

    /// Bytes held for the incomplete trailing segment.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Encode one message with its trailing marker.
pub fn encode_message(message: AppMessage) -> Result<BytesMut, CarvizError> {
    let mut dst = BytesMut::new();
    MessageCodec::new().encode(message, &mut dst)?;
    Ok(dst)
}

//! # carviz-core
//!
//! Core library for carviz: a viewer tracks a red ball in a remote
//! video feed and reports its centre back to the peer over the same
//! byte stream that carried the offer/answer handshake.
//!
//! This crate contains:
//! - **Messages**: `AppMessage`, the JSON objects exchanged on the stream
//! - **Codec**: `MessageCodec`, `eol`-delimited framing for `tokio_util`
//! - **Network**: `Connection`, a framed stream split into reader and writer
//! - **Vision**: `FrameSampler` and `detect_centroid`
//! - **State**: `SessionState`, the signaling state machine
//! - **Viewer**: `ViewerSession`, running the handshake, telemetry and read loops
//! - **Peer**: `PeerHandler`, answering offers and scoring reports
//! - **Sim**: `BallSimulator`, the bouncing-ball video source
//! - **Media**: traits at the media-engine seam plus loopback stand-ins
//! - **Error**: `CarvizError`, a typed `thiserror`-based error hierarchy

pub mod codec;
pub mod error;
pub mod media;
pub mod message;
pub mod network;
pub mod peer;
pub mod sim;
pub mod state;
pub mod status;
pub mod viewer;
pub mod vision;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{BOUNDARY_MARKER, Decoded, FrameBuffer, MAX_SEGMENT_SIZE, MessageCodec};
pub use error::{CarvizError, SegmentError};
pub use media::{LoopbackMedia, LoopbackResponder, MediaEvent, MediaResponder, MediaSession};
pub use message::{AppMessage, Fixed3, MessageKind};
pub use network::{Connection, ConnectionInfo, MessageReader, MessageWriter};
pub use peer::{PeerHandler, PeerStats};
pub use sim::{Ball, BallSimulator, SimConfig, SimFrame, SimulatorSurface};
pub use state::{AnswerOutcome, AnswerPolicy, SessionState};
pub use status::{Status, StatusBoard, StatusSink};
pub use viewer::{
    IntervalRefresh, RefreshSignal, SessionReport, SignalingSession, TelemetryLoop,
    TelemetryStats, ViewerSession,
};
pub use vision::{Centroid, DisplaySurface, FrameSampler, PixelFrame, detect_centroid};

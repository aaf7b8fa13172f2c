//! Peer side: the process that streams the video and scores reports.

pub mod handler;

pub use handler::{PeerHandler, PeerStats};

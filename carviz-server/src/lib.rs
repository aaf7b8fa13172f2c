//! # carviz-server - Ball Stream Server
//!
//! Accepts viewers over TCP. For each one it answers the SDP offer,
//! runs a bouncing-ball simulation as the remote video, and replies to
//! every reported centre with its L2 distance from the true ball
//! centre.

pub mod config;
pub mod service;

//! # carviz-viewer - Ball Tracking Viewer
//!
//! Connects to `carviz-server`, negotiates the video session, then on
//! every display refresh samples the shown frame, finds the red ball's
//! centre and reports it. The server answers each report with the
//! tracking error, which is shown on the status line.

pub mod config;
pub mod connection;
pub mod mirror;

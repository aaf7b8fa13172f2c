//! Viewer side of a session.
//!
//! | Module      | Purpose                                                |
//! |-------------|--------------------------------------------------------|
//! | `signaling` | Offer/answer exchange and the published session state  |
//! | `telemetry` | Refresh-driven sampling and `detected-center` writes    |
//! | `reader`    | Inbound decode and dispatch                            |
//! | `session`   | Runs the read and telemetry loops over one stream      |

pub mod reader;
pub mod session;
pub mod signaling;
pub mod telemetry;

pub use reader::run_reader;
pub use session::{SessionReport, ViewerSession};
pub use signaling::SignalingSession;
pub use telemetry::{IntervalRefresh, RefreshSignal, TelemetryLoop, TelemetryStats};

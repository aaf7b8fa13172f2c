//! Simulated remote video: a ball bouncing under gravity.
//!
//! | Module      | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `ball`      | Physics step and rendering                       |
//! | `simulator` | Paced render task publishing the latest frame    |
//! | `surface`   | [`DisplaySurface`](crate::vision::DisplaySurface) over the simulator |

pub mod ball;
pub mod simulator;
pub mod surface;

pub use ball::{BALL_COLOR, Ball};
pub use simulator::{BallSimulator, SimConfig, SimFrame};
pub use surface::SimulatorSurface;

/// Euclidean distance between a reported point and the true centre.
///
/// With no true centre (simulator stopped) the error is `0.0`.
pub fn l2_error(actual: Option<(i32, i32)>, x: f64, y: f64) -> f64 {
    match actual {
        Some((ax, ay)) => (f64::from(ax) - x).hypot(f64::from(ay) - y),
        None => 0.0,
    }
}

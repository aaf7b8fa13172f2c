//! Local stand-in for the rendered remote video.
//!
//! The loopback media layer carries no pixels, so the viewer runs its
//! own copy of the server's simulation and samples that. It starts
//! when the media layer reports playback and stops when the video ends
//! or the media layer goes away.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use carviz_core::{BallSimulator, MediaEvent, SimConfig, SimulatorSurface};

/// Create the mirrored simulation and the surface that shows it.
///
/// The returned task owns the simulator; aborting it stops the video.
pub fn spawn_mirror(
    config: SimConfig,
    mut events: watch::Receiver<MediaEvent>,
) -> (SimulatorSurface, JoinHandle<()>) {
    let mut sim = BallSimulator::new(config);
    let surface = SimulatorSurface::new(&sim);

    let task = tokio::spawn(async move {
        let playing = events
            .wait_for(|e| *e == MediaEvent::VideoPlaying)
            .await
            .is_ok();
        if !playing {
            return;
        }
        debug!("mirroring remote video");
        sim.start();
        let _ = events.wait_for(|e| *e == MediaEvent::VideoEnded).await;
        sim.stop();
    });
    (surface, task)
}

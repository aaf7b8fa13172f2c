use tokio::sync::watch;

use crate::sim::simulator::{BallSimulator, SimFrame};
use crate::vision::{DisplaySurface, PixelFrame};

/// Shows whatever the simulator published last, scaled to the target.
#[derive(Debug, Clone)]
pub struct SimulatorSurface {
    frames: watch::Receiver<Option<SimFrame>>,
}

impl SimulatorSurface {
    pub fn new(sim: &BallSimulator) -> Self {
        Self {
            frames: sim.subscribe(),
        }
    }
}

impl DisplaySurface for SimulatorSurface {
    fn draw_into(&self, target: &mut PixelFrame) -> bool {
        match self.frames.borrow().as_ref() {
            Some(latest) => {
                latest.frame.scale_into(target);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimConfig;
    use crate::vision::{FrameSampler, detect_centroid};

    #[tokio::test]
    async fn stopped_simulator_shows_nothing() {
        let sim = BallSimulator::new(SimConfig::default());
        let surface = SimulatorSurface::new(&sim);
        let mut sampler = FrameSampler::new(64, 48);
        assert!(sampler.sample(&surface).is_none());
    }

    #[tokio::test]
    async fn scaled_sample_tracks_ball() {
        let mut sim = BallSimulator::new(SimConfig::default());
        sim.start();
        let surface = SimulatorSurface::new(&sim);

        let mut sampler = FrameSampler::new(320, 240);
        let frame = sampler.sample(&surface).unwrap();
        let c = detect_centroid(frame).unwrap();
        // half-size sample of a ball centred at (320, 240)
        assert!((c.x - 160.0).abs() < 1.0);
        assert!((c.y - 120.0).abs() < 1.0);
        sim.stop();
    }
}

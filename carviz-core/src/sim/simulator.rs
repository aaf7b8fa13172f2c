//! Paced bouncing-ball video source.
//!
//! The simulator runs in a Tokio task and publishes each rendered frame
//! through a `watch` channel, so slow readers only ever see the newest
//! frame. It stops via its `running` flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::sim::ball::Ball;
use crate::vision::PixelFrame;

// ── SimConfig ────────────────────────────────────────────────────

/// Configuration for [`BallSimulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Target frames per second (1..=240).
    pub fps: u32,
    /// Downward acceleration in px/s².
    pub gravity: f64,
    /// Initial velocity in px/s.
    pub velocity: [f64; 2],
    pub radius: f64,
    /// Fraction of speed kept on each wall bounce.
    pub restitution: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 60,
            gravity: 980.0,
            velocity: [1000.0, 1000.0],
            radius: 12.0,
            restitution: 0.98,
        }
    }
}

impl SimConfig {
    /// Time between two frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.clamp(1, 240)))
    }

    fn ball(&self) -> Ball {
        Ball::new(
            self.radius,
            self.width,
            self.height,
            self.gravity,
            self.velocity,
        )
    }
}

// ── SimFrame ─────────────────────────────────────────────────────

/// One published frame and the ball centre drawn in it.
#[derive(Debug, Clone)]
pub struct SimFrame {
    pub frame: Arc<PixelFrame>,
    pub center: (i32, i32),
    pub number: u64,
}

// ── BallSimulator ────────────────────────────────────────────────

/// Renders a bouncing ball at a fixed rate.
///
/// # Lifetime
///
/// [`start`](Self::start) spawns the render task (restarting it if it
/// was already running) and publishes the first frame before returning.
/// [`stop`](Self::stop) ends the task and clears the published frame.
/// Dropping the simulator stops it.
#[derive(Debug)]
pub struct BallSimulator {
    config: SimConfig,
    running: Arc<AtomicBool>,
    frames: Arc<watch::Sender<Option<SimFrame>>>,
    task: Option<JoinHandle<()>>,
}

impl BallSimulator {
    pub fn new(config: SimConfig) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(frames),
            task: None,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Start rendering from a fresh ball. Must be called inside a Tokio
    /// runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("restarting simulator");
            self.stop();
        }

        let mut ball = self.config.ball();
        let (width, height) = (self.config.width, self.config.height);
        let interval = self.config.frame_interval();
        let restitution = self.config.restitution;

        let mut frame = PixelFrame::new(width, height);
        let center = ball.draw(&mut frame);
        self.frames.send_replace(Some(SimFrame {
            frame: Arc::new(frame),
            center,
            number: 0,
        }));

        let running = Arc::new(AtomicBool::new(true));
        self.running = Arc::clone(&running);
        let frames = Arc::clone(&self.frames);

        self.task = Some(tokio::spawn(async move {
            let mut number: u64 = 0;
            let mut last = Instant::now();
            Self::pace(last, interval).await;

            while running.load(Ordering::SeqCst) {
                let loop_start = Instant::now();
                let dt = interval.min(loop_start - last).as_secs_f64();
                last = loop_start;

                ball.update(dt, restitution);
                let mut frame = PixelFrame::new(width, height);
                let center = ball.draw(&mut frame);
                number += 1;

                // A stop may have cleared the channel while we rendered.
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                frames.send_replace(Some(SimFrame {
                    frame: Arc::new(frame),
                    center,
                    number,
                }));

                Self::pace(loop_start, interval).await;
            }
        }));
        info!(
            "simulator started ({}x{} @ {} fps)",
            width, height, self.config.fps
        );
    }

    /// Stop rendering. No-op when not running.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.frames.send_replace(None);
        if was_running {
            info!("simulator stopped");
        }
    }

    /// Whether the render task is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Follow published frames; `None` while stopped.
    pub fn subscribe(&self) -> watch::Receiver<Option<SimFrame>> {
        self.frames.subscribe()
    }

    /// Centre of the ball in the newest frame.
    pub fn current_center(&self) -> Option<(i32, i32)> {
        self.frames.borrow().as_ref().map(|f| f.center)
    }

    /// Sleep for the remainder of the frame interval.
    async fn pace(loop_start: Instant, interval: Duration) {
        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}

impl Drop for BallSimulator {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_frame_is_published_on_start() {
        let mut sim = BallSimulator::new(SimConfig::default());
        assert!(!sim.is_running());
        assert_eq!(sim.current_center(), None);

        sim.start();
        assert!(sim.is_running());
        assert_eq!(sim.current_center(), Some((320, 240)));

        let rx = sim.subscribe();
        let published = rx.borrow().clone().unwrap();
        assert_eq!(published.number, 0);
        assert_eq!((published.frame.width(), published.frame.height()), (640, 480));
        sim.stop();
    }

    #[tokio::test]
    async fn ball_moves_while_running() {
        let mut sim = BallSimulator::new(SimConfig {
            fps: 200,
            ..SimConfig::default()
        });
        sim.start();
        let mut rx = sim.subscribe();
        rx.wait_for(|f| f.as_ref().is_some_and(|f| f.number >= 3))
            .await
            .unwrap();
        assert_ne!(sim.current_center(), Some((320, 240)));
        sim.stop();
    }

    #[tokio::test]
    async fn stop_clears_frame() {
        let mut sim = BallSimulator::new(SimConfig::default());
        sim.start();
        sim.stop();
        assert!(!sim.is_running());
        assert_eq!(sim.current_center(), None);
        // stopping twice is harmless
        sim.stop();
    }

    #[tokio::test]
    async fn restart_resets_ball() {
        let mut sim = BallSimulator::new(SimConfig {
            fps: 200,
            ..SimConfig::default()
        });
        sim.start();
        let mut rx = sim.subscribe();
        rx.wait_for(|f| f.as_ref().is_some_and(|f| f.number >= 2))
            .await
            .unwrap();

        sim.start();
        assert!(sim.is_running());
        assert_eq!(sim.current_center(), Some((320, 240)));
        sim.stop();
    }

    #[test]
    fn frame_interval_clamps_fps() {
        let cfg = SimConfig {
            fps: 0,
            ..SimConfig::default()
        };
        assert_eq!(cfg.frame_interval(), Duration::from_secs(1));
        assert_eq!(
            SimConfig::default().frame_interval(),
            Duration::from_secs_f64(1.0 / 60.0)
        );
    }
}

//! Per-refresh sampling loop that reports the detected centre.
//!
//! Each refresh tick samples the display surface once, runs the
//! centroid detector, and writes a `detected-center` message when a
//! centroid exists. Ticks without a centroid write nothing.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::error::CarvizError;
use crate::media::MediaEvent;
use crate::message::AppMessage;
use crate::network::MessageWriter;
use crate::vision::{DisplaySurface, FrameSampler, detect_centroid};

// ── RefreshSignal ─────────────────────────────────────────────────

/// Source of display-refresh ticks.
#[async_trait]
pub trait RefreshSignal: Send {
    /// Wait for the next refresh. `None` ends the loop.
    async fn next_refresh(&mut self) -> Option<Instant>;
}

/// Fixed-rate refresh driven by a Tokio interval.
///
/// A late tick delays the schedule instead of bursting to catch up,
/// so the loop never runs more than once per period.
#[derive(Debug)]
pub struct IntervalRefresh {
    interval: tokio::time::Interval,
}

impl IntervalRefresh {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Refresh at `hz` ticks per second (clamped to 1..=240).
    pub fn from_hz(hz: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / f64::from(hz.clamp(1, 240))))
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl RefreshSignal for IntervalRefresh {
    async fn next_refresh(&mut self) -> Option<Instant> {
        Some(self.interval.tick().await.into_std())
    }
}

/// Externally driven refresh: one tick per received `()`.
#[async_trait]
impl RefreshSignal for mpsc::Receiver<()> {
    async fn next_refresh(&mut self) -> Option<Instant> {
        self.recv().await.map(|()| Instant::now())
    }
}

// ── TelemetryStats ────────────────────────────────────────────────

/// Counters kept by [`TelemetryLoop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    /// Refresh ticks handled.
    pub ticks: u64,
    /// Ticks where the surface had nothing to show.
    pub empty_surface: u64,
    /// Ticks where no pixel qualified.
    pub no_centroid: u64,
    /// `detected-center` messages written.
    pub sent: u64,
}

// ── TelemetryLoop ─────────────────────────────────────────────────

pub struct TelemetryLoop<S, R> {
    surface: S,
    refresh: R,
    sampler: FrameSampler,
    stats: TelemetryStats,
}

impl<S, R> TelemetryLoop<S, R>
where
    S: DisplaySurface,
    R: RefreshSignal,
{
    /// Sample `surface` at `width × height` on every tick of `refresh`.
    pub fn new(surface: S, refresh: R, width: u32, height: u32) -> Self {
        Self {
            surface,
            refresh,
            sampler: FrameSampler::new(width, height),
            stats: TelemetryStats::default(),
        }
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats
    }

    /// Wait until video plays, then report once per refresh.
    ///
    /// Returns when the refresh source ends, the video ends, or the
    /// media layer goes away. A write failure is returned as an error.
    pub async fn run<W>(
        &mut self,
        mut media: watch::Receiver<MediaEvent>,
        writer: &mut MessageWriter<W>,
    ) -> Result<TelemetryStats, CarvizError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match media.wait_for(|event| *event != MediaEvent::Pending).await {
            Ok(event) if *event == MediaEvent::VideoPlaying => {}
            Ok(_) => {
                debug!("video ended before it started");
                return Ok(self.stats);
            }
            Err(_) => {
                debug!("media layer dropped before video started");
                return Ok(self.stats);
            }
        }
        info!(
            "video playing; sampling at {}x{}",
            self.sampler.width(),
            self.sampler.height()
        );

        while self.refresh.next_refresh().await.is_some() {
            if *media.borrow() == MediaEvent::VideoEnded {
                info!("video ended; telemetry stopped");
                break;
            }
            self.tick(writer).await?;
        }
        Ok(self.stats)
    }

    async fn tick<W>(&mut self, writer: &mut MessageWriter<W>) -> Result<(), CarvizError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.stats.ticks += 1;
        let Some(frame) = self.sampler.sample(&self.surface) else {
            self.stats.empty_surface += 1;
            return Ok(());
        };
        let Some(centroid) = detect_centroid(frame) else {
            self.stats.no_centroid += 1;
            return Ok(());
        };

        let message = AppMessage::detected_center(centroid);
        trace!(?message, "sending");
        writer.send(message).await?;
        self.stats.sent += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessageCodec;
    use crate::message::Fixed3;
    use crate::vision::PixelFrame;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[derive(Clone)]
    struct SharedImage(Arc<Mutex<Option<PixelFrame>>>);

    impl SharedImage {
        fn new(img: Option<PixelFrame>) -> Self {
            Self(Arc::new(Mutex::new(img)))
        }

        fn set(&self, img: Option<PixelFrame>) {
            *self.0.lock().unwrap() = img;
        }
    }

    impl DisplaySurface for SharedImage {
        fn draw_into(&self, target: &mut PixelFrame) -> bool {
            match self.0.lock().unwrap().as_ref() {
                Some(img) => {
                    img.scale_into(target);
                    true
                }
                None => false,
            }
        }
    }

    fn red_dot(x: u32, y: u32) -> PixelFrame {
        let mut img = PixelFrame::new(4, 4);
        img.put_pixel(x, y, [200, 0, 0, 255]);
        img
    }

    #[tokio::test]
    async fn one_message_per_tick_with_centroid() {
        let surface = SharedImage::new(Some(red_dot(1, 2)));
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (media_tx, media_rx) = watch::channel(MediaEvent::VideoPlaying);

        let (ours, theirs) = tokio::io::duplex(4096);
        let mut writer = FramedWrite::new(ours, MessageCodec::new());
        let mut peer = FramedRead::new(theirs, MessageCodec::new());

        let mut telemetry = TelemetryLoop::new(surface.clone(), tick_rx, 4, 4);
        let handle = tokio::spawn(async move {
            let stats = telemetry.run(media_rx, &mut writer).await;
            drop(media_tx);
            stats
        });

        tick_tx.send(()).await.unwrap();
        let msg = peer.next().await.unwrap().unwrap().unwrap();
        assert_eq!(
            msg,
            AppMessage::DetectedCenter {
                x: Fixed3::from_thousandths(1000),
                y: Fixed3::from_thousandths(2000),
            }
        );

        tick_tx.send(()).await.unwrap();
        assert!(peer.next().await.unwrap().unwrap().is_ok());

        drop(tick_tx);
        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.sent, 2);
    }

    #[tokio::test]
    async fn absent_centroid_writes_nothing() {
        let surface = SharedImage::new(Some(PixelFrame::new(4, 4)));
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (_media_tx, media_rx) = watch::channel(MediaEvent::VideoPlaying);

        let (ours, mut theirs) = tokio::io::duplex(4096);
        let mut writer = FramedWrite::new(ours, MessageCodec::new());
        let mut telemetry = TelemetryLoop::new(surface.clone(), tick_rx, 4, 4);

        for _ in 0..3 {
            tick_tx.send(()).await.unwrap();
        }
        surface.set(None);
        tick_tx.send(()).await.unwrap();
        drop(tick_tx);

        let stats = telemetry.run(media_rx, &mut writer).await.unwrap();
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.empty_surface + stats.no_centroid, 4);

        drop(writer);
        let mut written = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut theirs, &mut written)
            .await
            .unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn waits_for_video_before_sampling() {
        let surface = SharedImage::new(Some(red_dot(0, 0)));
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (media_tx, media_rx) = watch::channel(MediaEvent::Pending);

        let (ours, _theirs) = tokio::io::duplex(4096);
        let mut writer = FramedWrite::new(ours, MessageCodec::new());
        let mut telemetry = TelemetryLoop::new(surface, tick_rx, 4, 4);

        tick_tx.send(()).await.unwrap();
        drop(tick_tx);
        // media never starts; the loop returns without a tick
        drop(media_tx);
        let stats = telemetry.run(media_rx, &mut writer).await.unwrap();
        assert_eq!(stats.ticks, 0);
    }

    #[tokio::test]
    async fn video_end_stops_loop() {
        let surface = SharedImage::new(Some(red_dot(0, 0)));
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let (media_tx, media_rx) = watch::channel(MediaEvent::VideoPlaying);

        let (ours, _theirs) = tokio::io::duplex(4096);
        let mut writer = FramedWrite::new(ours, MessageCodec::new());
        let mut telemetry = TelemetryLoop::new(surface, tick_rx, 4, 4);

        media_tx.send_replace(MediaEvent::VideoEnded);
        tick_tx.send(()).await.unwrap();
        let stats = telemetry.run(media_rx, &mut writer).await.unwrap();
        assert_eq!(stats.ticks, 0);
    }

    #[tokio::test]
    async fn interval_refresh_period() {
        let refresh = IntervalRefresh::from_hz(50);
        assert_eq!(refresh.period(), Duration::from_millis(20));
        let mut refresh = IntervalRefresh::new(Duration::from_millis(1));
        assert!(refresh.next_refresh().await.is_some());
    }
}

//! Deterministic in-process playback engine
//!
//! Drives the full notification surface (readiness, loaded ranges, time
//! control, end-of-item) from a timer loop instead of a device decoder.
//! Used by the CLI demo and by integration tests that need a live engine
//! without platform media plumbing.

use super::{EngineFactory, EngineSignal, EngineSink, EngineStatus, PlaybackEngine};
use crate::source::MediaMetadata;
use crate::types::{BufferedRange, TimeControlStatus, VideoSize};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

const DRIVE_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct SimState {
    position: f64,
    duration: f64,
    buffered_end: f64,
    rate: f64,
    volume: f64,
    playing: bool,
    ready: bool,
    ended_reported: bool,
}

/// Simulated playback engine for one item
///
/// Buffering fills at `buffer_rate` seconds of media per second of wall
/// time; readiness is reported once `preroll` seconds are buffered.
pub struct SimulatedEngine {
    state: Arc<Mutex<SimState>>,
    driver: JoinHandle<()>,
}

impl SimulatedEngine {
    pub fn new(duration: f64, preroll: f64, buffer_rate: f64, video_size: VideoSize, sink: EngineSink) -> Self {
        let state = Arc::new(Mutex::new(SimState {
            position: 0.0,
            duration,
            buffered_end: 0.0,
            rate: 1.0,
            volume: 1.0,
            playing: false,
            ready: false,
            ended_reported: false,
        }));

        let driver = tokio::spawn(Self::drive(state.clone(), preroll, buffer_rate, video_size, sink));

        Self { state, driver }
    }

    async fn drive(
        state: Arc<Mutex<SimState>>,
        preroll: f64,
        buffer_rate: f64,
        video_size: VideoSize,
        sink: EngineSink,
    ) {
        let dt = DRIVE_PERIOD.as_secs_f64();

        // Duration and dimensions arrive independently and in no fixed
        // order relative to readiness.
        let duration = state.lock().expect("sim state").duration;
        if !sink.send(EngineSignal::DurationKnown(duration)) {
            return;
        }
        sink.send(EngineSignal::PresentationSize(video_size));

        let mut interval = tokio::time::interval(DRIVE_PERIOD);
        interval.tick().await;

        loop {
            interval.tick().await;

            let mut signals = Vec::new();
            {
                let mut s = state.lock().expect("sim state");

                // Fill the buffer ahead of the play head
                if s.buffered_end < s.duration {
                    s.buffered_end = (s.buffered_end + buffer_rate * dt).min(s.duration);
                    signals.push(EngineSignal::LoadedRangesChanged(vec![BufferedRange::new(
                        0.0,
                        s.buffered_end,
                    )]));
                }

                if !s.ready && s.buffered_end >= preroll.min(s.duration) {
                    s.ready = true;
                    signals.push(EngineSignal::StatusChanged(EngineStatus::ReadyToPlay));
                }

                if s.playing && s.ready {
                    s.position = (s.position + s.rate * dt).min(s.buffered_end);

                    if s.position >= s.duration && !s.ended_reported {
                        s.position = s.duration;
                        s.playing = false;
                        s.ended_reported = true;
                        signals.push(EngineSignal::TimeControl(TimeControlStatus::Paused));
                        signals.push(EngineSignal::DidReachEnd);
                    }
                }
            }

            for signal in signals {
                if !sink.send(signal) {
                    debug!("Simulated engine detached, stopping driver");
                    return;
                }
            }
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.lock().expect("sim state"))
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl PlaybackEngine for SimulatedEngine {
    async fn play(&self) {
        self.with_state(|s| {
            s.playing = true;
            s.ended_reported = false;
        });
    }

    async fn pause(&self) {
        self.with_state(|s| s.playing = false);
    }

    async fn seek(&self, seconds: f64) {
        self.with_state(|s| {
            s.position = seconds.max(0.0).min(s.duration);
            s.ended_reported = false;
        });
    }

    async fn set_rate(&self, rate: f64) {
        self.with_state(|s| s.rate = rate);
    }

    async fn set_volume(&self, volume: f64) {
        self.with_state(|s| s.volume = volume);
    }

    async fn is_playing(&self) -> bool {
        self.with_state(|s| s.playing && s.rate > 0.0)
    }

    async fn current_time(&self) -> f64 {
        self.with_state(|s| s.position)
    }

    async fn duration(&self) -> Option<f64> {
        Some(self.with_state(|s| s.duration))
    }

    async fn time_control_status(&self) -> TimeControlStatus {
        self.with_state(|s| {
            if !s.playing {
                TimeControlStatus::Paused
            } else if s.position >= s.buffered_end && s.buffered_end < s.duration {
                TimeControlStatus::WaitingToPlay
            } else {
                TimeControlStatus::Playing
            }
        })
    }
}

/// Factory producing [`SimulatedEngine`] items
#[derive(Debug, Clone)]
pub struct SimulatedEngineFactory {
    /// Seconds of media buffered before readiness is reported
    pub preroll: f64,
    /// Seconds of media buffered per second of wall time
    pub buffer_rate: f64,
    /// Presentation size reported for every item
    pub video_size: VideoSize,
    /// Fallback duration when the resolver reports none
    pub fallback_duration: f64,
}

impl Default for SimulatedEngineFactory {
    fn default() -> Self {
        Self {
            preroll: 2.0,
            buffer_rate: 8.0,
            video_size: VideoSize::new(1920.0, 1080.0),
            fallback_duration: 30.0,
        }
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn create(&self, url: &Url, metadata: &MediaMetadata, sink: EngineSink) -> Box<dyn PlaybackEngine> {
        let duration = metadata.duration_secs.unwrap_or(self.fallback_duration);
        debug!(url = %url, duration, "Creating simulated engine");
        Box::new(SimulatedEngine::new(
            duration,
            self.preroll,
            self.buffer_rate,
            metadata.video_size.unwrap_or(self.video_size),
            sink,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSignal;
    use tokio::sync::mpsc;

    fn test_sink() -> (EngineSink, mpsc::UnboundedReceiver<SessionSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EngineSink::new(1, tx), rx)
    }

    #[tokio::test]
    async fn test_reports_ready_after_preroll() {
        let (sink, mut rx) = test_sink();
        let engine = SimulatedEngine::new(10.0, 1.0, 20.0, VideoSize::new(640.0, 360.0), sink);

        let mut saw_ready = false;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(SessionSignal::Engine { signal, .. })) => {
                    if signal == EngineSignal::StatusChanged(EngineStatus::ReadyToPlay) {
                        saw_ready = true;
                        break;
                    }
                }
                _ => break,
            }
        }
        assert!(saw_ready);
        drop(engine);
    }

    #[tokio::test]
    async fn test_seek_floors_at_zero_and_clamps_at_duration() {
        let (sink, _rx) = test_sink();
        let engine = SimulatedEngine::new(10.0, 1.0, 20.0, VideoSize::new(640.0, 360.0), sink);

        engine.seek(-5.0).await;
        assert_eq!(engine.current_time().await, 0.0);

        engine.seek(99.0).await;
        assert_eq!(engine.current_time().await, 10.0);
    }

    #[tokio::test]
    async fn test_is_playing_tracks_rate() {
        let (sink, _rx) = test_sink();
        let engine = SimulatedEngine::new(10.0, 1.0, 20.0, VideoSize::new(640.0, 360.0), sink);

        assert!(!engine.is_playing().await);
        engine.play().await;
        assert!(engine.is_playing().await);
        engine.set_rate(0.0).await;
        assert!(!engine.is_playing().await);
    }
}

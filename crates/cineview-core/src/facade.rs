//! Complete player - derived-state facade over a session
//!
//! Composition, not inheritance: the facade subscribes to the base
//! session's event stream and layers derived values and convenience
//! commands on top. Duration, dimensions and time-control status each
//! arrive independently; no ordering between them is assumed.

use crate::{
    events::PlayerEvent,
    session::PlayerSession,
    types::{PlaybackState, PlayerConfig, TimeControlStatus, VideoSize},
};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
struct DerivedState {
    duration: RwLock<Option<f64>>,
    video_size: RwLock<Option<VideoSize>>,
    time_control: RwLock<TimeControlStatus>,
}

/// Player facade with derived playback observations
///
/// Exposes the fixed skip-back/skip-forward controls, seek-by-fraction,
/// and an `is_playing_now` signal based on the engine's three-way
/// time-control status rather than the raw rate boolean.
pub struct CompletePlayer {
    session: Arc<PlayerSession>,
    derived: Arc<DerivedState>,
    observer: StdMutex<Option<JoinHandle<()>>>,
}

impl CompletePlayer {
    /// Wrap a session and start observing its event stream
    pub fn new(session: Arc<PlayerSession>) -> Self {
        let derived = Arc::new(DerivedState {
            duration: RwLock::new(None),
            video_size: RwLock::new(None),
            time_control: RwLock::new(TimeControlStatus::Paused),
        });

        let mut events = session.subscribe_events();
        let cache = derived.clone();
        let observer = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => Self::observe(&cache, event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "Facade observer lagged behind event stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self {
            session,
            derived,
            observer: StdMutex::new(Some(observer)),
        }
    }

    async fn observe(cache: &DerivedState, event: PlayerEvent) {
        match event {
            PlayerEvent::DurationKnown { seconds } => {
                *cache.duration.write().await = Some(seconds);
            }
            PlayerEvent::VideoDimensionsKnown { width, height } => {
                *cache.video_size.write().await = Some(VideoSize::new(width, height));
            }
            PlayerEvent::PlaybackStatusChanged { status } => {
                *cache.time_control.write().await = status;
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Commands (pass-through plus convenience seeks)
    // ------------------------------------------------------------------

    pub async fn setup(&self, config: PlayerConfig) {
        self.session.setup(config).await;
    }

    pub async fn play(&self) {
        self.session.play().await;
    }

    pub async fn pause(&self) {
        self.session.pause().await;
    }

    /// Skip backward by the configured step (10 s by default)
    pub async fn skip_back(&self) {
        let amount = self.session.skip_amount().await;
        self.session.skip(-amount).await;
    }

    /// Skip forward by the configured step (10 s by default); a no-op
    /// when the result would reach or pass the end of the item
    pub async fn skip_forward(&self) {
        let amount = self.session.skip_amount().await;
        self.session.skip(amount).await;
    }

    /// Seek to a fraction of the total duration, e.g. from a scrub bar
    pub async fn seek_to_fraction(&self, fraction: f64) {
        self.session.seek_to_fraction(fraction).await;
    }

    pub async fn clean_up(&self) {
        self.session.clean_up().await;
    }

    // ------------------------------------------------------------------
    // Derived observations
    // ------------------------------------------------------------------

    /// UI-facing playing signal, derived from time-control status
    ///
    /// Intentionally differs from [`CompletePlayer::is_playing`]: an engine
    /// stalled waiting for data still reads as visually playing.
    pub async fn is_playing_now(&self) -> bool {
        matches!(
            *self.derived.time_control.read().await,
            TimeControlStatus::Playing | TimeControlStatus::WaitingToPlay
        )
    }

    /// Raw `rate > 0` playing query from the engine
    pub async fn is_playing(&self) -> bool {
        self.session.is_playing().await
    }

    /// Total duration in seconds, once observed
    pub async fn duration(&self) -> Option<f64> {
        *self.derived.duration.read().await
    }

    /// Presentation size, once observed
    pub async fn video_size(&self) -> Option<VideoSize> {
        *self.derived.video_size.read().await
    }

    /// Width over height, once dimensions are known
    pub async fn video_aspect_ratio(&self) -> Option<f64> {
        self.derived.video_size.read().await.and_then(|s| s.aspect_ratio())
    }

    pub async fn state(&self) -> PlaybackState {
        self.session.state().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.session.subscribe_events()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.session.subscribe_state()
    }

    /// The underlying session, for consumers needing base commands
    pub fn session(&self) -> &Arc<PlayerSession> {
        &self.session
    }
}

impl Drop for CompletePlayer {
    fn drop(&mut self) {
        if let Ok(mut observer) = self.observer.lock() {
            if let Some(handle) = observer.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    async fn cache_with(events: Vec<PlayerEvent>) -> DerivedState {
        let cache = DerivedState {
            duration: RwLock::new(None),
            video_size: RwLock::new(None),
            time_control: RwLock::new(TimeControlStatus::Paused),
        };
        for event in events {
            CompletePlayer::observe(&cache, event).await;
        }
        cache
    }

    #[tokio::test]
    async fn test_duration_and_dimensions_cached_in_any_order() {
        let cache = cache_with(vec![
            PlayerEvent::VideoDimensionsKnown {
                width: 1280.0,
                height: 720.0,
            },
            PlayerEvent::DurationKnown { seconds: 42.0 },
        ])
        .await;

        assert_eq!(*cache.duration.read().await, Some(42.0));
        assert_eq!(
            *cache.video_size.read().await,
            Some(VideoSize::new(1280.0, 720.0))
        );
    }

    #[tokio::test]
    async fn test_time_control_cache_tracks_latest() {
        let cache = cache_with(vec![
            PlayerEvent::PlaybackStatusChanged {
                status: TimeControlStatus::Playing,
            },
            PlayerEvent::PlaybackStatusChanged {
                status: TimeControlStatus::WaitingToPlay,
            },
        ])
        .await;

        assert_eq!(*cache.time_control.read().await, TimeControlStatus::WaitingToPlay);
    }

    #[tokio::test]
    async fn test_unrelated_events_do_not_touch_cache() {
        let cache = cache_with(vec![
            PlayerEvent::ProgressUpdated { fraction: 0.5 },
            PlayerEvent::Failed {
                error: Error::PlaybackInterrupted,
            },
        ])
        .await;

        assert_eq!(*cache.duration.read().await, None);
        assert_eq!(*cache.video_size.read().await, None);
    }
}

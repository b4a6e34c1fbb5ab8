//! Playback session - the central state machine
//!
//! Owns the URL-to-engine binding for exactly one configuration:
//! validates commands against the current state, executes them through the
//! engine adapter, and translates the engine's order-sensitive lifecycle
//! notifications into the public [`PlayerEvent`] contract.
//!
//! All state mutation triggered by asynchronous sources (resolver
//! completion, engine signals, ticker) is serialized through one signal
//! pump task; resolution is the only cross-task hand-off and it lands here
//! exactly once. Stale callbacks from a torn-down item are dropped at the
//! pump by a session-token check, so `clean_up` can be called in any state.

use crate::{
    buffered::buffered_fraction,
    engine::{EngineFactory, EngineSignal, EngineSink, EngineStatus, PlaybackEngine},
    error::Error,
    events::PlayerEvent,
    source::{MediaResolver, ResolveOutcome},
    ticker::ProgressTicker,
    types::{PlaybackState, PlayerConfig, ProgressSample, SessionId, VideoSize},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Internal signals multiplexed onto the session's pump task
#[derive(Debug)]
pub enum SessionSignal {
    /// Resolver finished; fires exactly once per setup
    Resolved { token: u64, outcome: ResolveOutcome },
    /// Low-level engine notification
    Engine { token: u64, signal: EngineSignal },
    /// Periodic progress sample is due
    Tick { token: u64 },
}

/// Playback session managing a single URL-to-engine binding
///
/// Created once per configuration and torn down exactly once; there is no
/// in-place URL swap. The presentation layer holds this behind an `Arc`
/// and is a non-owning consumer of the event stream.
pub struct PlayerSession {
    /// Unique session ID
    id: SessionId,
    /// Media source resolver
    resolver: Arc<dyn MediaResolver>,
    /// Engine factory, used once per session
    factory: Arc<dyn EngineFactory>,
    /// Active configuration, set on setup
    config: RwLock<Option<PlayerConfig>>,
    /// Current playback state
    state: RwLock<PlaybackState>,
    /// State change broadcaster
    state_tx: watch::Sender<PlaybackState>,
    /// Public event stream
    event_tx: broadcast::Sender<PlayerEvent>,
    /// Engine adapter; at most one instance per session
    engine: RwLock<Option<Box<dyn PlaybackEngine>>>,
    /// Ingress for resolver/engine/ticker signals
    signal_tx: mpsc::UnboundedSender<SessionSignal>,
    /// Signal pump task
    pump: StdMutex<Option<JoinHandle<()>>>,
    /// Periodic progress sampler
    ticker: StdMutex<ProgressTicker>,
    /// Generation counter; bumping it turns in-flight callbacks into no-ops
    token: AtomicU64,
    /// Guards against configuring the same session twice
    configured: AtomicBool,
    /// Total duration in seconds, once known
    duration: RwLock<Option<f64>>,
    /// Presentation size, once known
    video_size: RwLock<Option<VideoSize>>,
}

impl PlayerSession {
    /// Create an idle session around a resolver and an engine factory
    pub fn new(resolver: Arc<dyn MediaResolver>, factory: Arc<dyn EngineFactory>) -> Arc<Self> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(PlaybackState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let session = Arc::new(Self {
            id: SessionId::new(),
            resolver,
            factory,
            config: RwLock::new(None),
            state: RwLock::new(PlaybackState::Idle),
            state_tx,
            event_tx,
            engine: RwLock::new(None),
            signal_tx,
            pump: StdMutex::new(None),
            ticker: StdMutex::new(ProgressTicker::new()),
            token: AtomicU64::new(0),
            configured: AtomicBool::new(false),
            duration: RwLock::new(None),
            video_size: RwLock::new(None),
        });

        let pump = tokio::spawn(Self::pump_signals(Arc::downgrade(&session), signal_rx));
        *session.pump.lock().expect("pump handle") = Some(pump);

        session
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get current state
    pub async fn state(&self) -> PlaybackState {
        *self.state.read().await
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to the public event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Total duration in seconds, once known
    pub async fn duration(&self) -> Option<f64> {
        *self.duration.read().await
    }

    /// Width over height of the video, once dimensions are known
    pub async fn video_aspect_ratio(&self) -> Option<f64> {
        self.video_size.read().await.and_then(|s| s.aspect_ratio())
    }

    /// Simple `rate > 0` playing query against the engine
    pub async fn is_playing(&self) -> bool {
        match self.engine.read().await.as_ref() {
            Some(engine) => engine.is_playing().await,
            None => false,
        }
    }

    /// Skip step from the active configuration, in seconds
    pub async fn skip_amount(&self) -> f64 {
        self.config.read().await.as_ref().map(|c| c.skip_amount).unwrap_or(10.0)
    }

    /// Configured resume-after-seek policy
    async fn resume_after_seek(&self) -> bool {
        self.config.read().await.as_ref().map(|c| c.resume_after_seek).unwrap_or(true)
    }

    async fn playback_rate(&self) -> f64 {
        self.config.read().await.as_ref().map(|c| c.playback_rate).unwrap_or(1.0)
    }

    /// Bind a configuration and begin metadata resolution
    ///
    /// Ignored with a warning when the session was configured before;
    /// a new configuration requires a fresh session.
    #[instrument(skip(self, config), fields(session_id = %self.id))]
    pub async fn setup(self: &Arc<Self>, config: PlayerConfig) {
        if self.configured.swap(true, Ordering::SeqCst) {
            warn!("setup ignored: session already configured");
            return;
        }

        let config = config.sanitized();
        info!(url = %config.url, title = %config.video_title, "Setting up session");

        if !self.set_state(PlaybackState::ResolvingMetadata).await {
            return;
        }

        let token = self.token.load(Ordering::SeqCst);
        let url = config.url.clone();
        *self.config.write().await = Some(config);

        // Resolution runs off this context; its outcome hops back through
        // the signal channel and is applied on the pump task.
        let resolver = self.resolver.clone();
        let tx = self.signal_tx.clone();
        tokio::spawn(async move {
            let outcome = resolver.resolve(&url).await;
            let _ = tx.send(SessionSignal::Resolved { token, outcome });
        });
    }

    /// Start or continue playback
    ///
    /// A no-op unless the engine item is ready: issuing `play` during
    /// resolution or preparation performs no engine call, no state change
    /// and emits no event.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn play(&self) {
        let state = self.state().await;
        match state {
            PlaybackState::ReadyPaused | PlaybackState::Ended => {
                let rate = self.playback_rate().await;
                let started = {
                    let engine = self.engine.read().await;
                    match engine.as_ref() {
                        Some(engine) => {
                            engine.play().await;
                            engine.set_rate(rate).await;
                            true
                        }
                        None => false,
                    }
                };
                if started {
                    self.set_state(PlaybackState::Playing).await;
                }
            }
            PlaybackState::Playing => {
                if let Some(engine) = self.engine.read().await.as_ref() {
                    engine.play().await;
                }
            }
            _ => trace!(state = %state, "play ignored in current state"),
        }
    }

    /// Pause playback; a no-op outside `Playing`
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn pause(&self) {
        if self.state().await == PlaybackState::Playing {
            if let Some(engine) = self.engine.read().await.as_ref() {
                engine.pause().await;
            }
            self.set_state(PlaybackState::ReadyPaused).await;
        }
    }

    /// Seek to an absolute position in seconds
    ///
    /// Always pauses first, seeks, then resumes in the completion when the
    /// session was playing or the resume-after-seek policy says so. The
    /// pause-seek-resume order avoids audio glitches while scrubbing and is
    /// observable by the adapter.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn seek_to(&self, seconds: f64) {
        let state = self.state().await;
        if !matches!(
            state,
            PlaybackState::Playing | PlaybackState::ReadyPaused | PlaybackState::Ended
        ) {
            trace!(state = %state, "seek ignored in current state");
            return;
        }

        let was_playing = state == PlaybackState::Playing;
        let resume = was_playing || self.resume_after_seek().await;

        if !self.set_state(PlaybackState::Seeking).await {
            return;
        }

        let rate = self.playback_rate().await;
        {
            let engine = self.engine.read().await;
            let Some(engine) = engine.as_ref() else {
                return;
            };

            // Negative targets are floored at 0 by the adapter.
            engine.pause().await;
            engine.seek(seconds).await;

            if resume {
                engine.play().await;
                engine.set_rate(rate).await;
            }
        }

        if resume {
            self.set_state(PlaybackState::Playing).await;
        } else {
            self.set_state(PlaybackState::ReadyPaused).await;
        }
    }

    /// Seek to a fraction of the total duration; a no-op while the
    /// duration is unknown
    pub async fn seek_to_fraction(&self, fraction: f64) {
        let Some(duration) = self.duration().await else {
            trace!("seek by fraction ignored: duration unknown");
            return;
        };
        let target = fraction.clamp(0.0, 1.0) * duration;
        self.seek_to(target).await;
    }

    /// Seek relative to the current position
    ///
    /// A forward skip that would land at or past the end is a no-op; a
    /// backward skip floors at 0 through the adapter.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn skip(&self, delta: f64) {
        let now = {
            let engine = self.engine.read().await;
            let Some(engine) = engine.as_ref() else {
                trace!("skip ignored: no engine attached");
                return;
            };
            engine.current_time().await
        };

        let target = now + delta;
        if delta > 0.0 {
            let Some(duration) = self.duration().await else {
                trace!("forward skip ignored: duration unknown");
                return;
            };
            if target >= duration {
                trace!(target, duration, "forward skip past end ignored");
                return;
            }
        }

        self.seek_to(target).await;
    }

    /// Set playback rate, coercing negative values to 0
    pub async fn set_rate(&self, rate: f64) {
        let rate = rate.max(0.0);
        if let Some(config) = self.config.write().await.as_mut() {
            config.playback_rate = rate;
        }
        if let Some(engine) = self.engine.read().await.as_ref() {
            engine.set_rate(rate).await;
        }
    }

    /// Set volume, coercing negative values to 0
    pub async fn set_volume(&self, volume: f64) {
        let volume = volume.max(0.0);
        if let Some(config) = self.config.write().await.as_mut() {
            config.volume = volume;
        }
        if let Some(engine) = self.engine.read().await.as_ref() {
            engine.set_volume(volume).await;
        }
    }

    /// Tear the session down; callable in any state and idempotent
    ///
    /// Renders pending callbacks harmless by bumping the session token,
    /// then detaches in order: ticker, signal registrations, engine handle.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn clean_up(&self) {
        self.ticker.lock().expect("ticker").cancel();
        self.token.fetch_add(1, Ordering::SeqCst);

        if let Some(engine) = self.engine.write().await.take() {
            engine.pause().await;
        }

        let mut state = self.state.write().await;
        if *state != PlaybackState::Idle {
            *state = PlaybackState::Idle;
            let _ = self.state_tx.send(PlaybackState::Idle);
            info!("Session cleaned up");
        }
    }

    // ------------------------------------------------------------------
    // Signal pump
    // ------------------------------------------------------------------

    async fn pump_signals(
        session: Weak<PlayerSession>,
        mut rx: mpsc::UnboundedReceiver<SessionSignal>,
    ) {
        while let Some(signal) = rx.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };
            session.handle_signal(signal).await;
        }
    }

    async fn handle_signal(&self, signal: SessionSignal) {
        let live = self.token.load(Ordering::SeqCst);
        match signal {
            SessionSignal::Resolved { token, outcome } => {
                if token == live {
                    self.finish_resolve(outcome).await;
                } else {
                    debug!("Stale resolve outcome dropped");
                }
            }
            SessionSignal::Engine { token, signal } => {
                if token == live {
                    self.handle_engine_signal(signal).await;
                } else {
                    debug!(signal = ?signal, "Stale engine signal dropped");
                }
            }
            SessionSignal::Tick { token } => {
                if token == live {
                    self.handle_tick().await;
                }
            }
        }
    }

    async fn finish_resolve(&self, outcome: ResolveOutcome) {
        if self.state().await != PlaybackState::ResolvingMetadata {
            debug!("Resolve outcome ignored outside ResolvingMetadata");
            return;
        }

        match outcome {
            ResolveOutcome::Loaded(metadata) => {
                info!(tracks = metadata.track_count, "Media source resolved");

                *self.duration.write().await = metadata.duration_secs;
                if metadata.video_size.is_some() {
                    *self.video_size.write().await = metadata.video_size;
                }

                let (url, rate, volume, interval) = {
                    let config = self.config.read().await;
                    let config = config.as_ref().expect("configured before resolve");
                    (
                        config.url.clone(),
                        config.playback_rate,
                        config.volume,
                        config.progress_interval,
                    )
                };

                let token = self.token.load(Ordering::SeqCst);
                let sink = EngineSink::new(token, self.signal_tx.clone());
                let engine = self.factory.create(&url, &metadata, sink);
                engine.set_rate(rate).await;
                engine.set_volume(volume).await;
                *self.engine.write().await = Some(engine);

                self.set_state(PlaybackState::Preparing).await;
                self.emit(PlayerEvent::BufferingStarted);

                let tx = self.signal_tx.clone();
                self.ticker.lock().expect("ticker").start(interval, move || {
                    let _ = tx.send(SessionSignal::Tick { token });
                });
            }
            ResolveOutcome::Cancelled => {
                self.fail(Error::ResolutionCancelled).await;
            }
            ResolveOutcome::Failed(reason) => {
                self.fail(Error::ResolutionFailed(reason)).await;
            }
        }
    }

    async fn handle_engine_signal(&self, signal: EngineSignal) {
        match signal {
            EngineSignal::StatusChanged(EngineStatus::ReadyToPlay) => {
                if self.state().await != PlaybackState::Preparing {
                    return;
                }
                self.set_state(PlaybackState::ReadyPaused).await;
                self.emit(PlayerEvent::BufferingEnded);
                self.emit(PlayerEvent::ReadyToPlay);

                let auto_play = self
                    .config
                    .read()
                    .await
                    .as_ref()
                    .map(|c| c.start_auto_play)
                    .unwrap_or(false);
                if auto_play {
                    self.play().await;
                }
            }
            EngineSignal::StatusChanged(EngineStatus::Failed(reason)) => {
                self.fail(Error::EngineFailed(reason)).await;
            }
            EngineSignal::StatusChanged(EngineStatus::Unknown) => {}
            EngineSignal::LoadedRangesChanged(ranges) => {
                let fraction = buffered_fraction(&ranges, self.duration().await);
                self.emit(PlayerEvent::BufferedUpdated { fraction });
            }
            EngineSignal::DidReachEnd => {
                // Identity is already checked at the pump; state guards
                // against a duplicate end notification.
                if self.state().await != PlaybackState::Playing {
                    return;
                }
                self.emit(PlayerEvent::DidReachEnd);
                self.set_state(PlaybackState::Ended).await;

                if let Some(engine) = self.engine.read().await.as_ref() {
                    engine.seek(0.0).await;
                }

                let repeat = self
                    .config
                    .read()
                    .await
                    .as_ref()
                    .map(|c| c.repeat_after_end)
                    .unwrap_or(false);
                if repeat {
                    // Single level of re-entry: the Ended handler issuing
                    // play is the deepest documented recursion.
                    self.play().await;
                }
            }
            EngineSignal::FailedToPlayToEnd => {
                // Informational; reported without forcing a transition.
                self.emit(PlayerEvent::Failed {
                    error: Error::PlaybackInterrupted,
                });
            }
            EngineSignal::PresentationSize(size) => {
                *self.video_size.write().await = Some(size);
                self.emit(PlayerEvent::VideoDimensionsKnown {
                    width: size.width,
                    height: size.height,
                });
            }
            EngineSignal::DurationKnown(seconds) => {
                *self.duration.write().await = Some(seconds);
                self.emit(PlayerEvent::DurationKnown { seconds });
            }
            EngineSignal::TimeControl(status) => {
                self.emit(PlayerEvent::PlaybackStatusChanged { status });
            }
        }
    }

    async fn handle_tick(&self) {
        if self.state().await.is_terminal() {
            return;
        }
        let current = {
            let engine = self.engine.read().await;
            let Some(engine) = engine.as_ref() else {
                return;
            };
            engine.current_time().await
        };
        let fraction = ProgressSample::new(current, self.duration().await).fraction();
        self.emit(PlayerEvent::ProgressUpdated { fraction });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Transition to a new state; invalid transitions are logged and refused
    async fn set_state(&self, target: PlaybackState) -> bool {
        let mut state = self.state.write().await;
        let current = *state;

        if current == target {
            return true;
        }
        if !current.can_transition_to(target) {
            warn!(from = %current, to = %target, "Refusing invalid state transition");
            return false;
        }

        *state = target;
        drop(state);

        let _ = self.state_tx.send(target);
        info!(from = %current, to = %target, "State transition");
        true
    }

    /// Enter the terminal `Failed` state and report the error once
    async fn fail(&self, error: Error) {
        if self.state().await.is_terminal() {
            return;
        }
        self.ticker.lock().expect("ticker").cancel();
        self.set_state(PlaybackState::Failed).await;
        self.emit(PlayerEvent::Failed { error });
    }

    fn emit(&self, event: PlayerEvent) {
        debug!(event = event.name(), "Emitting event");
        let _ = self.event_tx.send(event);
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            ticker.cancel();
        }
        if let Ok(mut pump) = self.pump.lock() {
            if let Some(handle) = pump.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngineFactory;
    use crate::source::StaticResolver;
    use url::Url;

    fn test_config() -> PlayerConfig {
        PlayerConfig::new(
            Url::parse("https://example.com/movie.mp4").unwrap(),
            "Test Movie",
        )
    }

    fn test_session() -> Arc<PlayerSession> {
        PlayerSession::new(
            Arc::new(StaticResolver::with_duration(30.0)),
            Arc::new(SimulatedEngineFactory::default()),
        )
    }

    #[tokio::test]
    async fn test_session_starts_idle() {
        let session = test_session();
        assert_eq!(session.state().await, PlaybackState::Idle);
        assert!(!session.is_playing().await);
        assert_eq!(session.duration().await, None);
    }

    #[tokio::test]
    async fn test_setup_enters_resolving() {
        let session = test_session();
        session.setup(test_config()).await;
        assert_eq!(session.state().await, PlaybackState::ResolvingMetadata);
    }

    #[tokio::test]
    async fn test_second_setup_is_ignored() {
        let session = test_session();
        session.setup(test_config()).await;
        let state_before = session.state().await;
        session.setup(test_config()).await;
        assert_eq!(session.state().await, state_before);
    }

    #[tokio::test]
    async fn test_commands_silently_ignored_while_idle() {
        let session = test_session();
        session.play().await;
        session.pause().await;
        session.seek_to(5.0).await;
        session.skip(10.0).await;
        assert_eq!(session.state().await, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_clean_up_is_idempotent() {
        let session = test_session();
        session.setup(test_config()).await;
        session.clean_up().await;
        session.clean_up().await;
        assert_eq!(session.state().await, PlaybackState::Idle);
    }
}

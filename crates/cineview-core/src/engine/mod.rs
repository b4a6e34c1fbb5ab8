//! Playback engine adapter
//!
//! Thin façade over the platform media-playback primitive. The session
//! never talks to a device API directly: commands go through
//! [`PlaybackEngine`], and the engine pushes its low-level notifications
//! into the session through an [`EngineSink`]. Signals are registered once
//! per engine item and detached on teardown by invalidating the sink's
//! session token, never by reflection-style observation.

mod simulated;

pub use simulated::{SimulatedEngine, SimulatedEngineFactory};

use crate::session::SessionSignal;
use crate::source::MediaMetadata;
use crate::types::{BufferedRange, TimeControlStatus, VideoSize};
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// Item readiness as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Readiness not determined yet
    Unknown,
    /// The item can be played
    ReadyToPlay,
    /// The engine failed; it must not retry, the session goes terminal
    Failed(String),
}

/// Low-level notifications pushed by an engine item
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// Item readiness changed
    StatusChanged(EngineStatus),
    /// Full replacement set of loaded time ranges
    LoadedRangesChanged(Vec<BufferedRange>),
    /// The item played to its natural end
    DidReachEnd,
    /// The item failed to play through to the end
    FailedToPlayToEnd,
    /// Presentation size became known or changed
    PresentationSize(VideoSize),
    /// Item duration became known or changed
    DurationKnown(f64),
    /// The three-way playing signal changed
    TimeControl(TimeControlStatus),
}

/// Handle an engine uses to notify its owning session
///
/// Cloneable and cheap; sends are tagged with the session token captured at
/// attach time, so signals from a torn-down item are dropped at the pump.
#[derive(Debug, Clone)]
pub struct EngineSink {
    token: u64,
    tx: mpsc::UnboundedSender<SessionSignal>,
}

impl EngineSink {
    pub(crate) fn new(token: u64, tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self { token, tx }
    }

    /// Push a signal toward the session; returns false once the session is gone
    pub fn send(&self, signal: EngineSignal) -> bool {
        self.tx
            .send(SessionSignal::Engine {
                token: self.token,
                signal,
            })
            .is_ok()
    }
}

/// Commands accepted by a platform playback engine
///
/// Contract notes:
/// - `seek` floors negative targets at 0 (the adapter's own floor; callers
///   pass raw targets).
/// - `is_playing` is the simple `rate > 0` boolean; the richer signal is
///   [`PlaybackEngine::time_control_status`].
/// - After a `Failed` status the engine accepts no further commands and
///   must not retry on its own.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    async fn play(&self);

    async fn pause(&self);

    /// Seek to an absolute position in seconds
    async fn seek(&self, seconds: f64);

    /// Set playback rate; values are already clamped to >= 0 by the session
    async fn set_rate(&self, rate: f64);

    /// Set volume; values are already clamped to >= 0 by the session
    async fn set_volume(&self, volume: f64);

    async fn is_playing(&self) -> bool;

    /// Current playback position in seconds
    async fn current_time(&self) -> f64;

    /// Item duration in seconds, once known
    async fn duration(&self) -> Option<f64>;

    async fn time_control_status(&self) -> TimeControlStatus;
}

/// Builds one engine item per session after metadata resolution
///
/// The session owns the returned engine exclusively; at most one engine
/// instance exists per session, and replacing it requires a new session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, url: &Url, metadata: &MediaMetadata, sink: EngineSink) -> Box<dyn PlaybackEngine>;
}

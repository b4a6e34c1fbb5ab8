//! Core types for Cineview

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player state machine states
///
/// Exactly one state is current per session and transitions are the only
/// way it changes. `Failed` is terminal: recovering from it requires a
/// fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Initial state, no media configured
    Idle,
    /// Asynchronously loading track metadata for the source
    ResolvingMetadata,
    /// Engine item built, waiting for the engine to report ready
    Preparing,
    /// Ready to play, currently paused
    ReadyPaused,
    /// Content is playing
    Playing,
    /// Seeking to a new position
    Seeking,
    /// Natural end of the item reached
    Ended,
    /// Terminal failure, session must be re-created
    Failed,
}

impl PlaybackState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, target),
            // From Idle
            (Idle, ResolvingMetadata) |
            // From ResolvingMetadata
            (ResolvingMetadata, Preparing) | (ResolvingMetadata, Failed) |
            // From Preparing
            (Preparing, ReadyPaused) | (Preparing, Failed) |
            // From ReadyPaused
            (ReadyPaused, Playing) | (ReadyPaused, Seeking) | (ReadyPaused, Failed) |
            // From Playing
            (Playing, ReadyPaused) | (Playing, Seeking) | (Playing, Ended) | (Playing, Failed) |
            // From Seeking
            (Seeking, Playing) | (Seeking, ReadyPaused) | (Seeking, Failed) |
            // From Ended (auto-repeat or manual replay, item already rewound)
            (Ended, Playing) | (Ended, Seeking) | (Ended, Failed)
        )
    }

    /// Terminal states accept no further transitions or commands
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Failed)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::ResolvingMetadata => write!(f, "resolving_metadata"),
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::ReadyPaused => write!(f, "ready_paused"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Seeking => write!(f, "seeking"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Failed => write!(f, "failed"),
        }
    }
}

/// Three-way playing signal reported by the engine
///
/// Richer than the engine's `rate > 0` boolean: `WaitingToPlay` covers an
/// engine that wants to play but is stalled on data. The UI-facing
/// "is it visually playing" signal derives from this, not from the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeControlStatus {
    Paused,
    WaitingToPlay,
    Playing,
}

impl std::fmt::Display for TimeControlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeControlStatus::Paused => write!(f, "paused"),
            TimeControlStatus::WaitingToPlay => write!(f, "waiting_to_play"),
            TimeControlStatus::Playing => write!(f, "playing"),
        }
    }
}

/// Video presentation size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: f64,
    pub height: f64,
}

impl VideoSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width over height; `None` when height is 0
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height > 0.0 {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

impl std::fmt::Display for VideoSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One loaded time range reported by the engine
///
/// The raw feed is a full replacement set on every notification, not
/// necessarily sorted or disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferedRange {
    /// Range start in seconds
    pub start: f64,
    /// Range length in seconds
    pub duration: f64,
}

impl BufferedRange {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// End point of the range in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A sampled playback position against the total duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Current playback position in seconds
    pub current: f64,
    /// Total item duration in seconds, if known
    pub duration: Option<f64>,
}

impl ProgressSample {
    pub fn new(current: f64, duration: Option<f64>) -> Self {
        Self { current, duration }
    }

    /// Played fraction of the item, defined as 0 when duration is 0 or unknown
    pub fn fraction(&self) -> f64 {
        match self.duration {
            Some(total) if total > 0.0 => (self.current / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Player configuration
///
/// The URL is handed opaquely to the playback engine; the core owns no
/// wire formats. One configuration binds one session for its whole
/// lifetime — re-configuring requires a fresh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Media source URL
    pub url: Url,
    /// Title shown by the presentation layer
    pub video_title: String,
    /// Start playback automatically once the engine is ready
    pub start_auto_play: bool,
    /// Seek to zero and replay when the item reaches its natural end
    pub repeat_after_end: bool,
    /// Playback rate, clamped to >= 0
    pub playback_rate: f64,
    /// Volume, clamped to >= 0
    pub volume: f64,
    /// Resume playback after a seek performed while paused
    pub resume_after_seek: bool,
    /// Cadence of periodic progress sampling
    pub progress_interval: Duration,
    /// Step used by skip-back / skip-forward, in seconds
    pub skip_amount: f64,
}

impl PlayerConfig {
    /// Create a configuration with the default control surface
    pub fn new(url: Url, video_title: impl Into<String>) -> Self {
        Self {
            url,
            video_title: video_title.into(),
            start_auto_play: false,
            repeat_after_end: true,
            playback_rate: 1.0,
            volume: 1.0,
            resume_after_seek: true,
            progress_interval: Duration::from_secs(1),
            skip_amount: 10.0,
        }
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.start_auto_play = auto_play;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat_after_end = repeat;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_resume_after_seek(mut self, resume: bool) -> Self {
        self.resume_after_seek = resume;
        self
    }

    /// Coerce out-of-range values instead of rejecting them
    ///
    /// Negative rate and volume are floored at 0; a non-positive skip step
    /// falls back to the default 10 seconds.
    pub fn sanitized(mut self) -> Self {
        self.playback_rate = self.playback_rate.max(0.0);
        self.volume = self.volume.max(0.0);
        if self.skip_amount <= 0.0 {
            self.skip_amount = 10.0;
        }
        if self.progress_interval.is_zero() {
            self.progress_interval = Duration::from_secs(1);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_url() -> Url {
        Url::parse("https://example.com/movie.mp4").unwrap()
    }

    #[test]
    fn test_state_transitions() {
        use PlaybackState::*;

        // Valid transitions
        assert!(Idle.can_transition_to(ResolvingMetadata));
        assert!(ResolvingMetadata.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(ReadyPaused));
        assert!(ReadyPaused.can_transition_to(Playing));
        assert!(Playing.can_transition_to(Ended));
        assert!(Ended.can_transition_to(Playing));

        // Invalid transitions
        assert!(!Idle.can_transition_to(Playing));
        assert!(!ResolvingMetadata.can_transition_to(Playing));
        assert!(!Failed.can_transition_to(Idle));
        assert!(!Failed.can_transition_to(ResolvingMetadata));
    }

    #[test]
    fn test_failed_is_terminal() {
        assert!(PlaybackState::Failed.is_terminal());
        assert!(!PlaybackState::Ended.is_terminal());
        assert!(!PlaybackState::Idle.is_terminal());
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(ProgressSample::new(25.0, Some(100.0)).fraction(), 0.25);
        assert_eq!(ProgressSample::new(25.0, Some(0.0)).fraction(), 0.0);
        assert_eq!(ProgressSample::new(25.0, None).fraction(), 0.0);
        // Never exceeds 1 even when the sample overshoots the duration
        assert_eq!(ProgressSample::new(120.0, Some(100.0)).fraction(), 1.0);
    }

    #[test]
    fn test_buffered_range_end() {
        assert_eq!(BufferedRange::new(3.0, 2.0).end(), 5.0);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(VideoSize::new(1920.0, 1080.0).aspect_ratio(), Some(1920.0 / 1080.0));
        assert_eq!(VideoSize::new(1920.0, 0.0).aspect_ratio(), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = PlayerConfig::new(test_url(), "Trailer");
        assert!(!config.start_auto_play);
        assert!(config.repeat_after_end);
        assert!(config.resume_after_seek);
        assert_eq!(config.playback_rate, 1.0);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.skip_amount, 10.0);
        assert_eq!(config.progress_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_config_sanitized_clamps_negative_values() {
        let config = PlayerConfig::new(test_url(), "Trailer")
            .with_rate(-2.0)
            .with_volume(-0.5)
            .sanitized();
        assert_eq!(config.playback_rate, 0.0);
        assert_eq!(config.volume, 0.0);
    }
}

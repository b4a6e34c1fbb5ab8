//! Public event contract consumed by presentation layers
//!
//! The session multiplexes every engine and resolver notification into this
//! single sum type. Consumers pattern-match and ignore variants they do not
//! care about; there are no per-event callback registrations to stub out.

use crate::{error::Error, types::TimeControlStatus};
use serde::{Deserialize, Serialize};

/// Events emitted by a playback session
///
/// Records are immutable after emission. Ordering between `DurationKnown`
/// and `VideoDimensionsKnown` is not guaranteed; each is observed
/// independently and may arrive at a different time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The item has started loading data and is not yet playable
    BufferingStarted,

    /// Enough data is available; pairs with an earlier `BufferingStarted`
    BufferingEnded,

    /// The engine can start playback
    ReadyToPlay,

    /// Periodic played-fraction sample, ~1 Hz while an item is attached
    ProgressUpdated { fraction: f64 },

    /// Downloaded fraction derived from the loaded time ranges
    BufferedUpdated { fraction: f64 },

    /// Total item duration became known
    DurationKnown { seconds: f64 },

    /// Video presentation size became known
    VideoDimensionsKnown { width: f64, height: f64 },

    /// The engine's three-way playing signal changed
    PlaybackStatusChanged { status: TimeControlStatus },

    /// The item played to its natural end
    DidReachEnd,

    /// An error occurred; terminal for the session unless the error says otherwise
    Failed { error: Error },
}

impl PlayerEvent {
    /// Event name for structured logging
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::BufferingStarted => "buffering_started",
            PlayerEvent::BufferingEnded => "buffering_ended",
            PlayerEvent::ReadyToPlay => "ready_to_play",
            PlayerEvent::ProgressUpdated { .. } => "progress_updated",
            PlayerEvent::BufferedUpdated { .. } => "buffered_updated",
            PlayerEvent::DurationKnown { .. } => "duration_known",
            PlayerEvent::VideoDimensionsKnown { .. } => "video_dimensions_known",
            PlayerEvent::PlaybackStatusChanged { .. } => "playback_status_changed",
            PlayerEvent::DidReachEnd => "did_reach_end",
            PlayerEvent::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = PlayerEvent::ProgressUpdated { fraction: 0.25 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"progress_updated\""));
        assert!(json.contains("0.25"));
    }

    #[test]
    fn test_failed_event_round_trip() {
        let event = PlayerEvent::Failed {
            error: Error::EngineFailed("decoder died".into()),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PlayerEvent::DidReachEnd.name(), "did_reach_end");
        assert_eq!(
            PlayerEvent::DurationKnown { seconds: 10.0 }.name(),
            "duration_known"
        );
    }
}

//! Error types for Cineview Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
///
/// Errors are carried as data inside [`PlayerEvent::Failed`] rather than
/// propagated up the call stack; the core never retries on its own. All
/// variants are terminal for the session except [`Error::PlaybackInterrupted`],
/// which is reported without forcing a state transition.
///
/// [`PlayerEvent::Failed`]: crate::events::PlayerEvent::Failed
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    // Resolution errors
    #[error("Failed to resolve media source: {0}")]
    ResolutionFailed(String),

    #[error("Media source resolution was cancelled")]
    ResolutionCancelled,

    // Engine errors
    #[error("Playback engine failed: {0}")]
    EngineFailed(String),

    #[error("Playback failed to reach the end of the item")]
    PlaybackInterrupted,
}

impl Error {
    /// Returns true if this error ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::PlaybackInterrupted)
    }

    /// Returns the error code for structured reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ResolutionFailed(_) => "RESOLUTION_FAILED",
            Error::ResolutionCancelled => "RESOLUTION_CANCELLED",
            Error::EngineFailed(_) => "ENGINE_FAILED",
            Error::PlaybackInterrupted => "PLAYBACK_INTERRUPTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminality() {
        assert!(Error::ResolutionFailed("no tracks".into()).is_terminal());
        assert!(Error::ResolutionCancelled.is_terminal());
        assert!(Error::EngineFailed("decoder".into()).is_terminal());
        assert!(!Error::PlaybackInterrupted.is_terminal());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::ResolutionCancelled.error_code(), "RESOLUTION_CANCELLED");
        assert_eq!(Error::PlaybackInterrupted.error_code(), "PLAYBACK_INTERRUPTED");
    }
}

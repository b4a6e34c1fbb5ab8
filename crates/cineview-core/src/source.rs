//! Media source resolution
//!
//! Wraps a URL into loadable track metadata before playback can start.
//! Resolution runs off the session's context on a spawned task; the session
//! applies the outcome back on its signal pump, exactly once, guarded by the
//! session token so a resolve finishing after `clean_up` is a no-op.

use crate::types::VideoSize;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Track metadata produced by a successful resolve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Total duration in seconds, when the container reports one up front
    pub duration_secs: Option<f64>,
    /// Presentation size, when known before the engine reports it
    pub video_size: Option<VideoSize>,
    /// Number of media tracks found
    pub track_count: u32,
}

/// Outcome of a resolve call; exactly one is reported per call
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Tracks available, metadata loaded
    Loaded(MediaMetadata),
    /// Resolution was cancelled underneath us
    Cancelled,
    /// Resolution failed
    Failed(String),
}

/// Asynchronous track-metadata loader for a media URL
///
/// `resolve` must not block the caller's context and must report exactly
/// one outcome. The core performs a single resolution attempt per session;
/// retry policy belongs to the presentation layer re-invoking setup on a
/// fresh session.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, url: &Url) -> ResolveOutcome;
}

/// Resolver returning preset metadata after a fixed delay
///
/// Stands in for a real container probe when driving the simulated engine,
/// and gives tests a deterministic resolution window.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    metadata: MediaMetadata,
    delay: Duration,
}

impl StaticResolver {
    pub fn new(metadata: MediaMetadata) -> Self {
        Self {
            metadata,
            delay: Duration::from_millis(10),
        }
    }

    /// Resolver that reports a plain video item of `duration_secs`
    pub fn with_duration(duration_secs: f64) -> Self {
        Self::new(MediaMetadata {
            duration_secs: Some(duration_secs),
            video_size: None,
            track_count: 1,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl MediaResolver for StaticResolver {
    async fn resolve(&self, _url: &Url) -> ResolveOutcome {
        tokio::time::sleep(self.delay).await;
        ResolveOutcome::Loaded(self.metadata.clone())
    }
}

/// Resolver that always fails or cancels, for exercising the failure paths
#[derive(Debug, Clone)]
pub enum FailingResolver {
    Fails(String),
    Cancels,
}

#[async_trait]
impl MediaResolver for FailingResolver {
    async fn resolve(&self, _url: &Url) -> ResolveOutcome {
        tokio::time::sleep(Duration::from_millis(5)).await;
        match self {
            FailingResolver::Fails(reason) => ResolveOutcome::Failed(reason.clone()),
            FailingResolver::Cancels => ResolveOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver_loads_metadata() {
        let resolver = StaticResolver::with_duration(30.0);
        let url = Url::parse("https://example.com/clip.mp4").unwrap();

        match resolver.resolve(&url).await {
            ResolveOutcome::Loaded(meta) => {
                assert_eq!(meta.duration_secs, Some(30.0));
                assert_eq!(meta.track_count, 1);
            }
            other => panic!("expected Loaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_resolver() {
        let url = Url::parse("https://example.com/clip.mp4").unwrap();

        let outcome = FailingResolver::Fails("no tracks".into()).resolve(&url).await;
        assert_eq!(outcome, ResolveOutcome::Failed("no tracks".into()));

        let outcome = FailingResolver::Cancels.resolve(&url).await;
        assert_eq!(outcome, ResolveOutcome::Cancelled);
    }
}

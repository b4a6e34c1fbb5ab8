//! Cineview Core - embeddable video-player session core
//!
//! This crate provides the playback logic behind a video-player UI
//! component:
//! - Asset resolution, playback, seeking and end-of-item lifecycle as an
//!   explicit state machine
//! - Buffered-range aggregation and progress-fraction computation
//! - Periodic progress sampling at ~1 Hz
//! - A derived-state facade with skip controls and scrub-bar seeks
//!
//! View rendering, gestures and fullscreen transitions are left to the
//! presentation layer, which issues commands into [`PlayerSession`] (or
//! [`CompletePlayer`]) and consumes the [`PlayerEvent`] stream.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      Cineview Core                        │
//! ├───────────────────────────────────────────────────────────┤
//! │                                                           │
//! │  ┌────────────┐   ┌─────────────┐   ┌────────────────┐    │
//! │  │   Media    │   │  Playback   │   │    Progress    │    │
//! │  │  Resolver  │   │   Engine    │   │     Ticker     │    │
//! │  └─────┬──────┘   └──────┬──────┘   └───────┬────────┘    │
//! │        │                 │                  │             │
//! │        └────────────┬────┴──────────────────┘             │
//! │                     │  signal pump                        │
//! │              ┌──────┴──────┐                              │
//! │              │   Player    │                              │
//! │              │   Session   │                              │
//! │              └──────┬──────┘                              │
//! │                     │  PlayerEvent stream                 │
//! │              ┌──────┴──────┐                              │
//! │              │  Complete   │                              │
//! │              │   Player    │                              │
//! │              └─────────────┘                              │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod buffered;
pub mod engine;
pub mod error;
pub mod events;
pub mod facade;
pub mod session;
pub mod source;
pub mod ticker;
pub mod types;

pub use buffered::{buffered_fraction, MonotonicFraction};
pub use engine::{
    EngineFactory, EngineSignal, EngineSink, EngineStatus, PlaybackEngine, SimulatedEngine,
    SimulatedEngineFactory,
};
pub use error::{Error, Result};
pub use events::PlayerEvent;
pub use facade::CompletePlayer;
pub use session::{PlayerSession, SessionSignal};
pub use source::{FailingResolver, MediaMetadata, MediaResolver, ResolveOutcome, StaticResolver};
pub use ticker::ProgressTicker;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Cineview Core initialized");
}

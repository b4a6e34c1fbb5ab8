//! Periodic progress sampling
//!
//! Owns the timer task that drives `ProgressUpdated` emission while an
//! engine item is attached. The owner cancels it explicitly on teardown;
//! cancellation is idempotent and a dropped ticker aborts its task so no
//! callback can fire into a destroyed session.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Fixed-cadence tick source, ~1 Hz by default
#[derive(Debug, Default)]
pub struct ProgressTicker {
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking at `period`, replacing any previous schedule
    ///
    /// The callback runs on the timer task; it is expected to hand off to
    /// the session's signal channel rather than mutate state itself.
    pub fn start(&mut self, period: Duration, mut on_tick: impl FnMut() + Send + 'static) {
        self.cancel();

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the cadence
            // starts one full period after attach.
            interval.tick().await;
            loop {
                interval.tick().await;
                on_tick();
            }
        }));

        debug!(period_ms = period.as_millis() as u64, "Progress ticker started");
    }

    /// Whether a tick task is currently scheduled
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Invalidate-if-present, then clear the handle; safe to call twice
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Progress ticker cancelled");
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticks_at_cadence() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let mut ticker = ProgressTicker::new();
        ticker.start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        ticker.cancel();

        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let mut ticker = ProgressTicker::new();
        ticker.start(Duration::from_millis(10), || {});

        assert!(ticker.is_active());
        ticker.cancel();
        assert!(!ticker.is_active());
        // Second cancel must be a safe no-op with the handle cleared
        ticker.cancel();
        assert!(!ticker.is_active());
    }

    #[tokio::test]
    async fn test_no_ticks_after_cancel() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let mut ticker = ProgressTicker::new();
        ticker.start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        ticker.cancel();
        let at_cancel = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_cancel);
    }

    #[tokio::test]
    async fn test_restart_replaces_schedule() {
        let count = Arc::new(AtomicU32::new(0));

        let mut ticker = ProgressTicker::new();
        let slow = count.clone();
        ticker.start(Duration::from_secs(60), move || {
            slow.fetch_add(1, Ordering::SeqCst);
        });
        let fast = count.clone();
        ticker.start(Duration::from_millis(10), move || {
            fast.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        ticker.cancel();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}

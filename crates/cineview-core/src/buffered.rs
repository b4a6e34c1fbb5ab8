//! Buffered-range aggregation
//!
//! The engine reports the full current set of loaded time ranges on every
//! change; the set replaces the previous one and is not guaranteed to be
//! sorted or disjoint. The tracker reduces it to a single downloaded
//! fraction: the maximum reachable end point over the total duration.

use crate::types::BufferedRange;

/// Fraction of the item downloaded, in [0, 1]
///
/// Returns 0 when the set is empty or the duration is 0/unknown.
pub fn buffered_fraction(ranges: &[BufferedRange], duration: Option<f64>) -> f64 {
    let total = match duration {
        Some(d) if d > 0.0 => d,
        _ => return 0.0,
    };

    let maximum = ranges.iter().map(BufferedRange::end).fold(0.0, f64::max);

    (maximum / total).clamp(0.0, 1.0)
}

/// Never-decreasing fraction for progress-bar style consumers
///
/// Transient range updates can regress the raw fraction; the presentation
/// layer only applies a new value when it exceeds the previous one. The
/// tracker itself stays stateless, this guard lives with the consumer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicFraction {
    current: f64,
}

impl MonotonicFraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a new sample, keeping the floor; returns the value to display
    pub fn update(&mut self, fraction: f64) -> f64 {
        if fraction > self.current {
            self.current = fraction;
        }
        self.current
    }

    pub fn get(&self) -> f64 {
        self.current
    }

    /// Drop the floor, e.g. when a new item is attached
    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_unsorted_ranges() {
        let ranges = [BufferedRange::new(0.0, 5.0), BufferedRange::new(3.0, 2.0)];
        assert_eq!(buffered_fraction(&ranges, Some(10.0)), 0.5);
    }

    #[test]
    fn test_max_end_wins_over_order() {
        let ranges = [BufferedRange::new(8.0, 1.0), BufferedRange::new(0.0, 4.0)];
        assert_eq!(buffered_fraction(&ranges, Some(10.0)), 0.9);
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(buffered_fraction(&[], Some(10.0)), 0.0);
    }

    #[test]
    fn test_unknown_or_zero_duration() {
        let ranges = [BufferedRange::new(0.0, 5.0)];
        assert_eq!(buffered_fraction(&ranges, None), 0.0);
        assert_eq!(buffered_fraction(&ranges, Some(0.0)), 0.0);
    }

    #[test]
    fn test_clamped_to_one() {
        // Ranges can momentarily overshoot the reported duration
        let ranges = [BufferedRange::new(0.0, 12.0)];
        assert_eq!(buffered_fraction(&ranges, Some(10.0)), 1.0);
    }

    #[test]
    fn test_monotonic_floor() {
        let mut floor = MonotonicFraction::new();
        assert_eq!(floor.update(0.3), 0.3);
        // A regressing sample keeps the previous value
        assert_eq!(floor.update(0.2), 0.3);
        assert_eq!(floor.update(0.7), 0.7);
        floor.reset();
        assert_eq!(floor.get(), 0.0);
    }
}

//! Mutable bar accumulator.

use candela_types::BarRecord;
use chrono::{DateTime, Utc};

/// Accumulates consecutive input bars into one in-progress output bar.
///
/// A closed accumulator carries the maximal sentinel timestamp so that any
/// real tick compares as earlier than it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BarAccumulator {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_interest: f64,
    timestamp: DateTime<Utc>,
    is_open: bool,
}

impl BarAccumulator {
    pub(crate) const fn new() -> Self {
        Self {
            open: f64::NAN,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close: f64::NAN,
            volume: 0.0,
            open_interest: 0.0,
            timestamp: DateTime::<Utc>::MAX_UTC,
            is_open: false,
        }
    }

    /// Returns the accumulator to its empty sentinel state.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.is_open
    }

    /// Timestamp of the most recently merged input bar.
    pub(crate) const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Merges one input bar, keeping its own timestamp.
    pub(crate) fn merge(&mut self, rec: &BarRecord) {
        self.merge_at(rec, rec.timestamp);
    }

    /// Merges one input bar under a forced timestamp (late-data path).
    ///
    /// The first merge copies all price fields; subsequent merges widen
    /// high/low, overwrite close and sum volume and open interest.
    pub(crate) fn merge_at(&mut self, rec: &BarRecord, timestamp: DateTime<Utc>) {
        if self.is_open {
            self.high = self.high.max(rec.high);
            self.low = self.low.min(rec.low);
        } else {
            self.open = rec.open;
            self.high = rec.high;
            self.low = rec.low;
            self.is_open = true;
        }
        self.close = rec.close;
        self.volume += rec.volume;
        self.open_interest += rec.open_interest;
        self.timestamp = timestamp;
    }

    /// Returns the accumulated bar stamped with the given delivery timestamp.
    pub(crate) const fn snapshot(&self, timestamp: DateTime<Utc>) -> BarRecord {
        BarRecord {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            open_interest: self.open_interest,
        }
    }
}

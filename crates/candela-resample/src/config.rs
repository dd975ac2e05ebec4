//! Engine configuration.

use candela_types::TimeSpec;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Policy configuration for one engine instance.
///
/// All fields are fixed for the lifetime of the engine; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Target timeframe (unit plus compression).
    pub timespec: TimeSpec,
    /// Snap sub-day boundaries to clock edges instead of counting bars.
    pub bar2edge: bool,
    /// Stamp delivered bars with the canonical slot edge rather than the
    /// raw last-seen input timestamp.
    pub adjust_time: bool,
    /// Use the end of the slot as the canonical edge rather than its start.
    pub right_edge: bool,
    /// Shifts the sub-day boundary grid by this many units.
    pub boundary_offset: i64,
    /// Merge non-advancing (late) ticks instead of dropping them.
    pub take_late: bool,
    /// Stamp daily bars with the session end instead of the raw timestamp.
    pub use_session_end: bool,
    /// Time of day at which a trading session ends.
    pub session_end: NaiveTime,
}

impl SamplerConfig {
    /// Creates a configuration with the default policy flags for the given
    /// timeframe.
    #[must_use]
    pub fn new(timespec: TimeSpec) -> Self {
        Self {
            timespec,
            bar2edge: true,
            adjust_time: true,
            right_edge: true,
            boundary_offset: 0,
            take_late: false,
            use_session_end: true,
            session_end: default_session_end(),
        }
    }

    /// Sets whether sub-day boundaries snap to clock edges.
    #[must_use]
    pub const fn with_bar2edge(mut self, bar2edge: bool) -> Self {
        self.bar2edge = bar2edge;
        self
    }

    /// Sets whether delivered bars are stamped on the canonical edge.
    #[must_use]
    pub const fn with_adjust_time(mut self, adjust_time: bool) -> Self {
        self.adjust_time = adjust_time;
        self
    }

    /// Sets whether the canonical edge is the slot end or the slot start.
    #[must_use]
    pub const fn with_right_edge(mut self, right_edge: bool) -> Self {
        self.right_edge = right_edge;
        self
    }

    /// Sets the boundary grid offset in timeframe units.
    #[must_use]
    pub const fn with_boundary_offset(mut self, offset: i64) -> Self {
        self.boundary_offset = offset;
        self
    }

    /// Sets whether late ticks are merged rather than dropped.
    #[must_use]
    pub const fn with_take_late(mut self, take_late: bool) -> Self {
        self.take_late = take_late;
        self
    }

    /// Sets whether daily bars are stamped with the session end.
    #[must_use]
    pub const fn with_use_session_end(mut self, use_session_end: bool) -> Self {
        self.use_session_end = use_session_end;
        self
    }

    /// Sets the session end time of day.
    #[must_use]
    pub const fn with_session_end(mut self, session_end: NaiveTime) -> Self {
        self.session_end = session_end;
        self
    }

    /// Returns true when clock-edge snapping is actually in effect: it was
    /// requested, the unit is sub-day and the compression divides the day
    /// evenly. Anything else falls back to plain bar counting.
    #[must_use]
    pub const fn edge_effective(&self) -> bool {
        self.bar2edge && self.timespec.divides_day()
    }
}

/// End-of-day default session end (23:59:59.999999).
#[must_use]
pub(crate) fn default_session_end() -> NaiveTime {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
}

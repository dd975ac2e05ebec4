//! Edge alignment of delivery timestamps.

use candela_types::{TimeSpec, TimeUnit};
use chrono::{DateTime, Days, Timelike, Utc};

/// Returns the intraday "point" of a timestamp in timeframe units
/// (seconds or minutes since midnight), shifted by the boundary offset.
pub(crate) fn time_point(ts: DateTime<Utc>, unit: TimeUnit, offset: i64) -> i64 {
    let seconds = i64::from(ts.time().num_seconds_from_midnight());
    let point = match unit {
        TimeUnit::Minute => seconds / 60,
        _ => seconds,
    };
    point + offset
}

/// Computes the canonical delivery timestamp for a closing sub-day bar.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeAligner {
    spec: TimeSpec,
    right_edge: bool,
    boundary_offset: i64,
}

impl EdgeAligner {
    pub(crate) const fn new(spec: TimeSpec, right_edge: bool, boundary_offset: i64) -> Self {
        Self {
            spec,
            right_edge,
            boundary_offset,
        }
    }

    /// Snaps the accumulator timestamp onto its compression slot edge.
    ///
    /// Every tick inside one slot aligns to the same value, and with the
    /// right edge selected the result is the first instant past the slot,
    /// carrying into the next day when the reconstructed hour passes 24.
    pub(crate) fn align(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let per = i64::from(self.spec.compression);
        let point = time_point(ts, self.spec.unit, self.boundary_offset);

        let mut slot = point.div_euclid(per);
        if self.right_edge {
            slot += 1;
        }
        let mut edge = slot * per;

        let per_day = match self.spec.unit {
            TimeUnit::Minute => 1_440,
            _ => 86_400,
        };
        let mut date = ts.date_naive();
        let carry = edge.div_euclid(per_day);
        edge = edge.rem_euclid(per_day);
        if carry > 0 {
            date = date
                .checked_add_days(Days::new(carry.unsigned_abs()))
                .unwrap_or(date);
        } else if carry < 0 {
            date = date
                .checked_sub_days(Days::new(carry.unsigned_abs()))
                .unwrap_or(date);
        }

        let (hour, minute, second) = match self.spec.unit {
            TimeUnit::Minute => (edge / 60, edge % 60, 0),
            _ => (edge / 3_600, (edge % 3_600) / 60, edge % 60),
        };

        // The carry above bounds hour to 0..24, so the reconstruction
        // cannot fail.
        date.and_hms_opt(hour as u32, minute as u32, second as u32)
            .unwrap()
            .and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, second).unwrap()
    }

    #[test]
    fn test_right_edge_minutes() {
        let aligner = EdgeAligner::new(TimeSpec::new(TimeUnit::Minute, 5), true, 0);
        assert_eq!(aligner.align(ts(9, 0, 0)), ts(9, 5, 0));
        assert_eq!(aligner.align(ts(9, 4, 0)), ts(9, 5, 0));
        assert_eq!(aligner.align(ts(9, 5, 0)), ts(9, 10, 0));
    }

    #[test]
    fn test_left_edge_minutes() {
        let aligner = EdgeAligner::new(TimeSpec::new(TimeUnit::Minute, 15), false, 0);
        assert_eq!(aligner.align(ts(14, 37, 45)), ts(14, 30, 0));
        assert_eq!(aligner.align(ts(14, 44, 59)), ts(14, 30, 0));
    }

    #[test]
    fn test_idempotent_within_slot() {
        let aligner = EdgeAligner::new(TimeSpec::new(TimeUnit::Second, 30), true, 0);
        let a = aligner.align(ts(10, 0, 1));
        let b = aligner.align(ts(10, 0, 17));
        let c = aligner.align(ts(10, 0, 29));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, ts(10, 0, 30));
    }

    #[test]
    fn test_midnight_carry() {
        let aligner = EdgeAligner::new(TimeSpec::new(TimeUnit::Minute, 60), true, 0);
        let aligned = aligner.align(ts(23, 30, 0));
        assert_eq!(aligned, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_boundary_offset_shifts_grouping() {
        // A 30-second offset moves the minute grid to hh:mm:30, so a tick
        // at :40 already sits in the next slot.
        let plain = EdgeAligner::new(TimeSpec::new(TimeUnit::Second, 60), true, 0);
        let offset = EdgeAligner::new(TimeSpec::new(TimeUnit::Second, 60), true, 30);
        assert_eq!(plain.align(ts(9, 0, 40)), ts(9, 1, 0));
        assert_eq!(offset.align(ts(9, 0, 40)), ts(9, 2, 0));
    }
}

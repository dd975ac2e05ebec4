//! Boundary detection across timeframe units.

use crate::align::time_point;
use crate::bar::BarAccumulator;
use crate::calendar::TradingCalendar;
use crate::config::SamplerConfig;
use candela_types::{TimeSpec, TimeUnit};
use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};

/// Decides whether the in-progress bar must close before the incoming tick.
///
/// Holds the per-session state the decision needs: the lazily computed end
/// of the current trading session (day unit) and the injected trading
/// calendar (week/month/year units).
#[derive(Debug)]
pub(crate) struct BoundaryDetector {
    spec: TimeSpec,
    edge_effective: bool,
    boundary_offset: i64,
    session_end: NaiveTime,
    next_session_end: Option<DateTime<Utc>>,
    calendar: Box<dyn TradingCalendar>,
}

impl BoundaryDetector {
    pub(crate) fn new(config: &SamplerConfig, calendar: Box<dyn TradingCalendar>) -> Self {
        let spec = config.timespec;
        let edge_effective = config.edge_effective();
        if config.bar2edge
            && spec.is_subday()
            && spec.unit != TimeUnit::Tick
            && !edge_effective
        {
            tracing::warn!(
                timespec = %spec,
                "compression does not divide the day evenly; \
                 falling back to plain bar-count grouping"
            );
        }
        Self {
            spec,
            edge_effective,
            boundary_offset: config.boundary_offset,
            session_end: config.session_end,
            next_session_end: None,
            calendar,
        }
    }

    /// Returns true when the accumulator's bar is over and must close
    /// before `incoming` is merged.
    pub(crate) fn is_over(&mut self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        if !acc.is_open() {
            return false;
        }
        match self.spec.unit {
            TimeUnit::Tick => true,
            TimeUnit::Second | TimeUnit::Minute => self.subday_over(acc, incoming),
            TimeUnit::Day => self.session_over(acc, incoming),
            TimeUnit::Week => self.week_over(acc, incoming),
            TimeUnit::Month => self.month_over(acc, incoming),
            TimeUnit::Year => self.year_over(acc, incoming),
        }
    }

    /// Integer compression slot of a timestamp on the sub-day grid.
    fn slot(&self, ts: DateTime<Utc>) -> i64 {
        time_point(ts, self.spec.unit, self.boundary_offset)
            .div_euclid(i64::from(self.spec.compression))
    }

    fn subday_over(&self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        if !self.edge_effective {
            // Degraded mode: every consumed tick is its own boundary and
            // grouping is left to the compression counter.
            return true;
        }
        let held = acc.timestamp();
        incoming.date_naive() > held.date_naive() || self.slot(incoming) > self.slot(held)
    }

    fn session_over(&mut self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        let eos = self.current_session_end(acc.timestamp());
        // The degenerate arm closes bars whose own last tick already sits
        // on the session end, so a market gap cannot hold a bar open.
        incoming >= eos || acc.timestamp() >= eos
    }

    fn week_over(&self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        let held = acc.timestamp().date_naive();
        let inc = incoming.date_naive();
        let held_week = (held.iso_week().year(), held.iso_week().week());
        let inc_week = (inc.iso_week().year(), inc.iso_week().week());
        inc_week > held_week || (inc > held && self.calendar.is_last_weekday(held))
    }

    fn month_over(&self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        let held = acc.timestamp().date_naive();
        let inc = incoming.date_naive();
        (inc.year(), inc.month()) > (held.year(), held.month())
            || (inc > held && self.calendar.is_last_monthday(held))
    }

    fn year_over(&self, acc: &BarAccumulator, incoming: DateTime<Utc>) -> bool {
        let held = acc.timestamp().date_naive();
        let inc = incoming.date_naive();
        inc.year() > held.year() || (inc > held && self.calendar.is_last_yearday(held))
    }

    /// End of the trading session the accumulator's bar belongs to,
    /// computed once per session and cached until crossed.
    ///
    /// A bar that opens past its own date's session end belongs to the
    /// next session, so the marker rolls forward a day.
    pub(crate) fn current_session_end(&mut self, held: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(eos) = self.next_session_end {
            return eos;
        }
        let mut date = held.date_naive();
        let mut eos = date.and_time(self.session_end).and_utc();
        while eos < held {
            let Some(next) = date.checked_add_days(Days::new(1)) else {
                break;
            };
            date = next;
            eos = date.and_time(self.session_end).and_utc();
        }
        self.next_session_end = Some(eos);
        eos
    }

    /// Drops the cached session end after a crossing was counted.
    pub(crate) fn clear_session(&mut self) {
        self.next_session_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::IsoCalendar;
    use candela_types::BarRecord;
    use chrono::{NaiveDate, TimeZone, Weekday};

    fn detector(spec: TimeSpec) -> BoundaryDetector {
        BoundaryDetector::new(&SamplerConfig::new(spec), Box::new(IsoCalendar))
    }

    fn open_acc(ts: DateTime<Utc>) -> BarAccumulator {
        let mut acc = BarAccumulator::new();
        acc.merge(&BarRecord::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0));
        acc
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_closed_accumulator_never_over() {
        let mut det = detector(TimeSpec::new(TimeUnit::Minute, 5));
        assert!(!det.is_over(&BarAccumulator::new(), ts(2024, 1, 15, 9, 0, 0)));
    }

    #[test]
    fn test_minute_slots() {
        let mut det = detector(TimeSpec::new(TimeUnit::Minute, 5));
        let acc = open_acc(ts(2024, 1, 15, 9, 2, 0));
        assert!(!det.is_over(&acc, ts(2024, 1, 15, 9, 4, 59)));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 9, 5, 0)));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 9, 17, 0)));
    }

    #[test]
    fn test_midnight_rollover_closes_subday_bar() {
        let mut det = detector(TimeSpec::new(TimeUnit::Minute, 60));
        let acc = open_acc(ts(2024, 1, 15, 23, 59, 0));
        assert!(det.is_over(&acc, ts(2024, 1, 16, 0, 1, 0)));
    }

    #[test]
    fn test_degraded_compression_counts_every_tick() {
        // 7 minutes does not divide 1440
        let mut det = detector(TimeSpec::new(TimeUnit::Minute, 7));
        let acc = open_acc(ts(2024, 1, 15, 9, 0, 0));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 9, 1, 0)));
    }

    #[test]
    fn test_session_end_cached_and_crossed() {
        let mut det = detector(TimeSpec::new(TimeUnit::Day, 1));
        let acc = open_acc(ts(2024, 1, 15, 10, 0, 0));
        assert!(!det.is_over(&acc, ts(2024, 1, 15, 16, 0, 0)));
        assert!(det.is_over(&acc, ts(2024, 1, 16, 0, 0, 0)));
    }

    #[test]
    fn test_degenerate_session_close() {
        // With a 16:00 session end, a bar whose own last tick already sits
        // on the session end closes at the next tick even within the same
        // calendar day.
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Day, 1))
            .with_session_end(NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        let mut det = BoundaryDetector::new(&config, Box::new(IsoCalendar));
        let acc = open_acc(ts(2024, 1, 15, 16, 0, 0));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 16, 0, 1)));

        let mut det = BoundaryDetector::new(&config, Box::new(IsoCalendar));
        let acc = open_acc(ts(2024, 1, 15, 15, 0, 0));
        assert!(!det.is_over(&acc, ts(2024, 1, 15, 15, 30, 0)));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 16, 0, 0)));
    }

    #[test]
    fn test_session_end_rolls_past_late_open() {
        // A bar opened after its own date's session end belongs to the
        // next session and must not close on same-day ticks.
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Day, 1))
            .with_session_end(NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        let mut det = BoundaryDetector::new(&config, Box::new(IsoCalendar));
        let acc = open_acc(ts(2024, 1, 15, 16, 30, 0));
        assert!(!det.is_over(&acc, ts(2024, 1, 15, 16, 45, 0)));
        assert!(det.is_over(&acc, ts(2024, 1, 16, 16, 0, 0)));
    }

    #[test]
    fn test_week_bucket() {
        let mut det = detector(TimeSpec::new(TimeUnit::Week, 1));
        // 2024-01-12 is a Friday, 2024-01-15 the following Monday.
        let acc = open_acc(ts(2024, 1, 12, 0, 0, 0));
        assert!(!det.is_over(&acc, ts(2024, 1, 13, 0, 0, 0)));
        assert!(det.is_over(&acc, ts(2024, 1, 15, 0, 0, 0)));
    }

    #[test]
    fn test_week_calendar_closes_on_last_session() {
        #[derive(Debug)]
        struct FridayClose;
        impl TradingCalendar for FridayClose {
            fn is_last_weekday(&self, date: NaiveDate) -> bool {
                date.weekday() == Weekday::Fri
            }
            fn is_last_monthday(&self, _date: NaiveDate) -> bool {
                false
            }
            fn is_last_yearday(&self, _date: NaiveDate) -> bool {
                false
            }
        }

        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Week, 1));
        let mut det = BoundaryDetector::new(&config, Box::new(FridayClose));
        let friday = open_acc(ts(2024, 1, 12, 0, 0, 0));
        // Saturday is still the same ISO week, but Friday was the last session.
        assert!(det.is_over(&friday, ts(2024, 1, 13, 0, 0, 0)));
        // Mid-Friday ticks must not close the bar early.
        assert!(!det.is_over(&friday, ts(2024, 1, 12, 18, 0, 0)));
    }

    #[test]
    fn test_month_and_year_buckets() {
        let mut det = detector(TimeSpec::new(TimeUnit::Month, 1));
        let acc = open_acc(ts(2024, 1, 31, 0, 0, 0));
        assert!(det.is_over(&acc, ts(2024, 2, 1, 0, 0, 0)));

        let mut det = detector(TimeSpec::new(TimeUnit::Year, 1));
        let acc = open_acc(ts(2024, 12, 31, 0, 0, 0));
        assert!(!det.is_over(&acc, ts(2024, 12, 31, 12, 0, 0)));
        assert!(det.is_over(&acc, ts(2025, 1, 1, 0, 0, 0)));
    }
}

//! Resample policy: deliver only completed bars.

use crate::align::EdgeAligner;
use crate::bar::BarAccumulator;
use crate::boundary::BoundaryDetector;
use crate::calendar::{IsoCalendar, TradingCalendar};
use crate::config::SamplerConfig;
use candela_types::{BarRecord, TimeUnit};
use chrono::{DateTime, TimeDelta, Utc};

/// Streaming bar resampler.
///
/// Holds one in-progress bar and emits it only once its boundary has been
/// crossed (or the source is exhausted). Feed input bars one at a time via
/// [`consume`](Self::consume) and finish with [`last`](Self::last).
#[derive(Debug)]
pub struct Resampler {
    config: SamplerConfig,
    aligner: EdgeAligner,
    boundary: BoundaryDetector,
    acc: BarAccumulator,
    comp_count: u32,
    deliver_every: u32,
    count_based: bool,
    last_delivered: Option<DateTime<Utc>>,
    finished: bool,
}

impl Resampler {
    /// Creates a resampler with the calendar-less default calendar.
    #[must_use]
    pub fn new(config: SamplerConfig) -> Self {
        Self::with_calendar(config, Box::new(IsoCalendar))
    }

    /// Creates a resampler with an injected trading calendar.
    #[must_use]
    pub fn with_calendar(config: SamplerConfig, calendar: Box<dyn TradingCalendar>) -> Self {
        // With effective edge snapping the compression is already folded
        // into the slot arithmetic; everything else groups crossings by
        // counting.
        let edge = config.timespec.is_subday() && config.edge_effective();
        let count_based = config.timespec.is_subday() && !config.edge_effective();
        Self {
            aligner: EdgeAligner::new(config.timespec, config.right_edge, config.boundary_offset),
            boundary: BoundaryDetector::new(&config, calendar),
            acc: BarAccumulator::new(),
            comp_count: 0,
            deliver_every: if edge { 1 } else { config.timespec.compression },
            count_based,
            last_delivered: None,
            finished: false,
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Timestamp of the most recently delivered bar, if any.
    #[must_use]
    pub const fn last_delivered(&self) -> Option<DateTime<Utc>> {
        self.last_delivered
    }

    /// Processes one input bar, returning a completed output bar when the
    /// input crossed a boundary.
    ///
    /// # Panics
    ///
    /// Panics when called after [`last`](Self::last); consuming past the
    /// forced final delivery is a programming error.
    pub fn consume(&mut self, rec: &BarRecord) -> Option<BarRecord> {
        assert!(
            !self.finished,
            "Resampler::consume called after last() finalized the stream"
        );

        // Live feeds routinely redeliver the last tick; a non-advancing
        // timestamp is dropped, or merged under a forced timestamp when
        // late ticks are taken.
        if let Some(last) = self.last_delivered {
            if rec.timestamp <= last {
                if self.config.take_late {
                    self.acc.merge_at(rec, last + TimeDelta::microseconds(1));
                }
                return None;
            }
        }

        if self.config.timespec.is_subday() {
            self.consume_subday(rec)
        } else {
            self.consume_session(rec)
        }
    }

    /// Force-delivers the in-progress bar once the source is exhausted.
    ///
    /// Idempotent: repeated calls return `None` after the first delivery.
    pub fn last(&mut self) -> Option<BarRecord> {
        if self.finished {
            return None;
        }
        self.finished = true;
        if !self.acc.is_open() {
            return None;
        }
        let ts = if self.config.timespec.is_subday() {
            self.subday_delivery_ts()
        } else {
            self.session_delivery_ts()
        };
        Some(self.deliver(ts))
    }

    /// Sub-day units merge the tick first unless it crossed the boundary,
    /// in which case the closed bar goes out and the tick seeds the fresh
    /// accumulator, so no tick is ever lost or duplicated.
    fn consume_subday(&mut self, rec: &BarRecord) -> Option<BarRecord> {
        if self.count_based {
            self.acc.merge(rec);
            self.comp_count += 1;
            if self.comp_count < self.deliver_every {
                return None;
            }
            self.comp_count = 0;
            let ts = self.acc.timestamp();
            return Some(self.deliver(ts));
        }

        if !self.boundary.is_over(&self.acc, rec.timestamp) {
            self.acc.merge(rec);
            return None;
        }
        let ts = self.subday_delivery_ts();
        let delivered = self.deliver(ts);
        self.acc.merge(rec);
        Some(delivered)
    }

    /// Day and above evaluate the boundary against the incoming bar before
    /// consuming it: a session bar never contains the tick that closed it.
    fn consume_session(&mut self, rec: &BarRecord) -> Option<BarRecord> {
        let mut delivered = None;
        if self.boundary.is_over(&self.acc, rec.timestamp) {
            self.comp_count += 1;
            if self.comp_count >= self.deliver_every {
                self.comp_count = 0;
                let ts = self.session_delivery_ts();
                delivered = Some(self.deliver(ts));
            }
            self.boundary.clear_session();
        }
        self.acc.merge(rec);
        delivered
    }

    fn subday_delivery_ts(&self) -> DateTime<Utc> {
        if self.count_based || !self.config.adjust_time {
            self.acc.timestamp()
        } else {
            self.aligner.align(self.acc.timestamp())
        }
    }

    fn session_delivery_ts(&mut self) -> DateTime<Utc> {
        if self.config.timespec.unit == TimeUnit::Day
            && self.config.adjust_time
            && self.config.use_session_end
        {
            self.boundary.current_session_end(self.acc.timestamp())
        } else {
            self.acc.timestamp()
        }
    }

    fn deliver(&mut self, ts: DateTime<Utc>) -> BarRecord {
        debug_assert!(
            self.last_delivered.is_none_or(|prev| ts > prev),
            "delivery timestamps must be strictly increasing"
        );
        let bar = self.acc.snapshot(ts);
        self.acc.reset();
        self.last_delivered = Some(bar.timestamp);
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TradingCalendar;
    use candela_types::TimeSpec;
    use chrono::{Datelike, NaiveDate, TimeZone, Weekday};

    fn minute_bar(
        minute: u32,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> BarRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 9, minute, 0).unwrap();
        BarRecord::new(timestamp, open, high, low, close, volume, 0.0)
    }

    /// The five one-minute bars shared by the compression scenarios.
    fn nine_oclock_bars() -> Vec<BarRecord> {
        vec![
            minute_bar(0, 10.0, 11.0, 9.0, 10.0, 100.0),
            minute_bar(1, 10.0, 12.0, 10.0, 11.0, 150.0),
            minute_bar(2, 11.0, 11.0, 10.0, 10.0, 120.0),
            minute_bar(3, 10.0, 10.0, 9.0, 9.0, 80.0),
            minute_bar(4, 9.0, 10.0, 9.0, 10.0, 90.0),
        ]
    }

    fn day_bar(y: i32, m: u32, d: u32, close: f64) -> BarRecord {
        let timestamp = Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();
        BarRecord::new(timestamp, close, close, close, close, 1000.0, 0.0)
    }

    #[test]
    fn test_five_minute_bar_right_edge() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Resampler::new(config);

        let mut out = Vec::new();
        for rec in nine_oclock_bars() {
            out.extend(engine.consume(&rec));
        }
        out.extend(engine.last());

        assert_eq!(out.len(), 1);
        let bar = out[0];
        assert_eq!(
            bar.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap()
        );
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.high, 12.0);
        assert_eq!(bar.low, 9.0);
        assert_eq!(bar.close, 10.0);
        assert_eq!(bar.volume, 540.0);
    }

    #[test]
    fn test_minute_pairs_with_partial_tail() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 2));
        let mut engine = Resampler::new(config);

        let mut out = Vec::new();
        for rec in nine_oclock_bars() {
            out.extend(engine.consume(&rec));
        }
        assert_eq!(out.len(), 2, "two complete pairs before the stream ends");
        out.extend(engine.last());
        assert_eq!(out.len(), 3, "last() flushes the partial 09:04 bar");

        // 09:00 + 09:01
        assert_eq!(out[0].volume, 250.0);
        assert_eq!(out[0].high, 12.0);
        // 09:02 + 09:03
        assert_eq!(out[1].volume, 200.0);
        assert_eq!(out[1].low, 9.0);
        // 09:04 alone
        assert_eq!(out[2].volume, 90.0);
        assert_eq!(out[2].open, 9.0);
    }

    #[test]
    fn test_late_tick_dropped_without_mutation() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Resampler::new(config);

        for rec in nine_oclock_bars() {
            engine.consume(&rec);
        }
        // Crossing into the next slot delivers the 09:00-09:04 bar.
        let bar = engine
            .consume(&minute_bar(5, 10.0, 10.5, 10.0, 10.2, 60.0))
            .unwrap();
        let delivered_at = engine.last_delivered().unwrap();
        assert_eq!(bar.timestamp, delivered_at);

        // A tick older than the delivery must change nothing.
        let late = minute_bar(3, 99.0, 99.0, 99.0, 99.0, 999.0);
        assert!(engine.consume(&late).is_none());
        assert_eq!(engine.last_delivered(), Some(delivered_at));

        // The open 09:05 accumulation is unaffected by the late tick.
        let tail = engine.last().unwrap();
        assert_eq!(tail.volume, 60.0);
        assert_eq!(tail.high, 10.5);
    }

    #[test]
    fn test_take_late_merges_under_forced_timestamp() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5)).with_take_late(true);
        let mut engine = Resampler::new(config);

        for rec in nine_oclock_bars() {
            engine.consume(&rec);
        }
        engine
            .consume(&minute_bar(5, 10.0, 10.5, 10.0, 10.2, 60.0))
            .unwrap();
        let delivered_at = engine.last_delivered().unwrap();

        // The late tick is absorbed, stamped just past the delivery.
        let late = minute_bar(3, 10.0, 42.0, 10.0, 10.0, 5.0);
        assert!(engine.consume(&late).is_none());

        let tail = engine.last().unwrap();
        assert_eq!(tail.high, 42.0);
        assert_eq!(tail.volume, 65.0);
        assert!(tail.timestamp > delivered_at);
    }

    #[test]
    fn test_tick_compression_groups_and_includes_nth_tick() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Tick, 3));
        let mut engine = Resampler::new(config);

        let bars = nine_oclock_bars();
        assert!(engine.consume(&bars[0]).is_none());
        assert!(engine.consume(&bars[1]).is_none());
        // The third tick completes the group and is part of it.
        let bar = engine.consume(&bars[2]).unwrap();
        assert_eq!(bar.volume, 370.0);
        assert_eq!(bar.close, 10.0);
        assert_eq!(bar.timestamp, bars[2].timestamp);
    }

    #[test]
    fn test_degraded_compression_falls_back_to_counting() {
        // 7 does not divide 1440, so edge snapping degrades to counting.
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 7));
        let mut engine = Resampler::new(config);

        let mut out = Vec::new();
        for rec in nine_oclock_bars() {
            out.extend(engine.consume(&rec));
        }
        // Five bars in, one complete group of seven not reached.
        assert!(out.is_empty());
        out.extend(engine.last());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].volume, 540.0);
        // Degraded delivery keeps the raw last-seen timestamp.
        assert_eq!(out[0].timestamp, nine_oclock_bars()[4].timestamp);
    }

    #[test]
    fn test_adjust_time_disabled_keeps_raw_timestamp() {
        let config =
            SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5)).with_adjust_time(false);
        let mut engine = Resampler::new(config);

        for rec in nine_oclock_bars() {
            engine.consume(&rec);
        }
        let bar = engine.last().unwrap();
        assert_eq!(bar.timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 9, 4, 0).unwrap());
    }

    #[test]
    fn test_daily_bar_closes_on_next_session() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Day, 1));
        let mut engine = Resampler::new(config);

        assert!(engine.consume(&day_bar(2024, 1, 15, 10.0)).is_none());
        // The next session's bar closes the previous one and is not in it.
        let bar = engine.consume(&day_bar(2024, 1, 16, 11.0)).unwrap();
        assert_eq!(bar.volume, 1000.0);
        assert_eq!(bar.close, 10.0);
        // Stamped on the session end, not the raw midnight input.
        assert_eq!(bar.timestamp.date_naive().day(), 15);
        assert!(bar.timestamp.time() > chrono::NaiveTime::from_hms_opt(23, 59, 58).unwrap());
    }

    #[test]
    fn test_two_day_compression() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Day, 2));
        let mut engine = Resampler::new(config);

        assert!(engine.consume(&day_bar(2024, 1, 15, 10.0)).is_none());
        assert!(engine.consume(&day_bar(2024, 1, 16, 11.0)).is_none());
        let bar = engine.consume(&day_bar(2024, 1, 17, 12.0)).unwrap();
        assert_eq!(bar.volume, 2000.0);
        assert_eq!(bar.close, 11.0);
        assert_eq!(bar.timestamp.date_naive().day(), 16);
    }

    #[test]
    fn test_week_closes_on_friday_with_calendar() {
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
        let mut engine = Resampler::with_calendar(config, Box::new(FridayClose));

        // Mon 2024-01-08 .. Fri 2024-01-12, then a weekend gap to Monday.
        for d in 8..=12 {
            assert!(engine.consume(&day_bar(2024, 1, d, f64::from(d))).is_none());
        }
        let bar = engine.consume(&day_bar(2024, 1, 15, 20.0)).unwrap();
        // The week bar closes on Friday's own timestamp, not Monday's.
        assert_eq!(bar.timestamp, day_bar(2024, 1, 12, 0.0).timestamp);
        assert_eq!(bar.volume, 5000.0);
        assert_eq!(bar.close, 12.0);
    }

    #[test]
    fn test_last_is_idempotent() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Resampler::new(config);
        for rec in nine_oclock_bars() {
            engine.consume(&rec);
        }
        assert!(engine.last().is_some());
        assert!(engine.last().is_none());
        assert!(engine.last().is_none());
    }

    #[test]
    #[should_panic(expected = "after last()")]
    fn test_consume_after_last_panics() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Resampler::new(config);
        engine.consume(&minute_bar(0, 10.0, 11.0, 9.0, 10.0, 100.0));
        engine.last();
        engine.consume(&minute_bar(1, 10.0, 11.0, 9.0, 10.0, 100.0));
    }

    #[test]
    fn test_monotonic_delivery_timestamps() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 2));
        let mut engine = Resampler::new(config);

        let mut stamps = Vec::new();
        for rec in nine_oclock_bars() {
            if let Some(bar) = engine.consume(&rec) {
                stamps.push(bar.timestamp);
            }
        }
        stamps.extend(engine.last().map(|b| b.timestamp));
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}

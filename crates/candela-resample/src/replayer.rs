//! Replay policy: deliver an evolving bar, then freeze it.

use crate::align::EdgeAligner;
use crate::bar::BarAccumulator;
use crate::boundary::BoundaryDetector;
use crate::calendar::{IsoCalendar, TradingCalendar};
use crate::config::SamplerConfig;
use candela_types::{BarRecord, TimeUnit};
use chrono::{DateTime, TimeDelta, Utc};

/// One step of replay output.
///
/// A downstream consumer maintaining an output stack applies `Open` as a
/// push and `Update`/`Freeze` as an in-place replacement of the top entry,
/// so the same logical bar is seen evolving tick by tick until it freezes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayAction {
    /// A new output slot opened with this bar as its first contents.
    Open(BarRecord),
    /// The open slot refined in place.
    Update(BarRecord),
    /// The open slot reached its boundary; no further updates follow.
    Freeze(BarRecord),
}

impl ReplayAction {
    /// Returns the bar carried by this action.
    #[must_use]
    pub const fn bar(&self) -> BarRecord {
        match self {
            Self::Open(bar) | Self::Update(bar) | Self::Freeze(bar) => *bar,
        }
    }

    /// Returns true for the freeze step that finalizes a slot.
    #[must_use]
    pub const fn is_freeze(&self) -> bool {
        matches!(self, Self::Freeze(_))
    }
}

/// Streaming bar replayer.
///
/// Like [`Resampler`](crate::Resampler) but the in-progress bar is pushed
/// to the output on every tick, overwriting the previous version in place,
/// simulating intrabar progress for consumers that want to watch a bar
/// develop.
#[derive(Debug)]
pub struct Replayer {
    config: SamplerConfig,
    aligner: EdgeAligner,
    boundary: BoundaryDetector,
    acc: BarAccumulator,
    comp_count: u32,
    deliver_every: u32,
    count_based: bool,
    first_bar: bool,
    last_frozen: Option<DateTime<Utc>>,
    finished: bool,
}

impl Replayer {
    /// Creates a replayer with the calendar-less default calendar.
    #[must_use]
    pub fn new(config: SamplerConfig) -> Self {
        Self::with_calendar(config, Box::new(IsoCalendar))
    }

    /// Creates a replayer with an injected trading calendar.
    #[must_use]
    pub fn with_calendar(config: SamplerConfig, calendar: Box<dyn TradingCalendar>) -> Self {
        let edge = config.timespec.is_subday() && config.edge_effective();
        let count_based = config.timespec.is_subday() && !config.edge_effective();
        Self {
            aligner: EdgeAligner::new(config.timespec, config.right_edge, config.boundary_offset),
            boundary: BoundaryDetector::new(&config, calendar),
            acc: BarAccumulator::new(),
            comp_count: 0,
            deliver_every: if edge { 1 } else { config.timespec.compression },
            count_based,
            first_bar: true,
            last_frozen: None,
            finished: false,
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Processes one input bar.
    ///
    /// Returns up to two actions: a `Freeze` of the previous slot when the
    /// boundary fired, followed by the `Open`/`Update` for the consumed
    /// tick. The boundary is evaluated against the pre-consumption tick, so
    /// a frozen slot never contains the tick that closed it.
    ///
    /// # Panics
    ///
    /// Panics when called after [`last`](Self::last); consuming past the
    /// forced final freeze is a programming error.
    pub fn consume(&mut self, rec: &BarRecord) -> Vec<ReplayAction> {
        assert!(
            !self.finished,
            "Replayer::consume called after last() finalized the stream"
        );
        let mut actions = Vec::with_capacity(2);

        // Late data: the open slot stays untouched unless late ticks are
        // taken, in which case it absorbs the tick under a forced
        // timestamp just past the reference.
        let reference = if self.acc.is_open() {
            Some(self.acc.timestamp())
        } else {
            self.last_frozen
        };
        if let Some(reference) = reference {
            if rec.timestamp <= reference {
                if self.config.take_late {
                    self.acc
                        .merge_at(rec, reference + TimeDelta::microseconds(1));
                    actions.push(self.emit());
                }
                return actions;
            }
        }

        if self.boundary.is_over(&self.acc, rec.timestamp) {
            self.comp_count += 1;
            if self.comp_count >= self.deliver_every {
                self.comp_count = 0;
                let ts = self.freeze_ts();
                actions.push(self.freeze(ts));
            }
            self.boundary.clear_session();
        }

        self.acc.merge(rec);
        actions.push(self.emit());
        actions
    }

    /// Force-freezes the open slot once the source is exhausted.
    ///
    /// Idempotent: repeated calls return `None` after the first freeze.
    pub fn last(&mut self) -> Option<ReplayAction> {
        if self.finished {
            return None;
        }
        self.finished = true;
        if !self.acc.is_open() {
            return None;
        }
        let ts = self.freeze_ts();
        Some(self.freeze(ts))
    }

    fn emit(&mut self) -> ReplayAction {
        let bar = self.acc.snapshot(self.acc.timestamp());
        if self.first_bar {
            self.first_bar = false;
            ReplayAction::Open(bar)
        } else {
            ReplayAction::Update(bar)
        }
    }

    fn freeze(&mut self, ts: DateTime<Utc>) -> ReplayAction {
        let bar = self.acc.snapshot(ts);
        self.acc.reset();
        self.first_bar = true;
        self.last_frozen = Some(ts);
        ReplayAction::Freeze(bar)
    }

    /// Final timestamp for the freezing slot. Edge alignment is applied
    /// only when it moves the timestamp forward, keeping frozen output
    /// strictly increasing.
    fn freeze_ts(&mut self) -> DateTime<Utc> {
        let raw = self.acc.timestamp();
        if self.count_based || !self.config.adjust_time {
            return raw;
        }
        if self.config.timespec.is_subday() {
            let aligned = self.aligner.align(raw);
            if aligned > raw { aligned } else { raw }
        } else if self.config.timespec.unit == TimeUnit::Day && self.config.use_session_end {
            self.boundary.current_session_end(raw)
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_types::TimeSpec;
    use chrono::TimeZone;

    fn minute_bar(minute: u32, high: f64, low: f64, close: f64, volume: f64) -> BarRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 9, minute, 0).unwrap();
        BarRecord::new(timestamp, close, high, low, close, volume, 0.0)
    }

    #[test]
    fn test_evolving_slot_then_single_freeze() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Replayer::new(config);

        // Three sub-boundary ticks: one open, two in-place updates.
        let a1 = engine.consume(&minute_bar(0, 11.0, 9.0, 10.0, 100.0));
        assert_eq!(a1.len(), 1);
        assert!(matches!(a1[0], ReplayAction::Open(_)));

        let a2 = engine.consume(&minute_bar(1, 12.0, 10.0, 11.0, 150.0));
        assert_eq!(a2.len(), 1);
        assert!(matches!(a2[0], ReplayAction::Update(_)));
        assert_eq!(a2[0].bar().high, 12.0);
        assert_eq!(a2[0].bar().volume, 250.0);

        let a3 = engine.consume(&minute_bar(2, 11.0, 8.0, 9.0, 120.0));
        assert_eq!(a3.len(), 1);
        assert!(matches!(a3[0], ReplayAction::Update(_)));
        assert_eq!(a3[0].bar().low, 8.0);
        assert_eq!(a3[0].bar().volume, 370.0);

        // The boundary tick freezes the slot and opens the next one.
        let a4 = engine.consume(&minute_bar(5, 10.0, 9.5, 9.8, 60.0));
        assert_eq!(a4.len(), 2);
        assert!(a4[0].is_freeze());
        assert!(matches!(a4[1], ReplayAction::Open(_)));

        let frozen = a4[0].bar();
        assert_eq!(frozen.volume, 370.0, "the boundary tick is not in the frozen slot");
        assert_eq!(
            frozen.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap()
        );
        assert_eq!(a4[1].bar().volume, 60.0);
    }

    #[test]
    fn test_late_tick_leaves_open_slot_untouched() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Replayer::new(config);

        engine.consume(&minute_bar(1, 11.0, 9.0, 10.0, 100.0));
        let actions = engine.consume(&minute_bar(0, 99.0, 1.0, 50.0, 999.0));
        assert!(actions.is_empty(), "no overwrite for a regressing tick");

        let frozen = engine.last().unwrap().bar();
        assert_eq!(frozen.volume, 100.0);
        assert_eq!(frozen.high, 11.0);
    }

    #[test]
    fn test_take_late_updates_in_place() {
        let config =
            SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5)).with_take_late(true);
        let mut engine = Replayer::new(config);

        engine.consume(&minute_bar(1, 11.0, 9.0, 10.0, 100.0));
        let actions = engine.consume(&minute_bar(0, 13.0, 9.0, 10.0, 50.0));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ReplayAction::Update(_)));
        let bar = actions[0].bar();
        assert_eq!(bar.high, 13.0);
        assert_eq!(bar.volume, 150.0);
        assert!(bar.timestamp > minute_bar(1, 0.0, 0.0, 0.0, 0.0).timestamp);
    }

    #[test]
    fn test_tick_groups_freeze_before_next_group() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Tick, 2));
        let mut engine = Replayer::new(config);

        // Pre-consumption counting: the freeze lands on the tick after the
        // group is full.
        assert_eq!(engine.consume(&minute_bar(0, 11.0, 9.0, 10.0, 100.0)).len(), 1);
        assert_eq!(engine.consume(&minute_bar(1, 12.0, 10.0, 11.0, 150.0)).len(), 1);
        let actions = engine.consume(&minute_bar(2, 11.0, 10.0, 10.0, 120.0));
        assert_eq!(actions.len(), 2);
        assert!(actions[0].is_freeze());
        assert_eq!(actions[0].bar().volume, 250.0);
        assert_eq!(actions[1].bar().volume, 120.0);
    }

    #[test]
    fn test_last_freezes_once() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Replayer::new(config);
        engine.consume(&minute_bar(0, 11.0, 9.0, 10.0, 100.0));

        let frozen = engine.last();
        assert!(frozen.is_some());
        assert!(frozen.unwrap().is_freeze());
        assert!(engine.last().is_none());
    }

    #[test]
    #[should_panic(expected = "after last()")]
    fn test_consume_after_last_panics() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 5));
        let mut engine = Replayer::new(config);
        engine.consume(&minute_bar(0, 11.0, 9.0, 10.0, 100.0));
        engine.last();
        engine.consume(&minute_bar(1, 11.0, 9.0, 10.0, 100.0));
    }

    #[test]
    fn test_conservation_across_frozen_bars() {
        let config = SamplerConfig::new(TimeSpec::new(TimeUnit::Minute, 2));
        let mut engine = Replayer::new(config);

        let inputs: Vec<BarRecord> = (0..5)
            .map(|m| minute_bar(m, 11.0, 9.0, 10.0, 100.0))
            .collect();
        let mut frozen_volume = 0.0;
        for rec in &inputs {
            for action in engine.consume(rec) {
                if let ReplayAction::Freeze(bar) = action {
                    frozen_volume += bar.volume;
                }
            }
        }
        if let Some(ReplayAction::Freeze(bar)) = engine.last() {
            frozen_volume += bar.volume;
        }
        let input_volume: f64 = inputs.iter().map(|b| b.volume).sum();
        assert_eq!(frozen_volume, input_volume);
    }
}

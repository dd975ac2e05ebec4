//! Output stack and whole-stream drivers.

use crate::config::SamplerConfig;
use crate::replayer::{ReplayAction, Replayer};
use crate::resampler::Resampler;
use candela_types::BarRecord;

/// Delivery stack the driving loop hands to downstream consumers.
///
/// Resampled bars are pushed; replay actions either push a new slot or
/// replace the top entry in place.
#[derive(Debug, Clone, Default)]
pub struct OutputStack {
    bars: Vec<BarRecord>,
}

impl OutputStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self { bars: Vec::new() }
    }

    /// Pushes a completed bar.
    pub fn push(&mut self, bar: BarRecord) {
        self.bars.push(bar);
    }

    /// Applies one replay action: `Open` pushes a new slot,
    /// `Update`/`Freeze` replace the top entry.
    pub fn apply(&mut self, action: ReplayAction) {
        match action {
            ReplayAction::Open(bar) => self.bars.push(bar),
            ReplayAction::Update(bar) | ReplayAction::Freeze(bar) => {
                match self.bars.last_mut() {
                    Some(top) => *top = bar,
                    None => self.bars.push(bar),
                }
            }
        }
    }

    /// Returns the delivered bars in delivery order.
    #[must_use]
    pub fn as_slice(&self) -> &[BarRecord] {
        &self.bars
    }

    /// Consumes the stack, returning the delivered bars.
    #[must_use]
    pub fn into_vec(self) -> Vec<BarRecord> {
        self.bars
    }

    /// Returns the number of delivered bars.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true when nothing has been delivered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Resamples a whole stream, including the forced final delivery.
pub fn resample_all(
    config: SamplerConfig,
    bars: impl IntoIterator<Item = BarRecord>,
) -> Vec<BarRecord> {
    let mut engine = Resampler::new(config);
    let mut out = OutputStack::new();
    for rec in bars {
        if let Some(bar) = engine.consume(&rec) {
            out.push(bar);
        }
    }
    if let Some(bar) = engine.last() {
        out.push(bar);
    }
    out.into_vec()
}

/// Replays a whole stream, including the forced final freeze, returning
/// the finalized output stack.
pub fn replay_all(
    config: SamplerConfig,
    bars: impl IntoIterator<Item = BarRecord>,
) -> Vec<BarRecord> {
    let mut engine = Replayer::new(config);
    let mut out = OutputStack::new();
    for rec in bars {
        for action in engine.consume(&rec) {
            out.apply(action);
        }
    }
    if let Some(action) = engine.last() {
        out.apply(action);
    }
    out.into_vec()
}

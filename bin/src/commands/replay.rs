//! Replay command implementation.

use crate::display::{Format, write_bars};
use crate::input::read_bars;
use anyhow::{Context, Result};
use candela_lib::prelude::*;
use std::path::Path;

/// Replay a bar file, optionally printing every intermediate update.
pub(crate) fn replay(
    input: &Path,
    timeframe: &str,
    output: Option<&Path>,
    format: Format,
    evolution: bool,
) -> Result<()> {
    let timespec: TimeSpec = timeframe
        .parse()
        .with_context(|| format!("Invalid timeframe: {timeframe}"))?;
    let config = SamplerConfig::new(timespec);

    let bars = read_bars(input)?;
    let input_count = bars.len();

    let mut engine = Replayer::new(config);
    let mut stack = OutputStack::new();
    let mut freezes = 0_usize;
    for rec in bars {
        for action in engine.consume(&rec) {
            if evolution {
                print_action(&action, stack.len());
            }
            if action.is_freeze() {
                freezes += 1;
            }
            stack.apply(action);
        }
    }
    if let Some(action) = engine.last() {
        if evolution {
            print_action(&action, stack.len());
        }
        freezes += 1;
        stack.apply(action);
    }

    write_bars(stack.as_slice(), output, format)?;
    eprintln!("Replayed {input_count} bars into {freezes} frozen {timespec} bars");
    Ok(())
}

fn print_action(action: &ReplayAction, stack_len: usize) {
    let bar = action.bar();
    let kind = match action {
        ReplayAction::Open(_) => "open",
        ReplayAction::Update(_) => "update",
        ReplayAction::Freeze(_) => "freeze",
    };
    let slot = match action {
        // An open pushes a new slot; updates and freezes rewrite the top.
        ReplayAction::Open(_) => stack_len,
        _ => stack_len.saturating_sub(1),
    };
    eprintln!(
        "[{slot:>4}] {kind:<6} {} O={} H={} L={} C={} V={}",
        bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
    );
}

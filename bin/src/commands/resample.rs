//! Resample command implementation.

use crate::display::{Format, write_bars};
use crate::input::read_bars;
use anyhow::{Context, Result};
use candela_lib::prelude::*;
use std::path::Path;

/// Resample a bar file to a coarser timeframe.
#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
pub(crate) fn resample(
    input: &Path,
    timeframe: &str,
    output: Option<&Path>,
    format: Format,
    left_edge: bool,
    raw_time: bool,
    take_late: bool,
    boundary_offset: i64,
) -> Result<()> {
    let timespec: TimeSpec = timeframe
        .parse()
        .with_context(|| format!("Invalid timeframe: {timeframe}"))?;

    let config = SamplerConfig::new(timespec)
        .with_right_edge(!left_edge)
        .with_adjust_time(!raw_time)
        .with_take_late(take_late)
        .with_boundary_offset(boundary_offset);

    let bars = read_bars(input)?;
    let input_count = bars.len();
    let out = resample_all(config, bars);

    write_bars(&out, output, format)?;
    eprintln!(
        "Resampled {input_count} bars into {} x {timespec} bars",
        out.len()
    );
    Ok(())
}

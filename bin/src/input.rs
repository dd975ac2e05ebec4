//! Bar file reading for the candela CLI.

use anyhow::{Context, Result, bail};
use candela_lib::prelude::*;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Reads bars from a CSV file.
///
/// Expected columns: `timestamp,open,high,low,close,volume[,open_interest]`
/// with RFC 3339 timestamps. A header row is skipped when present.
pub(crate) fn read_bars(path: &Path) -> Result<Vec<BarRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;

    let mut bars = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if number == 0 && line.to_lowercase().starts_with("timestamp") {
            continue;
        }
        let bar = parse_line(line)
            .with_context(|| format!("Invalid bar on line {}: '{line}'", number + 1))?;
        bars.push(bar);
    }

    if bars.is_empty() {
        bail!("No bars found in {}", path.display());
    }
    Ok(bars)
}

fn parse_line(line: &str) -> Result<BarRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 6 {
        bail!("expected at least 6 comma-separated fields, found {}", fields.len());
    }

    let timestamp: DateTime<Utc> = fields[0]
        .parse()
        .with_context(|| format!("invalid timestamp '{}'", fields[0]))?;
    let mut values = [0.0_f64; 6];
    for (i, field) in fields[1..].iter().take(6).enumerate() {
        values[i] = field
            .parse()
            .with_context(|| format!("invalid number '{field}'"))?;
    }
    let open_interest = if fields.len() > 6 { values[5] } else { 0.0 };

    Ok(BarRecord::new(
        timestamp,
        values[0],
        values[1],
        values[2],
        values[3],
        values[4],
        open_interest,
    ))
}

//! Units command implementation.

use anyhow::Result;
use candela_lib::prelude::*;

/// List supported timeframe units with example timespecs.
pub(crate) fn list_units() -> Result<()> {
    println!("{:<8} {:<10} {}", "UNIT", "EXAMPLE", "DESCRIPTION");
    println!("{}", "-".repeat(50));
    for unit in TimeUnit::all() {
        let (example, description) = match unit {
            TimeUnit::Tick => ("t10", "every N input bars"),
            TimeUnit::Second => ("s30", "seconds since midnight, edge-snapped"),
            TimeUnit::Minute => ("m5", "minutes since midnight, edge-snapped"),
            TimeUnit::Day => ("d1", "trading sessions"),
            TimeUnit::Week => ("w1", "ISO weeks"),
            TimeUnit::Month => ("mo1", "calendar months"),
            TimeUnit::Year => ("y1", "calendar years"),
        };
        println!("{:<8} {example:<10} {description}", unit.as_str());
    }
    Ok(())
}

//! Subcommand implementations for the candela CLI.

pub(crate) mod replay;
pub(crate) mod resample;
pub(crate) mod units;

//! Core types for the candela bar aggregation engine.
//!
//! This crate provides the fundamental data structures used throughout candela:
//!
//! - [`BarRecord`] - A single OHLCV sample with timestamp and open interest
//! - [`TimeUnit`] - Closed set of aggregation units (tick through year)
//! - [`TimeSpec`] - A unit paired with a compression factor
//! - [`CandelaError`] - Shared error type

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod record;
mod timespec;

pub use error::{CandelaError, Result};
pub use record::BarRecord;
pub use timespec::{TimeSpec, TimeSpecParseError, TimeUnit};

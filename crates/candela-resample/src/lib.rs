//! Bar aggregation engine for candela.
//!
//! Converts an ascending stream of OHLCV bars at a base granularity into a
//! coarser stream under two delivery disciplines:
//!
//! - [`Resampler`] - holds an in-progress bar and delivers it only when its
//!   boundary has been crossed
//! - [`Replayer`] - delivers an evolving version of the in-progress bar on
//!   every tick, then freezes it at the boundary
//!
//! Both are pure, deterministic, single-threaded stream transformers driven
//! one input bar at a time.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod align;
mod bar;
mod boundary;
mod calendar;
mod config;
mod replayer;
mod resampler;
mod stack;

pub use calendar::{IsoCalendar, TradingCalendar};
pub use config::SamplerConfig;
pub use replayer::{ReplayAction, Replayer};
pub use resampler::Resampler;
pub use stack::{OutputStack, replay_all, resample_all};

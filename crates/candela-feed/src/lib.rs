//! Realtime polling scheduler for candela.
//!
//! This crate supplies live bars to aggregation pipelines:
//!
//! - [`BarSource`] - capability trait for the external feed
//! - [`PollScheduler`] - timeframe-grouped wake/poll loop with per-callback
//!   delivery queues and cooperative shutdown
//! - [`FeedHandler`] - callback consumer interface
//!
//! The scheduler runs independently of the aggregation engine; engines stay
//! strictly synchronous and single-threaded.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod registry;
mod scheduler;
mod source;

pub use registry::{AssetId, SubscriptionId};
pub use scheduler::{FeedHandler, PollScheduler};
pub use source::{BarSource, FeedError, FetchConfig};

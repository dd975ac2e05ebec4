//! Time-series bar aggregation for Rust.
//!
//! This is a facade crate that re-exports functionality from the candela
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```
//! use candela_lib::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let config = SamplerConfig::new("m5".parse::<TimeSpec>().unwrap());
//! let mut engine = Resampler::new(config);
//!
//! let mut out = Vec::new();
//! for minute in 0..7 {
//!     let bar = BarRecord::new(
//!         Utc.with_ymd_and_hms(2024, 1, 15, 9, minute, 0).unwrap(),
//!         100.0, 101.0, 99.0, 100.5, 10.0, 0.0,
//!     );
//!     out.extend(engine.consume(&bar));
//! }
//! out.extend(engine.last());
//!
//! // One completed five-minute bar plus the finalized partial tail.
//! assert_eq!(out.len(), 2);
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candela_types::*;

// Re-export the aggregation engine
#[cfg(feature = "resample")]
pub use candela_resample::{
    IsoCalendar, OutputStack, ReplayAction, Replayer, Resampler, SamplerConfig, TradingCalendar,
    replay_all, resample_all,
};

// Re-export the feed scheduler
#[cfg(feature = "feed")]
pub use candela_feed::{
    AssetId, BarSource, FeedError, FeedHandler, FetchConfig, PollScheduler, SubscriptionId,
};

// Re-export the persistence collaborator
#[cfg(feature = "store")]
pub use candela_store::{
    OrderRecord, OrderSide, RunRecord, Store, StoreError, StoreHandle, StoreOp, StoreReply,
    StoreRequest, StoreResponse,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use candela_format::{CsvFormatter, FormatError, Formatter, JsonFormatter, OutputFormat};

/// Prelude module for convenient imports.
///
/// ```
/// use candela_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candela_types::{BarRecord, CandelaError, Result, TimeSpec, TimeUnit};

    #[cfg(feature = "resample")]
    pub use candela_resample::{
        IsoCalendar, OutputStack, ReplayAction, Replayer, Resampler, SamplerConfig,
        TradingCalendar, replay_all, resample_all,
    };

    #[cfg(feature = "feed")]
    pub use candela_feed::{BarSource, FeedHandler, FetchConfig, PollScheduler};

    #[cfg(feature = "store")]
    pub use candela_store::{Store, StoreHandle, StoreOp, StoreReply};

    #[cfg(feature = "format")]
    pub use candela_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};
}

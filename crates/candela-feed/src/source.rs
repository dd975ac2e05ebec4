//! Bar source capability and bounded-retry fetching.

use async_trait::async_trait;
use candela_types::{BarRecord, TimeSpec};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the feed scheduler.
#[derive(Error, Debug)]
pub enum FeedError {
    /// A single fetch attempt failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// All retry attempts were exhausted.
    #[error("Fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last underlying error message.
        last: String,
    },

    /// The asset id is not registered.
    #[error("Unknown asset id: {0}")]
    UnknownAsset(u64),
}

/// External feed capability supplying the latest bar for a symbol.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Fetches the most recent bar for the given symbol at the given
    /// timeframe, or `None` when the venue has nothing new yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the fetch attempt fails; the scheduler retries
    /// with backoff up to the configured attempt budget.
    async fn fetch_latest(
        &self,
        symbol: &str,
        venue: &str,
        timespec: TimeSpec,
    ) -> Result<Option<BarRecord>, FeedError>;
}

/// Retry configuration for feed fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum retry attempts for failed fetches.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl FetchConfig {
    /// Calculates the backoff delay with exponential backoff and jitter.
    pub(crate) fn backoff_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base_delay * 2^attempt
        let exp_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(10));
        let capped_delay = exp_delay.min(self.max_delay_ms);

        // Deterministic jitter (±25%) keyed on the attempt number; no
        // random number generator needed.
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let jitter_offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            jitter_offset.saturating_sub(jitter_range)
        } else {
            0
        };

        Duration::from_millis((capped_delay + jitter).max(100))
    }
}

/// Fetches one bar with bounded retries.
///
/// After the attempt budget is exhausted the failure is surfaced as a hard
/// error rather than masked.
pub(crate) async fn fetch_with_retry<S: BarSource + ?Sized>(
    source: &S,
    symbol: &str,
    venue: &str,
    timespec: TimeSpec,
    config: &FetchConfig,
) -> Result<Option<BarRecord>, FeedError> {
    let mut attempts = 0;
    loop {
        match source.fetch_latest(symbol, venue, timespec).await {
            Ok(bar) => return Ok(bar),
            Err(e) if attempts < config.max_retries => {
                attempts += 1;
                tracing::debug!(symbol, venue, attempt = attempts, error = %e, "fetch retry");
                tokio::time::sleep(config.backoff_delay(attempts)).await;
            }
            Err(e) => {
                return Err(FeedError::Exhausted {
                    attempts: attempts + 1,
                    last: e.to_string(),
                });
            }
        }
    }
}

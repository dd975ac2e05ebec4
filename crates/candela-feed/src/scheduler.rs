//! Wake/poll scheduling loop and callback fan-out.

use crate::registry::{AssetId, DueAsset, FeedMessage, Registry, SubscriptionId};
use crate::source::{BarSource, FeedError, FetchConfig, fetch_with_retry};
use candela_types::{BarRecord, TimeSpec};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Wake cadence while no symbol is registered yet.
const IDLE_WAKE: Duration = Duration::from_millis(250);

/// Callback consumer for fetched bars.
///
/// Each registered handler gets its own delivery queue and fan-out worker;
/// handlers never run under the registry lock.
pub trait FeedHandler: Send + 'static {
    /// Called with every bar fetched for the subscribed asset.
    fn on_bar(&mut self, asset: AssetId, bar: BarRecord);

    /// Called when fetching for the subscribed asset failed after all
    /// retries. The default implementation only logs.
    fn on_failure(&mut self, asset: AssetId, error: &str) {
        tracing::error!(asset, error, "feed fetch failed");
    }
}

/// Realtime multi-symbol polling scheduler.
///
/// Groups monitored symbols by timeframe, sleeps until the earliest due
/// group (cancellably), fetches one bar per due symbol and pushes it into
/// every subscriber's delivery queue. Shutdown is cooperative: the signal
/// is checked before sleeping and after waking, and every queue receives an
/// exit sentinel so workers terminate deterministically.
#[derive(Debug)]
pub struct PollScheduler {
    registry: Arc<Mutex<Registry>>,
    shutdown_tx: watch::Sender<bool>,
    poll_handle: Option<JoinHandle<()>>,
    workers: HashMap<SubscriptionId, JoinHandle<()>>,
}

impl PollScheduler {
    /// Starts the scheduler with the default retry configuration.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(source: Arc<dyn BarSource>) -> Self {
        Self::with_config(source, FetchConfig::default())
    }

    /// Starts the scheduler with an explicit retry configuration.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_config(source: Arc<dyn BarSource>, config: FetchConfig) -> Self {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poll_handle = tokio::spawn(poll_loop(
            Arc::clone(&registry),
            source,
            config,
            shutdown_rx,
        ));
        Self {
            registry,
            shutdown_tx,
            poll_handle: Some(poll_handle),
            workers: HashMap::new(),
        }
    }

    /// Registers a (symbol, venue, timeframe) triple for polling.
    ///
    /// Idempotent: registering an identical triple returns the existing id.
    pub fn register_symbol(&self, symbol: &str, venue: &str, timespec: TimeSpec) -> AssetId {
        let key = crate::registry::AssetKey {
            symbol: symbol.to_string(),
            venue: venue.to_string(),
            timespec,
        };
        self.lock_registry().register_symbol(key, Instant::now())
    }

    /// Registers a callback for an asset, spawning its fan-out worker.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UnknownAsset`] when the asset id was never
    /// registered.
    pub fn register_callback<H: FeedHandler>(
        &mut self,
        asset: AssetId,
        mut handler: H,
    ) -> Result<SubscriptionId, FeedError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<FeedMessage>();
        let subscription = self.lock_registry().register_callback(asset, tx)?;

        let worker = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    FeedMessage::Bar(asset, bar) => handler.on_bar(asset, bar),
                    FeedMessage::Failed(asset, error) => handler.on_failure(asset, &error),
                    FeedMessage::Exit => break,
                }
            }
        });
        self.workers.insert(subscription, worker);
        Ok(subscription)
    }

    /// Removes a callback subscription and terminates its worker.
    pub fn unregister_callback(&mut self, subscription: SubscriptionId) {
        let tx = self.lock_registry().unregister_callback(subscription);
        if let Some(tx) = tx {
            let _ = tx.send(FeedMessage::Exit);
        }
        self.workers.remove(&subscription);
    }

    /// Shuts the scheduler down, blocking until the poll loop and every
    /// fan-out worker have exited.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.poll_handle.take() {
            let _ = handle.await;
        }
        let queues = self.lock_registry().drain_subscribers();
        for tx in queues {
            let _ = tx.send(FeedMessage::Exit);
        }
        for (_, worker) in self.workers.drain() {
            let _ = worker.await;
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn poll_loop(
    registry: Arc<Mutex<Registry>>,
    source: Arc<dyn BarSource>,
    config: FetchConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        // Checked before sleeping...
        if *shutdown.borrow() {
            break;
        }
        let wake = {
            let registry = registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            registry.earliest_due()
        };
        let wake = wake.unwrap_or_else(|| Instant::now() + IDLE_WAKE);

        tokio::select! {
            _ = shutdown.changed() => {}
            () = tokio::time::sleep_until(wake) => {}
        }
        // ...and after waking.
        if *shutdown.borrow() {
            break;
        }

        let due = {
            let mut registry = registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            registry.take_due(Instant::now())
        };
        for asset in due {
            poll_asset(source.as_ref(), &config, asset).await;
        }
    }
}

/// Fetches one bar for a due asset and fans it out; the registry lock is
/// not held here.
async fn poll_asset(source: &dyn BarSource, config: &FetchConfig, asset: DueAsset) {
    let DueAsset { id, key, queues } = asset;
    match fetch_with_retry(source, &key.symbol, &key.venue, key.timespec, config).await {
        Ok(Some(bar)) => {
            tracing::debug!(symbol = %key.symbol, timestamp = %bar.timestamp, "bar fetched");
            for tx in &queues {
                let _ = tx.send(FeedMessage::Bar(id, bar));
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(symbol = %key.symbol, error = %e, "feed fetch exhausted retries");
            let message = e.to_string();
            for tx in &queues {
                let _ = tx.send(FeedMessage::Failed(id, message.clone()));
            }
        }
    }
}

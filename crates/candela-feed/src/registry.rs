//! Symbol and callback registry.

use crate::source::FeedError;
use candela_types::{BarRecord, TimeSpec};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Identifier for a registered (symbol, venue, timeframe) triple.
pub type AssetId = u64;

/// Identifier for a registered callback subscription.
pub type SubscriptionId = u64;

/// Message delivered to per-callback queues.
#[derive(Debug, Clone)]
pub(crate) enum FeedMessage {
    /// A freshly fetched bar for an asset.
    Bar(AssetId, BarRecord),
    /// Fetching for an asset failed after all retries.
    Failed(AssetId, String),
    /// Shutdown sentinel; the receiving worker terminates.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct AssetKey {
    pub(crate) symbol: String,
    pub(crate) venue: String,
    pub(crate) timespec: TimeSpec,
}

#[derive(Debug)]
struct Subscriber {
    asset: AssetId,
    tx: UnboundedSender<FeedMessage>,
}

/// One asset due for polling, with the queues to fan results out to.
#[derive(Debug)]
pub(crate) struct DueAsset {
    pub(crate) id: AssetId,
    pub(crate) key: AssetKey,
    pub(crate) queues: Vec<UnboundedSender<FeedMessage>>,
}

/// Registry of monitored symbols and their callback queues.
///
/// Mutated only under the scheduler's coarse lock so registry edits stay
/// atomic with respect to the wake/poll cycle. The lock is never held
/// across a fetch or a callback invocation.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    next_asset_id: AssetId,
    next_subscription_id: SubscriptionId,
    ids_by_key: HashMap<AssetKey, AssetId>,
    assets: HashMap<AssetId, AssetKey>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    group_due: HashMap<TimeSpec, Instant>,
}

impl Registry {
    /// Registers a symbol, returning the existing id when the identical
    /// triple is already present.
    pub(crate) fn register_symbol(&mut self, key: AssetKey, now: Instant) -> AssetId {
        if let Some(id) = self.ids_by_key.get(&key) {
            return *id;
        }
        let id = self.next_asset_id;
        self.next_asset_id += 1;
        self.group_due
            .entry(key.timespec)
            .or_insert_with(|| now + poll_interval(key.timespec));
        self.ids_by_key.insert(key.clone(), id);
        self.assets.insert(id, key);
        id
    }

    pub(crate) fn register_callback(
        &mut self,
        asset: AssetId,
        tx: UnboundedSender<FeedMessage>,
    ) -> Result<SubscriptionId, FeedError> {
        if !self.assets.contains_key(&asset) {
            return Err(FeedError::UnknownAsset(asset));
        }
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.subscribers.insert(id, Subscriber { asset, tx });
        Ok(id)
    }

    /// Removes a subscription, returning its queue so the caller can send
    /// the exit sentinel outside the lock.
    pub(crate) fn unregister_callback(
        &mut self,
        subscription: SubscriptionId,
    ) -> Option<UnboundedSender<FeedMessage>> {
        self.subscribers.remove(&subscription).map(|s| s.tx)
    }

    /// Earliest next-due wake time across all timeframe groups with at
    /// least one registered asset.
    pub(crate) fn earliest_due(&self) -> Option<Instant> {
        self.group_due
            .iter()
            .filter(|(spec, _)| self.assets.values().any(|k| k.timespec == **spec))
            .map(|(_, due)| *due)
            .min()
    }

    /// Collects the assets of every group due at `now` and advances those
    /// groups to their next wake time.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<DueAsset> {
        let due_specs: Vec<TimeSpec> = self
            .group_due
            .iter()
            .filter(|(_, due)| **due <= now)
            .map(|(spec, _)| *spec)
            .collect();

        let mut due = Vec::new();
        for spec in due_specs {
            if let Some(slot) = self.group_due.get_mut(&spec) {
                *slot = now + poll_interval(spec);
            }
            for (id, key) in &self.assets {
                if key.timespec != spec {
                    continue;
                }
                let queues = self
                    .subscribers
                    .values()
                    .filter(|s| s.asset == *id)
                    .map(|s| s.tx.clone())
                    .collect();
                due.push(DueAsset {
                    id: *id,
                    key: key.clone(),
                    queues,
                });
            }
        }
        due
    }

    /// Drains every subscriber queue for shutdown fan-out.
    pub(crate) fn drain_subscribers(&mut self) -> Vec<UnboundedSender<FeedMessage>> {
        self.subscribers.drain().map(|(_, s)| s.tx).collect()
    }
}

/// Polling cadence for a timeframe group: one bar duration, floored at one
/// second for tick data.
pub(crate) const fn poll_interval(spec: TimeSpec) -> Duration {
    use candela_types::TimeUnit;
    let seconds = match spec.unit {
        TimeUnit::Tick => 1,
        TimeUnit::Second => spec.compression as u64,
        TimeUnit::Minute => spec.compression as u64 * 60,
        TimeUnit::Day => spec.compression as u64 * 86_400,
        TimeUnit::Week => spec.compression as u64 * 7 * 86_400,
        TimeUnit::Month => spec.compression as u64 * 30 * 86_400,
        TimeUnit::Year => spec.compression as u64 * 365 * 86_400,
    };
    Duration::from_secs(seconds)
}

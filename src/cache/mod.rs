// src/cache/mod.rs
//! Expiring key-value state and the background sweeper that prunes it.
//!
//! Every piece of in-process state in this service (sessions, conversation
//! buffers, the in-memory continuity fallback) sits in a [`TtlCache`] so the
//! expiry rules live in one place: writes refresh an entry's lifetime, reads
//! never do, and expired entries are dropped lazily on access plus in bulk by
//! the periodic sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Time-bounded key-value map.
///
/// `insert` and `update` stamp a fresh deadline; `get` evicts an expired
/// entry instead of returning it but does not extend the lifetime of a live
/// one. Entries that are never touched again are reclaimed by `sweep`.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone + Send + Sync> TtlCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Insert or replace, stamping a fresh expiry deadline.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            value,
            expires_at: Utc::now() + self.ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Fetch a clone of a live entry. An expired entry is removed and
    /// reported as absent; a live one keeps its original deadline.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Mutate a live entry in place and refresh its deadline, returning a
    /// clone of the updated value. Returns `None` when the key is absent or
    /// already expired.
    pub async fn update<F>(&self, key: &str, updater: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => {
                updater(&mut entry.value);
                entry.expires_at = Utc::now() + self.ttl;
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Entry count, including expired entries not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn force_expire(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

/// A cache-backed component the background sweeper can prune.
#[async_trait]
pub trait Sweepable: Send + Sync {
    fn name(&self) -> &'static str;
    async fn sweep(&self) -> usize;
}

/// Spawn the background sweep task.
///
/// `interval` is the time between passes over all registered caches.
pub fn spawn_sweeper(
    targets: Vec<Arc<dyn Sweepable>>,
    interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            for target in &targets {
                let removed = target.sweep().await;
                if removed > 0 {
                    info!("🧹 sweep removed {} expired entries from {}", removed, target.name());
                } else {
                    debug!("sweep found nothing expired in {}", target.name());
                }
            }
        }
    })
}

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CounterKey, CounterStore, Scope, SweepOutcome};

type CounterMap = HashMap<CounterKey, u64>;

/// In-memory counter store.
///
/// The write guard is held across the whole entry-or-insert-then-add, so the
/// increment is a single atomic step per key; there is no read/check/write
/// window in which another writer can interleave.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<CounterMap>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        InMemoryCounterStore {
            counters: Arc::new(RwLock::new(CounterMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.read().await.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &CounterKey) -> anyhow::Result<u64> {
        let mut counters = self.counters.write().await;
        let count = counters.entry(key.clone()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn current(&self, key: &CounterKey) -> anyhow::Result<u64> {
        Ok(self.counters.read().await.get(key).copied().unwrap_or(0))
    }

    async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<SweepOutcome> {
        let mut counters = self.counters.write().await;
        let mut outcome = SweepOutcome::default();
        counters.retain(|key, _| {
            if key.bucket < cutoff {
                match key.scope {
                    Scope::Ip => outcome.ip_deleted += 1,
                    Scope::Tenant => outcome.tenant_deleted += 1,
                }
                false
            } else {
                true
            }
        });
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 7, 10, 31, 12).unwrap()
    }

    #[tokio::test]
    async fn increment_creates_at_one_and_counts_up() {
        let store = InMemoryCounterStore::new();
        let key = CounterKey::at(Scope::Ip, "10.0.0.1", fixed_now());

        assert_eq!(store.increment(&key).await.unwrap(), 1);
        assert_eq!(store.increment(&key).await.unwrap(), 2);
        assert_eq!(store.increment(&key).await.unwrap(), 3);
        assert_eq!(store.current(&key).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn current_is_zero_for_missing_counter() {
        let store = InMemoryCounterStore::new();
        let key = CounterKey::at(Scope::Tenant, "demo", fixed_now());
        assert_eq!(store.current(&key).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_increments_lose_no_updates() {
        let store = InMemoryCounterStore::new();
        let key = CounterKey::at(Scope::Ip, "10.0.0.1", fixed_now());

        let mut handles = vec![];
        for _ in 0..100 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store.increment(&key).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.current(&key).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn buckets_are_independent() {
        let store = InMemoryCounterStore::new();
        let now = fixed_now();
        let key_a = CounterKey::at(Scope::Ip, "10.0.0.1", now);
        let key_b = CounterKey::at(Scope::Ip, "10.0.0.1", now + Duration::minutes(1));

        store.increment(&key_a).await.unwrap();
        store.increment(&key_a).await.unwrap();

        assert_eq!(store.current(&key_a).await.unwrap(), 2);
        assert_eq!(store.current(&key_b).await.unwrap(), 0);
        assert_eq!(store.increment(&key_b).await.unwrap(), 1);
        assert_eq!(store.current(&key_a).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sweep_deletes_only_older_buckets_per_scope() {
        let store = InMemoryCounterStore::new();
        let now = fixed_now();
        let old = now - Duration::days(8);

        store
            .increment(&CounterKey::at(Scope::Ip, "10.0.0.1", old))
            .await
            .unwrap();
        store
            .increment(&CounterKey::at(Scope::Tenant, "demo", old))
            .await
            .unwrap();
        store
            .increment(&CounterKey::at(Scope::Tenant, "other", old))
            .await
            .unwrap();
        let fresh = CounterKey::at(Scope::Ip, "10.0.0.1", now);
        store.increment(&fresh).await.unwrap();

        let cutoff = now - Duration::days(7);
        let outcome = store.sweep_older_than(cutoff).await.unwrap();
        assert_eq!(outcome.ip_deleted, 1);
        assert_eq!(outcome.tenant_deleted, 2);
        assert_eq!(outcome.total(), 3);
        assert_eq!(store.current(&fresh).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let store = InMemoryCounterStore::new();
        let now = fixed_now();
        store
            .increment(&CounterKey::at(Scope::Ip, "10.0.0.1", now - Duration::days(10)))
            .await
            .unwrap();

        let cutoff = now - Duration::days(7);
        let first = store.sweep_older_than(cutoff).await.unwrap();
        let second = store.sweep_older_than(cutoff).await.unwrap();
        assert_eq!(first.total(), 1);
        assert_eq!(second.total(), 0);
    }

    #[tokio::test]
    async fn sweep_cutoff_is_strict() {
        let store = InMemoryCounterStore::new();
        let cutoff = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let at_cutoff = CounterKey::new(Scope::Ip, "10.0.0.1", cutoff);
        store.increment(&at_cutoff).await.unwrap();

        let outcome = store.sweep_older_than(cutoff).await.unwrap();
        assert_eq!(outcome.total(), 0);
        assert_eq!(store.current(&at_cutoff).await.unwrap(), 1);
    }
}

//! Keyed rate-limit counters.
//!
//! One counter exists per (scope, key, minute bucket). Counters are created
//! lazily on the first increment, only ever grow within their bucket and are
//! deleted by the retention sweeper once the bucket has aged out.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::InMemoryCounterStore;

/// The dimension a quota is enforced over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Ip,
    Tenant,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Ip => write!(f, "ip"),
            Scope::Tenant => write!(f, "tenant"),
        }
    }
}

/// Logical key of a counter. At most one counter exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub scope: Scope,
    pub key: String,
    pub bucket: DateTime<Utc>,
}

impl CounterKey {
    pub fn new(scope: Scope, key: impl Into<String>, bucket: DateTime<Utc>) -> Self {
        CounterKey {
            scope,
            key: key.into(),
            bucket,
        }
    }

    /// Key for the minute bucket containing `now`.
    pub fn at(scope: Scope, key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::new(scope, key, minute_bucket(now))
    }
}

/// Wall-clock time truncated to the minute, in UTC.
pub fn minute_bucket(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    DateTime::<Utc>::from_timestamp(secs - secs.rem_euclid(60), 0).unwrap_or(now)
}

/// Counters deleted by a retention sweep, per scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub ip_deleted: usize,
    pub tenant_deleted: usize,
}

impl SweepOutcome {
    pub fn total(&self) -> usize {
        self.ip_deleted + self.tenant_deleted
    }
}

/// Durable keyed counters, consumed through an atomic increment-or-create
/// primitive.
///
/// `increment` must be linearizable per key: N concurrent calls for the same
/// key must leave the counter at exactly N. Implementations retry transient
/// contention internally; callers never see a partial update.
#[async_trait]
pub trait CounterStore: fmt::Debug + Send + Sync {
    /// Increment the counter for `key` by exactly one, creating it with a
    /// count of one when absent, and return the count after the increment.
    async fn increment(&self, key: &CounterKey) -> anyhow::Result<u64>;

    /// Current count for `key`, zero when no counter exists.
    async fn current(&self, key: &CounterKey) -> anyhow::Result<u64>;

    /// Delete every counter (both scopes) whose minute bucket is strictly
    /// older than `cutoff`. Idempotent.
    async fn sweep_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<SweepOutcome>;
}

//! Dual-scope admission control built on the counter store.
//!
//! Every check increments the counter for the current minute bucket, then
//! compares against the limit. The count goes up even on the call that
//! exceeds the limit, so abuse stays measurable while being rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::counters::{CounterKey, CounterStore, Scope};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current_count: u64,
    pub limit: u64,
}

impl RateLimitDecision {
    /// Usage rendered as `"{count}/{limit}"`.
    pub fn usage(&self) -> String {
        format!("{}/{}", self.current_count, self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        RateLimiter { store }
    }

    /// Admission check against the current wall clock.
    pub async fn check(
        &self,
        scope: Scope,
        key: &str,
        limit_per_minute: u64,
    ) -> anyhow::Result<RateLimitDecision> {
        self.check_at(Utc::now(), scope, key, limit_per_minute).await
    }

    /// Admission check against an explicit clock.
    ///
    /// Increment-then-compare: a new minute bucket always starts an
    /// independent counter, so a key over quota in one bucket is freely
    /// admitted again in the next.
    pub async fn check_at(
        &self,
        now: DateTime<Utc>,
        scope: Scope,
        key: &str,
        limit_per_minute: u64,
    ) -> anyhow::Result<RateLimitDecision> {
        let counter_key = CounterKey::at(scope, key, now);
        let current_count = self.store.increment(&counter_key).await?;
        let allowed = current_count <= limit_per_minute;
        if !allowed {
            debug!(%scope, key, current_count, limit_per_minute, "request over quota");
        }
        Ok(RateLimitDecision {
            allowed,
            current_count,
            limit: limit_per_minute,
        })
    }
}

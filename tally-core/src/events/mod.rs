//! Event records and the persistence collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A fully-resolved analytics event, ready for persistence. `user_id` and
/// `session_id` are never empty once the pipeline has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Event {
    pub event_name: String,
    pub source: String,
    pub tenant: String,
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "utoipa", schema(value_type = Object))]
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    pub user_id: String,
    pub session_id: String,
    /// Server-observed, never client-asserted.
    pub ip_address: String,
    /// Server-observed, never client-asserted.
    pub user_agent: String,
}

/// An event as persisted, with its assigned id.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub id: Uuid,
    #[serde(flatten)]
    pub event: Event,
}

/// Persistence collaborator. Failures are propagated unchanged; the pipeline
/// never translates or retries them.
#[async_trait]
pub trait EventStore: std::fmt::Debug + Send + Sync {
    async fn persist(&self, event: Event) -> anyhow::Result<StoredEvent>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        InMemoryEventStore {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<StoredEvent> {
        let events = self.events.read().await;
        events.iter().find(|event| event.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn persist(&self, event: Event) -> anyhow::Result<StoredEvent> {
        let stored = StoredEvent {
            id: Uuid::new_v4(),
            event,
        };
        self.events.write().await.push(stored.clone());
        Ok(stored)
    }
}

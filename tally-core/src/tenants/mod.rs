//! Tenant registry.
//!
//! Tenants are provisioned administratively through configuration; the
//! ingestion pipeline only authenticates against them and reads their quota
//! and allow-list.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A registered client application, identified by its public API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Tenant {
    pub slug: String,
    pub name: String,
    pub api_key: String,
    /// Reserved for signed-request verification; never read by the pipeline.
    pub secret_key: String,
    /// Allowed source names; an empty list accepts every source.
    #[serde(default)]
    pub allowed_sources: Vec<String>,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u64,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_rate_limit_per_minute() -> u64 {
    60
}

fn default_is_active() -> bool {
    true
}

impl Tenant {
    pub fn allows_source(&self, source: &str) -> bool {
        self.allowed_sources.is_empty() || self.allowed_sources.iter().any(|s| s == source)
    }
}

type TenantMap = HashMap<String, Tenant>;

/// Shared, api-key-indexed view over the configured tenants.
#[derive(Debug, Clone, Default)]
pub struct SharedTenantList {
    tenants: Arc<RwLock<TenantMap>>,
}

impl SharedTenantList {
    pub fn new() -> SharedTenantList {
        SharedTenantList {
            tenants: Arc::new(RwLock::new(TenantMap::new())),
        }
    }

    pub async fn add_tenant(&self, tenant: Tenant) -> anyhow::Result<()> {
        self.tenants
            .write()
            .await
            .insert(tenant.api_key.clone(), tenant);
        Ok(())
    }

    pub async fn set_tenants(&self, tenants: &[Tenant]) -> anyhow::Result<()> {
        let mut t = self.tenants.write().await;
        t.clear();
        t.extend(
            tenants
                .iter()
                .map(|tenant| (tenant.api_key.clone(), tenant.clone())),
        );
        Ok(())
    }

    /// Look up an active tenant by API key. Inactive tenants are treated the
    /// same as unknown keys.
    pub async fn find_by_api_key(&self, api_key: &str) -> Option<Tenant> {
        let t = self.tenants.read().await;
        t.get(api_key).filter(|tenant| tenant.is_active).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tenants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tenants.read().await.is_empty()
    }
}

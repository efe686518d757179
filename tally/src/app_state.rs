use std::sync::Arc;

use tally_core::counters::{CounterStore, InMemoryCounterStore};
use tally_core::events::{EventStore, InMemoryEventStore};
use tally_core::rate_limit::RateLimiter;
use tally_core::sampling::SamplingGate;
use tally_core::tenants::SharedTenantList;
use tracing::warn;

use crate::settings::config::Settings;
use crate::stop_flag;

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub stop_flag: stop_flag::StopFlag,
    pub tenants: SharedTenantList,
    pub counters: Arc<dyn CounterStore>,
    pub events: Arc<dyn EventStore>,
    pub rate_limiter: RateLimiter,
    pub sampling: SamplingGate,
}

pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub async fn new() -> anyhow::Result<SharedAppState> {
        let settings = Settings::new()?;
        Self::from_settings(settings).await
    }

    pub async fn from_settings(settings: Settings) -> anyhow::Result<SharedAppState> {
        settings.sampling.validate().map_err(anyhow::Error::new)?;

        let tenants = SharedTenantList::new();
        tenants.set_tenants(&settings.tenants).await?;
        if tenants.is_empty().await {
            warn!("No tenants configured, every capture request will be rejected");
        }

        let counters: Arc<dyn CounterStore> = Arc::new(InMemoryCounterStore::new());
        let events: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let rate_limiter = RateLimiter::new(counters.clone());
        let sampling = SamplingGate::from_settings(&settings.sampling);

        Ok(Arc::new(AppState {
            settings,
            stop_flag: stop_flag::StopFlag::new(),
            tenants,
            counters,
            events,
            rate_limiter,
            sampling,
        }))
    }
}

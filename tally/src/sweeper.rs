//! Retention sweeper for expired rate-limit counters.
//!
//! Runs on its own schedule, fully decoupled from request handling. Racing
//! against fresh counter creation is safe: old buckets cannot receive new
//! increments once the clock has moved past them.

use chrono::{Duration, Utc};
use tracing::{error, info, instrument};

use crate::app_state::SharedAppState;

pub async fn setup_retention_sweeper(
    app_state: SharedAppState,
) -> anyhow::Result<tokio::task::JoinHandle<anyhow::Result<()>>> {
    let stop_flag = app_state.stop_flag.clone();
    let mut scheduler = clokwerk::AsyncScheduler::new();

    {
        let app_state = app_state.clone();
        scheduler
            .every(
                app_state
                    .settings
                    .scheduler
                    .counter_cleanup
                    .clone()
                    .into(),
            )
            .run(move || {
                let app_state = app_state.clone();
                async move {
                    sweep_expired_counters(app_state).await;
                }
            });
    }

    // Handle the scheduler in a separate task.
    let handle = tokio::spawn(async move {
        while !stop_flag.is_stopped() {
            scheduler.run_pending().await;
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        Ok::<(), anyhow::Error>(())
    });

    Ok(handle)
}

#[instrument(skip(app_state))]
async fn sweep_expired_counters(app_state: SharedAppState) {
    let cutoff = Utc::now() - Duration::days(app_state.settings.ingest.retention_days);
    match app_state.counters.sweep_older_than(cutoff).await {
        Ok(outcome) => {
            info!(
                ip_deleted = outcome.ip_deleted,
                tenant_deleted = outcome.tenant_deleted,
                "Swept expired rate-limit counters"
            );
        }
        Err(e) => {
            error!("Error while sweeping rate-limit counters: {:?}", e);
        }
    }
}

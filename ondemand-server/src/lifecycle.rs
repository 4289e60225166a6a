//! Scheduled reconciliation of dashboard tiers

use std::sync::Arc;
use std::time::Duration;

use ondemand::action::Action;
use tracing::{debug, error, info};

use crate::AppState;

/// Background task that runs a reconciliation pass on every tick
pub async fn scheduled_job_task(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.job_interval);
    info!("Starting scheduled job with interval: {:?}", interval);

    loop {
        tokio::time::sleep(interval).await;
        debug!("Running scheduled reconciliation...");

        if let Err(e) = state.manager.execute(&Action::ScheduledJob).await {
            error!("Scheduled job error: {:?}", e);
        }
    }
}

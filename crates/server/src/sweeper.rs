//! Background task that completes sessions whose voting window has closed.

use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::services::VotingService;

/// Run `expire_overdue_sessions` every `period` until the handle is aborted.
pub fn spawn_expiry_sweeper(voting: VotingService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "expiry sweeper started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match voting.expire_overdue_sessions(Utc::now()).await {
                Ok(expired) if expired.is_empty() => debug!("no overdue sessions"),
                Ok(expired) => info!(count = expired.len(), "expired overdue sessions"),
                Err(e) => error!(error = %e, "expiry sweep failed"),
            }
        }
    })
}

//! Movie night service process.
//!
//! Loads configuration, wires the services, runs the expiry sweeper and logs
//! realtime events until Ctrl-C.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use server::{App, AppConfig, logging, spawn_expiry_sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.log)?;

    info!(
        provider = ?config.catalog.provider,
        max_groups_per_user = config.groups.max_groups_per_user,
        "Starting movie night server"
    );

    let app = App::build(config).context("Failed to initialise application")?;

    let sweeper = match app.config.sessions.sweep_interval_secs {
        0 => {
            info!("expiry sweeper disabled");
            None
        }
        secs => Some(spawn_expiry_sweeper(app.voting.clone(), Duration::from_secs(secs))),
    };

    let mut events = app.events.subscribe();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(notification) => info!(
                    event = notification.event.as_str(),
                    audience = %notification.audience,
                    payload = %notification.payload,
                    "realtime event"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event feed lagged"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}

//! Tracker TCP service: accepts connections, spawns one task per connection, and periodically
//! (and on shutdown) persists a snapshot of durable state.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::FilemeshResult;
use crate::tracker::dispatcher::handle_connection;
use crate::tracker::registry::Tracker;
use crate::tracker::snapshot::{self, SnapshotData};

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(config: Config) -> FilemeshResult<()> {
    let primary_existed = config.persistence.snapshot_path.exists();
    let state = snapshot::bootstrap(&config.persistence)?;
    let tracker = Arc::new(Tracker::from_state(state));

    // spec.md §4.2: booting from a seed snapshot persists it as the primary immediately, rather
    // than waiting for the first mutation or periodic tick.
    if !primary_existed {
        persist(&tracker, &config.persistence.snapshot_path).await;
    }

    let listener = TcpListener::bind(config.tracker_addr()).await?;
    tracing::info!(addr = %config.tracker_addr(), "tracker listening");

    let connection_limit = Arc::new(Semaphore::new(config.tracker.max_connections as usize));
    let snapshot_path = Arc::new(config.persistence.snapshot_path.clone());

    let snapshot_task = {
        let tracker = tracker.clone();
        let snapshot_path = config.persistence.snapshot_path.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SNAPSHOT_INTERVAL).await;
                persist(&tracker, &snapshot_path).await;
            }
        })
    };

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let tracker = tracker.clone();
                let snapshot_path = snapshot_path.clone();
                let permit = connection_limit.clone().acquire_owned().await.expect("semaphore closed");
                tokio::spawn(async move {
                    handle_connection(tracker, stream, peer_addr, Some(snapshot_path)).await;
                    drop(permit);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received, saving snapshot");
                snapshot_task.abort();
                persist(&tracker, &config.persistence.snapshot_path).await;
                return Ok(());
            }
        }
    }
}

async fn persist(tracker: &Tracker, snapshot_path: &std::path::Path) {
    let view = tracker.snapshot().await;
    let data = SnapshotData::from(&view);
    if let Err(e) = snapshot::save(&data, snapshot_path) {
        tracing::error!(error = %e, "failed to persist tracker snapshot");
    }
}

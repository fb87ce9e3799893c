//! Ticks the three background jobs the engine exposes on a fixed interval,
//! the way `bin/prover-client` drives its proving pipeline off a
//! `tokio::time::interval` loop spawned alongside the RPC server.

use std::sync::Arc;
use std::time::Duration;

use ceremony_core::CoordinatorEngine;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub fn spawn(engine: Arc<CoordinatorEngine>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;

            match engine.start_ceremony_job().await {
                Ok(0) => {}
                Ok(n) => info!(opened = n, "scheduler opened ceremonies"),
                Err(err) => error!(error = %err, "start_ceremony_job failed"),
            }
            match engine.stop_ceremony_job().await {
                Ok(0) => {}
                Ok(n) => info!(closed = n, "scheduler closed ceremonies"),
                Err(err) => error!(error = %err, "stop_ceremony_job failed"),
            }
            match engine.check_and_remove_blocking_contributor_job().await {
                Ok(0) => {}
                Ok(n) => info!(evicted = n, "scheduler evicted blocking contributors"),
                Err(err) => error!(error = %err, "check_and_remove_blocking_contributor_job failed"),
            }
        }
    })
}

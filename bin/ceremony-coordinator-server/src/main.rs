//! Ceremony coordination engine.
//!
//! Wires a [`ceremony_db::InMemoryRecordStore`], a
//! [`ceremony_storage::LocalArtifactStore`], a
//! [`ceremony_crypto::MockZkeyCryptoCore`] and the configured identity
//! allowlist into one [`ceremony_core::CoordinatorEngine`], then serves it
//! over JSON-RPC alongside the scheduler loop.

use std::sync::Arc;

use ceremony_core::{AllowlistIdentityProvider, CoordinatorEngine, LocalFileAttestationPublisher, NoopAttestationPublisher, SystemClock};
use ceremony_crypto::MockZkeyCryptoCore;
use ceremony_db::InMemoryRecordStore;
use ceremony_storage::LocalArtifactStore;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod args;
mod config;
mod rpc_server;
mod scheduler;

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args: args::Args = argh::from_env();
    let server_config = config::ServerConfig::load(args.config_file.as_deref())?;

    let mut identity = AllowlistIdentityProvider::new();
    for entry in &server_config.identities {
        identity = if entry.coordinator {
            identity.with_coordinator(entry.bearer_token.clone(), entry.user_id.clone(), entry.display_name.clone())
        } else {
            identity.with_participant(entry.bearer_token.clone(), entry.user_id.clone(), entry.display_name.clone())
        };
    }

    let attestations: Arc<dyn ceremony_core::AttestationPublisher> = match &args.attestation_file {
        Some(path) => Arc::new(LocalFileAttestationPublisher::new(path.clone())),
        None => Arc::new(NoopAttestationPublisher),
    };

    let tick = std::time::Duration::from_secs(server_config.engine.scheduler_tick_secs);
    let engine = Arc::new(CoordinatorEngine::new(
        Arc::new(InMemoryRecordStore::default()),
        Arc::new(LocalArtifactStore::new(args.artifact_dir.clone())),
        Arc::new(MockZkeyCryptoCore::default()),
        Arc::new(identity),
        attestations,
        Arc::new(SystemClock),
        server_config.engine,
    ));

    info!(artifact_dir = %args.artifact_dir, "ceremony coordination engine initialized");
    let scheduler_handle = scheduler::spawn(engine.clone(), tick);

    let (stop_tx, stop_rx) = oneshot::channel();
    let rpc_impl = rpc_server::CeremonyRpcImpl::new(engine);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
            let _ = stop_tx.send(());
        }
    });

    rpc_server::start(rpc_impl, args.rpc_url(), stop_rx).await?;
    scheduler_handle.abort();
    Ok(())
}

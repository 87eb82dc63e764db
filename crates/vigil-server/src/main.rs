//! VIGIL Server — application entry point.
//!
//! Wires configuration, the cryptographic primitives, the SurrealDB
//! stores, the audit service, and the ingest driver, then runs until a
//! shutdown signal arrives. Exits 0 on clean shutdown and non-zero on
//! any fatal initialization failure.

mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vigil_archive::FsArchiveSink;
use vigil_core::{VigilError, VigilResult};
use vigil_crypto::FieldCipher;
use vigil_db::{DbManager, SurrealAccessLogStore, SurrealLedgerStore, SurrealSearchProjection};
use vigil_ingest::{ChannelBus, IngestDriver};
use vigil_service::AuditService;

use crate::config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vigil=info".parse().expect("static directive parses")),
        )
        .json()
        .init();

    info!("Starting VIGIL audit ledger service...");

    match run().await {
        Ok(()) => {
            info!("VIGIL audit ledger service stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> VigilResult<()> {
    // Configuration first; everything downstream fails fast on a bad
    // setup.
    let config = Config::load()?;

    // Cryptographic primitives. An invalid key set is fatal before any
    // connection is attempted.
    let cipher = Arc::new(FieldCipher::new(&config.encryption)?);
    info!(
        current_key_version = cipher.current_version(),
        "key registry initialized"
    );

    // Authoritative store.
    let db = DbManager::connect(&config.database.to_db_config())
        .await
        .map_err(|e| VigilError::Storage(e.to_string()))?;
    vigil_db::run_migrations(db.client()).await?;

    // Archive sink for the external batch worker; an unreachable root is
    // a fatal init failure.
    tokio::fs::create_dir_all(&config.archive.root)
        .await
        .map_err(|e| {
            VigilError::Archive(format!(
                "archive root {} is not writable: {e}",
                config.archive.root.display()
            ))
        })?;
    let _archive = FsArchiveSink::new(&config.archive.root);
    info!(root = %config.archive.root.display(), "archive sink ready");

    let service = Arc::new(AuditService::new(
        SurrealLedgerStore::new(db.client().clone()),
        SurrealSearchProjection::new(db.client().clone()),
        SurrealAccessLogStore::new(db.client().clone()),
        cipher,
    ));

    // Bus consumer. Topics and partition layout come from configuration;
    // the driver claims every partition and processes them in parallel.
    let bus = Arc::new(ChannelBus::new(
        &config.bus.topics(),
        config.bus.partitions_per_topic,
    ));
    let driver = IngestDriver::new(service, bus);
    let shutdown = driver.shutdown_token();

    info!(
        consumer_group = %config.bus.consumer_group,
        topics = ?config.bus.topics(),
        "starting ingest driver"
    );
    let driver_task = tokio::spawn(async move { driver.run().await });

    wait_for_signal().await;
    info!("shutdown signal received");

    shutdown.cancel();
    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(grace, driver_task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => {
            return Err(VigilError::Internal(format!(
                "ingest driver task failed: {join_err}"
            )));
        }
        Err(_) => warn!(
            grace_secs = config.server.shutdown_timeout_secs,
            "ingest driver did not drain within the grace period"
        ),
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

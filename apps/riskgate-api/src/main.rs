//! Riskgate service entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use riskgate_client::{ListApiClient, RiskApiClient};
use riskgate_core::SnapshotStore;
use riskgate_sync::store::{MemorySnapshotStore, PgSnapshotStore};
use riskgate_sync::SyncService;
use tokio::signal;
use tracing::{info, warn};

use riskgate_api::scheduler::SyncScheduler;
use riskgate_api::{create_router, logging, AppState, Config};

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        scheduler_enabled = config.scheduler_enabled,
        interval_secs = config.sync_interval.as_secs(),
        "Starting riskgate"
    );

    let store: Arc<dyn SnapshotStore> = match &config.database_url {
        Some(url) => match PgSnapshotStore::connect(url).await {
            Ok(store) => {
                info!("Using PostgreSQL snapshot store");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("Failed to open snapshot store: {e}");
                std::process::exit(1);
            }
        },
        None => {
            warn!("DATABASE_URL not set, snapshots are kept in memory and lost on restart");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    let risk_client = match RiskApiClient::new(&config.risk_client_config()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid risk API configuration: {e}");
            std::process::exit(1);
        }
    };
    let list_client = match ListApiClient::new(&config.list_client_config()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid list API configuration: {e}");
            std::process::exit(1);
        }
    };

    let service = Arc::new(SyncService::new(
        Arc::new(risk_client),
        Arc::new(list_client),
        store,
        config.sync_config(),
    ));

    let scheduler = Arc::new(SyncScheduler::new(service.clone(), config.sync_interval));
    if config.scheduler_enabled {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run().await });
    } else {
        info!("Scheduler disabled, cycles run only on manual trigger");
    }

    let app = create_router(AppState::new(service));

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    scheduler.shutdown();
    info!("Server shutdown complete");
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

// storecache - Offline-first caching proxy for the storefront
// Author: storecache contributors

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use storecache::cache::open_storage;
use storecache::cli::Args;
use storecache::config::AppConfig;
use storecache::network::OriginClient;
use storecache::server::create_router;
use storecache::utils::logging;
use storecache::worker::{CacheManager, RegisterOutcome};
use tokio::signal;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting storecache v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    // Phase 3: Open cache storage and origin client
    let storage = open_storage(&config.cache).await?;
    let network = Arc::new(OriginClient::new(&config.origin)?);
    info!("Proxying {} with {:?} cache storage", network.base_url(), config.cache.backend);

    let manager = Arc::new(CacheManager::new(config.cache.clone(), storage, network));

    // Phase 4: Register the configured generation. Requests pass through
    // until it is active.
    spawn_registration(manager.clone(), config.cache.version.clone(), config.cache.precache.clone());

    #[cfg(unix)]
    spawn_reload_on_hangup(manager.clone(), args);
    #[cfg(not(unix))]
    drop(args);

    // Phase 5: Build and start HTTP server
    let app = create_router(config.clone(), manager)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

fn spawn_registration(manager: Arc<CacheManager>, version: String, manifest: Vec<String>) {
    tokio::spawn(async move {
        match manager.register(&version, manifest).await {
            Ok(RegisterOutcome::Unchanged) => info!("Cache generation {} already active", version),
            Ok(RegisterOutcome::Registered { install, activate }) => {
                let failed = install.failed().count();
                if failed > 0 {
                    warn!("Generation {} installed with {} precache failures", version, failed);
                }
                match activate {
                    Some(outcome) => info!(
                        "Generation {} active, deleted stores: {:?}",
                        outcome.version, outcome.deleted
                    ),
                    None if manager.active().is_some_and(|g| g.version() == version) => {
                        info!("Generation {} active", version)
                    }
                    None => info!("Generation {} waiting for SKIP_WAITING", version),
                }
            }
            Err(e) => error!("Registering generation {} failed: {}", version, e),
        }
    });
}

/// Reload the configuration on SIGHUP and register the new version tag,
/// if it changed.
#[cfg(unix)]
fn spawn_reload_on_hangup(manager: Arc<CacheManager>, args: Args) {
    tokio::spawn(async move {
        let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("SIGHUP reload disabled: {}", e);
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration");
            let mut config = match AppConfig::load(args.config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    error!("Reload failed, keeping current generation: {}", e);
                    continue;
                }
            };
            args.apply(&mut config);
            spawn_registration(manager.clone(), config.cache.version, config.cache.precache);
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

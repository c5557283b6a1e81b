use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreBackend, StoreConfig};
use service::roster::{RosterPolicy, RosterStore};
use service::seed;
use service::storage::{KvBackend, MemoryBackend, RedisBackend};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::observability;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured backend once; the handle lives until shutdown.
pub async fn connect_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn KvBackend>> {
    let backend: Arc<dyn KvBackend> = match cfg.backend {
        StoreBackend::Redis => Arc::new(RedisBackend::connect(&cfg.url).await?),
        StoreBackend::Memory => {
            warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };
    backend.ping().await?;
    info!(backend = ?cfg.backend, "store connected");
    Ok(backend)
}

/// Wire the roster over an already opened backend, seeding it if asked to.
pub async fn build_state(cfg: &AppConfig, backend: Arc<dyn KvBackend>) -> AppState {
    let policy = RosterPolicy { auto_create_missing_class: cfg.roster.auto_create_missing_class };
    let roster = RosterStore::new(backend, policy);
    if cfg.roster.seed_on_empty {
        let outcome = seed::seed_if_empty(&roster).await;
        info!(?outcome, "seed check finished");
    }
    AppState::new(roster, cfg.roster.max_upload_bytes)
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; shutdown only by process exit");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: open the store, build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    observability::init();

    let backend = connect_store(&cfg.store).await?;
    let state = build_state(&cfg, backend).await;
    info!(
        auto_create_missing_class = state.roster.policy().auto_create_missing_class,
        "roster policy"
    );

    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting roster server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(event = "store_closed", "server stopped; store handle released");
    Ok(())
}

//! Scorebug Back binary entrypoint wiring the REST, WebSocket and SSE layers to the
//! selected storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scorebug_back::{
    config::{AppConfig, StoreKind},
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        storage::StorageError,
    },
    routes,
    services::{
        game_service,
        records::{LogRecordsSink, RecordsSink},
        storage_supervisor,
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let records = records_sink(&config);
    let app_state = AppState::new(config, records);

    spawn_storage_supervisor(app_state.clone());
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // Flush every pending write before exiting; clocks resume on the next start.
    game_service::close_all(&app_state).await;
    Ok(())
}

/// Post final results to the configured endpoints, or just log them.
#[cfg(feature = "remote-records")]
fn records_sink(config: &AppConfig) -> Arc<dyn RecordsSink> {
    use scorebug_back::services::records::HttpRecordsSink;

    match HttpRecordsSink::from_config(&config.records) {
        Some(sink) => {
            info!("final results will be posted to the records endpoints");
            Arc::new(sink)
        }
        None => Arc::new(LogRecordsSink),
    }
}

/// Log final results.
#[cfg(not(feature = "remote-records"))]
fn records_sink(config: &AppConfig) -> Arc<dyn RecordsSink> {
    if config.records.team_records_url.is_some() || config.records.bracket_results_url.is_some() {
        warn!("records endpoints configured but the `remote-records` feature is disabled");
    }
    Arc::new(LogRecordsSink)
}

/// Start the background task keeping the configured backend installed.
fn spawn_storage_supervisor(state: SharedState) {
    match state.config().store {
        StoreKind::Memory => {
            let store = MemoryGameStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store: Arc<dyn GameStore> = Arc::new(store.clone());
                async move { Ok::<_, StorageError>(store) }
            }));
        }
        #[cfg(feature = "couch-store")]
        StoreKind::Couchdb => {
            use scorebug_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

            let config = match CouchConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    warn!(error = %err, "CouchDB configuration incomplete; staying in degraded mode");
                    return;
                }
            };
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = CouchGameStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
            }));
        }
        #[cfg(not(feature = "couch-store"))]
        StoreKind::Couchdb => {
            warn!("CouchDB selected but the `couch-store` feature is disabled; staying in degraded mode");
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

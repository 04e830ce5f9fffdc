use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parcel_tracking::api::{self, AppState};
use parcel_tracking::config::{AppConfig, StoreBackend};
use parcel_tracking::directory::NetworkDirectory;
use parcel_tracking::lifecycle::{build_manager, Clock, LifecycleSettings, SystemClock};
use parcel_tracking::metrics::{self, Metrics};
use parcel_tracking::store::{InMemoryStore, ScyllaStore, TrackingStore};
use parcel_tracking::views::TrackingViews;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parcel_tracking=debug"))
        )
        .init();

    tracing::info!("🚀 Starting parcel tracking service");

    let config = AppConfig::from_env()?;

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Store and lifecycle engine ===
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = config.lifecycle_settings();

    let state = match config.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            app_state(Arc::new(InMemoryStore::new()), clock, metrics.clone(), settings)
        }
        StoreBackend::Scylla => {
            let store = ScyllaStore::connect(&config.scylla_nodes, &config.scylla_keyspace).await?;
            app_state(Arc::new(store), clock, metrics.clone(), settings)
        }
    };

    // === 3. HTTP servers ===
    let metrics_server = metrics::start_metrics_server(
        Arc::new(metrics.registry().clone()),
        config.server_host.clone(),
        config.metrics_port,
    );

    tracing::info!("🌐 API listening on http://{}:{}/api", config.server_host, config.server_port);
    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run();

    tokio::try_join!(api_server, metrics_server)?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

fn app_state<S>(store: Arc<S>, clock: Arc<dyn Clock>, metrics: Arc<Metrics>, settings: LifecycleSettings) -> AppState
where
    S: TrackingStore + 'static,
{
    let views = TrackingViews::new(store.clone(), settings.store_timeout);
    let directory = NetworkDirectory::new(store.clone(), clock.clone(), settings.store_timeout);
    let manager = build_manager(store, clock, metrics, settings);

    AppState {
        manager: Arc::new(manager),
        views: Arc::new(views),
        directory: Arc::new(directory),
    }
}

//! Plant Tracker
//!
//! Keeps houseplant watering schedules in a local SQLite or JSON store and
//! serves them, grouped by urgency, over a small REST API.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, StorageBackend};
use db::{JsonRecordStore, RecordStore, SqliteRecordStore};
use store::{PlantStore, SystemClock};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PlantStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Plant Tracker");
    tracing::info!("Storage backend: {:?}", config.backend);
    tracing::info!("Bind address: {}", config.bind_addr);

    let store = Arc::new(PlantStore::new(
        record_store_for(&config),
        Arc::new(SystemClock),
    ));

    // A failed load leaves the API up with an empty collection so clients
    // can retry through /api/state/initialize.
    if let Err(e) = store.initialize_store().await {
        tracing::warn!("Continuing with an empty plant list: {}", e);
    }

    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let (phase, count) = {
                let snapshot = changes.borrow_and_update();
                (snapshot.phase.clone(), snapshot.plants.len())
            };
            tracing::debug!("Plant state changed: {:?}, {} plants", phase, count);
        }
    });

    let app = create_router(AppState { store });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the record store selected by the configuration.
pub fn record_store_for(config: &Config) -> Arc<dyn RecordStore> {
    match config.backend {
        StorageBackend::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            Arc::new(SqliteRecordStore::new(config.db_path.clone()))
        }
        StorageBackend::Json => {
            tracing::info!("JSON slot path: {:?}", config.json_path);
            Arc::new(JsonRecordStore::new(config.json_path.clone()))
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Lifecycle
        .route("/state", get(api::get_state))
        .route("/state/initialize", post(api::initialize_store))
        // Plants
        .route("/plants", get(api::list_plants).post(api::create_plant))
        .route("/plants/grouped", get(api::grouped_plants))
        .route(
            "/plants/{id}",
            get(api::get_plant)
                .put(api::update_plant)
                .delete(api::delete_plant),
        )
        .route("/plants/{id}/water", post(api::water_plant));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;

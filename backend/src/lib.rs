//! HTTP API over the task and settings stores.

use axum::routing::{get, post, put};
use axum::Router;
use shared::local::LocalStore;
use shared::{Store, StoreError};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod redis_store;
pub mod routes;

use config::StorageConfig;
use redis_store::RedisStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

/// Builds the backend selected by configuration.
pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match storage {
        StorageConfig::Redis { url } => Arc::new(RedisStore::open(url)?),
        StorageConfig::File { path } => Arc::new(LocalStore::open(path)),
    };
    Ok(store)
}

pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/tasks", get(routes::list_tasks).post(routes::create_task))
        .route(
            "/api/tasks/:id",
            put(routes::update_task).delete(routes::delete_task),
        )
        .route("/api/tasks/:id/complete", post(routes::complete_task))
        .route("/api/completed", get(routes::list_completed))
        .route("/api/settings", post(routes::save_setting))
        .route(
            "/api/settings/:key",
            get(routes::get_setting)
                .put(routes::put_setting)
                .delete(routes::delete_setting),
        )
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

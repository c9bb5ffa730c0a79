// Symposium Server - State and Router Assembly

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use symposium_core::ModelLayer;
use symposium_core::model::{ChatClient, FailedModelStore, ModelCatalog, ModelStatusCache};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{chat, models};

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ChatClient>,
    pub catalog: Arc<ModelCatalog>,
    pub status: Arc<ModelStatusCache>,
    pub failed: Arc<FailedModelStore>,
}

impl AppState {
    pub fn new(layer: ModelLayer) -> Self {
        Self {
            client: layer.client,
            catalog: layer.catalog,
            status: layer.status,
            failed: layer.failed,
        }
    }
}

/// Full application router. Every route answers both bare and under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/models", get(models::list))
        .route(
            "/models/status",
            get(models::status_all).post(models::status_set),
        )
        .route("/models/status/reset", post(models::status_reset))
        .route("/models/check/{modelId}", get(models::check))
        .route(
            "/models/failed",
            get(models::failed_list)
                .post(models::failed_add)
                .delete(models::failed_clear),
        )
        .route("/models/failed/batch-delete", post(models::failed_batch_delete))
        .route("/models/failed/{modelId}", delete(models::failed_remove))
}

// Symposium Server - Route Handlers

pub mod chat;
pub mod models;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 400 with the `{"error": ...}` JSON shape shared by every endpoint.
pub(crate) fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;
    use std::time::Duration;

    use symposium_core::model::{
        ChatClient, FailedModelStore, ModelCatalog, ModelStatusCache, ProviderRegistry,
    };
    use tempfile::TempDir;

    use crate::app::AppState;

    /// State wired to a registry with no credentials at all.
    pub(crate) fn disabled_state(dir: &TempDir) -> AppState {
        state_with_registry(dir, ProviderRegistry::with_credentials(|_| None))
    }

    /// State whose only configured provider is groq, pointed at `base_url`.
    pub(crate) fn groq_state(dir: &TempDir, base_url: &str) -> AppState {
        let registry = ProviderRegistry::with_credentials(|spec| {
            (spec.key == "groq").then(|| "test-key".to_string())
        })
        .with_base_url("groq", base_url);
        state_with_registry(dir, registry)
    }

    fn state_with_registry(dir: &TempDir, registry: ProviderRegistry) -> AppState {
        let registry = Arc::new(registry);
        let status = Arc::new(ModelStatusCache::new());
        let failed = Arc::new(
            FailedModelStore::load(dir.path().join("failed-models.json")).expect("failed store"),
        );
        let http = reqwest::Client::new();
        let client = Arc::new(ChatClient::new(
            registry.clone(),
            status.clone(),
            failed.clone(),
            http.clone(),
            Duration::from_secs(5),
        ));
        let catalog = Arc::new(ModelCatalog::new(
            registry,
            status.clone(),
            failed.clone(),
            http,
            600,
        ));
        AppState {
            client,
            catalog,
            status,
            failed,
        }
    }
}

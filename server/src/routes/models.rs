// Symposium Server - Model Catalog and Health Endpoints

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use symposium_core::model::{FailureKind, StatusSnapshot, is_known_free};

use crate::app::AppState;
use crate::routes::bad_request;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    force: Option<String>,
}

/// GET /models
///
/// Aggregated catalog across all enabled providers. `?force=1` bypasses
/// the cache.
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let force = matches!(query.force.as_deref(), Some("1") | Some("true"));
    match state.catalog.list(force).await {
        Ok(models) => Json(models).into_response(),
        Err(err) => {
            error!("error fetching models: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch models" })),
            )
                .into_response()
        }
    }
}

/// GET /models/status
pub async fn status_all(State(state): State<AppState>) -> Json<BTreeMap<String, StatusSnapshot>> {
    Json(state.status.all().await)
}

/// POST /models/status
///
/// Manually flags a model as quota_exceeded, paid or working.
pub async fn status_set(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let model_id = match body.get("modelId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => return bad_request("modelId is required"),
    };

    let status = body.get("status").and_then(Value::as_str).unwrap_or_default();
    match status {
        "quota_exceeded" => state.status.mark_quota_exceeded(model_id).await,
        "paid" => state.status.mark_paid(model_id).await,
        "working" => state.status.mark_working(model_id).await,
        _ => return bad_request("Invalid status"),
    }

    Json(json!({ "success": true, "modelId": model_id, "status": status })).into_response()
}

/// POST /models/status/reset
pub async fn status_reset(State(state): State<AppState>) -> Json<Value> {
    state.status.clear().await;
    Json(json!({ "success": true, "message": "Model status cache cleared" }))
}

/// GET /models/check/{modelId}
pub async fn check(State(state): State<AppState>, Path(model_id): Path<String>) -> Json<Value> {
    let status = state.status.status(&model_id).await;
    let failed = state.failed.contains(&model_id).await;
    Json(json!({
        "modelId": model_id,
        "status": status,
        "isKnownFree": is_known_free(&model_id),
        "isFailedModel": failed,
    }))
}

/// GET /models/failed
pub async fn failed_list(State(state): State<AppState>) -> Json<Value> {
    let models = state.failed.list().await;
    Json(json!({ "count": models.len(), "models": models }))
}

/// POST /models/failed
///
/// Marks a model as failed so the catalog stops offering it. Deselections
/// record the client address instead of an upstream error.
pub async fn failed_add(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let model_id = match body.get("modelId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => return bad_request("modelId is required"),
    };

    let kind = body
        .get("errorType")
        .and_then(Value::as_str)
        .map(FailureKind::parse)
        .unwrap_or(FailureKind::Unknown);
    let detail = if kind == FailureKind::UserDeselect {
        Some(format!(
            "Deselected by user from ip : {}",
            client_ip(&headers, addr)
        ))
    } else {
        body.get("error")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    let record = state.failed.record(model_id, kind, detail).await;
    state.catalog.invalidate().await;

    Json(json!({
        "success": true,
        "modelId": record.model_id,
        "errorType": record.error_type,
        "detail": record.detail,
        "timestamp": record.timestamp,
        "message": format!("Model {model_id} added to failed cache"),
    }))
    .into_response()
}

/// DELETE /models/failed/{modelId}
pub async fn failed_remove(State(state): State<AppState>, Path(model_id): Path<String>) -> Response {
    if state.failed.remove(&model_id).await {
        state.catalog.invalidate().await;
        Json(json!({
            "success": true,
            "modelId": model_id,
            "message": format!("Model {model_id} removed from failed cache"),
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Model not found in failed cache", "modelId": model_id })),
        )
            .into_response()
    }
}

/// DELETE /models/failed
pub async fn failed_clear(State(state): State<AppState>) -> Json<Value> {
    state.failed.clear().await;
    state.catalog.invalidate().await;
    Json(json!({ "success": true, "message": "All failed models cleared" }))
}

/// POST /models/failed/batch-delete
pub async fn failed_batch_delete(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Response {
    let ids = match body.get("modelIds").and_then(Value::as_array) {
        Some(values) if !values.is_empty() => values,
        _ => return bad_request("modelIds (array) is required"),
    };

    let mut removed = Vec::new();
    let mut not_found = Vec::new();
    for value in ids {
        if let Some(id) = value.as_str() {
            if state.failed.remove(id).await {
                removed.push(id.to_string());
            } else {
                not_found.push(id.to_string());
            }
        }
    }

    if !removed.is_empty() {
        state.catalog.invalidate().await;
    }

    Json(json!({
        "success": true,
        "removedCount": removed.len(),
        "removed": removed,
        "notFound": not_found,
    }))
    .into_response()
}

/// Proxy-aware client address, falling back to the socket peer.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|value| value.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }
    addr.ip().to_string()
}

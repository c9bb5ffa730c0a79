// Symposium Server - Chat Endpoint
//
// POST /chat takes { message, model }, routes the model to its provider
// and answers with an SSE stream of normalized chunks.

use std::convert::Infallible;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::app::AppState;
use crate::routes::bad_request;

/// POST /chat
///
/// Rejects malformed payloads with 400 before any upstream call. Once the
/// stream starts, upstream failures arrive as in-band `{"error": ...}`
/// events rather than HTTP errors.
pub async fn chat(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let message = body.get("message");
    let model = body.get("model");
    if is_absent(message) || is_absent(model) {
        return bad_request("Missing message or model");
    }

    let (message, model) = match (message.and_then(Value::as_str), model.and_then(Value::as_str)) {
        (Some(message), Some(model)) if !message.trim().is_empty() => (message, model),
        _ => return bad_request("Invalid message or model format"),
    };

    debug!(model, "dispatching chat request");
    let stream = match state.client.chat(model, message) {
        Ok(stream) => stream,
        Err(error) => return bad_request(&error.to_string()),
    };

    let body = Body::from_stream(
        stream.map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk.sse_block()))),
    );
    (sse_headers(), body).into_response()
}

/// Absent, null and empty-string fields all count as missing.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn sse_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::routes::testutil::{disabled_state, groq_state};

    async fn call(state: AppState, body: Value) -> Response {
        chat(State(state), Json(body)).await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = disabled_state(&dir);

        let response = call(state.clone(), json!({ "message": "hello" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing message or model" })
        );

        let response = call(state, json!({ "message": "", "model": "llama" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing message or model" })
        );
    }

    #[tokio::test]
    async fn malformed_fields_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = disabled_state(&dir);

        let response = call(state.clone(), json!({ "message": "   ", "model": "llama" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid message or model format" })
        );

        let response = call(state, json!({ "message": "hello", "model": 7 })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid message or model format" })
        );
    }

    #[tokio::test]
    async fn unconfigured_provider_is_a_client_error() {
        let dir = TempDir::new().unwrap();
        let state = disabled_state(&dir);

        let response = call(state, json!({ "message": "hello", "model": "openai-gpt-4o" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Provider OpenAI is not configured. Please set the OPENAI_API_KEY environment variable."
            })
        );
    }

    #[tokio::test]
    async fn successful_chat_streams_server_sent_events() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"4\"}}]}\n\n",
                    "data: [DONE]\n\n",
                ),
                "text/event-stream",
            ))
            .mount(&upstream)
            .await;

        let dir = TempDir::new().unwrap();
        let state = groq_state(&dir, &upstream.uri());

        let response = call(
            state,
            json!({ "message": "2+2?", "model": "llama-3.3-70b-versatile" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "data: {\"token\":\"4\"}\n\ndata: [DONE]\n\n"
        );
    }
}

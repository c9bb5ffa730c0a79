//! Chat client
//!
//! Sends one upstream chat request and returns the normalized token stream.
//! Provider quirks live in the provider table and the normalizer; this
//! module owns the failure protocol: classify, record, then surface exactly
//! one terminal chunk to the caller.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::Value;

use super::classify::{classify_http_failure, classify_send_failure};
use super::error::Result;
use super::failed::FailedModelStore;
use super::registry::ProviderRegistry;
use super::request::build_chat_request;
use super::status::ModelStatusCache;
use super::streaming::StreamNormalizer;
use super::types::{FailureKind, NormalizedChunk};

/// Bounded wait for the upstream response head. Streaming itself is
/// unbounded; slow-consumer policy belongs to the caller.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub type ChunkStream = Pin<Box<dyn Stream<Item = NormalizedChunk> + Send>>;

/// Streaming chat client shared across requests.
pub struct ChatClient {
  registry: Arc<ProviderRegistry>,
  status: Arc<ModelStatusCache>,
  failed: Arc<FailedModelStore>,
  http: reqwest::Client,
  request_timeout: Duration,
}

impl ChatClient {
  pub fn new(
    registry: Arc<ProviderRegistry>,
    status: Arc<ModelStatusCache>,
    failed: Arc<FailedModelStore>,
    http: reqwest::Client,
    request_timeout: Duration,
  ) -> Self {
    Self {
      registry,
      status,
      failed,
      http,
      request_timeout,
    }
  }

  /// Starts one upstream chat call and returns the normalized stream.
  ///
  /// Routing and request building happen eagerly, so configuration problems
  /// surface as errors before any stream exists. Everything after that is
  /// reported in-stream, and the stream always terminates: a failed request
  /// ends with one `{error}` chunk, a successful one with `[DONE]`.
  pub fn chat(&self, model: &str, message: &str) -> Result<ChunkStream> {
    let route = self.registry.resolve(model);
    let request = build_chat_request(route.provider, route.upstream_model, message)?;
    let framing = route.provider.spec.framing;
    let display_name = route.provider.spec.display_name;

    let model = model.to_string();
    let status = Arc::clone(&self.status);
    let failed = Arc::clone(&self.failed);
    let http = self.http.clone();
    let request_timeout = self.request_timeout;

    let stream = async_stream::stream! {
      let mut call = http.post(&request.url).json(&request.body);
      for (name, value) in &request.headers {
        call = call.header(name.as_str(), value.as_str());
      }

      let response = match tokio::time::timeout(request_timeout, call.send()).await {
        Err(_) => {
          let message = format!("{display_name} API request failed: request timed out");
          failed
            .record(&model, FailureKind::Timeout, Some(message.clone()))
            .await;
          yield NormalizedChunk::Error(message);
          return;
        }
        Ok(Err(error)) => {
          let kind = classify_send_failure(&error);
          let message = format!("{display_name} API request failed: {error}");
          failed.record(&model, kind, Some(message.clone())).await;
          yield NormalizedChunk::Error(message);
          return;
        }
        Ok(Ok(response)) => response,
      };

      let http_status = response.status();
      if !http_status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("{display_name} API error: {http_status} {body}");

        let kind = classify_http_failure(http_status, &body);
        if kind == FailureKind::QuotaExceeded {
          // Soft status for catalog filtering; the hard record below is
          // what keeps the model out until explicitly restored.
          status.mark_quota_exceeded(&model).await;
        }
        let message = upstream_error_message(display_name, http_status, &body);
        failed.record(&model, kind, Some(message.clone())).await;
        yield NormalizedChunk::Error(message);
        return;
      }

      status.mark_working(&model).await;

      let mut normalizer = StreamNormalizer::new(framing);
      let mut bytes = response.bytes_stream();
      while let Some(item) = bytes.next().await {
        match item {
          Ok(data) => {
            for chunk in normalizer.push(&data) {
              let terminal = chunk.is_terminal();
              yield chunk;
              if terminal {
                return;
              }
            }
          }
          Err(error) => {
            // Partial output may already have been delivered; end quietly
            // rather than surfacing a second verdict on the model.
            tracing::debug!("stream error from {display_name}: {error}");
            return;
          }
        }
      }
      for chunk in normalizer.finish() {
        yield chunk;
      }
    };

    Ok(Box::pin(stream))
  }
}

/// Caller-facing message for a non-2xx upstream response, with the
/// provider's own error text appended when it can be extracted.
fn upstream_error_message(display: &str, status: reqwest::StatusCode, body: &str) -> String {
  let mut message = format!("{display} API request failed (Status: {})", status.as_u16());
  match serde_json::from_str::<Value>(body) {
    Ok(value) => {
      let provider_text = value
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .or_else(|| {
          value
            .get("message")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        });
      if let Some(text) = provider_text {
        message.push_str(": ");
        message.push_str(text);
      }
    }
    Err(_) => {
      if !body.is_empty() && body.len() < 200 {
        message.push_str(": ");
        message.push_str(body);
      }
    }
  }
  message
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use reqwest::StatusCode;

  #[test]
  fn test_error_message_prefers_nested_error_message() {
    let body = "{\"error\":{\"message\":\"You exceeded your current quota\",\"code\":429}}";
    assert_eq!(
      upstream_error_message("OpenAI", StatusCode::TOO_MANY_REQUESTS, body),
      "OpenAI API request failed (Status: 429): You exceeded your current quota"
    );
  }

  #[test]
  fn test_error_message_falls_back_to_flat_message() {
    let body = "{\"message\":\"invalid api token\"}";
    assert_eq!(
      upstream_error_message("Cohere", StatusCode::UNAUTHORIZED, body),
      "Cohere API request failed (Status: 401): invalid api token"
    );
  }

  #[test]
  fn test_error_message_includes_short_plain_bodies() {
    assert_eq!(
      upstream_error_message("Groq", StatusCode::BAD_GATEWAY, "upstream connect error"),
      "Groq API request failed (Status: 502): upstream connect error"
    );
  }

  #[test]
  fn test_error_message_omits_long_or_empty_bodies() {
    let long = "x".repeat(300);
    assert_eq!(
      upstream_error_message("Groq", StatusCode::INTERNAL_SERVER_ERROR, &long),
      "Groq API request failed (Status: 500)"
    );
    assert_eq!(
      upstream_error_message("Groq", StatusCode::INTERNAL_SERVER_ERROR, ""),
      "Groq API request failed (Status: 500)"
    );
    // Parseable JSON without a recognizable message field adds nothing.
    assert_eq!(
      upstream_error_message("Groq", StatusCode::INTERNAL_SERVER_ERROR, "{\"detail\":\"x\"}"),
      "Groq API request failed (Status: 500)"
    );
  }
}

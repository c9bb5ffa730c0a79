//! Model layer types
//!
//! Wire units for the normalized stream, failure/status records, and the
//! catalog listing shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One normalized event emitted to the caller.
///
/// Every stream ends with exactly one terminal event: [NormalizedChunk::Done]
/// or a single [NormalizedChunk::Error].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedChunk {
  /// A token of generated text
  Token(String),

  /// Terminal error description
  Error(String),

  /// Terminal end-of-stream marker
  Done,
}

impl NormalizedChunk {
  /// True for the two terminal variants.
  pub fn is_terminal(&self) -> bool {
    matches!(self, NormalizedChunk::Error(_) | NormalizedChunk::Done)
  }

  /// The SSE data payload for this chunk (without the `data: ` framing).
  pub fn sse_payload(&self) -> String {
    match self {
      NormalizedChunk::Token(token) => serde_json::json!({ "token": token }).to_string(),
      NormalizedChunk::Error(error) => serde_json::json!({ "error": error }).to_string(),
      NormalizedChunk::Done => "[DONE]".to_string(),
    }
  }

  /// The chunk rendered as one complete SSE block: `data: <payload>\n\n`.
  pub fn sse_block(&self) -> String {
    format!("data: {}\n\n", self.sse_payload())
  }
}

/// Failure classification attached to permanent failure records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  QuotaExceeded,
  Timeout,
  NetworkError,
  ApiError,
  InternalError,
  UserDeselect,
  Unknown,
}

impl FailureKind {
  /// Wire name, as stored in records and returned by the API.
  pub fn as_str(&self) -> &'static str {
    match self {
      FailureKind::QuotaExceeded => "quota_exceeded",
      FailureKind::Timeout => "timeout",
      FailureKind::NetworkError => "network_error",
      FailureKind::ApiError => "api_error",
      FailureKind::InternalError => "internal_error",
      FailureKind::UserDeselect => "user_deselect",
      FailureKind::Unknown => "unknown",
    }
  }

  /// Parses a wire name; anything unrecognized is [FailureKind::Unknown].
  pub fn parse(value: &str) -> Self {
    match value {
      "quota_exceeded" => FailureKind::QuotaExceeded,
      "timeout" => FailureKind::Timeout,
      "network_error" => FailureKind::NetworkError,
      "api_error" => FailureKind::ApiError,
      "internal_error" => FailureKind::InternalError,
      "user_deselect" => FailureKind::UserDeselect,
      _ => FailureKind::Unknown,
    }
  }
}

impl std::fmt::Display for FailureKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Permanent failure record for one model.
///
/// Removed only by explicit restore operations; survives restarts via the
/// file-backed store. `timestamp` is null for entries migrated from the
/// legacy bare-string file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
  #[serde(rename = "modelId")]
  pub model_id: String,

  #[serde(rename = "errorType")]
  pub error_type: FailureKind,

  #[serde(default)]
  pub detail: Option<String>,

  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
}

/// Soft model status derived from the TTL cache and the known-free lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
  QuotaExceeded,
  Paid,
  Working,
  Free,
  Unknown,
}

impl StatusKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      StatusKind::QuotaExceeded => "quota_exceeded",
      StatusKind::Paid => "paid",
      StatusKind::Working => "working",
      StatusKind::Free => "free",
      StatusKind::Unknown => "unknown",
    }
  }
}

/// One live entry in the status dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
  pub status: StatusKind,
  pub timestamp: DateTime<Utc>,
}

/// One catalog entry as returned by the models listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
  /// Externally-visible model id, catalog prefix included
  pub id: String,

  /// Unix seconds
  pub created: i64,

  pub owner: String,

  /// Provider display name
  pub provider: String,
}

/// Per-provider summary attached to the models listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOverview {
  pub enabled: bool,

  #[serde(rename = "hasApiKey")]
  pub has_api_key: bool,

  #[serde(rename = "modelCount")]
  pub model_count: usize,
}

/// Full response of the models listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
  pub models: Vec<ModelEntry>,

  /// Keyed by provider display name
  pub providers: BTreeMap<String, ProviderOverview>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
}

//! Model layer error types

use thiserror::Error;

/// Chat engine errors
#[derive(Error, Debug)]
pub enum ModelError {
  /// Provider resolved for a chat request has no credential configured
  #[error("Provider {name} is not configured. Please set the {env_key} environment variable.")]
  ProviderDisabled {
    name: &'static str,
    env_key: &'static str,
  },

  /// Invalid request
  #[error("Invalid request: {0}")]
  InvalidRequest(String),

  /// Invalid response from provider
  #[error("Invalid response: {0}")]
  InvalidResponse(String),

  /// Provider API error
  #[error("Provider API error: {0}")]
  ApiError(String),

  /// Network error
  #[error("Network error: {0}")]
  NetworkError(#[from] reqwest::Error),

  /// JSON parse error
  #[error("JSON parse error: {0}")]
  JsonError(#[from] serde_json::Error),

  /// Persistence error
  #[error("Storage error: {0}")]
  StorageError(#[from] std::io::Error),

  /// Streaming error
  #[error("Streaming error: {0}")]
  StreamError(String),

  /// Timeout
  #[error("Request timeout: {0}")]
  Timeout(String),
}

/// Alias for Result<T, ModelError>
pub type Result<T> = std::result::Result<T, ModelError>;

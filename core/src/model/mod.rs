//! Symposium Model Layer
//!
//! One prompt in, many model streams out. This module talks to hosted LLM
//! providers over their native HTTP APIs, normalizes their streaming
//! responses into a common chunk shape, and remembers which models are
//! currently worth calling.
//!
//! Architecture:
//! - [provider]: static description of every supported provider
//! - [registry]: credential resolution and prefix routing of model ids
//! - [request]: provider-specific chat and catalog request construction
//! - [streaming]: normalization of the upstream stream framings
//! - [client] and [fanout]: single-model and multi-model chat dispatch
//! - [status], [failed], [catalog]: model health caches and the model list

pub mod catalog;
pub mod classify;
pub mod client;
pub mod error;
pub mod failed;
pub mod fanout;
pub mod provider;
pub mod registry;
pub mod request;
pub mod status;
pub mod streaming;
pub mod types;

// Re-exports
pub use catalog::{ModelCatalog, is_valid_chat_model, parse_catalog};
pub use classify::{classify_http_failure, classify_send_failure};
pub use client::{ChatClient, ChunkStream};
pub use error::{ModelError, Result};
pub use failed::FailedModelStore;
pub use fanout::{FanOut, ModelStream};
pub use provider::{DEFAULT_PROVIDER_KEY, PROVIDERS, ProviderSpec, StreamFraming};
pub use registry::{ProviderRegistry, RegisteredProvider, RouteMatch};
pub use request::{BuiltChatRequest, BuiltModelsRequest, build_chat_request, build_models_request};
pub use status::{ModelStatusCache, is_known_free};
pub use streaming::{FrameOutcome, StreamNormalizer, interpret_frame};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;

/// Shared handles over the whole layer: chat, fan-out, catalog, and the
/// health caches, wired to the same underlying state.
#[derive(Clone)]
pub struct ModelLayer {
  pub registry: Arc<ProviderRegistry>,
  pub status: Arc<ModelStatusCache>,
  pub failed: Arc<FailedModelStore>,
  pub client: Arc<ChatClient>,
  pub catalog: Arc<ModelCatalog>,
  pub fanout: FanOut,
}

/// Initialize the model layer from engine configuration.
///
/// Credentials come from the environment, the failed-model store from disk.
/// The chat client and the catalog share one HTTP client.
pub fn init_model_layer(config: &EngineConfig) -> Result<ModelLayer> {
  let registry = Arc::new(ProviderRegistry::from_env());
  let status = Arc::new(ModelStatusCache::new());
  let failed = Arc::new(FailedModelStore::load(config.failed_models_path())?);
  let http = reqwest::Client::new();

  let client = Arc::new(ChatClient::new(
    registry.clone(),
    status.clone(),
    failed.clone(),
    http.clone(),
    Duration::from_secs(config.request_timeout_secs),
  ));
  let catalog = Arc::new(ModelCatalog::new(
    registry.clone(),
    status.clone(),
    failed.clone(),
    http,
    config.catalog_ttl_secs,
  ));
  let fanout = FanOut::new(client.clone());

  Ok(ModelLayer {
    registry,
    status,
    failed,
    client,
    catalog,
    fanout,
  })
}

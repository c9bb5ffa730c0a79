//! Model catalog
//!
//! Aggregated model listing across every enabled provider, with a TTL cache
//! in front. Provider listings disagree wildly about shape and metadata, so
//! each response is pared down by a shape-specific parser plus the shared
//! chat-model heuristic before the results are merged and sorted.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::Result;
use super::failed::FailedModelStore;
use super::provider::{CatalogShape, ProviderSpec};
use super::registry::{ProviderRegistry, RegisteredProvider};
use super::request::build_models_request;
use super::status::ModelStatusCache;
use super::types::{ModelEntry, ModelsResponse, ProviderOverview};

pub const CATALOG_TTL_SECS: u64 = 10 * 60;

/// Id substrings that rule a model out for chat, lowercased.
const EXCLUSIONS: &[&str] = &[
  "embedding",
  "embed",
  "moderation",
  "edit",
  "audio",
  "whisper",
  "tts",
  "speech",
  "transcribe",
  "vision-only",
  "instruct-light",
  "small",
  "tiny",
  "davinci-002",
  "davinci-003",
  "text-davinci",
  "text-curie",
  "text-babbage",
  "text-ada",
  "gpt-3.5",
  "claude-1",
  "claude-1.3",
  "claude-instant",
  "command-light",
  "command-nightly",
  "palm",
  "bison",
  "mistral-tiny",
  "mistral-small",
  "experimental",
  "preview",
  "legacy",
  "test",
  "mock",
  "demo",
  "dall-e",
  "image",
  "vision",
  "code-search",
  "search",
  "similarity",
  "gpt-2",
  "gpt2",
  "gpt-neo",
  "gpt-j",
  "gpt-j-",
  "gpt-neo-x",
  "bert",
  "roberta",
  "distilbert",
  "electra",
  "albert",
  "xlnet",
  "t5",
  "bart",
  "transformer",
];

/// Id substrings that mark a model as chat capable.
const INCLUSIONS: &[&str] = &[
  "chat",
  "gpt",
  "claude",
  "gemini",
  "command",
  "mistral",
  "llama",
  "qwen",
  "mixtral",
  "neural",
  "instruct",
  "colossus",
  "aya",
  "deepseek",
  "openrouter",
  "hugging",
  "zephyr",
  "phi",
  "gemma",
];

/// Heuristic filter for chat-capable model ids. Exclusions win over
/// inclusions; ids matching neither are rejected.
pub fn is_valid_chat_model(model_id: &str) -> bool {
  if model_id.is_empty() {
    return false;
  }
  let id = model_id.to_lowercase();
  if EXCLUSIONS.iter().any(|needle| id.contains(needle)) {
    return false;
  }
  INCLUSIONS.iter().any(|needle| id.contains(needle))
}

/// TTL cache for the assembled model list.
pub struct CatalogCache {
  ttl: Duration,
  slot: RwLock<Option<(Vec<ModelEntry>, DateTime<Utc>)>>,
}

impl CatalogCache {
  pub fn new(ttl_secs: u64) -> Self {
    Self {
      ttl: Duration::seconds(ttl_secs as i64),
      slot: RwLock::new(None),
    }
  }

  pub async fn get(&self) -> Option<Vec<ModelEntry>> {
    self.get_at(Utc::now()).await
  }

  async fn get_at(&self, now: DateTime<Utc>) -> Option<Vec<ModelEntry>> {
    let slot = self.slot.read().await;
    match slot.as_ref() {
      Some((models, cached_at)) if now - *cached_at < self.ttl => Some(models.clone()),
      _ => None,
    }
  }

  pub async fn set(&self, models: Vec<ModelEntry>) {
    self.set_at(models, Utc::now()).await;
  }

  async fn set_at(&self, models: Vec<ModelEntry>, now: DateTime<Utc>) {
    *self.slot.write().await = Some((models, now));
  }

  pub async fn invalidate(&self) {
    *self.slot.write().await = None;
  }
}

/// Catalog service: fetches, filters, sorts, and caches the model list.
pub struct ModelCatalog {
  registry: Arc<ProviderRegistry>,
  status: Arc<ModelStatusCache>,
  failed: Arc<FailedModelStore>,
  cache: CatalogCache,
  http: reqwest::Client,
}

impl ModelCatalog {
  pub fn new(
    registry: Arc<ProviderRegistry>,
    status: Arc<ModelStatusCache>,
    failed: Arc<FailedModelStore>,
    http: reqwest::Client,
    ttl_secs: u64,
  ) -> Self {
    Self {
      registry,
      status,
      failed,
      cache: CatalogCache::new(ttl_secs),
      http,
    }
  }

  /// Assembles the model listing, serving from cache unless `force` is set.
  ///
  /// Models with a live quota or paid mark are dropped, as are permanently
  /// failed ones. An empty result carries a warning and is never cached, so
  /// the next call retries the providers.
  pub async fn list(&self, force: bool) -> Result<ModelsResponse> {
    if !force {
      if let Some(models) = self.cache.get().await {
        let providers = self.provider_overview(&models);
        return Ok(ModelsResponse {
          models,
          providers,
          warning: None,
        });
      }
    }

    let enabled: Vec<&RegisteredProvider> = self
      .registry
      .providers()
      .iter()
      .filter(|provider| provider.enabled())
      .collect();
    let fetched = join_all(enabled.iter().map(|provider| self.fetch_provider(provider))).await;
    let all: Vec<ModelEntry> = fetched.into_iter().flatten().collect();

    let status_filtered = self.status.filter_catalog(all).await;
    let mut models = Vec::with_capacity(status_filtered.len());
    for model in status_filtered {
      if !self.failed.contains(&model.id).await {
        models.push(model);
      }
    }
    models.sort_by(|a, b| a.provider.cmp(&b.provider).then_with(|| a.id.cmp(&b.id)));

    let providers = self.provider_overview(&models);
    if models.is_empty() {
      return Ok(ModelsResponse {
        models,
        providers,
        warning: Some("No models available from any configured providers".to_string()),
      });
    }

    self.cache.set(models.clone()).await;
    Ok(ModelsResponse {
      models,
      providers,
      warning: None,
    })
  }

  /// Drops the cached listing so the next call refetches.
  pub async fn invalidate(&self) {
    self.cache.invalidate().await;
  }

  /// Per-provider summary for every configured provider, enabled or not.
  /// Counts reflect the list actually being returned.
  fn provider_overview(&self, models: &[ModelEntry]) -> BTreeMap<String, ProviderOverview> {
    self
      .registry
      .providers()
      .iter()
      .map(|provider| {
        let display = provider.spec.display_name;
        let overview = ProviderOverview {
          enabled: provider.enabled(),
          has_api_key: provider.api_key.is_some(),
          model_count: models.iter().filter(|m| m.provider == display).count(),
        };
        (display.to_string(), overview)
      })
      .collect()
  }

  /// Fetches one provider's listing. Every failure is logged and yields an
  /// empty list so one provider cannot take down the whole catalog.
  async fn fetch_provider(&self, provider: &RegisteredProvider) -> Vec<ModelEntry> {
    let display_name = provider.spec.display_name;
    let request = match build_models_request(provider) {
      Ok(request) => request,
      Err(error) => {
        tracing::warn!("failed to build models request for {display_name}: {error}");
        return Vec::new();
      }
    };

    let mut call = self.http.get(&request.url);
    for (name, value) in &request.headers {
      call = call.header(name.as_str(), value.as_str());
    }
    let response = match call.send().await {
      Ok(response) => response,
      Err(error) => {
        tracing::warn!("error fetching models from {display_name}: {error}");
        return Vec::new();
      }
    };
    if !response.status().is_success() {
      tracing::warn!(
        "failed to fetch models from {display_name}: {}",
        response.status()
      );
      return Vec::new();
    }

    let data: Value = match response.json().await {
      Ok(data) => data,
      Err(error) => {
        tracing::warn!("error fetching models from {display_name}: {error}");
        return Vec::new();
      }
    };
    let models = parse_catalog(provider.spec, &data);
    tracing::debug!("fetched {} models from {display_name}", models.len());
    models
  }
}

/// Pares one provider response down to catalog entries.
pub fn parse_catalog(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  match spec.catalog {
    CatalogShape::GoogleModels => parse_google(spec, data),
    CatalogShape::AnthropicData => parse_anthropic(spec, data),
    CatalogShape::MistralData => parse_mistral(spec, data),
    CatalogShape::CohereModels => parse_cohere(spec, data),
    CatalogShape::OpenAiData => parse_openai_style(spec, data),
    CatalogShape::HuggingFaceArray => parse_huggingface(spec, data),
  }
}

fn entry(spec: &ProviderSpec, upstream_id: &str, created: i64, owner: Option<String>) -> ModelEntry {
  ModelEntry {
    id: format!("{}{}", spec.catalog_prefix, upstream_id),
    created,
    owner: owner.unwrap_or_else(|| spec.display_name.to_lowercase()),
    provider: spec.display_name.to_string(),
  }
}

fn lowercase_tags(m: &Value) -> Vec<String> {
  tag_values(m.get("tags"))
}

/// Tags, falling back to `metadata.tags` when the top-level field is not
/// an array.
fn lowercase_tags_or_metadata(m: &Value) -> Vec<String> {
  match m.get("tags") {
    Some(tags) if tags.is_array() => tag_values(Some(tags)),
    _ => tag_values(m.pointer("/metadata/tags")),
  }
}

fn tag_values(tags: Option<&Value>) -> Vec<String> {
  tags
    .and_then(Value::as_array)
    .map(|tags| {
      tags
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_lowercase)
        .collect()
    })
    .unwrap_or_default()
}

fn rfc3339_timestamp(raw: Option<&Value>) -> Option<i64> {
  let raw = raw?.as_str()?;
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|parsed| parsed.timestamp())
}

fn parse_google(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  let Some(models) = data.get("models").and_then(Value::as_array) else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      let name = m.get("name").and_then(Value::as_str)?;
      let methods = m.get("supportedGenerationMethods").and_then(Value::as_array)?;
      if !methods
        .iter()
        .filter_map(Value::as_str)
        .any(|method| method == "generateContent")
      {
        return None;
      }
      if !is_valid_chat_model(name) {
        return None;
      }
      let upstream = name.strip_prefix("models/").unwrap_or(name);
      Some(entry(spec, upstream, Utc::now().timestamp(), None))
    })
    .collect()
}

fn parse_anthropic(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  const CHAT_TAGS: &[&str] = &["chat", "conversational", "assistant", "instruct", "completion"];

  let Some(models) = data.get("data").and_then(Value::as_array) else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      if m.get("type").and_then(Value::as_str) != Some("model") {
        return None;
      }
      let id = m.get("id").and_then(Value::as_str)?;

      let capabilities = match m.get("capabilities") {
        Some(capabilities) => Some(capabilities),
        None => m.pointer("/metadata/capabilities"),
      };
      let chat_capable = capabilities
        .and_then(|caps| caps.get("completion_chat"))
        .and_then(Value::as_bool)
        == Some(true)
        || lowercase_tags_or_metadata(m)
          .iter()
          .any(|tag| CHAT_TAGS.contains(&tag.as_str()))
        || is_valid_chat_model(id);
      if !chat_capable {
        return None;
      }

      let created =
        rfc3339_timestamp(m.get("created_at")).unwrap_or_else(|| Utc::now().timestamp());
      Some(entry(spec, id, created, None))
    })
    .collect()
}

fn parse_mistral(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  const CHAT_TAGS: &[&str] = &["chat", "instruct", "completion", "conversational", "assistant"];

  let Some(models) = data.get("data").and_then(Value::as_array) else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      let id = m.get("id").and_then(Value::as_str)?;

      let chat_capable = m
        .pointer("/capabilities/completion_chat")
        .and_then(Value::as_bool)
        == Some(true)
        || lowercase_tags_or_metadata(m)
          .iter()
          .any(|tag| CHAT_TAGS.contains(&tag.as_str()))
        || ((id.contains("instruct") || id.contains("chat")) && is_valid_chat_model(id));
      if !chat_capable {
        return None;
      }

      let created = m
        .get("created")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| Utc::now().timestamp());
      Some(entry(spec, id, created, None))
    })
    .collect()
}

fn parse_cohere(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  const NON_CHAT_TAGS: &[&str] = &["embed", "embedding", "classification", "search", "generation-image"];

  let Some(models) = data.get("models").and_then(Value::as_array) else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      let name = m.get("name").and_then(Value::as_str)?;
      if m.get("is_deprecated").and_then(Value::as_bool) == Some(true) {
        return None;
      }

      let has_chat_endpoint = m
        .get("endpoints")
        .and_then(Value::as_array)
        .is_some_and(|endpoints| {
          endpoints
            .iter()
            .filter_map(Value::as_str)
            .any(|endpoint| endpoint == "chat")
        });
      if !has_chat_endpoint
        && lowercase_tags(m)
          .iter()
          .any(|tag| NON_CHAT_TAGS.contains(&tag.as_str()))
      {
        return None;
      }
      if !is_valid_chat_model(name) {
        return None;
      }

      Some(entry(spec, name, Utc::now().timestamp(), None))
    })
    .collect()
}

fn parse_openai_style(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  const NON_CHAT_TAGS: &[&str] = &[
    "image",
    "vision",
    "audio",
    "embed",
    "embedding",
    "speech",
    "whisper",
    "tts",
    "transcribe",
  ];
  const OLD_FAMILIES: &[&str] = &["curie", "babbage", "ada"];

  let Some(models) = data.get("data").and_then(Value::as_array) else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      let id = m.get("id").and_then(Value::as_str)?;
      let lower = id.to_lowercase();

      if lowercase_tags_or_metadata(m)
        .iter()
        .any(|tag| NON_CHAT_TAGS.contains(&tag.as_str()))
      {
        return None;
      }
      if !is_valid_chat_model(&lower) {
        return None;
      }
      if lower.contains("vision") && !lower.contains("gpt-4") {
        return None;
      }
      if OLD_FAMILIES.iter().any(|family| lower.contains(family)) {
        return None;
      }

      let created = m
        .get("created")
        .and_then(Value::as_i64)
        .unwrap_or_else(|| Utc::now().timestamp());
      let owner = m
        .get("owned_by")
        .and_then(Value::as_str)
        .filter(|owner| !owner.is_empty())
        .map(str::to_string);
      Some(entry(spec, id, created, owner))
    })
    .collect()
}

fn parse_huggingface(spec: &ProviderSpec, data: &Value) -> Vec<ModelEntry> {
  const NON_CHAT_PIPELINES: &[&str] = &[
    "image-classification",
    "image-segmentation",
    "text-to-image",
    "image-to-image",
    "automatic-speech-recognition",
    "text-to-speech",
    "audio-classification",
    "voice",
    "speech",
    "audio",
    "stable-diffusion",
    "diffusion",
    "image-generation",
  ];
  const CHAT_PIPELINES: &[&str] = &[
    "text-generation",
    "text-to-text",
    "conversational",
    "question-answering",
    "text-generation-inference",
  ];
  // Raw weight repositories and offline packages, not callable endpoints.
  const WEIGHT_DISQUALIFIERS: &[&str] = &[
    "gguf",
    "ggml",
    "safetensors",
    "ckpt",
    "pt",
    "pth",
    "onnx",
    "quantized",
    "q4",
    "q5",
  ];
  const ENDPOINT_INDICATORS: &[&str] = &[
    "endpoints_compatible",
    "inference",
    "text-generation-inference",
    "endpoints",
    "inference-api",
    "hf-inference",
  ];
  const CHAT_TAGS: &[&str] = &[
    "chat",
    "conversational",
    "assistant",
    "instruct",
    "question-answering",
    "text-generation",
  ];

  let Some(models) = data.as_array() else {
    return Vec::new();
  };
  models
    .iter()
    .filter_map(|m| {
      let id = hf_model_id(m)?;
      if m.get("private").and_then(Value::as_bool) == Some(true) {
        return None;
      }

      let pipeline = m
        .get("pipeline_tag")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .unwrap_or_default();
      let tags = lowercase_tags(m);

      if NON_CHAT_PIPELINES.contains(&pipeline.as_str())
        || tags
          .iter()
          .any(|tag| NON_CHAT_PIPELINES.contains(&tag.as_str()))
      {
        return None;
      }

      let pipeline_is_chat = CHAT_PIPELINES.contains(&pipeline.as_str())
        || tags.iter().any(|tag| CHAT_PIPELINES.contains(&tag.as_str()));
      let accepted = if pipeline_is_chat {
        true
      } else {
        let lower = id.to_lowercase();
        if WEIGHT_DISQUALIFIERS
          .iter()
          .any(|needle| lower.contains(needle))
        {
          return None;
        }
        ENDPOINT_INDICATORS
          .iter()
          .any(|needle| tags.iter().any(|tag| tag == needle) || pipeline.contains(needle))
          || tags.iter().any(|tag| CHAT_TAGS.contains(&tag.as_str()))
          || is_valid_chat_model(id)
      };
      if !accepted {
        return None;
      }

      let created =
        rfc3339_timestamp(m.get("createdAt")).unwrap_or_else(|| Utc::now().timestamp());
      let owner = id
        .split('/')
        .next()
        .filter(|part| !part.is_empty())
        .map(str::to_string);
      Some(entry(spec, id, created, owner))
    })
    .collect()
}

fn hf_model_id(m: &Value) -> Option<&str> {
  for key in ["id", "modelId", "_id"] {
    if let Some(id) = m.get(key).and_then(Value::as_str) {
      if !id.is_empty() {
        return Some(id);
      }
    }
  }
  None
}

//! Model status cache
//!
//! In-memory TTL cache of per-model observations, shared by every request.
//! Quota marks expire after an hour; paid and working marks after a day.
//! Expired entries are evicted lazily on read.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::types::{ModelEntry, StatusKind, StatusSnapshot};

pub const QUOTA_ERROR_TTL_SECS: i64 = 60 * 60;
pub const STATUS_TTL_SECS: i64 = 24 * 60 * 60;

/// Models that are free to call, by provider key. Matching is substring
/// based so prefixed and routed ids hit too.
const FREE_MODELS: &[(&str, &[&str])] = &[
  (
    "groq",
    &[
      "llama-3.3-70b-versatile",
      "llama-3.1-8b-instant",
      "llama-3.3-70b-specdec",
    ],
  ),
  (
    "openrouter",
    &[
      "anthropic/claude-3-haiku",
      "google/gemini-1.5-flash",
      "mistral/mistral-7b-instruct",
      "meta-llama/llama-3.1-8b-instruct",
    ],
  ),
  (
    "huggingface",
    &[
      "Mistral-7B-Instruct-v0.1",
      "zephyr-7b-beta",
      "Phi-3-mini-4k-instruct",
    ],
  ),
  ("deepseek", &["deepseek-chat"]),
];

/// Namespace for one kind of cached observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StatusClass {
  Quota,
  Paid,
  Working,
}

impl StatusClass {
  fn ttl(self) -> Duration {
    match self {
      StatusClass::Quota => Duration::seconds(QUOTA_ERROR_TTL_SECS),
      StatusClass::Paid | StatusClass::Working => Duration::seconds(STATUS_TTL_SECS),
    }
  }

  fn status(self) -> StatusKind {
    match self {
      StatusClass::Quota => StatusKind::QuotaExceeded,
      StatusClass::Paid => StatusKind::Paid,
      StatusClass::Working => StatusKind::Working,
    }
  }
}

/// True when the id matches the known-free lists, either by model name or
/// by provider key substring.
pub fn is_known_free(model_id: &str) -> bool {
  let lower = model_id.to_lowercase();
  FREE_MODELS.iter().any(|(provider, models)| {
    lower.contains(provider)
      || models
        .iter()
        .any(|model| lower.contains(&model.to_lowercase()))
  })
}

/// Shared TTL cache of model observations.
pub struct ModelStatusCache {
  entries: RwLock<HashMap<(StatusClass, String), DateTime<Utc>>>,
}

impl ModelStatusCache {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }

  pub async fn mark_quota_exceeded(&self, model_id: &str) {
    self.mark_at(StatusClass::Quota, model_id, Utc::now()).await;
  }

  pub async fn mark_paid(&self, model_id: &str) {
    self.mark_at(StatusClass::Paid, model_id, Utc::now()).await;
  }

  pub async fn mark_working(&self, model_id: &str) {
    self
      .mark_at(StatusClass::Working, model_id, Utc::now())
      .await;
  }

  async fn mark_at(&self, class: StatusClass, model_id: &str, now: DateTime<Utc>) {
    self
      .entries
      .write()
      .await
      .insert((class, model_id.to_string()), now);
  }

  /// Effective status of one model.
  ///
  /// Quota marks shadow paid marks, which shadow the known-free lists.
  /// Working marks are visible in [`Self::all`] but never surface here;
  /// a model that worked once is not promised to be free.
  pub async fn status(&self, model_id: &str) -> StatusKind {
    self.status_at(model_id, Utc::now()).await
  }

  async fn status_at(&self, model_id: &str, now: DateTime<Utc>) -> StatusKind {
    if self.live_at(StatusClass::Quota, model_id, now).await {
      return StatusKind::QuotaExceeded;
    }
    if self.live_at(StatusClass::Paid, model_id, now).await {
      return StatusKind::Paid;
    }
    if is_known_free(model_id) {
      return StatusKind::Free;
    }
    StatusKind::Unknown
  }

  async fn live_at(&self, class: StatusClass, model_id: &str, now: DateTime<Utc>) -> bool {
    let mut entries = self.entries.write().await;
    let key = (class, model_id.to_string());
    match entries.get(&key) {
      Some(marked) if now - *marked > class.ttl() => {
        entries.remove(&key);
        false
      }
      Some(_) => true,
      None => false,
    }
  }

  /// Dump of every live entry, keyed by model id.
  ///
  /// When a model carries marks in several classes the highest-priority
  /// one wins: quota, then paid, then working.
  pub async fn all(&self) -> BTreeMap<String, StatusSnapshot> {
    self.all_at(Utc::now()).await
  }

  async fn all_at(&self, now: DateTime<Utc>) -> BTreeMap<String, StatusSnapshot> {
    let mut entries = self.entries.write().await;
    entries.retain(|(class, _), marked| now - *marked <= class.ttl());

    let mut statuses = BTreeMap::new();
    for class in [StatusClass::Quota, StatusClass::Paid, StatusClass::Working] {
      for ((entry_class, model_id), marked) in entries.iter() {
        if *entry_class == class && !statuses.contains_key(model_id) {
          statuses.insert(
            model_id.clone(),
            StatusSnapshot {
              status: class.status(),
              timestamp: *marked,
            },
          );
        }
      }
    }
    statuses
  }

  pub async fn clear(&self) {
    self.entries.write().await.clear();
    tracing::info!("model status cache cleared");
  }

  /// Drops catalog entries whose status is quota_exceeded or paid.
  pub async fn filter_catalog(&self, models: Vec<ModelEntry>) -> Vec<ModelEntry> {
    let mut kept = Vec::with_capacity(models.len());
    for model in models {
      let status = self.status(&model.id).await;
      if status != StatusKind::QuotaExceeded && status != StatusKind::Paid {
        kept.push(model);
      }
    }
    kept
  }
}

impl Default for ModelStatusCache {
  fn default() -> Self {
    Self::new()
  }
}

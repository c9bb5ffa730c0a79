//! Failed-model store
//!
//! File-backed record of models that failed permanently. Entries never
//! expire on their own; only explicit restore operations remove them. The
//! on-disk format is a JSON array of records, with the older bare-string
//! array still accepted and upgraded on load.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::error::Result;
use super::types::{FailureKind, FailureRecord};

/// Accepts the current record format and the legacy bare-string list.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
  Record(FailureRecord),
  Legacy(String),
}

/// Persistent set of permanently failed models, keyed by model id.
pub struct FailedModelStore {
  path: PathBuf,
  records: RwLock<BTreeMap<String, FailureRecord>>,
}

impl FailedModelStore {
  /// Opens the store at `path`, creating the parent directory if needed.
  ///
  /// A missing file starts the store empty. An unreadable file is logged
  /// and ignored rather than failing startup. Legacy bare-string entries
  /// are upgraded in memory and the file is rewritten in the record format.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let mut records = BTreeMap::new();
    let mut migrated = false;
    if path.exists() {
      match std::fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str::<Vec<StoredEntry>>(&data) {
          Ok(entries) => {
            for entry in entries {
              let record = match entry {
                StoredEntry::Record(record) => record,
                StoredEntry::Legacy(model_id) => {
                  migrated = true;
                  FailureRecord {
                    model_id,
                    error_type: FailureKind::Unknown,
                    detail: None,
                    timestamp: None,
                  }
                }
              };
              records.insert(record.model_id.clone(), record);
            }
          }
          Err(error) => {
            tracing::warn!(
              "ignoring unreadable failed-model store {}: {error}",
              path.display()
            );
          }
        },
        Err(error) => {
          tracing::warn!(
            "ignoring unreadable failed-model store {}: {error}",
            path.display()
          );
        }
      }
    }

    if migrated {
      write_records(&path, &records);
    }

    Ok(Self {
      path,
      records: RwLock::new(records),
    })
  }

  /// Records a failure for `model_id`, replacing any previous record.
  pub async fn record(
    &self,
    model_id: &str,
    kind: FailureKind,
    detail: Option<String>,
  ) -> FailureRecord {
    let record = FailureRecord {
      model_id: model_id.to_string(),
      error_type: kind,
      detail,
      timestamp: Some(Utc::now()),
    };
    let mut records = self.records.write().await;
    records.insert(record.model_id.clone(), record.clone());
    write_records(&self.path, &records);
    record
  }

  /// Removes one record. Returns false when the model was not present.
  pub async fn remove(&self, model_id: &str) -> bool {
    let mut records = self.records.write().await;
    if records.remove(model_id).is_none() {
      return false;
    }
    write_records(&self.path, &records);
    true
  }

  /// Drops every record and deletes the backing file.
  pub async fn clear(&self) {
    let mut records = self.records.write().await;
    records.clear();
    match std::fs::remove_file(&self.path) {
      Ok(()) => {}
      Err(error) if error.kind() == ErrorKind::NotFound => {}
      Err(error) => {
        tracing::error!(
          "failed to delete failed-model store {}: {error}",
          self.path.display()
        );
      }
    }
  }

  pub async fn contains(&self, model_id: &str) -> bool {
    self.records.read().await.contains_key(model_id)
  }

  /// Current records, ordered by model id.
  pub async fn list(&self) -> Vec<FailureRecord> {
    self.records.read().await.values().cloned().collect()
  }
}

/// Persists the records, logging instead of failing the mutation that
/// triggered the write.
fn write_records(path: &Path, records: &BTreeMap<String, FailureRecord>) {
  let entries: Vec<&FailureRecord> = records.values().collect();
  let payload = match serde_json::to_string_pretty(&entries) {
    Ok(payload) => payload,
    Err(error) => {
      tracing::error!("failed to serialize failed-model store: {error}");
      return;
    }
  };
  if let Err(error) = std::fs::write(path, payload) {
    tracing::error!(
      "failed to persist failed-model store {}: {error}",
      path.display()
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use tempfile::TempDir;

  fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data").join("failed-models.json")
  }

  #[tokio::test]
  async fn test_record_and_contains() {
    let dir = TempDir::new().expect("tempdir");
    let store = FailedModelStore::load(store_path(&dir)).expect("load");

    assert!(!store.contains("groq-llama-3.3-70b-versatile").await);
    let record = store
      .record(
        "groq-llama-3.3-70b-versatile",
        FailureKind::QuotaExceeded,
        Some("Groq API request failed (Status: 429)".to_string()),
      )
      .await;
    assert_eq!(record.error_type, FailureKind::QuotaExceeded);
    assert!(record.timestamp.is_some());
    assert!(store.contains("groq-llama-3.3-70b-versatile").await);
  }

  #[tokio::test]
  async fn test_records_survive_reload() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);

    {
      let store = FailedModelStore::load(&path).expect("load");
      store
        .record("gpt-4o", FailureKind::ApiError, Some("boom".to_string()))
        .await;
      store.record("claude-3-haiku", FailureKind::Timeout, None).await;
    }

    let reloaded = FailedModelStore::load(&path).expect("reload");
    let records = reloaded.list().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].model_id, "claude-3-haiku");
    assert_eq!(records[1].model_id, "gpt-4o");
    assert_eq!(records[1].detail.as_deref(), Some("boom"));
  }

  #[tokio::test]
  async fn test_legacy_string_entries_are_upgraded() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, "[\"gpt-4o\", \"mistral-large\"]").expect("seed");

    let store = FailedModelStore::load(&path).expect("load");
    let records = store.list().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].model_id, "gpt-4o");
    assert_eq!(records[0].error_type, FailureKind::Unknown);
    assert_eq!(records[0].timestamp, None);

    // The file itself is rewritten in the record format.
    let rewritten = std::fs::read_to_string(&path).expect("read");
    assert!(rewritten.contains("\"modelId\": \"gpt-4o\""));
    assert!(rewritten.contains("\"errorType\": \"unknown\""));
  }

  #[tokio::test]
  async fn test_remove_reports_presence() {
    let dir = TempDir::new().expect("tempdir");
    let store = FailedModelStore::load(store_path(&dir)).expect("load");
    store.record("gpt-4o", FailureKind::ApiError, None).await;

    assert!(store.remove("gpt-4o").await);
    assert!(!store.remove("gpt-4o").await);
    assert!(!store.contains("gpt-4o").await);
  }

  #[tokio::test]
  async fn test_clear_deletes_backing_file() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    let store = FailedModelStore::load(&path).expect("load");
    store.record("gpt-4o", FailureKind::ApiError, None).await;
    assert!(path.exists());

    store.clear().await;
    assert!(!path.exists());
    assert!(store.list().await.is_empty());

    // Clearing an already-empty store is not an error.
    store.clear().await;
  }

  #[tokio::test]
  async fn test_corrupt_file_starts_empty() {
    let dir = TempDir::new().expect("tempdir");
    let path = store_path(&dir);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, "{not json").expect("seed");

    let store = FailedModelStore::load(&path).expect("load");
    assert!(store.list().await.is_empty());
  }
}

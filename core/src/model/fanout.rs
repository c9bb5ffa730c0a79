//! Fan-out coordinator
//!
//! Starts independent chat streams for several models at once. Streams
//! share nothing but the status and failure caches, so one slow or broken
//! model can never stall or corrupt a sibling.

use std::sync::Arc;

use futures::stream;

use super::client::{ChatClient, ChunkStream};
use super::types::NormalizedChunk;

/// One model's normalized stream, tagged with the id it answers for.
pub struct ModelStream {
  pub model: String,
  pub stream: ChunkStream,
}

#[derive(Clone)]
pub struct FanOut {
  client: Arc<ChatClient>,
}

impl FanOut {
  pub fn new(client: Arc<ChatClient>) -> Self {
    Self { client }
  }

  /// Dispatches `message` to every model in `models`.
  ///
  /// Every entry gets a stream, even models that cannot be dispatched at
  /// all; those carry a single error chunk so the caller still observes a
  /// properly terminated stream per model.
  pub fn dispatch(&self, message: &str, models: &[String]) -> Vec<ModelStream> {
    models
      .iter()
      .map(|model| {
        let stream = match self.client.chat(model, message) {
          Ok(stream) => stream,
          Err(error) => {
            let chunk = NormalizedChunk::Error(error.to_string());
            Box::pin(stream::once(async move { chunk })) as ChunkStream
          }
        };
        ModelStream {
          model: model.clone(),
          stream,
        }
      })
      .collect()
  }
}

//! Upstream request construction
//!
//! Builds the provider-specific URL, auth placement, and JSON body for chat
//! and model-listing calls. The enabled check happens here, before any
//! network traffic.

use serde_json::{Value, json};

use super::error::{ModelError, Result};
use super::provider::{AuthStyle, RequestBody};
use super::registry::RegisteredProvider;

/// Product sampling defaults; not caller-configurable.
const TEMPERATURE: f64 = 0.8;
const TOP_P: f64 = 0.9;
const MAX_TOKENS: u32 = 4096;
const MAX_NEW_TOKENS: u32 = 1024;

/// A fully-built upstream chat request.
#[derive(Debug, Clone)]
pub struct BuiltChatRequest {
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Value,
}

/// A fully-built model-listing request.
#[derive(Debug, Clone)]
pub struct BuiltModelsRequest {
  pub url: String,
  pub headers: Vec<(String, String)>,
}

/// Builds the chat request for one resolved model.
///
/// `upstream_model` must already have the routing prefix stripped; it is
/// placed in the body verbatim. The question is trimmed before upstreams see
/// it.
pub fn build_chat_request(
  provider: &RegisteredProvider,
  upstream_model: &str,
  question: &str,
) -> Result<BuiltChatRequest> {
  let api_key = require_key(provider)?;
  let spec = provider.spec;

  let path = spec.chat_path(upstream_model);
  let url = apply_query_auth(format!("{}{}", provider.base_url, path), spec.auth, api_key);

  Ok(BuiltChatRequest {
    url,
    headers: request_headers(provider, api_key),
    body: chat_body(spec.body, upstream_model, question.trim()),
  })
}

/// Builds the model-listing request for one provider.
pub fn build_models_request(provider: &RegisteredProvider) -> Result<BuiltModelsRequest> {
  let api_key = require_key(provider)?;
  let spec = provider.spec;

  let url = apply_query_auth(
    format!("{}{}", provider.catalog_base_url, spec.models_path),
    spec.auth,
    api_key,
  );

  Ok(BuiltModelsRequest {
    url,
    headers: request_headers(provider, api_key),
  })
}

fn require_key(provider: &RegisteredProvider) -> Result<&str> {
  provider
    .api_key
    .as_deref()
    .ok_or(ModelError::ProviderDisabled {
      name: provider.spec.display_name,
      env_key: provider.spec.env_key,
    })
}

fn apply_query_auth(url: String, auth: AuthStyle, api_key: &str) -> String {
  if auth != AuthStyle::QueryParam {
    return url;
  }
  let sep = if url.contains('?') { '&' } else { '?' };
  format!("{url}{sep}key={api_key}")
}

fn request_headers(provider: &RegisteredProvider, api_key: &str) -> Vec<(String, String)> {
  let mut headers = Vec::new();

  match provider.spec.auth {
    AuthStyle::Bearer => {
      headers.push(("Authorization".to_string(), format!("Bearer {api_key}")));
    }
    AuthStyle::ApiKeyHeader => {
      headers.push(("x-api-key".to_string(), api_key.to_string()));
    }
    AuthStyle::QueryParam => {}
  }

  for (name, value) in provider.spec.extra_headers {
    headers.push(((*name).to_string(), value.resolve()));
  }

  headers
}

fn chat_body(body: RequestBody, model: &str, question: &str) -> Value {
  match body {
    RequestBody::OpenAiChat => json!({
        "model": model,
        "stream": true,
        "temperature": TEMPERATURE,
        "top_p": TOP_P,
        "messages": [{ "role": "user", "content": question }],
    }),
    RequestBody::AnthropicMessages => json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "stream": true,
        "temperature": TEMPERATURE,
        "top_p": TOP_P,
        "messages": [{ "role": "user", "content": question }],
    }),
    RequestBody::GoogleGenerate => json!({
        "contents": [{ "parts": [{ "text": question }] }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "topP": TOP_P,
            "maxOutputTokens": MAX_TOKENS,
        },
    }),
    RequestBody::CohereChat => json!({
        "model": model,
        "messages": [{ "role": "user", "content": question }],
        "temperature": TEMPERATURE,
        "stream": true,
    }),
    RequestBody::HuggingFaceInference => json!({
        "inputs": question,
        "parameters": {
            "temperature": TEMPERATURE,
            "top_p": TOP_P,
            "max_new_tokens": MAX_NEW_TOKENS,
        },
    }),
  }
}

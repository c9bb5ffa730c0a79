//! Provider Registry
//!
//! Snapshots the provider table with resolved credentials at startup and
//! routes model identifiers to providers by prefix.

use tracing::debug;

use super::provider::{DEFAULT_PROVIDER_KEY, PROVIDERS, ProviderSpec};

/// One provider with its credential and endpoints resolved.
#[derive(Debug, Clone)]
pub struct RegisteredProvider {
  pub spec: &'static ProviderSpec,
  pub api_key: Option<String>,
  pub base_url: String,
  pub catalog_base_url: String,
}

impl RegisteredProvider {
  /// A provider with no credential is never selected for chat or listing.
  pub fn enabled(&self) -> bool {
    self.api_key.is_some()
  }
}

/// Outcome of routing a model identifier.
#[derive(Debug)]
pub struct RouteMatch<'r, 'm> {
  pub provider: &'r RegisteredProvider,

  /// Model name as the upstream API expects it: the provider prefix is
  /// stripped on a match, and the id passes through unchanged on the
  /// default fallback.
  pub upstream_model: &'m str,
}

/// Provider Registry
///
/// Holds every known provider; `enabled` reflects whether its credential
/// environment variable was present at construction.
pub struct ProviderRegistry {
  providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
  /// Registry with credentials taken from the process environment. An empty
  /// variable counts as absent.
  pub fn from_env() -> Self {
    Self::with_credentials(|spec| {
      std::env::var(spec.env_key).ok().filter(|key| !key.is_empty())
    })
  }

  /// Registry with an explicit credential lookup, for callers that do not
  /// want ambient environment access.
  pub fn with_credentials<F>(lookup: F) -> Self
  where
    F: Fn(&ProviderSpec) -> Option<String>,
  {
    let providers = PROVIDERS
      .iter()
      .map(|spec| {
        let api_key = lookup(spec);
        if api_key.is_some() {
          debug!(provider = spec.key, "provider enabled");
        }
        RegisteredProvider {
          spec,
          api_key,
          base_url: spec.base_url.to_string(),
          catalog_base_url: spec.catalog_base_url.to_string(),
        }
      })
      .collect();

    Self { providers }
  }

  /// Points one provider's chat and catalog endpoints at a different root.
  pub fn with_base_url(mut self, key: &str, base_url: &str) -> Self {
    for provider in &mut self.providers {
      if provider.spec.key == key {
        provider.base_url = base_url.trim_end_matches('/').to_string();
        provider.catalog_base_url = provider.base_url.clone();
      }
    }
    self
  }

  /// Routes a model identifier to its provider.
  ///
  /// Longest matching prefix wins; identifiers matching no prefix go to the
  /// default provider with the id unchanged. Total: always returns a
  /// provider.
  pub fn resolve<'m>(&self, model: &'m str) -> RouteMatch<'_, 'm> {
    let mut best: Option<&RegisteredProvider> = None;
    for provider in &self.providers {
      if model.starts_with(provider.spec.model_prefix)
        && best.is_none_or(|b| provider.spec.model_prefix.len() > b.spec.model_prefix.len())
      {
        best = Some(provider);
      }
    }

    match best {
      Some(provider) => RouteMatch {
        provider,
        upstream_model: model
          .strip_prefix(provider.spec.model_prefix)
          .unwrap_or(model),
      },
      None => RouteMatch {
        provider: self.default_provider(),
        upstream_model: model,
      },
    }
  }

  /// Looks a provider up by key.
  pub fn get(&self, key: &str) -> Option<&RegisteredProvider> {
    self.providers.iter().find(|p| p.spec.key == key)
  }

  /// All providers, enabled or not, in table order.
  pub fn providers(&self) -> &[RegisteredProvider] {
    &self.providers
  }

  /// The no-prefix fallback provider.
  pub fn default_provider(&self) -> &RegisteredProvider {
    self
      .providers
      .iter()
      .find(|p| p.spec.key == DEFAULT_PROVIDER_KEY)
      .unwrap_or(&self.providers[0])
  }
}

// =============================================================================
// Tests
// =============================================================================

//! Static provider descriptions
//!
//! One [ProviderSpec] per upstream vendor: endpoints, authentication style,
//! routing prefix, request-body shape, and streaming framing. The table is
//! immutable; credentials are resolved by the registry at startup.

/// Where the API key goes on outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
  /// `Authorization: Bearer <key>`
  Bearer,
  /// `x-api-key: <key>` header
  ApiKeyHeader,
  /// `?key=<key>` query parameter
  QueryParam,
}

/// Chat endpoint path, fixed or derived from the upstream model name.
#[derive(Clone, Copy)]
pub enum ChatUrl {
  Static(&'static str),
  Templated(fn(&str) -> String),
}

impl std::fmt::Debug for ChatUrl {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ChatUrl::Static(path) => f.debug_tuple("Static").field(path).finish(),
      ChatUrl::Templated(_) => f.debug_tuple("Templated").field(&"<fn>").finish(),
    }
  }
}

/// Upstream streaming framing family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFraming {
  /// `data: {...}` lines, `[DONE]` sentinel, token at `choices[0].delta.content`
  OpenAi,
  /// `data: {...}` lines, `[DONE]` sentinel, token at `delta.text`
  Anthropic,
  /// `data: {...}` lines, no sentinel, token at `candidates[0].content.parts[0].text`
  Google,
  /// Double-newline SSE events; `event: content-delta` frames carry the token
  Cohere,
  /// Bare newline-delimited JSON; `token.text` yields tokens, `generated_text` ends
  HuggingFace,
}

/// Request body family for the chat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody {
  /// `{model, stream, temperature, top_p, messages}`
  OpenAiChat,
  /// OpenAI shape plus `max_tokens`
  AnthropicMessages,
  /// `{contents, generationConfig}`
  GoogleGenerate,
  /// `{model, messages, temperature, stream}`, no `top_p`
  CohereChat,
  /// `{inputs, parameters}`
  HuggingFaceInference,
}

/// Response shape of the provider's model-listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogShape {
  /// `{data: [{id, created, owned_by}]}` (OpenAI, Groq, DeepSeek, OpenRouter)
  OpenAiData,
  /// `{models: [{name, supportedGenerationMethods}]}`
  GoogleModels,
  /// `{data: [{id, type, created_at}]}`
  AnthropicData,
  /// `{data: [{id, capabilities}]}`
  MistralData,
  /// `{models: [{name, endpoints, is_deprecated}]}`
  CohereModels,
  /// Top-level array of model objects
  HuggingFaceArray,
}

/// Extra header value, literal or environment-derived.
#[derive(Debug, Clone, Copy)]
pub enum HeaderSpec {
  Literal(&'static str),
  /// Environment variable with a fallback when unset
  EnvOr(&'static str, &'static str),
}

impl HeaderSpec {
  pub fn resolve(&self) -> String {
    match self {
      HeaderSpec::Literal(value) => (*value).to_string(),
      HeaderSpec::EnvOr(var, fallback) => {
        std::env::var(var).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| (*fallback).to_string())
      }
    }
  }
}

/// Immutable description of one upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderSpec {
  pub key: &'static str,
  pub display_name: &'static str,
  pub env_key: &'static str,

  /// Chat API root
  pub base_url: &'static str,

  /// Model-listing root; differs from `base_url` only for Hugging Face
  pub catalog_base_url: &'static str,
  pub models_path: &'static str,
  pub chat_url: ChatUrl,

  /// Prefix stripped from incoming model ids during routing
  pub model_prefix: &'static str,

  /// Prefix prepended to upstream ids in catalog listings; empty for the
  /// default provider, whose models are listed unprefixed
  pub catalog_prefix: &'static str,

  pub auth: AuthStyle,
  pub framing: StreamFraming,
  pub body: RequestBody,
  pub catalog: CatalogShape,
  pub extra_headers: &'static [(&'static str, HeaderSpec)],
}

fn google_chat_path(model: &str) -> String {
  format!("/models/{model}:streamGenerateContent?alt=sse")
}

fn huggingface_chat_path(model: &str) -> String {
  format!("/models/{model}")
}

/// The provider table. Order is insignificant; routing picks the longest
/// matching prefix and falls back to [DEFAULT_PROVIDER_KEY] otherwise.
pub const PROVIDERS: &[ProviderSpec] = &[
  ProviderSpec {
    key: "groq",
    display_name: "Groq",
    env_key: "GROQ_API_KEY",
    base_url: "https://api.groq.com/openai/v1",
    catalog_base_url: "https://api.groq.com/openai/v1",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat/completions"),
    model_prefix: "groq-",
    catalog_prefix: "",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::OpenAi,
    body: RequestBody::OpenAiChat,
    catalog: CatalogShape::OpenAiData,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "openai",
    display_name: "OpenAI",
    env_key: "OPENAI_API_KEY",
    base_url: "https://api.openai.com/v1",
    catalog_base_url: "https://api.openai.com/v1",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat/completions"),
    model_prefix: "openai-",
    catalog_prefix: "openai-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::OpenAi,
    body: RequestBody::OpenAiChat,
    catalog: CatalogShape::OpenAiData,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "anthropic",
    display_name: "Anthropic",
    env_key: "ANTHROPIC_API_KEY",
    base_url: "https://api.anthropic.com/v1",
    catalog_base_url: "https://api.anthropic.com/v1",
    models_path: "/models",
    chat_url: ChatUrl::Static("/messages"),
    model_prefix: "anthropic-",
    catalog_prefix: "anthropic-",
    auth: AuthStyle::ApiKeyHeader,
    framing: StreamFraming::Anthropic,
    body: RequestBody::AnthropicMessages,
    catalog: CatalogShape::AnthropicData,
    extra_headers: &[("anthropic-version", HeaderSpec::Literal("2023-06-01"))],
  },
  ProviderSpec {
    key: "google",
    display_name: "Google AI",
    env_key: "GOOGLE_API_KEY",
    base_url: "https://generativelanguage.googleapis.com/v1beta",
    catalog_base_url: "https://generativelanguage.googleapis.com/v1beta",
    models_path: "/models",
    chat_url: ChatUrl::Templated(google_chat_path),
    model_prefix: "google-",
    catalog_prefix: "google-",
    auth: AuthStyle::QueryParam,
    framing: StreamFraming::Google,
    body: RequestBody::GoogleGenerate,
    catalog: CatalogShape::GoogleModels,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "mistral",
    display_name: "Mistral",
    env_key: "MISTRAL_API_KEY",
    base_url: "https://api.mistral.ai/v1",
    catalog_base_url: "https://api.mistral.ai/v1",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat/completions"),
    model_prefix: "mistral-",
    catalog_prefix: "mistral-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::OpenAi,
    body: RequestBody::OpenAiChat,
    catalog: CatalogShape::MistralData,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "cohere",
    display_name: "Cohere",
    env_key: "COHERE_API_KEY",
    base_url: "https://api.cohere.com/v2",
    catalog_base_url: "https://api.cohere.com/v2",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat"),
    model_prefix: "cohere-",
    catalog_prefix: "cohere-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::Cohere,
    body: RequestBody::CohereChat,
    catalog: CatalogShape::CohereModels,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "deepseek",
    display_name: "DeepSeek",
    env_key: "DEEPSEEK_API_KEY",
    base_url: "https://api.deepseek.com",
    catalog_base_url: "https://api.deepseek.com",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat/completions"),
    model_prefix: "deepseek-",
    catalog_prefix: "deepseek-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::OpenAi,
    body: RequestBody::OpenAiChat,
    catalog: CatalogShape::OpenAiData,
    extra_headers: &[],
  },
  ProviderSpec {
    key: "openrouter",
    display_name: "OpenRouter",
    env_key: "OPENROUTER_API_KEY",
    base_url: "https://openrouter.ai/api/v1",
    catalog_base_url: "https://openrouter.ai/api/v1",
    models_path: "/models",
    chat_url: ChatUrl::Static("/chat/completions"),
    model_prefix: "openrouter-",
    catalog_prefix: "openrouter-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::OpenAi,
    body: RequestBody::OpenAiChat,
    catalog: CatalogShape::OpenAiData,
    extra_headers: &[
      ("HTTP-Referer", HeaderSpec::EnvOr("APP_URL", "http://localhost")),
      ("X-Title", HeaderSpec::Literal("AI Model Comparison")),
    ],
  },
  ProviderSpec {
    key: "huggingface",
    display_name: "Hugging Face",
    env_key: "HUGGINGFACE_API_KEY",
    base_url: "https://api-inference.huggingface.co",
    // Listing must hit the main hub API; the inference host 410s on /models.
    catalog_base_url: "https://huggingface.co",
    models_path: "/api/models",
    chat_url: ChatUrl::Templated(huggingface_chat_path),
    model_prefix: "huggingface-",
    catalog_prefix: "huggingface-",
    auth: AuthStyle::Bearer,
    framing: StreamFraming::HuggingFace,
    body: RequestBody::HuggingFaceInference,
    catalog: CatalogShape::HuggingFaceArray,
    extra_headers: &[],
  },
];

/// Provider selected when no prefix matches.
pub const DEFAULT_PROVIDER_KEY: &str = "groq";

impl ProviderSpec {
  /// Chat endpoint path for this upstream model name.
  pub fn chat_path(&self, upstream_model: &str) -> String {
    match self.chat_url {
      ChatUrl::Static(path) => path.to_string(),
      ChatUrl::Templated(template) => template(upstream_model),
    }
  }
}

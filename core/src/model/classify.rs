//! Failure classification
//!
//! Maps upstream HTTP failures and transport errors onto the failure kinds
//! recorded against a model. HTTP classification is a rule table checked in
//! order so new upstream patterns can be added without touching call sites.

use reqwest::StatusCode;

use super::types::FailureKind;

/// Body substrings that mark a response as a quota problem, matched
/// case-insensitively.
const QUOTA_MARKERS: &[&str] = &["quota", "insufficient", "rate limit"];

/// One classification rule. The first matching rule wins.
pub struct ClassifyRule {
  pub kind: FailureKind,
  pub matches: fn(StatusCode, &str) -> bool,
}

pub const HTTP_FAILURE_RULES: &[ClassifyRule] = &[ClassifyRule {
  kind: FailureKind::QuotaExceeded,
  matches: |status, body| {
    if status == StatusCode::TOO_MANY_REQUESTS {
      return true;
    }
    let lower = body.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
  },
}];

/// Classifies a non-2xx upstream response.
pub fn classify_http_failure(status: StatusCode, body: &str) -> FailureKind {
  classify_with_rules(HTTP_FAILURE_RULES, status, body)
}

/// Applies `rules` in order, falling back to a generic API error.
pub fn classify_with_rules(rules: &[ClassifyRule], status: StatusCode, body: &str) -> FailureKind {
  for rule in rules {
    if (rule.matches)(status, body) {
      return rule.kind;
    }
  }
  FailureKind::ApiError
}

/// Classifies an error raised while sending the request, before any
/// response arrived.
pub fn classify_send_failure(error: &reqwest::Error) -> FailureKind {
  if error.is_timeout() {
    FailureKind::Timeout
  } else {
    FailureKind::NetworkError
  }
}

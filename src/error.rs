//! Typed failures surfaced by the cache manager.

use thiserror::Error;

/// Failure of an upstream fetch, classified for retry decisions.
///
/// Errors are `Clone` so that callers coalesced onto a single in-flight
/// fetch can all observe the leader's failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// No response was received at all (DNS failure, refused connection,
  /// reset mid-body).
  #[error("network failure: {0}")]
  Network(String),

  /// The upstream answered with a non-2xx status.
  #[error("upstream returned HTTP {code}")]
  HttpStatus { code: u16 },

  /// The response body could not be decoded into the declared payload type.
  #[error("payload parse failure: {0}")]
  Parse(String),

  /// The fetch was aborted before it completed.
  #[error("fetch cancelled")]
  Cancelled,
}

impl FetchError {
  /// Whether retrying may help.
  ///
  /// Network errors and server-side statuses are transient. Client errors
  /// are terminal, except request-timeout (408) and rate-limit (429).
  /// Parse failures and cancellations are never retried.
  pub fn is_transient(&self) -> bool {
    match self {
      FetchError::Network(_) => true,
      FetchError::HttpStatus { code } => matches!(code, 408 | 429 | 500..=599),
      FetchError::Parse(_) => false,
      FetchError::Cancelled => false,
    }
  }
}

impl From<serde_json::Error> for FetchError {
  fn from(e: serde_json::Error) -> Self {
    FetchError::Parse(e.to_string())
  }
}

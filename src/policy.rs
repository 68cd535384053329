//! Per-resource retry policy with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;

/// Predicate deciding whether a given failure is worth retrying.
type RetryPredicate = Arc<dyn Fn(&FetchError) -> bool + Send + Sync>;

/// Retry behavior attached to a logical resource type.
///
/// The default is 2 retries with exponential backoff doubling from one
/// second, capped at 30 seconds, retrying only transient failures
/// (see [`FetchError::is_transient`]).
#[derive(Clone)]
pub struct RequestPolicy {
  /// Retries after the initial attempt.
  pub max_retries: u32,
  /// Delay before the first retry; doubles on each subsequent one.
  pub base_delay: Duration,
  /// Backoff ceiling.
  pub max_delay: Duration,
  retryable_on: RetryPredicate,
}

impl RequestPolicy {
  pub fn new(max_retries: u32) -> Self {
    Self {
      max_retries,
      ..Self::default()
    }
  }

  /// Never retry, regardless of failure kind.
  pub fn no_retry() -> Self {
    Self::new(0)
  }

  pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
    self.base_delay = base_delay;
    self
  }

  pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
    self.max_delay = max_delay;
    self
  }

  /// Replace the retryable-failure predicate.
  pub fn with_retryable_on<F>(mut self, predicate: F) -> Self
  where
    F: Fn(&FetchError) -> bool + Send + Sync + 'static,
  {
    self.retryable_on = Arc::new(predicate);
    self
  }

  /// Whether the given failure should be retried under this policy.
  pub fn should_retry(&self, error: &FetchError) -> bool {
    (self.retryable_on)(error)
  }

  /// Backoff delay before retry number `attempt` (zero-based):
  /// `base_delay * 2^attempt`, capped at `max_delay`.
  pub fn retry_delay(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }
}

impl Default for RequestPolicy {
  fn default() -> Self {
    Self {
      max_retries: 2,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(30),
      retryable_on: Arc::new(FetchError::is_transient),
    }
  }
}

impl std::fmt::Debug for RequestPolicy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RequestPolicy")
      .field("max_retries", &self.max_retries)
      .field("base_delay", &self.base_delay)
      .field("max_delay", &self.max_delay)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles_and_caps() {
    let policy = RequestPolicy::new(5)
      .with_base_delay(Duration::from_secs(1))
      .with_max_delay(Duration::from_secs(30));

    assert_eq!(policy.retry_delay(0), Duration::from_secs(1));
    assert_eq!(policy.retry_delay(1), Duration::from_secs(2));
    assert_eq!(policy.retry_delay(2), Duration::from_secs(4));
    assert_eq!(policy.retry_delay(4), Duration::from_secs(16));
    // Capped from here on
    assert_eq!(policy.retry_delay(5), Duration::from_secs(30));
    assert_eq!(policy.retry_delay(20), Duration::from_secs(30));
  }

  #[test]
  fn default_predicate_follows_transience() {
    let policy = RequestPolicy::default();
    assert!(policy.should_retry(&FetchError::HttpStatus { code: 429 }));
    assert!(!policy.should_retry(&FetchError::HttpStatus { code: 404 }));
  }

  #[test]
  fn custom_predicate_overrides() {
    let policy = RequestPolicy::new(1).with_retryable_on(|_| false);
    assert!(!policy.should_retry(&FetchError::Network("timeout".into())));
  }
}

//! Cache entries and the results returned by the manager.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::error::FetchError;
use crate::freshness::{classify_at, FreshnessBucket};

/// A single cached payload.
///
/// Created on first successful fetch for a key and replaced wholesale on
/// refetch, never mutated in place. Eviction happens on GC sweeps, on a
/// window independent of the staleness window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// The payload as stored JSON (validated against the declared type at
  /// the fetch boundary).
  pub payload: Value,
  /// When the payload was fetched.
  pub fetched_at: DateTime<Utc>,
  /// How long the payload may be served without revalidation.
  pub stale_after: Duration,
}

impl CacheEntry {
  pub fn new(payload: Value, fetched_at: DateTime<Utc>, stale_after: Duration) -> Self {
    Self {
      payload,
      fetched_at,
      stale_after,
    }
  }

  /// Age of the payload as of `now`.
  pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
    now - self.fetched_at
  }

  /// Whether the payload is still within its staleness window as of `now`.
  pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
    self.age_at(now) < self.stale_after
  }

  pub fn is_fresh(&self) -> bool {
    self.is_fresh_at(Utc::now())
  }

  /// Freshness bucket for status displays, using the caller's thresholds.
  pub fn freshness(&self, green: Duration, yellow: Duration) -> FreshnessBucket {
    classify_at(Utc::now(), Some(self.fetched_at), green, yellow)
  }
}

/// Where the data in a [`CacheResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the network (or shared from a coalesced fetch).
  Network,
  /// Served from cache, still within its staleness window.
  CacheFresh,
  /// Refetch failed; serving the surviving stale entry because the caller
  /// opted into stale-if-error.
  StaleFallback,
}

/// Payload plus metadata about where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  /// When the payload was fetched from the network.
  pub fetched_at: DateTime<Utc>,
  /// The terminal failure that forced a stale fallback, if any.
  pub error: Option<FetchError>,
}

impl<T> CacheResult<T> {
  pub(crate) fn from_network(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at,
      error: None,
    }
  }

  pub(crate) fn from_cache(data: T, fetched_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      fetched_at,
      error: None,
    }
  }

  pub(crate) fn stale_fallback(data: T, fetched_at: DateTime<Utc>, error: FetchError) -> Self {
    Self {
      data,
      source: CacheSource::StaleFallback,
      fetched_at,
      error: Some(error),
    }
  }

  /// Whether this result is a degraded serve of stale data.
  pub fn is_stale_fallback(&self) -> bool {
    self.source == CacheSource::StaleFallback
  }

  /// Freshness bucket of the served payload against the caller's thresholds.
  pub fn freshness(&self, green: Duration, yellow: Duration) -> FreshnessBucket {
    classify_at(Utc::now(), Some(self.fetched_at), green, yellow)
  }
}

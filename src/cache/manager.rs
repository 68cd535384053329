//! Cache manager: get-or-fetch orchestration over an injectable store.
//!
//! The manager is the single entry point for cached data access. It serves
//! fresh entries without touching the network, coalesces concurrent fetches
//! for the same key into one network call, retries failures per the
//! attached [`RequestPolicy`], and optionally serves a surviving stale
//! entry when a refetch fails terminally.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{AbortRegistration, Abortable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::entry::{CacheEntry, CacheResult};
use super::key::ResourceKey;
use super::store::CacheStore;
use crate::error::FetchError;
use crate::policy::RequestPolicy;

/// Per-call configuration for [`CacheManager::get_or_fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
  /// How long a stored payload may be served without revalidation.
  pub stale_after: Duration,
  /// Retry behavior for the underlying fetch.
  pub policy: RequestPolicy,
  /// On terminal failure, serve a surviving stale entry alongside the
  /// error instead of failing outright.
  pub stale_if_error: bool,
}

impl FetchOptions {
  pub fn new(stale_after: Duration) -> Self {
    Self {
      stale_after,
      ..Self::default()
    }
  }

  pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_stale_if_error(mut self, stale_if_error: bool) -> Self {
    self.stale_if_error = stale_if_error;
    self
  }
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      stale_after: Duration::minutes(5),
      policy: RequestPolicy::default(),
      stale_if_error: false,
    }
  }
}

/// Result of one settled network fetch, shared with coalesced waiters.
type FetchOutcome = Result<(Value, DateTime<Utc>), FetchError>;

struct Inner<S> {
  store: S,
  /// At most one outstanding fetch per key; later callers subscribe to
  /// the leader's broadcast instead of fetching.
  inflight: DashMap<String, broadcast::Sender<FetchOutcome>>,
}

/// Deregisters a leader's in-flight entry when it settles or when its
/// future is dropped mid-fetch, so later callers for the key never await
/// a channel that can no longer settle.
struct InflightGuard<'a> {
  inflight: &'a DashMap<String, broadcast::Sender<FetchOutcome>>,
  hash: &'a str,
}

impl Drop for InflightGuard<'_> {
  fn drop(&mut self) {
    self.inflight.remove(self.hash);
  }
}

/// Central mapping from resource key to cached payload.
///
/// Cheap to clone; clones share the store and the in-flight table.
pub struct CacheManager<S: CacheStore> {
  inner: Arc<Inner<S>>,
}

enum Role {
  Leader(broadcast::Sender<FetchOutcome>),
  Follower(broadcast::Receiver<FetchOutcome>),
}

impl<S: CacheStore> CacheManager<S> {
  pub fn new(store: S) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        inflight: DashMap::new(),
      }),
    }
  }

  /// Return the cached payload for `key` if still fresh; otherwise fetch,
  /// store the new entry and return it.
  ///
  /// Concurrent calls for the same key while a fetch is outstanding await
  /// that fetch's result rather than issuing duplicate network calls.
  /// Failures are retried per `options.policy`; a terminal failure is
  /// returned typed, or downgraded to a [`CacheResult::stale_fallback`]
  /// serve when `options.stale_if_error` is set and a stale entry survives.
  pub async fn get_or_fetch<K, T, F, Fut>(
    &self,
    key: &K,
    fetcher: F,
    options: FetchOptions,
  ) -> Result<CacheResult<T>, FetchError>
  where
    K: ResourceKey + ?Sized,
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    self.get_or_fetch_inner(key, fetcher, options, None).await
  }

  /// [`Self::get_or_fetch`] with explicit cancellation.
  ///
  /// Aborting the registration's handle settles the call (and any
  /// coalesced waiters) with [`FetchError::Cancelled`]. Cancellation never
  /// falls back to stale data.
  pub async fn get_or_fetch_abortable<K, T, F, Fut>(
    &self,
    key: &K,
    fetcher: F,
    options: FetchOptions,
    abort: AbortRegistration,
  ) -> Result<CacheResult<T>, FetchError>
  where
    K: ResourceKey + ?Sized,
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    self
      .get_or_fetch_inner(key, fetcher, options, Some(abort))
      .await
  }

  async fn get_or_fetch_inner<K, T, F, Fut>(
    &self,
    key: &K,
    fetcher: F,
    options: FetchOptions,
    abort: Option<AbortRegistration>,
  ) -> Result<CacheResult<T>, FetchError>
  where
    K: ResourceKey + ?Sized,
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    let hash = key.cache_hash();

    if let Some(entry) = self.inner.store.get(&hash) {
      if entry.is_fresh() {
        debug!(key = %key.describe(), "cache hit");
        let data = serde_json::from_value(entry.payload)?;
        return Ok(CacheResult::from_cache(data, entry.fetched_at));
      }
    }

    // Join the outstanding fetch for this key, or become its leader. The
    // table shard is held only to register; never across the fetch itself.
    let role = match self.inner.inflight.entry(hash.clone()) {
      Entry::Occupied(occupied) => Role::Follower(occupied.get().subscribe()),
      Entry::Vacant(vacant) => {
        // The previous leader may have settled between our freshness
        // check and claiming the entry.
        if let Some(entry) = self.inner.store.get(&hash) {
          if entry.is_fresh() {
            let data = serde_json::from_value(entry.payload)?;
            return Ok(CacheResult::from_cache(data, entry.fetched_at));
          }
        }
        let (tx, _) = broadcast::channel(1);
        vacant.insert(tx.clone());
        Role::Leader(tx)
      }
    };

    match role {
      Role::Follower(mut rx) => {
        debug!(key = %key.describe(), "coalescing onto in-flight fetch");
        let outcome = match rx.recv().await {
          Ok(outcome) => outcome,
          // Every sender is gone: the leader's future was dropped (or its
          // task aborted) without settling.
          Err(_) => Err(FetchError::Cancelled),
        };
        self.settle(&hash, outcome, &options)
      }
      Role::Leader(tx) => {
        // Deregistration must survive this future being dropped at the
        // fetch await (task abort, select!, timeout), or the key would be
        // poisoned for every later caller.
        let registration = InflightGuard {
          inflight: &self.inner.inflight,
          hash: &hash,
        };

        debug!(key = %key.describe(), "fetching");
        let outcome = drive_fetch(&fetcher, &options.policy, abort).await;

        // Store before deregistering, so a racing caller finds either the
        // in-flight entry or the fresh payload.
        if let Ok((payload, fetched_at)) = &outcome {
          self.inner.store.put(
            &hash,
            CacheEntry::new(payload.clone(), *fetched_at, options.stale_after),
          );
          self.inner.store.sweep(*fetched_at);
        }
        drop(registration);
        let _ = tx.send(outcome.clone());

        self.settle(&hash, outcome, &options)
      }
    }
  }

  /// Remove the entry for `key` immediately. The next `get_or_fetch`
  /// bypasses the cache even if the entry was still fresh.
  pub fn invalidate<K: ResourceKey + ?Sized>(&self, key: &K) {
    self.inner.store.remove(&key.cache_hash());
  }

  /// Read-only inspection for status and diagnostic views. Never fetches;
  /// `None` before any fetch has completed for the key.
  pub fn peek<K: ResourceKey + ?Sized>(&self, key: &K) -> Option<CacheEntry> {
    self.inner.store.get(&key.cache_hash())
  }

  /// Evict entries past the store's GC window. Also runs opportunistically
  /// after each successful fetch.
  pub fn gc(&self) -> usize {
    self.inner.store.sweep(Utc::now())
  }

  /// Drop every cached entry (logout/teardown lifecycle).
  pub fn clear(&self) {
    self.inner.store.clear();
  }

  fn settle<T: DeserializeOwned>(
    &self,
    hash: &str,
    outcome: FetchOutcome,
    options: &FetchOptions,
  ) -> Result<CacheResult<T>, FetchError> {
    match outcome {
      Ok((payload, fetched_at)) => {
        let data = serde_json::from_value(payload)?;
        Ok(CacheResult::from_network(data, fetched_at))
      }
      Err(err) => {
        if options.stale_if_error && err != FetchError::Cancelled {
          if let Some(entry) = self.inner.store.get(hash) {
            warn!(error = %err, "refetch failed, serving stale cache");
            let data = serde_json::from_value(entry.payload)?;
            return Ok(CacheResult::stale_fallback(data, entry.fetched_at, err));
          }
        }
        warn!(error = %err, "fetch failed");
        Err(err)
      }
    }
  }
}

impl<S: CacheStore> Clone for CacheManager<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

/// Run the fetcher under the retry policy, serializing the payload at the
/// fetch boundary. An abort registration cancels attempts and backoff
/// sleeps alike.
async fn drive_fetch<T, F, Fut>(
  fetcher: &F,
  policy: &RequestPolicy,
  abort: Option<AbortRegistration>,
) -> FetchOutcome
where
  T: Serialize,
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, FetchError>>,
{
  let attempts = async {
    let mut attempt = 0u32;
    loop {
      match fetcher().await {
        Ok(data) => {
          let payload = serde_json::to_value(&data)?;
          return Ok((payload, Utc::now()));
        }
        Err(err) => {
          if attempt >= policy.max_retries || !policy.should_retry(&err) {
            return Err(err);
          }
          let delay = policy.retry_delay(attempt);
          debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying fetch");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  };

  match abort {
    Some(registration) => match Abortable::new(attempts, registration).await {
      Ok(outcome) => outcome,
      Err(_aborted) => Err(FetchError::Cancelled),
    },
    None => attempts.await,
  }
}

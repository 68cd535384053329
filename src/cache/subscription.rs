//! Cancellable periodic revalidation.
//!
//! Views that previously owned raw interval timers get a [`Subscription`]
//! instead: the manager runs the refetch loop, and dropping the handle
//! stops it. No timer can leak past view teardown.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::entry::CacheResult;
use super::key::ResourceKey;
use super::manager::{CacheManager, FetchOptions};
use super::store::CacheStore;
use crate::error::FetchError;

/// Stream of periodic refetch outcomes, cancelled on drop.
pub struct Subscription<T> {
  handle: JoinHandle<()>,
  rx: mpsc::UnboundedReceiver<Result<CacheResult<T>, FetchError>>,
}

impl<T> Subscription<T> {
  /// Await the next outcome. `None` once the subscription has stopped.
  pub async fn next_update(&mut self) -> Option<Result<CacheResult<T>, FetchError>> {
    self.rx.recv().await
  }

  /// Non-blocking check for a pending outcome, for callers polling from
  /// a render loop.
  pub fn poll_update(&mut self) -> Option<Result<CacheResult<T>, FetchError>> {
    self.rx.try_recv().ok()
  }

  /// Stop the refetch loop. Equivalent to dropping the subscription.
  pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

impl<S: CacheStore> CacheManager<S> {
  /// Revalidate `key` on a fixed period, delivering each outcome to the
  /// returned subscription. The first tick fires immediately.
  ///
  /// Refetches go through [`Self::get_or_fetch`], so they share the
  /// coalescing and retry behavior of on-demand calls, and a period
  /// shorter than `options.stale_after` degrades to serving cache.
  pub fn subscribe<K, T, F, Fut>(
    &self,
    key: K,
    every: std::time::Duration,
    fetcher: F,
    options: FetchOptions,
  ) -> Subscription<T>
  where
    // The loop borrows the key and fetcher across the fetch await, so
    // both must be shareable with the spawned task.
    K: ResourceKey + Send + Sync + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let manager = self.clone();
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      loop {
        ticker.tick().await;
        let outcome = manager.get_or_fetch(&key, &fetcher, options.clone()).await;
        if tx.send(outcome).is_err() {
          debug!(key = %key.describe(), "subscription receiver dropped, stopping");
          break;
        }
      }
    });

    Subscription { handle, rx }
  }
}

//! Minimum inter-request spacing per upstream target.
//!
//! Separate from staleness-based caching: the throttle guard protects shared
//! upstream services from bursts of duplicate calls triggered by rapid UI
//! re-renders, by spacing dispatches to the same target at least a minimum
//! interval apart.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum interval between dispatches to the same target.
///
/// The per-target slot timestamp advances at reservation time, not at
/// completion, so concurrent callers for one target serialize their
/// dispatch times instead of racing through together.
#[derive(Clone, Default)]
pub struct ThrottleGuard {
  slots: Arc<Mutex<HashMap<String, Instant>>>,
}

impl ThrottleGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// Wait until at least `min_interval` has passed since the previous
  /// dispatch slot for `target`, then claim the next slot and return.
  pub async fn acquire(&self, target: &str, min_interval: Duration) {
    let wait = {
      let mut slots = self.slots.lock().await;
      let now = Instant::now();
      match slots.get(target) {
        Some(&last) => {
          let slot = (last + min_interval).max(now);
          slots.insert(target.to_string(), slot);
          slot - now
        }
        None => {
          slots.insert(target.to_string(), now);
          Duration::ZERO
        }
      }
    };

    if !wait.is_zero() {
      debug!(upstream = %target, delay_ms = wait.as_millis() as u64, "throttling dispatch");
      tokio::time::sleep(wait).await;
    }
  }

  /// Acquire a dispatch slot for `target`, then run the operation.
  pub async fn run<T, F, Fut>(&self, target: &str, min_interval: Duration, op: F) -> T
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
  {
    self.acquire(target, min_interval).await;
    op().await
  }

  /// Forget all recorded dispatch times.
  pub async fn reset(&self) {
    self.slots.lock().await.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn second_dispatch_waits_out_the_interval() {
    let guard = ThrottleGuard::new();
    let interval = Duration::from_millis(50);

    let start = Instant::now();
    guard.acquire("nws-alerts", interval).await;
    guard.acquire("nws-alerts", interval).await;

    assert!(start.elapsed() >= interval);
  }

  #[tokio::test]
  async fn distinct_targets_do_not_wait_on_each_other() {
    let guard = ThrottleGuard::new();
    let interval = Duration::from_millis(200);

    let start = Instant::now();
    guard.acquire("fema-rss", interval).await;
    guard.acquire("noaa-stations", interval).await;

    // Only the first dispatch for each target, so no sleeping.
    assert!(start.elapsed() < interval);
  }

  #[tokio::test]
  async fn concurrent_callers_serialize_dispatch_slots() {
    let guard = ThrottleGuard::new();
    let interval = Duration::from_millis(40);

    let start = Instant::now();
    tokio::join!(
      guard.acquire("airtable", interval),
      guard.acquire("airtable", interval),
      guard.acquire("airtable", interval),
    );

    // Third caller's slot is two intervals after the first.
    assert!(start.elapsed() >= interval * 2);
  }

  #[tokio::test]
  async fn run_spaces_the_wrapped_operation() {
    let guard = ThrottleGuard::new();
    let interval = Duration::from_millis(30);

    let first = guard.run("inat", interval, || async { Instant::now() }).await;
    let second = guard.run("inat", interval, || async { Instant::now() }).await;

    assert!(second - first >= interval);
  }

  #[tokio::test]
  async fn reset_clears_recorded_slots() {
    let guard = ThrottleGuard::new();
    let interval = Duration::from_millis(100);

    guard.acquire("fema-rss", interval).await;
    guard.reset().await;

    let start = Instant::now();
    guard.acquire("fema-rss", interval).await;
    assert!(start.elapsed() < interval);
  }
}

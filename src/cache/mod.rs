//! Query cache for upstream data feeds.
//!
//! This module provides a feed-agnostic caching layer that:
//! - Keys entries by logical resource identifiers with per-resource
//!   staleness windows
//! - Coalesces concurrent fetches for one key into a single network call
//! - Retries transient failures per an attached policy
//! - Optionally serves stale data when a refetch fails (stale-if-error)
//! - Replaces raw polling timers with cancellable subscriptions

mod entry;
mod key;
mod manager;
mod store;
mod subscription;

pub use entry::{CacheEntry, CacheResult, CacheSource};
pub use key::ResourceKey;
pub use manager::{CacheManager, FetchOptions};
pub use store::{CacheStore, MemoryStore, NoopStore};
pub use subscription::Subscription;

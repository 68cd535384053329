//! Freshness-aware caching for disaster-relief data feeds.
//!
//! Relief coordination UIs aggregate slow third-party feeds (FEMA, NOAA,
//! NWS alerts, Airtable volunteer data, iNaturalist species lists). This
//! crate is the policy layer between those fetchers and the views:
//!
//! - [`CacheManager`] — get-or-fetch with per-resource staleness windows,
//!   request coalescing, retries and stale-if-error fallback
//! - [`ThrottleGuard`] — minimum spacing between dispatches to one upstream
//! - [`classify`] — pure recency bucketing shared by status text and map
//!   marker colors
//! - [`CacheConfig`] — per-feed thresholds and policies from YAML
//!
//! # Example
//!
//! ```ignore
//! let manager = CacheManager::new(MemoryStore::new());
//! let config = CacheConfig::load(None)?;
//! let feed = config.feed("supply_sites");
//!
//! let result = manager
//!     .get_or_fetch("supply_sites", || fetch_supply_sites(), feed.fetch_options())
//!     .await?;
//!
//! let (green, yellow) = feed.thresholds();
//! render_sites(&result.data, result.freshness(green, yellow));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod freshness;
pub mod policy;
pub mod throttle;

pub use cache::{
  CacheEntry, CacheManager, CacheResult, CacheSource, CacheStore, FetchOptions, MemoryStore,
  NoopStore, ResourceKey, Subscription,
};
pub use config::{CacheConfig, ConfigError, FeedConfig};
pub use error::FetchError;
pub use freshness::{classify, classify_at, FreshnessBucket};
pub use policy::RequestPolicy;
pub use throttle::ThrottleGuard;

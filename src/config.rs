//! Per-feed cache configuration.
//!
//! Each view reads its staleness window, retry behavior and freshness
//! thresholds from here instead of holding literal durations. Example:
//!
//! ```yaml
//! defaults:
//!   stale_after_minutes: 5
//! feeds:
//!   supply_sites:
//!     green_threshold_hours: 168    # 7 days
//!     yellow_threshold_hours: 720   # 30 days
//!     refetch_interval_minutes: 60
//!   species:
//!     green_threshold_hours: 6
//!     yellow_threshold_hours: 24
//!     min_request_interval_ms: 2000
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

use crate::cache::FetchOptions;
use crate::policy::RequestPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(String),

  #[error("failed to read config file {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    source: serde_yaml::Error,
  },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Settings applied when a feed has no entry of its own.
  #[serde(default)]
  pub defaults: FeedConfig,
  /// Per-feed overrides, keyed by feed name.
  #[serde(default)]
  pub feeds: HashMap<String, FeedConfig>,
}

/// Cache behavior for one data feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
  /// Minutes before a cached payload must be revalidated.
  pub stale_after_minutes: i64,
  /// Retries after the initial attempt.
  pub max_retries: u32,
  /// First backoff delay, in milliseconds. Doubles per retry.
  pub retry_base_ms: u64,
  /// Backoff ceiling, in milliseconds.
  pub retry_max_ms: u64,
  /// Serve a surviving stale entry when a refetch fails terminally.
  pub stale_if_error: bool,
  /// Freshness display threshold: ages within this are "fresh".
  pub green_threshold_hours: i64,
  /// Freshness display threshold: ages within this (but past green)
  /// are "aging"; beyond it, "stale".
  pub yellow_threshold_hours: i64,
  /// Background revalidation period, if the feed polls.
  pub refetch_interval_minutes: Option<u64>,
  /// Minimum spacing between dispatches to this feed's upstream.
  pub min_request_interval_ms: Option<u64>,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      stale_after_minutes: 5,
      max_retries: 2,
      retry_base_ms: 1_000,
      retry_max_ms: 30_000,
      stale_if_error: true,
      green_threshold_hours: 6,
      yellow_threshold_hours: 24,
      refetch_interval_minutes: None,
      min_request_interval_ms: None,
    }
  }
}

impl FeedConfig {
  pub fn fetch_options(&self) -> FetchOptions {
    FetchOptions::new(Duration::minutes(self.stale_after_minutes))
      .with_policy(self.policy())
      .with_stale_if_error(self.stale_if_error)
  }

  pub fn policy(&self) -> RequestPolicy {
    RequestPolicy::new(self.max_retries)
      .with_base_delay(StdDuration::from_millis(self.retry_base_ms))
      .with_max_delay(StdDuration::from_millis(self.retry_max_ms))
  }

  /// `(green, yellow)` thresholds for the recency classifier.
  pub fn thresholds(&self) -> (Duration, Duration) {
    (
      Duration::hours(self.green_threshold_hours),
      Duration::hours(self.yellow_threshold_hours),
    )
  }

  pub fn refetch_period(&self) -> Option<StdDuration> {
    self
      .refetch_interval_minutes
      .map(|m| StdDuration::from_secs(m * 60))
  }

  pub fn min_request_interval(&self) -> Option<StdDuration> {
    self.min_request_interval_ms.map(StdDuration::from_millis)
  }
}

impl CacheConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reliefdata.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reliefdata/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::NotFound(p.display().to_string()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      // No file anywhere: built-in defaults for every feed.
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("reliefdata.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reliefdata").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
      path: path.display().to_string(),
      source: e,
    })?;

    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
      path: path.display().to_string(),
      source: e,
    })
  }

  /// Settings for a feed, falling back to the defaults section.
  pub fn feed(&self, name: &str) -> FeedConfig {
    self
      .feeds
      .get(name)
      .cloned()
      .unwrap_or_else(|| self.defaults.clone())
  }
}

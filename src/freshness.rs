//! Recency classification shared by cache-status text and map marker colors.
//!
//! A single pure function maps "time since last update" plus two
//! caller-supplied thresholds to a discrete bucket, so a site that renders
//! as a yellow marker always reports "aging" in status text and vice versa.
//! The classifier holds no default thresholds; each view supplies its own
//! (supply-site maps use days, species caches use hours).

use chrono::{DateTime, Duration, Utc};

/// Discrete freshness of a piece of data relative to a view's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreshnessBucket {
  /// Age within the green threshold.
  Fresh,
  /// Age past green but within yellow.
  Aging,
  /// Age past the yellow threshold.
  Stale,
  /// No last-updated timestamp available.
  Unknown,
}

impl FreshnessBucket {
  /// Stable lowercase name, used verbatim in status text and as the
  /// lookup key for marker color palettes.
  pub fn label(&self) -> &'static str {
    match self {
      FreshnessBucket::Fresh => "fresh",
      FreshnessBucket::Aging => "aging",
      FreshnessBucket::Stale => "stale",
      FreshnessBucket::Unknown => "unknown",
    }
  }
}

impl std::fmt::Display for FreshnessBucket {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Classify `last_updated` against the green/yellow thresholds as of `now`.
///
/// Boundary ages belong to the fresher bucket: an age exactly equal to
/// `green` is still `Fresh`, exactly equal to `yellow` is still `Aging`.
pub fn classify_at(
  now: DateTime<Utc>,
  last_updated: Option<DateTime<Utc>>,
  green: Duration,
  yellow: Duration,
) -> FreshnessBucket {
  let Some(updated) = last_updated else {
    return FreshnessBucket::Unknown;
  };

  let age = now - updated;
  if age <= green {
    FreshnessBucket::Fresh
  } else if age <= yellow {
    FreshnessBucket::Aging
  } else {
    FreshnessBucket::Stale
  }
}

/// [`classify_at`] evaluated at the current wall clock.
pub fn classify(
  last_updated: Option<DateTime<Utc>>,
  green: Duration,
  yellow: Duration,
) -> FreshnessBucket {
  classify_at(Utc::now(), last_updated, green, yellow)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn species_cache_hour_thresholds() {
    let now = Utc::now();
    let green = Duration::hours(6);
    let yellow = Duration::hours(24);

    assert_eq!(
      classify_at(now, Some(now - Duration::hours(3)), green, yellow),
      FreshnessBucket::Fresh
    );
    assert_eq!(
      classify_at(now, Some(now - Duration::hours(10)), green, yellow),
      FreshnessBucket::Aging
    );
    assert_eq!(
      classify_at(now, Some(now - Duration::hours(48)), green, yellow),
      FreshnessBucket::Stale
    );
    assert_eq!(
      classify_at(now, None, green, yellow),
      FreshnessBucket::Unknown
    );
  }

  #[test]
  fn supply_site_day_thresholds() {
    let now = Utc::now();
    let green = Duration::days(7);
    let yellow = Duration::days(30);

    assert_eq!(
      classify_at(now, Some(now - Duration::days(2)), green, yellow),
      FreshnessBucket::Fresh
    );
    assert_eq!(
      classify_at(now, Some(now - Duration::days(14)), green, yellow),
      FreshnessBucket::Aging
    );
    assert_eq!(
      classify_at(now, Some(now - Duration::days(90)), green, yellow),
      FreshnessBucket::Stale
    );
  }

  #[test]
  fn boundary_ages_take_the_fresher_bucket() {
    let now = Utc::now();
    let green = Duration::hours(6);
    let yellow = Duration::hours(24);

    assert_eq!(
      classify_at(now, Some(now - green), green, yellow),
      FreshnessBucket::Fresh
    );
    assert_eq!(
      classify_at(now, Some(now - yellow), green, yellow),
      FreshnessBucket::Aging
    );
  }

  #[test]
  fn future_timestamps_are_fresh() {
    // Clock skew between upstream and client shows up as negative age.
    let now = Utc::now();
    assert_eq!(
      classify_at(
        now,
        Some(now + Duration::hours(1)),
        Duration::hours(6),
        Duration::hours(24)
      ),
      FreshnessBucket::Fresh
    );
  }

  #[test]
  fn labels_are_stable() {
    assert_eq!(FreshnessBucket::Fresh.label(), "fresh");
    assert_eq!(FreshnessBucket::Aging.label(), "aging");
    assert_eq!(FreshnessBucket::Stale.label(), "stale");
    assert_eq!(FreshnessBucket::Unknown.label(), "unknown");
    assert_eq!(FreshnessBucket::Stale.to_string(), "stale");
  }
}

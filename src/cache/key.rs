//! Resource keys identify cacheable units of data.

use sha2::{Digest, Sha256};

/// Logical identifier for a cacheable unit of data (a bioregion's species
/// list, the supply-site roster, the active alert feed).
///
/// Applications typically implement this on an enum of their feed types;
/// `&str`/`String` impls cover ad-hoc keys.
pub trait ResourceKey {
  /// The identity string. Two keys with equal material address the same
  /// cache slot.
  fn key_material(&self) -> String;

  /// Human-readable description for logs and status views.
  fn describe(&self) -> String {
    self.key_material()
  }

  /// Stable fixed-length cache key: SHA-256 of the key material.
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.key_material().as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl ResourceKey for str {
  fn key_material(&self) -> String {
    self.to_string()
  }
}

impl ResourceKey for String {
  fn key_material(&self) -> String {
    self.clone()
  }
}

impl<K: ResourceKey + ?Sized> ResourceKey for &K {
  fn key_material(&self) -> String {
    (**self).key_material()
  }

  fn describe(&self) -> String {
    (**self).describe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  enum FeedKey {
    Species { bioregion: String },
    SupplySites,
  }

  impl ResourceKey for FeedKey {
    fn key_material(&self) -> String {
      match self {
        FeedKey::Species { bioregion } => format!("species:{}", bioregion.to_lowercase()),
        FeedKey::SupplySites => "supply_sites".to_string(),
      }
    }

    fn describe(&self) -> String {
      match self {
        FeedKey::Species { bioregion } => format!("species for {}", bioregion),
        FeedKey::SupplySites => "supply sites".to_string(),
      }
    }
  }

  #[test]
  fn equal_material_hashes_equal() {
    let a = FeedKey::Species {
      bioregion: "Cascadia".into(),
    };
    let b = FeedKey::Species {
      bioregion: "cascadia".into(),
    };
    assert_eq!(a.cache_hash(), b.cache_hash());
    assert_ne!(a.cache_hash(), FeedKey::SupplySites.cache_hash());
  }

  #[test]
  fn hash_is_stable_hex_sha256() {
    let hash = "supply_sites".cache_hash();
    assert_eq!(hash.len(), 64);
    assert_eq!(hash, "supply_sites".to_string().cache_hash());
  }
}

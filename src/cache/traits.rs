//! Core traits for cached list items.

use serde::{de::DeserializeOwned, Serialize};

/// Trait for items that can live in a list cache.
///
/// Implementors must provide a stable identity. Two items with the same
/// `cache_key` are the same record; a later fetch replaces the earlier state.
pub trait Cacheable:
  Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
  /// Unique identifier for this item (e.g., post id)
  fn cache_key(&self) -> String;

  /// Last modification timestamp (ISO 8601).
  /// Returns None if the item doesn't track modification time.
  fn updated_at(&self) -> Option<&str> {
    None
  }
}

/// Names the kind of item a list manages (e.g., "post", "comment").
///
/// Used to scope the cache and its persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityDescriptor(String);

impl EntityDescriptor {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn name(&self) -> &str {
    &self.0
  }

  /// A descriptor is usable only if it names something.
  pub fn is_valid(&self) -> bool {
    !self.0.trim().is_empty()
  }
}

impl std::fmt::Display for EntityDescriptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

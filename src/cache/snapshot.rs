//! Immutable, sectioned views of cache content.

use super::traits::Cacheable;

/// Position of an item inside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
  pub section: usize,
  pub row: usize,
}

impl IndexPath {
  pub const fn new(section: usize, row: usize) -> Self {
    Self { section, row }
  }
}

/// Items sharing one section key, in sort order.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
  pub key: String,
  pub items: Vec<T>,
}

/// Ordered sections of ordered items.
///
/// Every item appears in exactly one section, and sections never hold zero
/// items.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot<T> {
  sections: Vec<Section<T>>,
}

impl<T> CacheSnapshot<T> {
  pub(crate) fn new(sections: Vec<Section<T>>) -> Self {
    Self { sections }
  }

  pub fn empty() -> Self {
    Self {
      sections: Vec::new(),
    }
  }

  pub fn sections(&self) -> &[Section<T>] {
    &self.sections
  }

  pub fn section_count(&self) -> usize {
    self.sections.len()
  }

  /// Total number of items across all sections.
  pub fn len(&self) -> usize {
    self.sections.iter().map(|s| s.items.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.sections.is_empty()
  }

  pub fn get(&self, path: IndexPath) -> Option<&T> {
    self
      .sections
      .get(path.section)
      .and_then(|s| s.items.get(path.row))
  }

  pub fn contains_path(&self, path: IndexPath) -> bool {
    self.get(path).is_some()
  }

  /// Items in display order with their positions.
  pub fn iter(&self) -> impl Iterator<Item = (IndexPath, &T)> {
    self.sections.iter().enumerate().flat_map(|(s, section)| {
      section
        .items
        .iter()
        .enumerate()
        .map(move |(r, item)| (IndexPath::new(s, r), item))
    })
  }

  /// Position of `path` when all sections are laid out one after another.
  pub fn flat_index(&self, path: IndexPath) -> Option<usize> {
    if !self.contains_path(path) {
      return None;
    }
    let before: usize = self.sections[..path.section]
      .iter()
      .map(|s| s.items.len())
      .sum();
    Some(before + path.row)
  }

  /// Inverse of [`flat_index`](Self::flat_index).
  pub fn path_at(&self, mut flat: usize) -> Option<IndexPath> {
    for (s, section) in self.sections.iter().enumerate() {
      if flat < section.items.len() {
        return Some(IndexPath::new(s, flat));
      }
      flat -= section.items.len();
    }
    None
  }
}

impl<T: Cacheable> CacheSnapshot<T> {
  pub fn index_of(&self, key: &str) -> Option<IndexPath> {
    self
      .iter()
      .find(|(_, item)| item.cache_key() == key)
      .map(|(path, _)| path)
  }

  /// Identities in display order.
  pub fn keys(&self) -> Vec<String> {
    self.iter().map(|(_, item)| item.cache_key()).collect()
  }
}

impl<T> Default for CacheSnapshot<T> {
  fn default() -> Self {
    Self::empty()
  }
}

//! Query definitions: which cached items are shown, in what order, and how
//! they are grouped into sections.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::snapshot::{CacheSnapshot, Section};
use super::traits::Cacheable;

/// Filters items out of a snapshot entirely.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Maps an item to the key of the section it belongs to.
pub type SectionKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

type CompareFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// One level of ordering applied to items within a section.
pub struct SortDescriptor<T> {
  compare: CompareFn<T>,
  ascending: bool,
}

impl<T> SortDescriptor<T> {
  /// Sort by a derived key, smallest first.
  pub fn ascending<K, F>(key: F) -> Self
  where
    K: Ord,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    Self {
      compare: Arc::new(move |a, b| key(a).cmp(&key(b))),
      ascending: true,
    }
  }

  /// Sort by a derived key, largest first.
  pub fn descending<K, F>(key: F) -> Self
  where
    K: Ord,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    Self {
      ascending: false,
      ..Self::ascending(key)
    }
  }

  fn compare(&self, a: &T, b: &T) -> Ordering {
    let ordering = (self.compare)(a, b);
    if self.ascending {
      ordering
    } else {
      ordering.reverse()
    }
  }
}

impl<T> Clone for SortDescriptor<T> {
  fn clone(&self) -> Self {
    Self {
      compare: Arc::clone(&self.compare),
      ascending: self.ascending,
    }
  }
}

/// Fetch specification plus section grouping for a cache.
///
/// With no sort descriptors items are ordered by identity. Sort descriptors
/// always fall back to identity order for ties, so the same content and the
/// same query produce the same snapshot.
pub struct CacheQuery<T> {
  predicate: Option<Predicate<T>>,
  sort: Vec<SortDescriptor<T>>,
  section_key: Option<SectionKeyFn<T>>,
}

impl<T: Cacheable> CacheQuery<T> {
  pub fn new() -> Self {
    Self {
      predicate: None,
      sort: Vec::new(),
      section_key: None,
    }
  }

  /// Only items for which `predicate` returns true are part of the snapshot.
  pub fn filter<F>(mut self, predicate: F) -> Self
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    self.predicate = Some(Arc::new(predicate));
    self
  }

  /// Append a sort level.
  pub fn sort_by(mut self, descriptor: SortDescriptor<T>) -> Self {
    self.sort.push(descriptor);
    self
  }

  /// Group items into sections keyed by `key`.
  pub fn sectioned_by<F>(mut self, key: F) -> Self
  where
    F: Fn(&T) -> String + Send + Sync + 'static,
  {
    self.section_key = Some(Arc::new(key));
    self
  }

  pub fn is_sectioned(&self) -> bool {
    self.section_key.is_some()
  }

  /// The section an item belongs to. Unsectioned queries put everything in
  /// the section with the empty key.
  pub fn section_of(&self, item: &T) -> String {
    self
      .section_key
      .as_ref()
      .map(|key| key(item))
      .unwrap_or_default()
  }

  pub fn matches(&self, item: &T) -> bool {
    self.predicate.as_ref().map_or(true, |p| p(item))
  }

  fn compare(&self, a: &T, b: &T) -> Ordering {
    self
      .sort
      .iter()
      .map(|descriptor| descriptor.compare(a, b))
      .find(|ordering| ordering.is_ne())
      .unwrap_or_else(|| a.cache_key().cmp(&b.cache_key()))
  }

  /// Build a snapshot from `items`.
  pub fn run<'a, I>(&self, items: I) -> CacheSnapshot<T>
  where
    I: IntoIterator<Item = &'a T>,
  {
    let mut kept: Vec<&T> = items.into_iter().filter(|item| self.matches(item)).collect();
    kept.sort_by(|a, b| self.compare(a, b));

    let mut grouped: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for item in kept {
      grouped
        .entry(self.section_of(item))
        .or_default()
        .push(item.clone());
    }

    CacheSnapshot::new(
      grouped
        .into_iter()
        .map(|(key, items)| Section { key, items })
        .collect(),
    )
  }
}

impl<T: Cacheable> Default for CacheQuery<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for CacheQuery<T> {
  fn clone(&self) -> Self {
    Self {
      predicate: self.predicate.clone(),
      sort: self.sort.clone(),
      section_key: self.section_key.clone(),
    }
  }
}

impl<T> std::fmt::Debug for CacheQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CacheQuery")
      .field("filtered", &self.predicate.is_some())
      .field("sort_levels", &self.sort.len())
      .field("sectioned", &self.section_key.is_some())
      .finish()
  }
}

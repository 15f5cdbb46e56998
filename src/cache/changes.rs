//! Change descriptions between two snapshots.
//!
//! A [`ChangeSet`] carries enough to drive an incremental list update:
//! deletions and move sources use positions in the previous snapshot,
//! insertions and move targets use positions in the current one.

use std::collections::{HashMap, HashSet};

use super::snapshot::{CacheSnapshot, IndexPath};
use super::traits::Cacheable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionChange {
  /// Index in the current snapshot
  Insert { key: String, index: usize },
  /// Index in the previous snapshot
  Delete { key: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemChange {
  Insert {
    key: String,
    at: IndexPath,
  },
  Delete {
    key: String,
    from: IndexPath,
  },
  /// Same identity, same relative position, different data
  Update {
    key: String,
    from: IndexPath,
    to: IndexPath,
  },
  /// Relative order or section changed
  Move {
    key: String,
    from: IndexPath,
    to: IndexPath,
  },
}

impl ItemChange {
  pub fn key(&self) -> &str {
    match self {
      ItemChange::Insert { key, .. }
      | ItemChange::Delete { key, .. }
      | ItemChange::Update { key, .. }
      | ItemChange::Move { key, .. } => key,
    }
  }
}

/// Everything that changed in one cache mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
  pub sections: Vec<SectionChange>,
  pub items: Vec<ItemChange>,
}

impl ChangeSet {
  pub fn is_empty(&self) -> bool {
    self.sections.is_empty() && self.items.is_empty()
  }

  pub fn inserted(&self) -> usize {
    self
      .items
      .iter()
      .filter(|c| matches!(c, ItemChange::Insert { .. }))
      .count()
  }

  pub fn deleted(&self) -> usize {
    self
      .items
      .iter()
      .filter(|c| matches!(c, ItemChange::Delete { .. }))
      .count()
  }

  pub fn is_deleted(&self, key: &str) -> bool {
    self
      .items
      .iter()
      .any(|c| matches!(c, ItemChange::Delete { key: k, .. } if k == key))
  }

  /// Compute the changes that turn `old` into `new`.
  pub fn between<T: Cacheable>(old: &CacheSnapshot<T>, new: &CacheSnapshot<T>) -> Self {
    let mut changes = ChangeSet::default();

    let old_sections: HashSet<&str> = old.sections().iter().map(|s| s.key.as_str()).collect();
    let new_sections: HashSet<&str> = new.sections().iter().map(|s| s.key.as_str()).collect();

    for (index, section) in old.sections().iter().enumerate() {
      if !new_sections.contains(section.key.as_str()) {
        changes.sections.push(SectionChange::Delete {
          key: section.key.clone(),
          index,
        });
      }
    }
    for (index, section) in new.sections().iter().enumerate() {
      if !old_sections.contains(section.key.as_str()) {
        changes.sections.push(SectionChange::Insert {
          key: section.key.clone(),
          index,
        });
      }
    }

    let new_positions: HashMap<String, (IndexPath, usize, &T)> = new
      .iter()
      .enumerate()
      .map(|(flat, (path, item))| (item.cache_key(), (path, flat, item)))
      .collect();

    // Items present in both, in previous display order
    let mut survivors = Vec::new();
    let mut old_keys = HashSet::new();
    for (from, item) in old.iter() {
      let key = item.cache_key();
      match new_positions.get(&key) {
        Some(&(to, flat, current)) => survivors.push((key.clone(), from, to, flat, item, current)),
        None => changes.items.push(ItemChange::Delete {
          key: key.clone(),
          from,
        }),
      }
      old_keys.insert(key);
    }

    for (at, item) in new.iter() {
      let key = item.cache_key();
      if !old_keys.contains(&key) {
        changes.items.push(ItemChange::Insert { key, at });
      }
    }

    let order: Vec<usize> = survivors.iter().map(|s| s.3).collect();
    let stable = longest_increasing(&order);

    for (i, (key, from, to, _, previous, current)) in survivors.into_iter().enumerate() {
      let section_changed = old.sections()[from.section].key != new.sections()[to.section].key;
      if section_changed || !stable[i] {
        changes.items.push(ItemChange::Move { key, from, to });
      } else if previous != current {
        changes.items.push(ItemChange::Update { key, from, to });
      }
    }

    changes
  }
}

/// Marks the members of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
  // tails[k] = index into seq of the smallest tail of an increasing run of length k+1
  let mut tails: Vec<usize> = Vec::new();
  let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

  for (i, &value) in seq.iter().enumerate() {
    let pos = tails.partition_point(|&t| seq[t] < value);
    if pos > 0 {
      prev[i] = Some(tails[pos - 1]);
    }
    if pos == tails.len() {
      tails.push(i);
    } else {
      tails[pos] = i;
    }
  }

  let mut members = vec![false; seq.len()];
  let mut cursor = tails.last().copied();
  while let Some(i) = cursor {
    members[i] = true;
    cursor = prev[i];
  }
  members
}

//! In-memory results cache with change notification.

use std::collections::HashMap;
use tokio::sync::mpsc;

use super::changes::ChangeSet;
use super::query::CacheQuery;
use super::snapshot::CacheSnapshot;
use super::traits::Cacheable;

/// How incoming items are combined with cached content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
  /// Full sync: the incoming set becomes the content
  ReplaceAll,
  /// Pagination: incoming items are upserted by identity
  Append,
}

#[derive(Debug, Clone)]
struct Entry<T> {
  item: T,
  /// Order in which the identity was first fetched
  fetched: u64,
}

/// Cached items plus the snapshot the current query produces from them.
///
/// Every mutation re-runs the query, diffs against the previous snapshot and
/// broadcasts the resulting [`ChangeSet`] to subscribers.
pub struct ResultsCache<T: Cacheable> {
  entries: HashMap<String, Entry<T>>,
  next_fetched: u64,
  active: CacheQuery<T>,
  snapshot: CacheSnapshot<T>,
  subscribers: Vec<mpsc::UnboundedSender<ChangeSet>>,
}

impl<T: Cacheable> ResultsCache<T> {
  pub fn new(query: CacheQuery<T>) -> Self {
    Self {
      entries: HashMap::new(),
      next_fetched: 0,
      active: query,
      snapshot: CacheSnapshot::empty(),
      subscribers: Vec::new(),
    }
  }

  /// Snapshot produced by the active query.
  pub fn snapshot(&self) -> &CacheSnapshot<T> {
    &self.snapshot
  }

  pub fn active_query(&self) -> &CacheQuery<T> {
    &self.active
  }

  /// Run an arbitrary query against the cached content.
  pub fn query(&self, query: &CacheQuery<T>) -> CacheSnapshot<T> {
    query.run(self.entries.values().map(|e| &e.item))
  }

  /// Number of cached items, including ones the active query filters out.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, key: &str) -> Option<&T> {
    self.entries.get(key).map(|e| &e.item)
  }

  /// Cached items in the order they were first fetched.
  pub fn items(&self) -> Vec<T> {
    let mut entries: Vec<&Entry<T>> = self.entries.values().collect();
    entries.sort_by_key(|e| e.fetched);
    entries.into_iter().map(|e| e.item.clone()).collect()
  }

  /// Receive a [`ChangeSet`] for every non-empty mutation from now on.
  pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChangeSet> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.push(tx);
    rx
  }

  /// Seed content from persisted state. Subscribers are not notified.
  pub fn restore(&mut self, items: Vec<T>) {
    self.entries.clear();
    for item in items {
      self.upsert(item);
    }
    self.snapshot = self.query(&self.active);
  }

  /// Merge fetched items and return what changed.
  pub fn merge(&mut self, items: Vec<T>, strategy: MergeStrategy) -> ChangeSet {
    let incoming = items.len();
    if strategy == MergeStrategy::ReplaceAll {
      let mut previous = std::mem::take(&mut self.entries);
      for item in items {
        let key = item.cache_key();
        match previous.remove(&key).or_else(|| self.entries.remove(&key)) {
          Some(entry) => {
            self.entries.insert(
              key,
              Entry {
                item,
                fetched: entry.fetched,
              },
            );
          }
          None => self.upsert(item),
        }
      }
    } else {
      for item in items {
        self.upsert(item);
      }
    }

    let changes = self.rebuild();
    tracing::debug!(
      ?strategy,
      incoming,
      cached = self.entries.len(),
      inserted = changes.inserted(),
      deleted = changes.deleted(),
      "Merged items into cache"
    );
    changes
  }

  /// Drop all content.
  pub fn invalidate(&mut self) -> ChangeSet {
    self.entries.clear();
    tracing::debug!("Cache invalidated");
    self.rebuild()
  }

  /// Swap the query definition and rebuild the snapshot.
  pub fn set_query(&mut self, query: CacheQuery<T>) -> ChangeSet {
    self.active = query;
    self.rebuild()
  }

  fn upsert(&mut self, item: T) {
    let key = item.cache_key();
    match self.entries.get_mut(&key) {
      Some(entry) => entry.item = item,
      None => {
        self.entries.insert(
          key,
          Entry {
            item,
            fetched: self.next_fetched,
          },
        );
        self.next_fetched += 1;
      }
    }
  }

  fn rebuild(&mut self) -> ChangeSet {
    let snapshot = self.query(&self.active);
    let changes = ChangeSet::between(&self.snapshot, &snapshot);
    self.snapshot = snapshot;
    if !changes.is_empty() {
      self
        .subscribers
        .retain(|tx| tx.send(changes.clone()).is_ok());
    }
    changes
  }
}

impl<T: Cacheable> std::fmt::Debug for ResultsCache<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResultsCache")
      .field("cached", &self.entries.len())
      .field("shown", &self.snapshot.len())
      .field("query", &self.active)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::changes::tests::assert_consistent;
  use crate::cache::changes::ItemChange;
  use crate::cache::traits::testing::{notes, Note};

  fn grouped() -> ResultsCache<Note> {
    ResultsCache::new(CacheQuery::new().sectioned_by(|n: &Note| n.group.clone()))
  }

  #[test]
  fn test_replace_all_yields_exactly_merged_set() {
    let mut cache = grouped();
    cache.merge(notes("old", 10), MergeStrategy::ReplaceAll);

    let fresh = vec![
      Note::new("b", "two", 0),
      Note::new("a", "one", 0),
      Note::new("c", "two", 0),
    ];
    cache.merge(fresh, MergeStrategy::ReplaceAll);

    let snapshot = cache.snapshot();
    assert_eq!(cache.len(), 3);
    assert_eq!(snapshot.section_count(), 2);
    assert_eq!(snapshot.sections()[0].key, "one");
    assert_eq!(snapshot.keys(), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_replace_all_updates_in_place() {
    let mut cache = grouped();
    cache.merge(vec![Note::new("a", "g", 0)], MergeStrategy::ReplaceAll);
    let changes = cache.merge(
      vec![Note::new("a", "g", 0).titled("new title")],
      MergeStrategy::ReplaceAll,
    );

    assert_eq!(cache.get("a").map(|n| n.title.as_str()), Some("new title"));
    assert!(matches!(changes.items.as_slice(), [ItemChange::Update { .. }]));
  }

  #[test]
  fn test_append_same_page_twice_has_no_duplicates() {
    let mut cache = grouped();
    let page = notes("p", 5);
    cache.merge(page.clone(), MergeStrategy::Append);
    let changes = cache.merge(page, MergeStrategy::Append);

    assert_eq!(cache.len(), 5);
    assert_eq!(cache.snapshot().len(), 5);
    assert!(changes.is_empty());
  }

  #[test]
  fn test_append_keeps_latest_state_and_resorts() {
    let mut cache = grouped();
    cache.merge(vec![Note::new("m", "g", 0)], MergeStrategy::Append);
    cache.merge(
      vec![Note::new("a", "g", 0), Note::new("m", "g", 0).titled("fresh")],
      MergeStrategy::Append,
    );

    assert_eq!(cache.snapshot().keys(), vec!["a", "m"]);
    assert_eq!(cache.get("m").map(|n| n.title.as_str()), Some("fresh"));
  }

  #[test]
  fn test_last_duplicate_in_batch_wins() {
    let mut cache = grouped();
    cache.merge(
      vec![Note::new("a", "g", 0), Note::new("a", "g", 0).titled("second")],
      MergeStrategy::ReplaceAll,
    );
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("a").map(|n| n.title.as_str()), Some("second"));
  }

  #[test]
  fn test_changes_stay_in_bounds() {
    let mut cache = grouped();
    cache.merge(
      vec![
        Note::new("a", "x", 0),
        Note::new("b", "y", 0),
        Note::new("c", "y", 0),
      ],
      MergeStrategy::ReplaceAll,
    );
    let old = cache.snapshot().clone();
    let changes = cache.merge(
      vec![
        Note::new("c", "x", 0),
        Note::new("d", "z", 0),
        Note::new("e", "z", 0),
      ],
      MergeStrategy::ReplaceAll,
    );
    assert_consistent(&old, cache.snapshot(), &changes);
  }

  #[test]
  fn test_invalidate_clears_and_notifies() {
    let mut cache = grouped();
    let mut rx = cache.subscribe();
    cache.merge(notes("n", 3), MergeStrategy::ReplaceAll);
    let changes = cache.invalidate();

    assert!(cache.snapshot().is_empty());
    assert_eq!(changes.deleted(), 3);
    assert_eq!(rx.try_recv().map(|c| c.inserted()), Ok(3));
    assert_eq!(rx.try_recv().map(|c| c.deleted()), Ok(3));
  }

  #[test]
  fn test_empty_change_not_broadcast() {
    let mut cache = grouped();
    let mut rx = cache.subscribe();
    cache.invalidate();
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_items_keep_fetch_order() {
    let mut cache = grouped();
    cache.merge(
      vec![Note::new("z", "g", 0), Note::new("a", "g", 0)],
      MergeStrategy::Append,
    );
    let keys: Vec<String> = cache.items().iter().map(|n| n.id.clone()).collect();
    assert_eq!(keys, vec!["z", "a"]);
  }

  #[test]
  fn test_set_query_rebuilds_snapshot() {
    let mut cache = grouped();
    cache.merge(
      vec![Note::new("a", "x", 0), Note::new("b", "y", 0)],
      MergeStrategy::ReplaceAll,
    );
    cache.set_query(CacheQuery::new().filter(|n: &Note| n.group == "y"));
    assert_eq!(cache.snapshot().keys(), vec!["b"]);
    assert_eq!(cache.len(), 2);
  }
}

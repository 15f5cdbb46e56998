//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{Cacheable, EntityDescriptor};

/// Identifies one persisted list: an entity plus a cache name.
///
/// Several lists of the same entity (e.g., drafts and published posts) keep
/// separate content by using different cache names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
  pub entity: EntityDescriptor,
  pub cache_name: String,
}

impl CacheScope {
  pub fn new(entity: EntityDescriptor, cache_name: impl Into<String>) -> Self {
    Self {
      entity,
      cache_name: cache_name.into(),
    }
  }

  /// Stable, fixed-length storage key.
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", self.entity.name(), self.cache_name.trim()).as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn description(&self) -> String {
    format!("{} ({})", self.entity, self.cache_name)
  }
}

/// Sync bookkeeping persisted next to the items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListMeta {
  pub last_synced_at: Option<DateTime<Utc>>,
  pub last_page: u32,
  pub has_more: bool,
}

/// A persisted list as loaded from storage.
#[derive(Debug, Clone)]
pub struct StoredList<T> {
  /// Items in fetch order
  pub items: Vec<T>,
  pub meta: ListMeta,
  /// When the list was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Load the persisted list for a scope, if any.
  fn load<T: Cacheable>(&self, scope: &CacheScope) -> Result<Option<StoredList<T>>>;

  /// Replace the persisted list for a scope.
  fn store<T: Cacheable>(&self, scope: &CacheScope, items: &[T], meta: &ListMeta) -> Result<()>;

  /// Forget everything persisted for a scope.
  fn clear(&self, scope: &CacheScope) -> Result<()>;
}

impl<S: CacheStorage> CacheStorage for std::sync::Arc<S> {
  fn load<T: Cacheable>(&self, scope: &CacheScope) -> Result<Option<StoredList<T>>> {
    (**self).load(scope)
  }

  fn store<T: Cacheable>(&self, scope: &CacheScope, items: &[T], meta: &ListMeta) -> Result<()> {
    (**self).store(scope, items, meta)
  }

  fn clear(&self, scope: &CacheScope) -> Result<()> {
    (**self).clear(scope)
  }
}

/// Storage implementation that doesn't persist anything.
/// Used when caching is disabled - all operations are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn load<T: Cacheable>(&self, _scope: &CacheScope) -> Result<Option<StoredList<T>>> {
    Ok(None) // Always miss
  }

  fn store<T: Cacheable>(&self, _scope: &CacheScope, _items: &[T], _meta: &ListMeta) -> Result<()> {
    Ok(()) // Discard
  }

  fn clear(&self, _scope: &CacheScope) -> Result<()> {
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Create a new SQLite storage at `path`, creating parent directories.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Storage that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("synclist").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- One row per persisted list
CREATE TABLE IF NOT EXISTS list_scope (
    scope_hash TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    last_synced_at TEXT,
    last_page INTEGER NOT NULL DEFAULT 0,
    has_more INTEGER NOT NULL DEFAULT 0,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    item_count INTEGER NOT NULL
);

-- Serialized items, position preserves fetch order
CREATE TABLE IF NOT EXISTS list_items (
    scope_hash TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    data BLOB NOT NULL,
    updated_at TEXT,
    PRIMARY KEY (scope_hash, entity_key),
    FOREIGN KEY (scope_hash) REFERENCES list_scope(scope_hash) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_list_items_position ON list_items(scope_hash, position);
"#;

impl CacheStorage for SqliteStorage {
  fn load<T: Cacheable>(&self, scope: &CacheScope) -> Result<Option<StoredList<T>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let scope_hash = scope.hash();

    let row: Option<(Option<String>, u32, bool, String)> = conn
      .query_row(
        "SELECT last_synced_at, last_page, has_more, cached_at FROM list_scope
         WHERE scope_hash = ?",
        params![scope_hash],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read list metadata: {}", e))?;

    let (last_synced, last_page, has_more, cached_at_str) = match row {
      Some(row) => row,
      None => return Ok(None),
    };

    let last_synced_at = last_synced
      .map(|s| {
        DateTime::parse_from_rfc3339(&s)
          .map(|dt| dt.with_timezone(&Utc))
          .map_err(|e| eyre!("Failed to parse last sync time '{}': {}", s, e))
      })
      .transpose()?;

    let mut stmt = conn
      .prepare("SELECT data FROM list_items WHERE scope_hash = ? ORDER BY position")
      .map_err(|e| eyre!("Failed to prepare item query: {}", e))?;

    // Rows that no longer deserialize (schema drift) are dropped rather than
    // failing the whole list.
    let items: Vec<T> = stmt
      .query_map(params![scope_hash], |row| row.get::<_, Vec<u8>>(0))
      .map_err(|e| eyre!("Failed to query items: {}", e))?
      .filter_map(|r| r.ok())
      .filter_map(|data| serde_json::from_slice(&data).ok())
      .collect();

    Ok(Some(StoredList {
      items,
      meta: ListMeta {
        last_synced_at,
        last_page,
        has_more,
      },
      cached_at: parse_datetime(&cached_at_str)?,
    }))
  }

  fn store<T: Cacheable>(&self, scope: &CacheScope, items: &[T], meta: &ListMeta) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let scope_hash = scope.hash();

    let tx = conn
      .unchecked_transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM list_items WHERE scope_hash = ?",
      params![scope_hash],
    )
    .map_err(|e| eyre!("Failed to delete old items: {}", e))?;

    tx.execute(
      "INSERT OR REPLACE INTO list_scope
         (scope_hash, description, last_synced_at, last_page, has_more, cached_at, item_count)
       VALUES (?, ?, ?, ?, ?, datetime('now'), ?)",
      params![
        scope_hash,
        scope.description(),
        meta.last_synced_at.map(|t| t.to_rfc3339()),
        meta.last_page,
        meta.has_more,
        items.len(),
      ],
    )
    .map_err(|e| eyre!("Failed to update list metadata: {}", e))?;

    for (position, item) in items.iter().enumerate() {
      let data = serde_json::to_vec(item).map_err(|e| eyre!("Failed to serialize item: {}", e))?;
      tx.execute(
        "INSERT OR REPLACE INTO list_items (scope_hash, entity_key, position, data, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![scope_hash, item.cache_key(), position, data, item.updated_at()],
      )
      .map_err(|e| eyre!("Failed to store item: {}", e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn clear(&self, scope: &CacheScope) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM list_scope WHERE scope_hash = ?",
        params![scope.hash()],
      )
      .map_err(|e| eyre!("Failed to clear list: {}", e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::testing::{notes, Note};

  fn scope(name: &str) -> CacheScope {
    CacheScope::new(EntityDescriptor::new("note"), name)
  }

  #[test]
  fn test_scope_hash_is_stable_and_distinct() {
    assert_eq!(scope("a").hash(), scope("a").hash());
    assert_ne!(scope("a").hash(), scope("b").hash());
    assert_eq!(scope("a").hash().len(), 64);
  }

  #[test]
  fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    let storage = SqliteStorage::open_at(&path).unwrap();
    storage
      .store(&scope("main"), &notes("n", 2), &ListMeta::default())
      .unwrap();
    drop(storage);

    let reopened = SqliteStorage::open_at(&path).unwrap();
    let loaded: StoredList<Note> = reopened.load(&scope("main")).unwrap().unwrap();
    assert_eq!(loaded.items.len(), 2);
  }

  #[test]
  fn test_round_trip_preserves_order_and_meta() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let mut items = notes("n", 3);
    items.reverse();
    let meta = ListMeta {
      last_synced_at: Some(Utc::now()),
      last_page: 2,
      has_more: true,
    };

    storage.store(&scope("main"), &items, &meta).unwrap();
    let loaded: StoredList<Note> = storage.load(&scope("main")).unwrap().unwrap();

    assert_eq!(loaded.items, items);
    assert_eq!(loaded.meta.last_page, 2);
    assert!(loaded.meta.has_more);
    assert_eq!(
      loaded.meta.last_synced_at.map(|t| t.timestamp()),
      meta.last_synced_at.map(|t| t.timestamp())
    );
  }

  #[test]
  fn test_store_replaces_previous_items() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .store(&scope("main"), &notes("old", 4), &ListMeta::default())
      .unwrap();
    storage
      .store(&scope("main"), &notes("new", 1), &ListMeta::default())
      .unwrap();

    let loaded: StoredList<Note> = storage.load(&scope("main")).unwrap().unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].id, "new000");
  }

  #[test]
  fn test_clear_and_missing_scope() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .store(&scope("main"), &notes("n", 2), &ListMeta::default())
      .unwrap();
    storage.clear(&scope("main")).unwrap();

    assert!(storage.load::<Note>(&scope("main")).unwrap().is_none());
    assert!(storage.load::<Note>(&scope("other")).unwrap().is_none());
  }

  #[test]
  fn test_noop_storage_always_misses() {
    NoopStorage
      .store(&scope("main"), &notes("n", 2), &ListMeta::default())
      .unwrap();
    assert!(NoopStorage.load::<Note>(&scope("main")).unwrap().is_none());
  }
}

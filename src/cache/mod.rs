//! Sectioned list cache with change notification and optional persistence.
//!
//! This module provides the data side of a list controller:
//! - Items keyed by a stable identity (`Cacheable`)
//! - Queries that filter, sort and section the cached content
//! - Replace-all and append merges that never duplicate an identity
//! - Change sets describing each mutation for incremental list updates
//! - Persistence of the cached list per scope (SQLite or nothing)

mod changes;
mod query;
mod results;
mod snapshot;
mod storage;
mod traits;

pub use changes::{ChangeSet, ItemChange, SectionChange};
pub use query::{CacheQuery, Predicate, SectionKeyFn, SortDescriptor};
pub use results::{MergeStrategy, ResultsCache};
pub use snapshot::{CacheSnapshot, IndexPath, Section};
pub use storage::{CacheScope, CacheStorage, ListMeta, NoopStorage, SqliteStorage, StoredList};
pub use traits::{Cacheable, EntityDescriptor};

#[cfg(test)]
pub(crate) use traits::testing;

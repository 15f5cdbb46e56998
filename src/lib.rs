//! Sync and cache coordination for sectioned, paginated list views.
//!
//! A [`ListController`] keeps a local cache of remote items, issues at most
//! one fetch at a time, merges the results and reports what changed so a
//! view can update incrementally. Pagination, swipe action views and the
//! empty-state placeholder are tracked alongside.

pub mod cache;
pub mod config;
pub mod controller;
pub mod empty_state;
pub mod error;
pub mod logging;
pub mod pagination;
pub mod swipe;
pub mod sync;

pub use cache::{
  CacheQuery, CacheSnapshot, CacheStorage, Cacheable, ChangeSet, EntityDescriptor, IndexPath,
  ItemChange, NoopStorage, SectionChange, SortDescriptor, SqliteStorage,
};
pub use config::{Config, ListConfig};
pub use controller::{ListController, ListControllerBuilder, ListEvent, ListUpdate};
pub use empty_state::EmptyState;
pub use error::{ListError, Result};
pub use pagination::PaginationState;
pub use swipe::{SwipeAction, SwipeClosed, SwipeTransition, SwipeView};
pub use sync::{Dispatch, FnSource, ListSource, Page, SyncState, SyncStatus, SyncTracking};

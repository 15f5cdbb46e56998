//! The host-facing list controller.
//!
//! [`ListController`] owns one cache, one sync coordinator, pagination and
//! swipe bookkeeping, and routes fetch completions between them. Hosts drive
//! it from a single task: issue commands, then call [`ListController::poll`]
//! on every tick (or [`ListController::settle`] when they can await) and
//! react to the returned [`ListEvent`]s.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{
  CacheQuery, CacheScope, CacheSnapshot, CacheStorage, Cacheable, ChangeSet, EntityDescriptor,
  IndexPath, ListMeta, MergeStrategy, NoopStorage, ResultsCache,
};
use crate::config::ListConfig;
use crate::empty_state::{EmptyState, EmptyStateResolver};
use crate::error::{ListError, Result};
use crate::pagination::{PaginationController, PaginationState};
use crate::swipe::{
  SwipeActionController, SwipeClosed, SwipeConfigurator, SwipeTransition, SwipeView,
};
use crate::sync::{
  Completed, Dispatch, FetchKind, ListSource, SyncCoordinator, SyncState, SyncTracking,
};

/// Something the host may want to react to after a completion was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
  /// The snapshot changed
  Changed(ChangeSet),
  /// A full sync was applied
  Synced { user_initiated: bool, items: usize },
  /// A full sync failed. Background failures only appear here when
  /// `report_background_errors` is set.
  SyncFailed {
    user_initiated: bool,
    error: ListError,
  },
  /// A page was appended
  LoadedMore { page: u32, has_more: bool },
  LoadMoreFailed { page: u32, error: ListError },
  /// The open swipe view went away because its row did
  SwipeClosed(SwipeClosed),
}

/// What a direct cache command changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ListUpdate {
  pub changes: ChangeSet,
  /// The open swipe view, if the command removed its row
  pub swipe_closed: Option<SwipeClosed>,
}

/// Builds a [`ListController`]. Obtained from [`ListController::builder`].
pub struct ListControllerBuilder<T: Cacheable, S: CacheStorage = NoopStorage> {
  source: Arc<dyn ListSource<T>>,
  entity: Option<EntityDescriptor>,
  query: CacheQuery<T>,
  config: ListConfig,
  tracking: SyncTracking,
  swipe: Option<SwipeConfigurator<SwipeView>>,
  storage: S,
}

impl<T: Cacheable> ListControllerBuilder<T, NoopStorage> {
  fn new(source: Arc<dyn ListSource<T>>) -> Self {
    Self {
      source,
      entity: None,
      query: CacheQuery::new(),
      config: ListConfig::default(),
      tracking: SyncTracking::Internal,
      swipe: None,
      storage: NoopStorage,
    }
  }
}

impl<T: Cacheable, S: CacheStorage> ListControllerBuilder<T, S> {
  pub fn entity(mut self, entity: EntityDescriptor) -> Self {
    self.entity = Some(entity);
    self
  }

  pub fn query(mut self, query: CacheQuery<T>) -> Self {
    self.query = query;
    self
  }

  pub fn config(mut self, config: ListConfig) -> Self {
    self.config = config;
    self
  }

  pub fn tracking(mut self, tracking: SyncTracking) -> Self {
    self.tracking = tracking;
    self
  }

  /// Builds the action view for a swiped row. Required when swipe actions
  /// are enabled in the config.
  pub fn swipe_actions<F>(mut self, configure: F) -> Self
  where
    F: Fn(&str) -> SwipeView + Send + Sync + 'static,
  {
    self.swipe = Some(Box::new(configure));
    self
  }

  /// Persist the list through `storage`.
  pub fn storage<S2: CacheStorage>(self, storage: S2) -> ListControllerBuilder<T, S2> {
    ListControllerBuilder {
      source: self.source,
      entity: self.entity,
      query: self.query,
      config: self.config,
      tracking: self.tracking,
      swipe: self.swipe,
      storage,
    }
  }

  /// Validate the collaborators and restore any persisted state.
  pub fn build(self) -> Result<ListController<T, S>> {
    let entity = match self.entity {
      Some(entity) if entity.is_valid() => entity,
      Some(_) => return Err(ListError::Configuration("entity name is blank".to_string())),
      None => return Err(ListError::Configuration("missing entity descriptor".to_string())),
    };

    let swipe = match (self.config.swipe_actions, self.swipe) {
      (true, Some(configure)) => SwipeActionController::new(configure),
      (true, None) => {
        return Err(ListError::Configuration(
          "swipe actions enabled without a row action configurator".to_string(),
        ))
      }
      (false, _) => SwipeActionController::disabled(),
    };

    let scope = CacheScope::new(entity, self.config.cache_name.clone());
    let paginate = self.config.infinite_scroll && self.source.supports_pagination();
    if self.config.infinite_scroll && !paginate {
      warn!(
        scope = %scope.description(),
        "Infinite scroll requested but the source cannot paginate, pagination disabled"
      );
    }
    let mut pagination = PaginationController::new(paginate, self.config.load_more_threshold);
    let mut cache = ResultsCache::new(self.query);
    let mut last_synced_at = None;

    let stored = self
      .storage
      .load::<T>(&scope)
      .map_err(|e| ListError::Storage(e.to_string()))?;
    if let Some(stored) = stored {
      info!(
        scope = %scope.description(),
        items = stored.items.len(),
        cached_at = %stored.cached_at,
        "Restored cached list"
      );
      cache.restore(stored.items);
      pagination.restore(stored.meta.last_page, stored.meta.has_more);
      last_synced_at = stored.meta.last_synced_at;
    }

    let coordinator =
      SyncCoordinator::new(self.source, self.tracking).with_last_synced(last_synced_at);
    let empty = EmptyStateResolver::new(&self.config.empty_title, &self.config.empty_message);

    Ok(ListController {
      scope,
      config: self.config,
      cache,
      coordinator,
      pagination,
      swipe,
      empty,
      storage: self.storage,
    })
  }
}

/// A cached, synced, optionally paginated list of `T`.
pub struct ListController<T: Cacheable, S: CacheStorage = NoopStorage> {
  scope: CacheScope,
  config: ListConfig,
  cache: ResultsCache<T>,
  coordinator: SyncCoordinator<T>,
  pagination: PaginationController,
  swipe: SwipeActionController<SwipeView>,
  empty: EmptyStateResolver,
  storage: S,
}

impl<T: Cacheable> ListController<T, NoopStorage> {
  /// Start building a controller that fetches through `source`.
  pub fn builder<L: ListSource<T>>(source: L) -> ListControllerBuilder<T, NoopStorage> {
    ListControllerBuilder::new(Arc::new(source))
  }

  /// Like [`builder`](Self::builder) for an already shared source.
  pub fn builder_shared(source: Arc<dyn ListSource<T>>) -> ListControllerBuilder<T, NoopStorage> {
    ListControllerBuilder::new(source)
  }
}

impl<T: Cacheable, S: CacheStorage> ListController<T, S> {
  pub fn scope(&self) -> &CacheScope {
    &self.scope
  }

  pub fn config(&self) -> &ListConfig {
    &self.config
  }

  pub fn snapshot(&self) -> &CacheSnapshot<T> {
    self.cache.snapshot()
  }

  pub fn query(&self) -> &CacheQuery<T> {
    self.cache.active_query()
  }

  pub fn state(&self) -> SyncState {
    self.coordinator.state()
  }

  pub fn pagination_state(&self) -> PaginationState {
    self.pagination.state()
  }

  pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
    self.coordinator.last_synced_at()
  }

  pub fn last_error(&self) -> Option<&str> {
    self.coordinator.last_error()
  }

  /// With external tracking our own fetch is not part of the state, so
  /// it is checked separately.
  pub fn should_show_empty_state(&self) -> bool {
    !self.coordinator.is_in_flight()
      && self
        .empty
        .should_show_empty_state(self.cache.snapshot(), &self.coordinator.state())
  }

  /// Placeholder content, when it should be shown.
  pub fn empty_state(&self) -> Option<EmptyState> {
    if self.should_show_empty_state() {
      Some(self.empty.content(&self.coordinator.state()))
    } else {
      None
    }
  }

  /// Receive every non-empty change set from now on.
  pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChangeSet> {
    self.cache.subscribe()
  }

  /// Map every visible row through a cell configurator, in display order.
  pub fn cells<C, F>(&self, configure: F) -> Vec<C>
  where
    F: Fn(&T, IndexPath) -> C,
  {
    self
      .cache
      .snapshot()
      .iter()
      .map(|(path, item)| configure(item, path))
      .collect()
  }

  pub fn sync(&mut self) -> Dispatch {
    self.coordinator.sync()
  }

  pub fn sync_via_user_interaction(&mut self) -> Dispatch {
    self.coordinator.sync_via_user_interaction()
  }

  /// Why `load_more` would complete without fetching, if it would.
  pub fn load_more_refusal(&self) -> Option<Dispatch> {
    self.pagination.refusal()
  }

  /// Request the next page. Completes immediately when pagination is off or
  /// the source said there is nothing more.
  pub fn load_more(&mut self) -> Dispatch {
    if let Some(refusal) = self.load_more_refusal() {
      debug!(scope = %self.scope.description(), ?refusal, "Load more skipped");
      return refusal;
    }

    let dispatch = self.coordinator.load_more(self.pagination.next_page());
    if dispatch.started() {
      self.pagination.started();
    }
    dispatch
  }

  /// Whether a viewport ending at `last_visible_row` warrants the next page.
  pub fn should_load_more(&self, last_visible_row: usize) -> bool {
    let near_end = self
      .pagination
      .is_near_end(last_visible_row, self.cache.snapshot().len());
    self
      .pagination
      .should_load_more(near_end, &self.coordinator.state())
  }

  /// Load the next page if the viewport is close enough to the end.
  /// Returns true if a fetch was started.
  pub fn maybe_load_more(&mut self, last_visible_row: usize) -> bool {
    self.should_load_more(last_visible_row) && self.load_more().started()
  }

  /// Show the swipe view of `row`, closing any other first. Rows that are
  /// not in the snapshot are ignored.
  pub fn open_swipe(&mut self, row: &str) -> Option<SwipeTransition> {
    self.cache.snapshot().index_of(row)?;
    self.swipe.open(row)
  }

  pub fn close_swipe(&mut self, row: &str, animated: bool) -> Option<SwipeClosed> {
    self.swipe.close(row, animated)
  }

  pub fn close_any_swipe(&mut self, animated: bool) -> Option<SwipeClosed> {
    self.swipe.close_any(animated)
  }

  /// The open swipe view and the row it belongs to.
  pub fn swipe_view(&self) -> Option<(&str, &SwipeView)> {
    self.swipe.open_row().zip(self.swipe.view())
  }

  /// Drop all cached content, persisted state and pagination progress.
  pub fn invalidate(&mut self) -> Result<ListUpdate> {
    if self.coordinator.is_in_flight() {
      return Err(ListError::Busy);
    }

    let swipe_closed = self.swipe.close_any(false);
    self.pagination.reset();
    let changes = self.cache.invalidate();
    if let Err(e) = self.storage.clear(&self.scope) {
      warn!(scope = %self.scope.description(), error = %e, "Failed to clear cached list");
    }
    info!(scope = %self.scope.description(), "List invalidated");
    Ok(ListUpdate {
      changes,
      swipe_closed,
    })
  }

  /// Replace the query definition and rebuild the snapshot from the cached
  /// content.
  pub fn reset_query(&mut self, query: CacheQuery<T>) -> Result<ListUpdate> {
    if self.coordinator.is_in_flight() {
      return Err(ListError::Busy);
    }

    let changes = self.cache.set_query(query);
    let swipe_closed = self.close_deleted_swipe(&changes, false);
    debug!(scope = %self.scope.description(), "Query reset");
    Ok(ListUpdate {
      changes,
      swipe_closed,
    })
  }

  /// Close the open swipe view if `changes` removed its row.
  fn close_deleted_swipe(&mut self, changes: &ChangeSet, animated: bool) -> Option<SwipeClosed> {
    let row = self.swipe.open_row()?;
    if changes.is_deleted(row) {
      self.swipe.close_any(animated)
    } else {
      None
    }
  }

  /// Apply the outstanding fetch if its result has arrived.
  pub fn poll(&mut self) -> Vec<ListEvent> {
    match self.coordinator.poll() {
      Some(done) => self.apply(done),
      None => Vec::new(),
    }
  }

  /// Wait for the outstanding fetch, if any, and apply it.
  pub async fn settle(&mut self) -> Vec<ListEvent> {
    match self.coordinator.settle().await {
      Some(done) => self.apply(done),
      None => Vec::new(),
    }
  }

  fn apply(&mut self, done: Completed<T>) -> Vec<ListEvent> {
    let mut events = Vec::new();

    match (done.kind, done.result) {
      (FetchKind::Sync { user_initiated }, Ok(page)) => {
        let items = page.items.len();
        let changes = self.cache.merge(page.items, MergeStrategy::ReplaceAll);
        self.pagination.synced(page.has_more);
        self.coordinator.finish(done.kind, Ok(()));
        self.persist();

        info!(scope = %self.scope.description(), items, user_initiated, "Sync finished");
        self.push_changes(changes, &mut events);
        events.push(ListEvent::Synced {
          user_initiated,
          items,
        });
      }
      (FetchKind::Sync { user_initiated }, Err(reason)) => {
        self.coordinator.finish(done.kind, Err(&reason));
        warn!(scope = %self.scope.description(), user_initiated, error = %reason, "Sync failed");

        if user_initiated || self.config.report_background_errors {
          events.push(ListEvent::SyncFailed {
            user_initiated,
            error: ListError::SyncFailed(reason),
          });
        }
      }
      (FetchKind::LoadMore { page }, Ok(loaded)) => {
        let changes = self.cache.merge(loaded.items, MergeStrategy::Append);
        self.pagination.loaded(page, loaded.has_more);
        self.coordinator.finish(done.kind, Ok(()));
        self.persist();

        debug!(scope = %self.scope.description(), page, has_more = loaded.has_more, "Page loaded");
        self.push_changes(changes, &mut events);
        events.push(ListEvent::LoadedMore {
          page,
          has_more: loaded.has_more,
        });
      }
      (FetchKind::LoadMore { page }, Err(reason)) => {
        self.pagination.failed();
        self.coordinator.finish(done.kind, Err(&reason));
        warn!(scope = %self.scope.description(), page, error = %reason, "Load more failed");

        events.push(ListEvent::LoadMoreFailed {
          page,
          error: ListError::PaginationFailed(reason),
        });
      }
    }

    events
  }

  fn push_changes(&mut self, changes: ChangeSet, events: &mut Vec<ListEvent>) {
    if changes.is_empty() {
      return;
    }

    if let Some(closed) = self.close_deleted_swipe(&changes, true) {
      events.push(ListEvent::SwipeClosed(closed));
    }
    events.push(ListEvent::Changed(changes));
  }

  fn persist(&self) {
    let state = self.pagination.state();
    let meta = ListMeta {
      last_synced_at: self.coordinator.last_synced_at(),
      last_page: state.last_page_loaded,
      has_more: state.has_more,
    };

    if let Err(e) = self.storage.store(&self.scope, &self.cache.items(), &meta) {
      warn!(scope = %self.scope.description(), error = %e, "Failed to persist list");
    }
  }
}

impl<T: Cacheable, S: CacheStorage> std::fmt::Debug for ListController<T, S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ListController")
      .field("scope", &self.scope)
      .field("coordinator", &self.coordinator)
      .field("pagination", &self.pagination)
      .field("swipe", &self.swipe)
      .field("items", &self.cache.snapshot().len())
      .finish_non_exhaustive()
  }
}

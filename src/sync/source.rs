//! Collaborators a list controller fetches through.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// A boxed fetch that resolves to a page or an error message.
pub type FetchFuture<T> = BoxFuture<'static, Result<T, String>>;

/// One batch of items from the remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Whether another page can be requested after this one
  pub has_more: bool,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, has_more: bool) -> Self {
    Self { items, has_more }
  }

  /// A page with nothing after it.
  pub fn last(items: Vec<T>) -> Self {
    Self::new(items, false)
  }
}

/// The remote side of a list.
///
/// `sync` is required. The remaining hooks have defaults: user-initiated
/// syncs run the same fetch as background ones, and pagination is off.
pub trait ListSource<T>: Send + Sync + 'static {
  /// Fetch the current full state (page one when paginated).
  fn sync(&self, user_initiated: bool) -> FetchFuture<Page<T>>;

  /// Fetch in response to an explicit user action such as pull to refresh.
  fn sync_via_user_interaction(&self) -> FetchFuture<Page<T>> {
    self.sync(true)
  }

  /// Whether `load_more` is implemented.
  fn supports_pagination(&self) -> bool {
    false
  }

  /// Fetch page `page` (1-based; page 1 comes from `sync`).
  fn load_more(&self, page: u32) -> FetchFuture<Page<T>> {
    Box::pin(async move { Err(format!("pagination not supported (page {})", page)) })
  }
}

type SyncFn<T> = Box<dyn Fn(bool) -> FetchFuture<Page<T>> + Send + Sync>;
type LoadMoreFn<T> = Box<dyn Fn(u32) -> FetchFuture<Page<T>> + Send + Sync>;

/// A [`ListSource`] built from closures.
///
/// ```ignore
/// let api = api.clone();
/// let source = FnSource::new(move |_user_initiated| {
///   let api = api.clone();
///   async move { api.first_page().await.map_err(|e| e.to_string()) }
/// });
/// ```
pub struct FnSource<T> {
  sync: SyncFn<T>,
  load_more: Option<LoadMoreFn<T>>,
}

impl<T: Send + 'static> FnSource<T> {
  pub fn new<F, Fut>(sync: F) -> Self
  where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, String>> + Send + 'static,
  {
    Self {
      sync: Box::new(move |user_initiated| Box::pin(sync(user_initiated))),
      load_more: None,
    }
  }

  /// Enable pagination with the given page fetcher.
  pub fn with_pagination<F, Fut>(mut self, load_more: F) -> Self
  where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, String>> + Send + 'static,
  {
    self.load_more = Some(Box::new(move |page| Box::pin(load_more(page))));
    self
  }
}

impl<T: Send + 'static> ListSource<T> for FnSource<T> {
  fn sync(&self, user_initiated: bool) -> FetchFuture<Page<T>> {
    (self.sync)(user_initiated)
  }

  fn supports_pagination(&self) -> bool {
    self.load_more.is_some()
  }

  fn load_more(&self, page: u32) -> FetchFuture<Page<T>> {
    match &self.load_more {
      Some(load_more) => load_more(page),
      None => Box::pin(async move { Err(format!("pagination not supported (page {})", page)) }),
    }
  }
}

/// Reports whether something outside the controller is syncing this list.
pub trait SyncStatus: Send + Sync {
  fn is_syncing(&self) -> bool;
}

impl<F> SyncStatus for F
where
  F: Fn() -> bool + Send + Sync,
{
  fn is_syncing(&self) -> bool {
    self()
  }
}

/// Who answers "is a sync running?".
#[derive(Clone, Default)]
pub enum SyncTracking {
  /// The coordinator's own state machine
  #[default]
  Internal,
  /// Another part of the application syncs the same data; its status
  /// blocks and is reported in place of an idle coordinator.
  External(Arc<dyn SyncStatus>),
}

impl SyncTracking {
  pub fn external<S: SyncStatus + 'static>(status: S) -> Self {
    SyncTracking::External(Arc::new(status))
  }
}

impl std::fmt::Debug for SyncTracking {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SyncTracking::Internal => f.write_str("Internal"),
      SyncTracking::External(_) => f.write_str("External"),
    }
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
  use std::sync::Mutex;
  use tokio::sync::Notify;

  type Script<T> = Arc<Mutex<VecDeque<Result<Page<T>, String>>>>;

  /// Source that replays scripted results and counts calls.
  ///
  /// When gated, every fetch waits for [`release`](Self::release) before
  /// resolving, which keeps a fetch in flight for as long as a test needs.
  pub struct Scripted<T> {
    syncs: Arc<AtomicU32>,
    user_syncs: Arc<AtomicU32>,
    loads: Arc<AtomicU32>,
    pages_requested: Arc<Mutex<Vec<u32>>>,
    sync_script: Script<T>,
    load_script: Script<T>,
    gate: Arc<Notify>,
    gated: Arc<AtomicBool>,
    paginated: bool,
  }

  impl<T> Clone for Scripted<T> {
    fn clone(&self) -> Self {
      Self {
        syncs: self.syncs.clone(),
        user_syncs: self.user_syncs.clone(),
        loads: self.loads.clone(),
        pages_requested: self.pages_requested.clone(),
        sync_script: self.sync_script.clone(),
        load_script: self.load_script.clone(),
        gate: self.gate.clone(),
        gated: self.gated.clone(),
        paginated: self.paginated,
      }
    }
  }

  impl<T: Clone + Send + 'static> Scripted<T> {
    pub fn new() -> Self {
      Self {
        syncs: Arc::default(),
        user_syncs: Arc::default(),
        loads: Arc::default(),
        pages_requested: Arc::default(),
        sync_script: Arc::default(),
        load_script: Arc::default(),
        gate: Arc::new(Notify::new()),
        gated: Arc::default(),
        paginated: false,
      }
    }

    pub fn paginated(mut self) -> Self {
      self.paginated = true;
      self
    }

    pub fn gated(self) -> Self {
      self.gated.store(true, Ordering::SeqCst);
      self
    }

    pub fn sync_ok(self, items: Vec<T>, has_more: bool) -> Self {
      self.push_sync(Ok(Page::new(items, has_more)));
      self
    }

    pub fn sync_err(self, error: &str) -> Self {
      self.push_sync(Err(error.to_string()));
      self
    }

    pub fn load_ok(self, items: Vec<T>, has_more: bool) -> Self {
      self.push_load(Ok(Page::new(items, has_more)));
      self
    }

    pub fn load_err(self, error: &str) -> Self {
      self.push_load(Err(error.to_string()));
      self
    }

    pub fn push_sync(&self, result: Result<Page<T>, String>) {
      self.sync_script.lock().unwrap().push_back(result);
    }

    pub fn push_load(&self, result: Result<Page<T>, String>) {
      self.load_script.lock().unwrap().push_back(result);
    }

    /// Let one gated fetch resolve.
    pub fn release(&self) {
      self.gate.notify_one();
    }

    pub fn syncs(&self) -> u32 {
      self.syncs.load(Ordering::SeqCst)
    }

    pub fn user_syncs(&self) -> u32 {
      self.user_syncs.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> u32 {
      self.loads.load(Ordering::SeqCst)
    }

    pub fn pages_requested(&self) -> Vec<u32> {
      self.pages_requested.lock().unwrap().clone()
    }

    fn respond(&self, script: &Script<T>) -> FetchFuture<Page<T>> {
      let result = script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Ok(Page::last(Vec::new())));
      let gate = self.gate.clone();
      let gated = self.gated.load(Ordering::SeqCst);
      Box::pin(async move {
        if gated {
          gate.notified().await;
        }
        result
      })
    }
  }

  impl<T: Clone + Send + Sync + 'static> ListSource<T> for Scripted<T> {
    fn sync(&self, _user_initiated: bool) -> FetchFuture<Page<T>> {
      self.syncs.fetch_add(1, Ordering::SeqCst);
      self.respond(&self.sync_script)
    }

    fn sync_via_user_interaction(&self) -> FetchFuture<Page<T>> {
      self.user_syncs.fetch_add(1, Ordering::SeqCst);
      self.sync(true)
    }

    fn supports_pagination(&self) -> bool {
      self.paginated
    }

    fn load_more(&self, page: u32) -> FetchFuture<Page<T>> {
      self.loads.fetch_add(1, Ordering::SeqCst);
      self.pages_requested.lock().unwrap().push(page);
      self.respond(&self.load_script)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fn_source_defaults() {
    let source = FnSource::new(|user_initiated| async move {
      Ok(Page::last(vec![if user_initiated { "user" } else { "bg" }]))
    });

    assert!(!source.supports_pagination());
    assert_eq!(source.sync(false).await, Ok(Page::last(vec!["bg"])));
    assert_eq!(
      source.sync_via_user_interaction().await,
      Ok(Page::last(vec!["user"]))
    );
    assert!(source.load_more(2).await.is_err());
  }

  #[tokio::test]
  async fn test_fn_source_with_pagination() {
    let source = FnSource::new(|_| async { Ok(Page::new(vec![1], true)) })
      .with_pagination(|page| async move { Ok(Page::last(vec![page])) });

    assert!(source.supports_pagination());
    assert_eq!(source.load_more(3).await, Ok(Page::last(vec![3])));
  }

  #[test]
  fn test_closure_as_sync_status() {
    let tracking = SyncTracking::external(|| true);
    match tracking {
      SyncTracking::External(status) => assert!(status.is_syncing()),
      SyncTracking::Internal => panic!("expected external tracking"),
    }
  }
}

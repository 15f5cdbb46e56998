//! Single-flight coordination of full syncs and load-more fetches.
//!
//! Fetches are spawned onto the tokio runtime; their result comes back over
//! a channel and is picked up by [`SyncCoordinator::poll`] (from a host's
//! tick) or [`SyncCoordinator::settle`]. The coordinator only hands the
//! result over: the owner applies it to the cache and then calls
//! [`SyncCoordinator::finish`], so the state never reads `Idle` while data
//! is half applied.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::source::{ListSource, Page, SyncTracking};
use super::state::{Dispatch, FetchKind, SyncState};

/// A fetch whose result has arrived but has not been applied yet.
#[derive(Debug)]
pub struct Completed<T> {
  pub kind: FetchKind,
  pub result: Result<Page<T>, String>,
}

struct InFlight<T> {
  kind: FetchKind,
  receiver: mpsc::UnboundedReceiver<Result<Page<T>, String>>,
}

/// Owns the [`SyncState`] of one list and at most one outstanding fetch.
pub struct SyncCoordinator<T> {
  source: Arc<dyn ListSource<T>>,
  tracking: SyncTracking,
  state: SyncState,
  in_flight: Option<InFlight<T>>,
  last_synced_at: Option<DateTime<Utc>>,
  last_error: Option<String>,
  fetches: u64,
}

impl<T: Send + 'static> SyncCoordinator<T> {
  pub fn new(source: Arc<dyn ListSource<T>>, tracking: SyncTracking) -> Self {
    Self {
      source,
      tracking,
      state: SyncState::Idle,
      in_flight: None,
      last_synced_at: None,
      last_error: None,
      fetches: 0,
    }
  }

  /// Start from a previously persisted sync time.
  pub fn with_last_synced(mut self, last_synced_at: Option<DateTime<Utc>>) -> Self {
    self.last_synced_at = last_synced_at;
    self
  }

  /// Current state. With external tracking the full-sync part comes from
  /// the status collaborator alone; only pagination is tracked here.
  pub fn state(&self) -> SyncState {
    match &self.tracking {
      SyncTracking::Internal => self.state.clone(),
      SyncTracking::External(_) if self.state == SyncState::LoadingMore => SyncState::LoadingMore,
      SyncTracking::External(status) if status.is_syncing() => SyncState::Syncing,
      SyncTracking::External(_) => SyncState::Idle,
    }
  }

  fn tracks_syncs(&self) -> bool {
    matches!(self.tracking, SyncTracking::Internal)
  }

  pub fn source(&self) -> &Arc<dyn ListSource<T>> {
    &self.source
  }

  /// When the last full sync succeeded, if ever.
  pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
    self.last_synced_at
  }

  /// Most recent failure of either kind, kept even when not surfaced.
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  /// Number of fetches spawned so far.
  pub fn fetches(&self) -> u64 {
    self.fetches
  }

  pub fn is_in_flight(&self) -> bool {
    self.in_flight.is_some()
  }

  /// Start a background full sync unless something is already running.
  pub fn sync(&mut self) -> Dispatch {
    self.start(FetchKind::Sync {
      user_initiated: false,
    })
  }

  /// Start a user-initiated full sync unless something is already running.
  pub fn sync_via_user_interaction(&mut self) -> Dispatch {
    self.start(FetchKind::Sync {
      user_initiated: true,
    })
  }

  /// Start fetching `page`. Callers check pagination state first.
  pub fn load_more(&mut self, page: u32) -> Dispatch {
    self.start(FetchKind::LoadMore { page })
  }

  fn start(&mut self, kind: FetchKind) -> Dispatch {
    let state = self.state();
    let allowed = match kind {
      FetchKind::Sync { .. } => state.accepts_sync(),
      FetchKind::LoadMore { .. } => state.accepts_load_more(),
    };
    if !allowed || self.in_flight.is_some() {
      tracing::debug!(?kind, %state, "Fetch skipped, coordinator busy");
      return Dispatch::Busy;
    }

    let future = match kind {
      FetchKind::Sync {
        user_initiated: false,
      } => self.source.sync(false),
      FetchKind::Sync {
        user_initiated: true,
      } => self.source.sync_via_user_interaction(),
      FetchKind::LoadMore { page } => self.source.load_more(page),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });

    self.in_flight = Some(InFlight { kind, receiver: rx });
    if self.tracks_syncs() || !kind.is_sync() {
      self.state = kind.busy_state();
    }
    self.fetches += 1;
    tracing::debug!(?kind, "Fetch started");
    Dispatch::Started
  }

  /// Collect the outstanding fetch's result without blocking.
  ///
  /// The state stays busy until [`finish`](Self::finish) is called.
  pub fn poll(&mut self) -> Option<Completed<T>> {
    let in_flight = self.in_flight.as_mut()?;

    let result = match in_flight.receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      // Sender dropped without sending - the task panicked
      Err(mpsc::error::TryRecvError::Disconnected) => Err(TASK_LOST.to_string()),
    };

    let kind = in_flight.kind;
    self.in_flight = None;
    Some(Completed { kind, result })
  }

  /// Wait for the outstanding fetch's result. Returns `None` if nothing is
  /// in flight.
  pub async fn settle(&mut self) -> Option<Completed<T>> {
    let in_flight = self.in_flight.as_mut()?;
    let result = in_flight
      .receiver
      .recv()
      .await
      .unwrap_or_else(|| Err(TASK_LOST.to_string()));

    let kind = in_flight.kind;
    self.in_flight = None;
    Some(Completed { kind, result })
  }

  /// Transition out of the busy state once a completed fetch is applied.
  ///
  /// With external tracking a full sync only records its outcome; the
  /// reported state stays with the status collaborator.
  pub fn finish(&mut self, kind: FetchKind, outcome: Result<(), &str>) {
    let tracks_syncs = self.tracks_syncs();
    match (kind, outcome) {
      (FetchKind::Sync { .. }, Ok(())) => {
        self.last_synced_at = Some(Utc::now());
        self.last_error = None;
        self.state = SyncState::Idle;
      }
      (FetchKind::Sync { .. }, Err(reason)) => {
        self.last_error = Some(reason.to_string());
        if tracks_syncs {
          self.state = SyncState::Failed(reason.to_string());
        }
      }
      (FetchKind::LoadMore { .. }, Ok(())) => {
        self.last_error = None;
        self.state = SyncState::Idle;
      }
      // Pagination failures leave the list usable; a retry asks for the same page
      (FetchKind::LoadMore { .. }, Err(reason)) => {
        self.last_error = Some(reason.to_string());
        self.state = SyncState::Idle;
      }
    }
    tracing::debug!(?kind, state = %self.state, "Fetch finished");
  }
}

const TASK_LOST: &str = "fetch task ended without a result";

impl<T> std::fmt::Debug for SyncCoordinator<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SyncCoordinator")
      .field("state", &self.state)
      .field("tracking", &self.tracking)
      .field("in_flight", &self.in_flight.as_ref().map(|i| i.kind))
      .field("last_synced_at", &self.last_synced_at)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::{notes, Note};
  use crate::sync::source::testing::Scripted;
  use crate::sync::source::FnSource;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::time::Duration;

  fn coordinator(source: &Scripted<Note>) -> SyncCoordinator<Note> {
    SyncCoordinator::new(Arc::new(source.clone()), SyncTracking::Internal)
  }

  /// Apply a completion the way an owner would, without a cache.
  fn finish(coordinator: &mut SyncCoordinator<Note>, done: Completed<Note>) {
    let outcome = done.result.as_ref().map(|_| ()).map_err(|e| e.as_str());
    coordinator.finish(done.kind, outcome);
  }

  #[tokio::test]
  async fn test_concurrent_syncs_issue_one_fetch() {
    let source = Scripted::new().gated().sync_ok(notes("n", 3), false);
    let mut coordinator = coordinator(&source);

    assert_eq!(coordinator.sync(), Dispatch::Started);
    for _ in 0..5 {
      assert_eq!(coordinator.sync(), Dispatch::Busy);
      assert_eq!(coordinator.sync_via_user_interaction(), Dispatch::Busy);
      assert_eq!(coordinator.load_more(2), Dispatch::Busy);
    }
    assert_eq!(coordinator.state(), SyncState::Syncing);

    source.release();
    let done = coordinator.settle().await.unwrap();
    assert_eq!(done.result.as_ref().map(|p| p.items.len()), Ok(3));
    // Still busy until the owner has applied the result
    assert_eq!(coordinator.state(), SyncState::Syncing);
    finish(&mut coordinator, done);

    assert_eq!(source.syncs(), 1);
    assert_eq!(coordinator.fetches(), 1);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert!(coordinator.last_synced_at().is_some());
  }

  #[tokio::test]
  async fn test_user_initiated_sync_uses_its_own_hook_and_state() {
    let source = Scripted::new().gated();
    let mut coordinator = coordinator(&source);

    assert!(coordinator.sync_via_user_interaction().started());
    assert_eq!(coordinator.state(), SyncState::SyncingUserInitiated);
    assert_eq!(source.user_syncs(), 1);

    source.release();
    let done = coordinator.settle().await.unwrap();
    assert_eq!(
      done.kind,
      FetchKind::Sync {
        user_initiated: true
      }
    );
  }

  #[tokio::test]
  async fn test_failure_then_retry() {
    let source = Scripted::new().sync_err("offline").sync_ok(notes("n", 1), false);
    let mut coordinator = coordinator(&source);

    coordinator.sync();
    let done = coordinator.settle().await.unwrap();
    finish(&mut coordinator, done);
    assert_eq!(coordinator.state(), SyncState::Failed("offline".into()));
    assert_eq!(coordinator.last_error(), Some("offline"));
    assert!(coordinator.last_synced_at().is_none());

    // Failed accepts the next sync but not pagination
    assert_eq!(coordinator.load_more(2), Dispatch::Busy);
    assert!(coordinator.sync().started());
    let done = coordinator.settle().await.unwrap();
    finish(&mut coordinator, done);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert_eq!(coordinator.last_error(), None);
  }

  #[tokio::test]
  async fn test_load_more_failure_returns_to_idle() {
    let source = Scripted::new().paginated().load_err("timeout");
    let mut coordinator = coordinator(&source);

    assert!(coordinator.load_more(2).started());
    assert_eq!(coordinator.state(), SyncState::LoadingMore);
    assert_eq!(coordinator.sync(), Dispatch::Busy);

    let done = coordinator.settle().await.unwrap();
    finish(&mut coordinator, done);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert_eq!(coordinator.last_error(), Some("timeout"));
  }

  #[tokio::test]
  async fn test_poll_picks_up_result() {
    let source = Scripted::new().sync_ok(notes("n", 2), false);
    let mut coordinator = coordinator(&source);

    assert!(coordinator.poll().is_none());
    coordinator.sync();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let done = coordinator.poll().unwrap();
    assert!(done.result.is_ok());
    assert!(!coordinator.is_in_flight());
  }

  #[tokio::test]
  async fn test_panicking_fetch_is_a_failure() {
    let source: FnSource<Note> = FnSource::new(|_| async {
      if true {
        panic!("boom");
      }
      Ok(Page::last(Vec::new()))
    });
    let mut coordinator = SyncCoordinator::new(Arc::new(source), SyncTracking::Internal);

    coordinator.sync();
    let done = coordinator.settle().await.unwrap();
    assert_eq!(done.result, Err(TASK_LOST.to_string()));
  }

  #[tokio::test]
  async fn test_external_tracking_blocks_and_reports() {
    let external = Arc::new(AtomicBool::new(true));
    let flag = external.clone();
    let source = Scripted::<Note>::new();
    let mut coordinator = SyncCoordinator::new(
      Arc::new(source.clone()),
      SyncTracking::external(move || flag.load(Ordering::SeqCst)),
    );

    assert_eq!(coordinator.state(), SyncState::Syncing);
    assert_eq!(coordinator.sync(), Dispatch::Busy);
    assert_eq!(source.syncs(), 0);

    external.store(false, Ordering::SeqCst);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert!(coordinator.sync().started());
  }

  #[tokio::test]
  async fn test_external_tracking_keeps_no_sync_flag_of_its_own() {
    let source = Scripted::new().gated().sync_err("x").load_ok(notes("n", 1), false);
    let mut coordinator = SyncCoordinator::new(
      Arc::new(source.clone().paginated()),
      SyncTracking::external(|| false),
    );

    // Our own fetch blocks the next one but is not reported as syncing
    assert!(coordinator.sync().started());
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert_eq!(coordinator.sync(), Dispatch::Busy);
    assert_eq!(coordinator.load_more(2), Dispatch::Busy);

    source.release();
    let done = coordinator.settle().await.unwrap();
    finish(&mut coordinator, done);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert_eq!(coordinator.last_error(), Some("x"));

    // Pagination is still tracked here
    assert!(coordinator.load_more(2).started());
    assert_eq!(coordinator.state(), SyncState::LoadingMore);
    source.release();
    let done = coordinator.settle().await.unwrap();
    finish(&mut coordinator, done);
    assert_eq!(coordinator.state(), SyncState::Idle);
    assert_eq!(coordinator.last_error(), None);
  }
}

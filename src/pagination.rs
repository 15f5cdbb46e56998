//! Infinite-scroll bookkeeping: when to ask for more and which page is next.

use crate::sync::{Dispatch, SyncState};

/// Pagination progress of one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationState {
  pub has_more: bool,
  /// 0 until something has been loaded; a full sync counts as page 1
  pub last_page_loaded: u32,
  /// True only while the coordinator is `LoadingMore`
  pub in_flight: bool,
}

/// Decides when a list should load its next page.
#[derive(Debug, Clone)]
pub struct PaginationController {
  enabled: bool,
  threshold: usize,
  state: PaginationState,
}

impl PaginationController {
  /// `enabled` is false when the host has infinite scroll off or the source
  /// cannot paginate; every request is then refused.
  pub fn new(enabled: bool, threshold: usize) -> Self {
    Self {
      enabled,
      threshold,
      state: PaginationState {
        has_more: enabled,
        last_page_loaded: 0,
        in_flight: false,
      },
    }
  }

  /// Resume from persisted progress.
  pub fn restore(&mut self, last_page_loaded: u32, has_more: bool) {
    self.state = PaginationState {
      has_more: self.enabled && has_more,
      last_page_loaded,
      in_flight: false,
    };
  }

  pub fn state(&self) -> PaginationState {
    self.state
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn has_more(&self) -> bool {
    self.enabled && self.state.has_more
  }

  pub fn next_page(&self) -> u32 {
    self.state.last_page_loaded + 1
  }

  /// Whether the last visible row is within the threshold of the end.
  pub fn is_near_end(&self, last_visible_row: usize, total_rows: usize) -> bool {
    total_rows > 0 && last_visible_row + 1 + self.threshold >= total_rows
  }

  /// True iff pagination is on, more content exists, nothing is running and
  /// the user scrolled close enough to the end.
  pub fn should_load_more(&self, near_end: bool, state: &SyncState) -> bool {
    near_end && self.has_more() && state.accepts_load_more()
  }

  /// Reason a load-more request completes without fetching, if any.
  pub fn refusal(&self) -> Option<Dispatch> {
    if !self.enabled {
      Some(Dispatch::Disabled)
    } else if !self.state.has_more {
      Some(Dispatch::NothingToLoad)
    } else {
      None
    }
  }

  pub fn started(&mut self) {
    self.state.in_flight = true;
  }

  pub fn loaded(&mut self, page: u32, has_more: bool) {
    self.state = PaginationState {
      has_more,
      last_page_loaded: page,
      in_flight: false,
    };
  }

  /// Progress is kept so the next attempt requests the same page.
  pub fn failed(&mut self) {
    self.state.in_flight = false;
  }

  /// A full sync replaced the content with page one.
  pub fn synced(&mut self, has_more: bool) {
    self.state = PaginationState {
      has_more: self.enabled && has_more,
      last_page_loaded: 1,
      in_flight: false,
    };
  }

  /// Content was dropped; start over from the first page.
  pub fn reset(&mut self) {
    self.state = PaginationState {
      has_more: self.enabled,
      last_page_loaded: 0,
      in_flight: false,
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_disabled_never_loads() {
    let pagination = PaginationController::new(false, 5);
    assert!(!pagination.should_load_more(true, &SyncState::Idle));
    assert_eq!(pagination.refusal(), Some(Dispatch::Disabled));
  }

  #[test]
  fn test_should_load_more_requires_idle_and_proximity() {
    let pagination = PaginationController::new(true, 5);
    assert!(pagination.should_load_more(true, &SyncState::Idle));
    assert!(!pagination.should_load_more(false, &SyncState::Idle));
    assert!(!pagination.should_load_more(true, &SyncState::Syncing));
    assert!(!pagination.should_load_more(true, &SyncState::LoadingMore));
    assert!(!pagination.should_load_more(true, &SyncState::Failed("x".into())));
  }

  #[test]
  fn test_exhausted_refuses() {
    let mut pagination = PaginationController::new(true, 5);
    pagination.synced(false);
    assert!(!pagination.should_load_more(true, &SyncState::Idle));
    assert_eq!(pagination.refusal(), Some(Dispatch::NothingToLoad));
  }

  #[test]
  fn test_near_end_threshold() {
    let pagination = PaginationController::new(true, 2);
    assert!(!pagination.is_near_end(6, 10));
    assert!(pagination.is_near_end(7, 10));
    assert!(pagination.is_near_end(9, 10));
    assert!(!pagination.is_near_end(0, 0));
  }

  #[test]
  fn test_failure_keeps_page() {
    let mut pagination = PaginationController::new(true, 5);
    pagination.synced(true);
    assert_eq!(pagination.next_page(), 2);

    pagination.started();
    pagination.failed();
    assert_eq!(pagination.next_page(), 2);
    assert!(pagination.has_more());

    pagination.started();
    pagination.loaded(2, false);
    assert_eq!(pagination.state().last_page_loaded, 2);
    assert!(!pagination.has_more());
  }

  #[test]
  fn test_sync_cannot_enable_disabled_pagination() {
    let mut pagination = PaginationController::new(false, 5);
    pagination.synced(true);
    assert!(!pagination.has_more());
  }
}

//! Sync state of a list controller.

use std::fmt;

/// What the controller is doing right now.
///
/// Exactly one value at any instant. Busy states (`Syncing`,
/// `SyncingUserInitiated`, `LoadingMore`) block every other cache-mutating
/// fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
  #[default]
  Idle,
  /// Background full sync in flight
  Syncing,
  /// Full sync requested by the user (e.g., pull to refresh)
  SyncingUserInitiated,
  /// Next page in flight
  LoadingMore,
  /// Last full sync failed; the next sync attempt is allowed
  Failed(String),
}

impl SyncState {
  pub fn is_busy(&self) -> bool {
    matches!(
      self,
      SyncState::Syncing | SyncState::SyncingUserInitiated | SyncState::LoadingMore
    )
  }

  pub fn is_syncing(&self) -> bool {
    matches!(self, SyncState::Syncing | SyncState::SyncingUserInitiated)
  }

  /// A full sync may start from `Idle` or `Failed`.
  pub fn accepts_sync(&self) -> bool {
    matches!(self, SyncState::Idle | SyncState::Failed(_))
  }

  /// Pagination may start only from `Idle`.
  pub fn accepts_load_more(&self) -> bool {
    matches!(self, SyncState::Idle)
  }

  pub fn failure(&self) -> Option<&str> {
    match self {
      SyncState::Failed(reason) => Some(reason),
      _ => None,
    }
  }
}

impl fmt::Display for SyncState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SyncState::Idle => f.write_str("idle"),
      SyncState::Syncing => f.write_str("syncing"),
      SyncState::SyncingUserInitiated => f.write_str("refreshing"),
      SyncState::LoadingMore => f.write_str("loading more"),
      SyncState::Failed(reason) => write!(f, "failed: {}", reason),
    }
  }
}

/// The kind of fetch a coordinator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
  Sync { user_initiated: bool },
  LoadMore { page: u32 },
}

impl FetchKind {
  pub fn is_sync(self) -> bool {
    matches!(self, FetchKind::Sync { .. })
  }

  /// State held while a fetch of this kind is outstanding.
  pub fn busy_state(self) -> SyncState {
    match self {
      FetchKind::Sync {
        user_initiated: false,
      } => SyncState::Syncing,
      FetchKind::Sync {
        user_initiated: true,
      } => SyncState::SyncingUserInitiated,
      FetchKind::LoadMore { .. } => SyncState::LoadingMore,
    }
  }
}

/// Outcome of issuing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
  /// A fetch was spawned
  Started,
  /// Another fetch is outstanding; nothing happened
  Busy,
  /// Pagination has no more pages; completed immediately
  NothingToLoad,
  /// The command is not enabled for this list
  Disabled,
}

impl Dispatch {
  pub fn started(self) -> bool {
    self == Dispatch::Started
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_guards() {
    assert!(SyncState::Idle.accepts_sync());
    assert!(SyncState::Failed("x".into()).accepts_sync());
    assert!(!SyncState::Syncing.accepts_sync());
    assert!(!SyncState::LoadingMore.accepts_sync());

    assert!(SyncState::Idle.accepts_load_more());
    assert!(!SyncState::Failed("x".into()).accepts_load_more());
    assert!(!SyncState::SyncingUserInitiated.accepts_load_more());
  }

  #[test]
  fn test_busy_state_per_kind() {
    assert_eq!(
      FetchKind::Sync {
        user_initiated: true
      }
      .busy_state(),
      SyncState::SyncingUserInitiated
    );
    assert_eq!(
      FetchKind::LoadMore { page: 2 }.busy_state(),
      SyncState::LoadingMore
    );
  }
}

//! Whether a list should show its "no results" placeholder, and what it says.

use crate::cache::CacheSnapshot;
use crate::sync::SyncState;

/// Placeholder text shown in place of an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
  pub title: String,
  pub message: String,
}

#[derive(Debug, Clone)]
pub struct EmptyStateResolver {
  title: String,
  message: String,
}

impl EmptyStateResolver {
  pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      message: message.into(),
    }
  }

  /// True iff nothing is shown and no fetch is about to fill the list, so
  /// the placeholder never flashes up during a sync.
  pub fn should_show_empty_state<T>(&self, snapshot: &CacheSnapshot<T>, state: &SyncState) -> bool {
    snapshot.is_empty() && !state.is_busy()
  }

  pub fn content(&self, state: &SyncState) -> EmptyState {
    let message = match state.failure() {
      Some(reason) => format!("Couldn't refresh: {}", reason),
      None => self.message.clone(),
    };
    EmptyState {
      title: self.title.clone(),
      message,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::{notes, Note};
  use crate::cache::CacheQuery;

  fn resolver() -> EmptyStateResolver {
    EmptyStateResolver::new("Nothing here", "Pull to refresh")
  }

  #[test]
  fn test_hidden_while_fetching_even_if_empty() {
    let empty: CacheSnapshot<Note> = CacheSnapshot::empty();
    for state in [
      SyncState::Syncing,
      SyncState::SyncingUserInitiated,
      SyncState::LoadingMore,
    ] {
      assert!(!resolver().should_show_empty_state(&empty, &state));
    }
  }

  #[test]
  fn test_shown_when_empty_and_settled() {
    let empty: CacheSnapshot<Note> = CacheSnapshot::empty();
    assert!(resolver().should_show_empty_state(&empty, &SyncState::Idle));
    assert!(resolver().should_show_empty_state(&empty, &SyncState::Failed("x".into())));
  }

  #[test]
  fn test_hidden_with_items() {
    let items = notes("n", 1);
    let snapshot = CacheQuery::new().run(&items);
    assert!(!resolver().should_show_empty_state(&snapshot, &SyncState::Idle));
  }

  #[test]
  fn test_failure_reason_replaces_message() {
    let content = resolver().content(&SyncState::Failed("offline".into()));
    assert_eq!(content.title, "Nothing here");
    assert_eq!(content.message, "Couldn't refresh: offline");
    assert_eq!(resolver().content(&SyncState::Idle).message, "Pull to refresh");
  }
}

//! Error types for the list controller core.

use thiserror::Error;

/// Errors surfaced by the list controller.
///
/// Sync and pagination failures are recoverable: the cache is left untouched
/// and the state machine accepts the next command. Configuration errors are
/// raised at construction and are not recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
  /// A full sync (background or user-initiated) failed.
  #[error("Sync failed: {0}")]
  SyncFailed(String),

  /// A load-more fetch failed. Pagination state is unchanged, so a retry
  /// requests the same page.
  #[error("Pagination failed: {0}")]
  PaginationFailed(String),

  /// A mandatory collaborator or setting is missing.
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// The persistence backend failed.
  #[error("Storage error: {0}")]
  Storage(String),

  /// A fetch is outstanding and the command needs the state machine idle.
  #[error("A sync or load-more is already in flight")]
  Busy,
}

/// A specialized `Result` type for list controller operations.
pub type Result<T> = std::result::Result<T, ListError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_messages() {
    assert_eq!(
      ListError::SyncFailed("timeout".into()).to_string(),
      "Sync failed: timeout"
    );
    assert_eq!(
      ListError::Configuration("missing entity".into()).to_string(),
      "Configuration error: missing entity"
    );
  }
}

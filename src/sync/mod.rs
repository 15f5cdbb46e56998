//! Sync state machine and the collaborators it fetches through.

mod coordinator;
mod source;
mod state;

pub use coordinator::{Completed, SyncCoordinator};
pub use source::{FetchFuture, FnSource, ListSource, Page, SyncStatus, SyncTracking};
pub use state::{Dispatch, FetchKind, SyncState};

#[cfg(test)]
pub(crate) use source::testing;

use ratatui::prelude::Color;
use synclist::SyncState;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the status bar color for a sync state
pub fn state_color(state: &SyncState) -> Color {
  match state {
    SyncState::Idle => Color::Green,
    SyncState::Syncing | SyncState::SyncingUserInitiated | SyncState::LoadingMore => {
      Color::Yellow
    }
    SyncState::Failed(_) => Color::Red,
  }
}

use crate::demo::{DemoSource, Post};
use crate::event::{Event, EventHandler};
use crate::ui;
use chrono::{DateTime, Local, TimeZone};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use synclist::cache::IndexPath;
use synclist::{
  CacheQuery, CacheStorage, Dispatch, EmptyState, EntityDescriptor, ListConfig, ListController,
  ListEvent, SortDescriptor, SwipeAction, SwipeView, SyncState,
};
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(100);

/// One rendered row, produced by the cell configurator.
#[derive(Debug, Clone)]
pub struct RowCell {
  pub id: String,
  /// Set on the first row of a section when grouping is on
  pub section: Option<String>,
  pub title: String,
  pub author: String,
  pub published: String,
}

/// Main application state
pub struct App<S: CacheStorage> {
  list: ListController<Post, S>,

  /// Selected row, as a flat index over the snapshot
  selected: usize,

  /// Group rows by author
  grouped: bool,

  /// Last message worth showing in the status line
  notice: Option<String>,

  /// Background sync cadence (none: only at startup)
  sync_interval: Option<Duration>,
  last_background_sync: Instant,

  /// Advances every tick; drives the spinner
  ticks: u64,

  /// Whether to quit
  should_quit: bool,
}

impl<S: CacheStorage> App<S> {
  pub fn new(
    config: ListConfig,
    source: DemoSource,
    storage: S,
    sync_interval: Option<Duration>,
  ) -> Result<Self> {
    let list = ListController::builder(source)
      .entity(EntityDescriptor::new("post"))
      .config(config)
      .query(feed_query(false))
      .swipe_actions(swipe_view)
      .storage(storage)
      .build()?;

    Ok(Self {
      list,
      selected: 0,
      grouped: false,
      notice: None,
      sync_interval,
      last_background_sync: Instant::now(),
      ticks: 0,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);

    // Background sync at startup
    self.list.sync();

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
      self.apply_events();
    }
    Ok(())
  }

  fn tick(&mut self) {
    self.ticks = self.ticks.wrapping_add(1);

    if let Some(interval) = self.sync_interval {
      if self.last_background_sync.elapsed() >= interval {
        self.last_background_sync = Instant::now();
        self.list.sync();
      }
    }
  }

  fn apply_events(&mut self) {
    for event in self.list.poll() {
      match event {
        ListEvent::Changed(changes) => {
          debug!(
            inserted = changes.inserted(),
            deleted = changes.deleted(),
            "List changed"
          );
          self.clamp_selection();
        }
        ListEvent::Synced { items, .. } => {
          self.notice = Some(format!("Synced {} posts", items));
        }
        ListEvent::SyncFailed { error, .. } => {
          self.notice = Some(error.to_string());
        }
        ListEvent::LoadedMore { page, has_more } => {
          self.notice = Some(if has_more {
            format!("Loaded page {}", page)
          } else {
            format!("Loaded page {}, end of feed", page)
          });
        }
        ListEvent::LoadMoreFailed { page, error } => {
          self.notice = Some(format!("Page {}: {} (scroll to retry)", page, error));
        }
        ListEvent::SwipeClosed(closed) => {
          debug!(row = %closed.row, "Swipe view closed with its row");
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),

      KeyCode::Char('r') => {
        if self.list.sync_via_user_interaction() == Dispatch::Busy {
          self.notice = Some("Already syncing".to_string());
        }
      }
      KeyCode::Char('l') | KeyCode::Right => {
        if let Some(id) = self.selected_id() {
          self.list.open_swipe(&id);
        }
      }
      KeyCode::Char('h') | KeyCode::Left | KeyCode::Esc => {
        self.list.close_any_swipe(true);
      }
      KeyCode::Char('i') => match self.list.invalidate() {
        Ok(_) => {
          self.selected = 0;
          self.notice = Some("Cache cleared, press r to refresh".to_string());
        }
        Err(e) => self.notice = Some(e.to_string()),
      },
      KeyCode::Char('s') => {
        let grouped = !self.grouped;
        match self.list.reset_query(feed_query(grouped)) {
          Ok(_) => {
            self.grouped = grouped;
            self.clamp_selection();
          }
          Err(e) => self.notice = Some(e.to_string()),
        }
      }
      _ => {}
    }
  }

  fn move_selection(&mut self, delta: i32) {
    let len = self.list.snapshot().len();
    if len == 0 {
      return;
    }
    self.selected = (self.selected as i32 + delta).clamp(0, len as i32 - 1) as usize;

    if self.list.maybe_load_more(self.selected) {
      info!(row = self.selected, "Scrolled near the end, loading more");
    }
  }

  fn clamp_selection(&mut self) {
    let len = self.list.snapshot().len();
    self.selected = self.selected.min(len.saturating_sub(1));
  }

  fn selected_id(&self) -> Option<String> {
    let snapshot = self.list.snapshot();
    let path = snapshot.path_at(self.selected)?;
    snapshot.get(path).map(|post| post.id.clone())
  }

  // Accessors for UI rendering
  pub fn cells(&self) -> Vec<RowCell> {
    let grouped = self.grouped;
    self.list.cells(|post, path: IndexPath| RowCell {
      id: post.id.clone(),
      section: (grouped && path.row == 0).then(|| post.author.clone()),
      title: post.title.clone(),
      author: post.author.clone(),
      published: format_time(post.published),
    })
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn state(&self) -> SyncState {
    self.list.state()
  }

  pub fn spinner(&self) -> char {
    const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
    FRAMES[(self.ticks % FRAMES.len() as u64) as usize]
  }

  pub fn empty_state(&self) -> Option<EmptyState> {
    self.list.empty_state()
  }

  pub fn swipe_view(&self) -> Option<(&str, &SwipeView)> {
    self.list.swipe_view()
  }

  pub fn item_count(&self) -> usize {
    self.list.snapshot().len()
  }

  pub fn has_more(&self) -> bool {
    self.list.pagination_state().has_more
  }

  pub fn last_page(&self) -> u32 {
    self.list.pagination_state().last_page_loaded
  }

  pub fn last_synced(&self) -> Option<DateTime<Local>> {
    self.list.last_synced_at().map(|t| t.with_timezone(&Local))
  }

  pub fn last_error(&self) -> Option<&str> {
    self.list.last_error()
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }

  pub fn scope(&self) -> String {
    self.list.scope().description()
  }

  pub fn grouped(&self) -> bool {
    self.grouped
  }
}

/// Newest first, optionally grouped by author.
fn feed_query(grouped: bool) -> CacheQuery<Post> {
  let query = CacheQuery::new().sort_by(SortDescriptor::descending(|p: &Post| p.published));
  if grouped {
    query.sectioned_by(|p: &Post| p.author.clone())
  } else {
    query
  }
}

fn swipe_view(row: &str) -> SwipeView {
  vec![
    SwipeAction::new("archive", format!("Archive {}", row)),
    SwipeAction::new("delete", "Delete").destructive(),
  ]
}

fn format_time(unix: i64) -> String {
  Local
    .timestamp_opt(unix, 0)
    .single()
    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grouped_query_sections_by_author() {
    assert!(feed_query(true).is_sectioned());
    assert!(!feed_query(false).is_sectioned());
  }

  #[test]
  fn test_swipe_view_has_destructive_delete() {
    let view = swipe_view("p0001");
    assert_eq!(view[0].label, "Archive p0001");
    assert!(view[1].destructive);
  }
}

//! Per-row swipe action views. At most one row shows its actions at a time.

/// Builds the action view for a row.
pub type SwipeConfigurator<V> = Box<dyn Fn(&str) -> V + Send + Sync>;

/// One button in a row's swipe view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeAction {
  pub id: String,
  pub label: String,
  pub destructive: bool,
}

impl SwipeAction {
  pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
      destructive: false,
    }
  }

  pub fn destructive(mut self) -> Self {
    self.destructive = true;
    self
  }
}

/// Content of the open swipe view.
pub type SwipeView = Vec<SwipeAction>;

/// A row's action view that was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeClosed {
  pub row: String,
  pub animated: bool,
}

/// Result of opening a row: what was closed first, then what was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeTransition {
  pub closed: Option<SwipeClosed>,
  pub opened: String,
}

struct OpenSwipe<V> {
  row: String,
  view: V,
}

/// Tracks the single open swipe view of a list.
pub struct SwipeActionController<V> {
  configure: Option<SwipeConfigurator<V>>,
  open: Option<OpenSwipe<V>>,
}

impl<V> SwipeActionController<V> {
  pub fn new(configure: SwipeConfigurator<V>) -> Self {
    Self {
      configure: Some(configure),
      open: None,
    }
  }

  /// Swipe actions off; `open` is always a no-op.
  pub fn disabled() -> Self {
    Self {
      configure: None,
      open: None,
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.configure.is_some()
  }

  pub fn open_row(&self) -> Option<&str> {
    self.open.as_ref().map(|o| o.row.as_str())
  }

  pub fn view(&self) -> Option<&V> {
    self.open.as_ref().map(|o| &o.view)
  }

  pub fn is_open(&self, row: &str) -> bool {
    self.open_row() == Some(row)
  }

  /// Show the action view for `row`, closing any other open row first.
  pub fn open(&mut self, row: &str) -> Option<SwipeTransition> {
    let configure = self.configure.as_ref()?;
    if self.is_open(row) {
      return None;
    }

    let closed = self.open.take().map(|previous| SwipeClosed {
      row: previous.row,
      animated: true,
    });
    let view = configure(row);
    self.open = Some(OpenSwipe {
      row: row.to_string(),
      view,
    });

    tracing::debug!(row, closed = ?closed.as_ref().map(|c| &c.row), "Swipe view opened");
    Some(SwipeTransition {
      closed,
      opened: row.to_string(),
    })
  }

  /// Remove the action view if it is open for `row`.
  pub fn close(&mut self, row: &str, animated: bool) -> Option<SwipeClosed> {
    if !self.is_open(row) {
      return None;
    }
    self.close_any(animated)
  }

  /// Remove whatever action view is open.
  pub fn close_any(&mut self, animated: bool) -> Option<SwipeClosed> {
    self
      .open
      .take()
      .map(|open| SwipeClosed {
        row: open.row,
        animated,
      })
  }
}

impl<V> std::fmt::Debug for SwipeActionController<V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SwipeActionController")
      .field("enabled", &self.is_enabled())
      .field("open_row", &self.open_row())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn controller() -> SwipeActionController<String> {
    SwipeActionController::new(Box::new(|row| format!("actions for {}", row)))
  }

  #[test]
  fn test_open_b_closes_a_first() {
    let mut swipe = controller();
    let first = swipe.open("a").unwrap();
    assert_eq!(first.closed, None);

    let second = swipe.open("b").unwrap();
    assert_eq!(
      second.closed,
      Some(SwipeClosed {
        row: "a".into(),
        animated: true
      })
    );
    assert_eq!(second.opened, "b");
    assert!(!swipe.is_open("a"));
    assert_eq!(swipe.view().map(String::as_str), Some("actions for b"));
  }

  #[test]
  fn test_close_other_row_is_noop() {
    let mut swipe = controller();
    swipe.open("a");
    assert_eq!(swipe.close("b", false), None);
    assert!(swipe.is_open("a"));

    assert_eq!(
      swipe.close("a", false),
      Some(SwipeClosed {
        row: "a".into(),
        animated: false
      })
    );
    assert_eq!(swipe.open_row(), None);
  }

  #[test]
  fn test_reopening_same_row_is_noop() {
    let mut swipe = controller();
    swipe.open("a");
    assert_eq!(swipe.open("a"), None);
    assert!(swipe.is_open("a"));
  }

  #[test]
  fn test_disabled_never_opens() {
    let mut swipe: SwipeActionController<String> = SwipeActionController::disabled();
    assert_eq!(swipe.open("a"), None);
    assert_eq!(swipe.close_any(true), None);
  }
}

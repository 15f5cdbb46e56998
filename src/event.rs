use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Host events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized; redraw
  Resize,
  /// Periodic tick for polling the list controller
  Tick,
}

/// What the reader loop does with one poll result.
#[derive(Debug)]
enum Step {
  Emit(Event),
  Skip,
  /// The terminal is gone; stop reading
  Stop,
}

fn step(polled: io::Result<bool>, read: impl FnOnce() -> io::Result<CrosstermEvent>) -> Step {
  match polled {
    Ok(false) => Step::Emit(Event::Tick),
    Ok(true) => match read() {
      Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
        Step::Emit(Event::Key(key))
      }
      Ok(CrosstermEvent::Resize(..)) => Step::Emit(Event::Resize),
      Ok(_) => Step::Skip,
      Err(e) => {
        tracing::warn!(error = %e, "Failed to read terminal event");
        Step::Stop
      }
    },
    Err(e) => {
      tracing::warn!(error = %e, "Failed to poll terminal");
      Step::Stop
    }
  }
}

/// Produces events from terminal input and a tick timer.
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm's poll blocks, so it gets its own thread
    tokio::task::spawn_blocking(move || loop {
      match step(event::poll(tick_rate), event::read) {
        Step::Emit(event) => {
          if tx.send(event).is_err() {
            break;
          }
        }
        Step::Skip => {}
        Step::Stop => break,
      }
    });

    Self { rx }
  }

  /// Receive the next event; `None` once the terminal can no longer be read
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

mod renderfns;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use renderfns::{draw_header, state_color, truncate};
use synclist::{CacheStorage, SyncState};

/// Main draw function
pub fn draw<S: CacheStorage>(frame: &mut Frame, app: &App<S>) {
  let swipe_height = if app.swipe_view().is_some() { 1 } else { 0 };
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),            // Header
      Constraint::Min(1),               // List
      Constraint::Length(swipe_height), // Swipe actions
      Constraint::Length(1),            // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], &app.scope(), app.grouped());

  match app.empty_state() {
    Some(empty) => draw_empty_state(frame, chunks[1], &empty.title, &empty.message),
    None => draw_list(frame, chunks[1], app),
  }

  if let Some((row, actions)) = app.swipe_view() {
    let mut spans = vec![Span::styled(
      format!(" {} ", row),
      Style::default().fg(Color::Cyan).bold(),
    )];
    for action in actions {
      let style = if action.destructive {
        Style::default().fg(Color::White).bg(Color::Red)
      } else {
        Style::default().fg(Color::Black).bg(Color::Gray)
      };
      spans.push(Span::raw(" "));
      spans.push(Span::styled(format!(" {} ", action.label), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[2]);
  }

  draw_status_bar(frame, chunks[3], app);
}

fn draw_list<S: CacheStorage>(frame: &mut Frame, area: Rect, app: &App<S>) {
  let cells = app.cells();
  let title = format!(" Posts ({}) ", cells.len());
  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  // Section headers take a line each, so the highlighted line is offset
  let mut items = Vec::with_capacity(cells.len());
  let mut highlighted = None;
  for (index, cell) in cells.iter().enumerate() {
    if let Some(section) = &cell.section {
      items.push(ListItem::new(Line::from(Span::styled(
        format!("── {} ", section),
        Style::default().fg(Color::Yellow).bold(),
      ))));
    }
    if index == app.selected() {
      highlighted = Some(items.len());
    }

    let swiped = app.swipe_view().map(|(row, _)| row) == Some(cell.id.as_str());
    let id_style = if swiped {
      Style::default().fg(Color::Red)
    } else {
      Style::default().fg(Color::Cyan)
    };
    items.push(ListItem::new(Line::from(vec![
      Span::styled(format!("{:<7}", cell.id), id_style),
      Span::raw(" "),
      Span::styled(
        format!("{:<10}", truncate(&cell.author, 10)),
        Style::default().fg(Color::Magenta),
      ),
      Span::raw(" "),
      Span::styled(cell.published.clone(), Style::default().fg(Color::DarkGray)),
      Span::raw("  "),
      Span::raw(truncate(&cell.title, 60)),
    ])));
  }

  if app.has_more() && !cells.is_empty() {
    let hint = match app.state() {
      SyncState::LoadingMore => format!("{} loading more...", app.spinner()),
      _ => "scroll for more".to_string(),
    };
    items.push(ListItem::new(Span::styled(
      hint,
      Style::default().fg(Color::DarkGray),
    )));
  }

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default().with_selected(highlighted);
  frame.render_stateful_widget(list, area, &mut state);
}

fn draw_empty_state(frame: &mut Frame, area: Rect, title: &str, message: &str) {
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(title.to_string(), Style::default().bold())),
    Line::from(""),
    Line::from(Span::styled(
      message.to_string(),
      Style::default().fg(Color::DarkGray),
    )),
  ];
  let paragraph = Paragraph::new(text)
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}

fn draw_status_bar<S: CacheStorage>(frame: &mut Frame, area: Rect, app: &App<S>) {
  let state = app.state();
  let label = if state.is_busy() {
    format!(" {} {} ", app.spinner(), state)
  } else {
    format!(" {} ", state)
  };

  let mut spans = vec![
    Span::styled(label, Style::default().fg(Color::Black).bg(state_color(&state))),
    Span::styled(
      format!(" {} items, page {} ", app.item_count(), app.last_page()),
      Style::default().fg(Color::White),
    ),
  ];

  let synced = app
    .last_synced()
    .map(|t| t.format("%H:%M:%S").to_string())
    .unwrap_or_else(|| "never".to_string());
  spans.push(Span::styled(
    format!("│ synced {} ", synced),
    Style::default().fg(Color::DarkGray),
  ));

  if let Some(error) = app.last_error() {
    spans.push(Span::styled(
      format!("│ {} ", truncate(error, 40)),
      Style::default().fg(Color::Red),
    ));
  } else if let Some(notice) = app.notice() {
    spans.push(Span::styled(
      format!("│ {} ", truncate(notice, 40)),
      Style::default().fg(Color::Green),
    ));
  }

  frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

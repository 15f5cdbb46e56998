use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const SHORTCUTS: [(&str, &str); 6] = [
  ("j/k", "move"),
  ("r", "refresh"),
  ("l/h", "swipe"),
  ("s", "group"),
  ("i", "invalidate"),
  ("q", "quit"),
];

/// Draw the header bar with name, list scope, and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, scope: &str, grouped: bool) {
  let mut spans = vec![
    Span::styled(" synclist ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", scope), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", layout_label(grouped)),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw(" "),
  ];

  // Keys highlighted, descriptions dimmed
  for (key, label) in SHORTCUTS {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("<{}>", key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(
      format!(" {}", label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn layout_label(grouped: bool) -> &'static str {
  if grouped {
    "by author"
  } else {
    "newest first"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout_label() {
    assert_eq!(layout_label(true), "by author");
    assert_eq!(layout_label(false), "newest first");
  }
}

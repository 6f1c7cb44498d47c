use super::KeyResult;
use crate::commands::{self, Suggestion};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Line submitted, replaced by the selected suggestion when there is one
  Submitted(String),
  Cancelled,
}

/// `:` command palette with suggestions
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  buffer: String,
  active: bool,
  selected_suggestion: usize,
  /// Cached categories offered after `products `
  categories: Vec<String>,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn set_categories(&mut self, categories: Vec<String>) {
    self.categories = categories;
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<Suggestion> {
    commands::suggest(&self.buffer, &self.categories)
  }

  /// Handle a key event. Call this regardless of active state, it handles
  /// activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.active = true;
        self.reset();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.reset();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        self.active = false;
        let cmd = self.resolve_command();
        self.reset();
        KeyResult::Event(CommandEvent::Submitted(cmd))
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = self.suggestions().len().min(MAX_SUGGESTIONS);
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::Backspace => {
        self.buffer.pop();
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.reset();
        KeyResult::Handled
      }
      KeyCode::Char(c) => {
        self.buffer.push(c);
        self.selected_suggestion = 0; // Reset on input change
        KeyResult::Handled
      }
      // Swallow everything else while the palette is open
      _ => KeyResult::Handled,
    }
  }

  fn reset(&mut self) {
    self.buffer.clear();
    self.selected_suggestion = 0;
  }

  /// Selected suggestion if there is one, else the raw input
  fn resolve_command(&self) -> String {
    self
      .suggestions()
      .into_iter()
      .nth(self.selected_suggestion)
      .map(|s| s.line)
      .unwrap_or_else(|| self.buffer.trim().to_string())
  }

  /// Render the palette over the top-left of `area`
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.buffer.as_str()),
      Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|s| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<28} ", s.line), Style::default().fg(Color::Cyan)),
          Span::styled(s.hint.as_str(), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));

    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(input: &mut CommandInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_ignores_keys_until_colon() {
    let mut input = CommandInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('j'))), KeyResult::NotHandled);
    assert_eq!(input.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    assert!(input.is_active());
  }

  #[test]
  fn test_submit_resolves_alias_to_name() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    type_str(&mut input, "basket");

    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(CommandEvent::Submitted("cart".to_string())));
    assert!(!input.is_active());
    assert!(input.buffer.is_empty());
  }

  #[test]
  fn test_submit_unknown_passes_raw_input() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    type_str(&mut input, "ZZZ ");

    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(CommandEvent::Submitted("ZZZ".to_string())));
  }

  #[test]
  fn test_tab_picks_a_cached_category() {
    let mut input = CommandInput::new();
    input.set_categories(vec!["electronics".to_string(), "jewelery".to_string()]);
    input.handle_key(key(KeyCode::Char(':')));
    type_str(&mut input, "products ");

    // First entry is the whole catalog, Tab moves to the first category
    input.handle_key(key(KeyCode::Tab));
    let result = input.handle_key(key(KeyCode::Enter));

    assert_eq!(
      result,
      KeyResult::Event(CommandEvent::Submitted("products electronics".to_string()))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    type_str(&mut input, "qu");

    assert_eq!(input.handle_key(key(KeyCode::Esc)), KeyResult::Event(CommandEvent::Cancelled));
    assert!(!input.is_active());
  }

  #[test]
  fn test_backspace_edits_buffer() {
    let mut input = CommandInput::new();
    input.handle_key(key(KeyCode::Char(':')));
    type_str(&mut input, "cartx");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.buffer, "cart");
  }
}

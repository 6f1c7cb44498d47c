//! One-line status describing the latest catalog fetch outcome.

use crate::network::NetworkResult;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Info,
  Ok,
  Warning,
  Error,
}

impl Tone {
  pub fn color(self) -> Color {
    match self {
      Tone::Info => Color::Cyan,
      Tone::Ok => Color::Green,
      Tone::Warning => Color::Yellow,
      Tone::Error => Color::Red,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
  pub tone: Tone,
  pub text: String,
}

impl Banner {
  fn new(tone: Tone, text: impl Into<String>) -> Self {
    Self {
      tone,
      text: text.into(),
    }
  }
}

/// Describe an outcome. `None` means nothing has arrived yet.
pub fn describe<T>(outcome: Option<&NetworkResult<Vec<T>>>) -> Banner {
  match outcome {
    None | Some(NetworkResult::Loading) => Banner::new(Tone::Info, "Loading products..."),
    Some(NetworkResult::Success(items)) if items.is_empty() => {
      Banner::new(Tone::Warning, "No products available")
    }
    Some(NetworkResult::Success(items)) => {
      Banner::new(Tone::Ok, format!("{} products", items.len()))
    }
    Some(NetworkResult::ServerError { code, error_body }) => {
      match error_body.as_ref().and_then(|body| body.description()) {
        Some(message) => Banner::new(Tone::Error, format!("Server error {}: {}", code, message)),
        None => Banner::new(Tone::Error, format!("Server error {}", code)),
      }
    }
    Some(NetworkResult::NetworkError) => Banner::new(
      Tone::Warning,
      "Network unavailable. Check your connection and press r to retry",
    ),
    Some(NetworkResult::UnexpectedError { message, .. }) => {
      Banner::new(Tone::Error, format!("Something went wrong: {}", message))
    }
  }
}

pub fn render_banner(frame: &mut Frame, area: Rect, banner: &Banner) {
  let line = Line::from(vec![
    Span::raw(" "),
    Span::styled(banner.text.as_str(), Style::default().fg(banner.tone.color())),
  ]);
  frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::api_types::ErrorResponse;
  use color_eyre::eyre::eyre;
  use std::sync::Arc;

  type Outcome = NetworkResult<Vec<u32>>;

  #[test]
  fn test_loading_and_nothing_yet_look_the_same() {
    assert_eq!(describe::<u32>(None), describe(Some(&Outcome::Loading)));
    assert_eq!(describe::<u32>(None).tone, Tone::Info);
  }

  #[test]
  fn test_success_counts_items() {
    let banner = describe(Some(&Outcome::Success(vec![1, 2, 3])));
    assert_eq!(banner, Banner::new(Tone::Ok, "3 products"));
  }

  #[test]
  fn test_empty_success_is_a_warning() {
    let banner = describe(Some(&Outcome::Success(vec![])));
    assert_eq!(banner.tone, Tone::Warning);
  }

  #[test]
  fn test_server_error_shows_code_and_message() {
    let outcome = Outcome::ServerError {
      code: 503,
      error_body: Some(ErrorResponse {
        message: Some("maintenance".to_string()),
        error: None,
        status: Some(503),
      }),
    };
    assert_eq!(describe(Some(&outcome)).text, "Server error 503: maintenance");

    let bare = Outcome::ServerError {
      code: 404,
      error_body: None,
    };
    assert_eq!(describe(Some(&bare)).text, "Server error 404");
  }

  #[test]
  fn test_each_failure_reads_differently() {
    let network = describe(Some(&Outcome::NetworkError));
    let unexpected = describe(Some(&Outcome::UnexpectedError {
      message: "bad payload".to_string(),
      cause: Arc::new(eyre!("bad payload")),
    }));
    let server = describe(Some(&Outcome::ServerError {
      code: 500,
      error_body: None,
    }));

    assert_ne!(network.text, unexpected.text);
    assert_ne!(network.text, server.text);
    assert_ne!(unexpected.text, server.text);
    assert!(unexpected.text.contains("bad payload"));
  }
}

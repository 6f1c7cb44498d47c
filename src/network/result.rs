//! Mapping of remote calls onto a closed set of fetch outcomes.

use color_eyre::Report;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, warn};

use super::api_types::ErrorResponse;
use super::client::HttpStatusError;

/// Outcome of attempting to obtain data from the remote API.
#[derive(Debug, Clone)]
pub enum NetworkResult<T> {
  /// Fetch in flight; never terminal
  Loading,
  /// Deserialized payload
  Success(T),
  /// Remote answered with a non-2xx status
  ServerError {
    code: u16,
    error_body: Option<ErrorResponse>,
  },
  /// Connectivity or transport failure
  NetworkError,
  /// Anything else
  UnexpectedError {
    message: String,
    cause: Arc<Report>,
  },
}

impl<T> NetworkResult<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, NetworkResult::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      NetworkResult::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> NetworkResult<U> {
    match self {
      NetworkResult::Loading => NetworkResult::Loading,
      NetworkResult::Success(data) => NetworkResult::Success(f(data)),
      NetworkResult::ServerError { code, error_body } => {
        NetworkResult::ServerError { code, error_body }
      }
      NetworkResult::NetworkError => NetworkResult::NetworkError,
      NetworkResult::UnexpectedError { message, cause } => {
        NetworkResult::UnexpectedError { message, cause }
      }
    }
  }
}

impl<T> fmt::Display for NetworkResult<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NetworkResult::Loading => write!(f, "loading"),
      NetworkResult::Success(_) => write!(f, "success"),
      NetworkResult::ServerError { code, error_body } => {
        match error_body.as_ref().and_then(|b| b.description()) {
          Some(description) => write!(f, "server error {}: {}", code, description),
          None => write!(f, "server error {}", code),
        }
      }
      NetworkResult::NetworkError => write!(f, "network unavailable"),
      NetworkResult::UnexpectedError { message, .. } => write!(f, "unexpected error: {}", message),
    }
  }
}

/// How a failed call is classified.
enum Failure<'a> {
  HostUnreachable,
  Transport,
  Status(&'a HttpStatusError),
  Other,
}

/// Walk the report chain and find the first error we know how to classify.
fn classify(report: &Report) -> Failure<'_> {
  for cause in report.chain() {
    if let Some(status) = cause.downcast_ref::<HttpStatusError>() {
      return Failure::Status(status);
    }

    if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
      if e.is_connect() {
        return Failure::HostUnreachable;
      }
      if e.is_builder() || e.is_decode() {
        return Failure::Other;
      }
      return Failure::Transport;
    }

    if cause.downcast_ref::<std::io::Error>().is_some() {
      return Failure::Transport;
    }
  }

  Failure::Other
}

/// Execute `api_call` and translate whatever happens into a `NetworkResult`.
///
/// Never returns an error and never yields `Loading`.
pub async fn safe_api_call<T, F, Fut>(api_call: F) -> NetworkResult<T>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = color_eyre::Result<T>>,
{
  let report = match api_call().await {
    Ok(data) => return NetworkResult::Success(data),
    Err(report) => report,
  };

  match classify(&report) {
    Failure::HostUnreachable => {
      error!(error = ?report, "Invalid URL or No Internet Connection");
      NetworkResult::NetworkError
    }
    Failure::Transport => {
      error!(error = ?report, "Network failure. Check your internet connection.");
      NetworkResult::NetworkError
    }
    Failure::Status(status) => {
      let error_body = convert_error_body(&status.body);
      error!(
        code = status.status,
        "Server error: {}",
        error_body
          .as_ref()
          .and_then(|b| b.description())
          .unwrap_or("Unknown error")
      );
      NetworkResult::ServerError {
        code: status.status,
        error_body,
      }
    }
    Failure::Other => {
      error!(error = ?report, "Unexpected error occurred.");
      let message = report.to_string();
      NetworkResult::UnexpectedError {
        message: if message.is_empty() {
          "Unexpected error".to_string()
        } else {
          message
        },
        cause: Arc::new(report),
      }
    }
  }
}

/// Best-effort decode of an error payload. Failures are logged, not raised.
pub fn convert_error_body(body: &[u8]) -> Option<ErrorResponse> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return None;
  }

  match serde_json::from_slice(body) {
    Ok(parsed) => Some(parsed),
    Err(e) => {
      warn!(error = %e, "Failed to parse error response");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::network::client::test_server::{closed_port, serve_once};
  use crate::network::client::{QuickMartApi, QuickMartClient};
  use color_eyre::eyre::{eyre, WrapErr};

  fn client_for(base_url: String) -> QuickMartClient {
    let mut config = Config::default();
    config.api.base_url = base_url;
    config.api.timeout_secs = 5;
    QuickMartClient::new(&config).unwrap()
  }

  #[tokio::test]
  async fn test_success_carries_payload() {
    let result = safe_api_call(|| async { Ok(vec![1, 2, 3]) }).await;
    assert_eq!(result.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_io_error_is_network_error() {
    let result: NetworkResult<()> = safe_api_call(|| async {
      Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
        .wrap_err("reading products")
    })
    .await;
    assert!(matches!(result, NetworkResult::NetworkError));
  }

  #[tokio::test]
  async fn test_connection_refused_is_network_error() {
    let client = client_for(closed_port().await);
    let result = safe_api_call(|| client.fetch_products_list()).await;
    assert!(matches!(result, NetworkResult::NetworkError));
  }

  #[tokio::test]
  async fn test_unknown_host_is_network_error() {
    // .invalid never resolves
    let client = client_for("http://no-such-host.invalid".to_string());
    let result = safe_api_call(|| client.fetch_products_list()).await;
    assert!(matches!(result, NetworkResult::NetworkError));
  }

  #[tokio::test]
  async fn test_server_error_with_structured_body() {
    let client = client_for(serve_once(401, r#"{"message":"token expired"}"#).await);
    let result = safe_api_call(|| client.fetch_products_list()).await;

    match result {
      NetworkResult::ServerError { code, error_body } => {
        assert_eq!(code, 401);
        assert_eq!(
          error_body.and_then(|b| b.message),
          Some("token expired".to_string())
        );
      }
      other => panic!("expected ServerError, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_server_error_with_malformed_body() {
    let client = client_for(serve_once(500, "<html>oops</html>").await);
    let result = safe_api_call(|| client.fetch_products_list()).await;

    assert!(matches!(
      result,
      NetworkResult::ServerError {
        code: 500,
        error_body: None
      }
    ));
  }

  #[tokio::test]
  async fn test_undecodable_success_body_is_unexpected() {
    let client = client_for(serve_once(200, r#"{"not":"a list"}"#).await);
    let result = safe_api_call(|| client.fetch_products_list()).await;

    match result {
      NetworkResult::UnexpectedError { message, .. } => {
        assert!(message.contains("Failed to decode"));
      }
      other => panic!("expected UnexpectedError, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_other_error_keeps_cause() {
    let result: NetworkResult<()> = safe_api_call(|| async { Err(eyre!("boom")) }).await;

    match result {
      NetworkResult::UnexpectedError { message, cause } => {
        assert_eq!(message, "boom");
        assert_eq!(cause.to_string(), "boom");
      }
      other => panic!("expected UnexpectedError, got {:?}", other),
    }
  }

  #[test]
  fn test_convert_error_body_empty_is_none() {
    assert_eq!(convert_error_body(b""), None);
    assert_eq!(convert_error_body(b"  \n"), None);
  }

  #[test]
  fn test_display_uses_server_message() {
    let result: NetworkResult<()> = NetworkResult::ServerError {
      code: 404,
      error_body: Some(ErrorResponse {
        message: Some("not found".to_string()),
        ..Default::default()
      }),
    };
    assert_eq!(result.to_string(), "server error 404: not found");
  }
}

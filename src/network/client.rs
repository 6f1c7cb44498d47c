use async_trait::async_trait;
use color_eyre::{
  eyre::{eyre, WrapErr},
  Result,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::network::api_types::{
  LoginRequest, LoginResponse, ProductDto, SignUpRequest, SignUpResponse,
};

/// A response arrived but its status was outside 2xx.
///
/// The raw body is kept so the result mapper can try to decode a structured
/// error payload from it.
#[derive(Debug, thiserror::Error)]
#[error("server responded with HTTP {status} for {url}")]
pub struct HttpStatusError {
  pub status: u16,
  pub url: String,
  pub body: Vec<u8>,
}

/// Remote catalog and auth endpoints.
#[async_trait]
pub trait QuickMartApi: Send + Sync {
  /// `GET /products`
  async fn fetch_products_list(&self) -> Result<Vec<ProductDto>>;

  /// `POST /auth/login`
  async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

  /// `POST /users`
  async fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<SignUpResponse>;
}

/// QuickMart API client backed by reqwest
#[derive(Clone)]
pub struct QuickMartClient {
  http: reqwest::Client,
  base_url: Url,
}

impl QuickMartClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut base_url = Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.api.base_url, e))?;

    // Url::join replaces the last path segment unless the base ends in '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(config.request_timeout())
      .user_agent(concat!("quickmart/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Failed to build URL for {}: {}", path, e))
  }

  fn post_json(&self, url: Url, body: Vec<u8>) -> reqwest::RequestBuilder {
    self
      .http
      .post(url)
      .header(CONTENT_TYPE, "application/json")
      .body(body)
  }

  /// Send a request and decode a 2xx JSON body.
  ///
  /// Transport errors are wrapped (not stringified) so the original
  /// `reqwest::Error` stays reachable through the report chain.
  async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
    let response = request
      .header(ACCEPT, "application/json")
      .send()
      .await
      .wrap_err("Request failed")?;

    let status = response.status();
    let url = response.url().to_string();

    let body = response
      .bytes()
      .await
      .wrap_err_with(|| format!("Failed to read response body from {}", url))?;

    if !status.is_success() {
      return Err(
        HttpStatusError {
          status: status.as_u16(),
          url,
          body: body.to_vec(),
        }
        .into(),
      );
    }

    serde_json::from_slice(&body).wrap_err_with(|| format!("Failed to decode response from {}", url))
  }
}

#[async_trait]
impl QuickMartApi for QuickMartClient {
  async fn fetch_products_list(&self) -> Result<Vec<ProductDto>> {
    let url = self.endpoint("products")?;
    self.execute(self.http.get(url)).await
  }

  async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
    let url = self.endpoint("auth/login")?;
    let body = serde_json::to_vec(&LoginRequest { username, password })
      .map_err(|e| eyre!("Failed to encode login request: {}", e))?;

    self.execute(self.post_json(url, body)).await
  }

  async fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<SignUpResponse> {
    let url = self.endpoint("users")?;
    let body = serde_json::to_vec(&SignUpRequest {
      email,
      username,
      password,
    })
    .map_err(|e| eyre!("Failed to encode sign-up request: {}", e))?;

    self.execute(self.post_json(url, body)).await
  }
}

#[cfg(test)]
pub(crate) mod test_server {
  //! One-shot HTTP responder for exercising the client without a network.

  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  /// Bind an ephemeral port, answer the first request with `status` and
  /// `body`, then close. Returns the base URL to point the client at.
  pub async fn serve_once(status: u16, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
      "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status,
      body.len(),
      body
    );

    tokio::spawn(async move {
      if let Ok((mut socket, _)) = listener.accept().await {
        let mut buf = vec![0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
      }
    });

    format!("http://{}", addr)
  }

  /// A base URL on a port nothing is listening on.
  pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
  }
}

#[cfg(test)]
mod tests {
  use super::test_server::serve_once;
  use super::*;

  fn client_for(base_url: String) -> QuickMartClient {
    let mut config = Config::default();
    config.api.base_url = base_url;
    config.api.timeout_secs = 5;
    QuickMartClient::new(&config).unwrap()
  }

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let client = client_for("http://localhost:9000/api".to_string());
    assert_eq!(
      client.endpoint("products").unwrap().as_str(),
      "http://localhost:9000/api/products"
    );
  }

  #[tokio::test]
  async fn test_fetch_products_list_returns_expected_data() {
    let body = r#"[
      {
        "id": 1,
        "title": "Sample Product",
        "price": 19.99,
        "category": "Electronics",
        "description": "A great product",
        "image": "https://example.com/image.jpg"
      }
    ]"#;
    let client = client_for(serve_once(200, body).await);

    let products = client.fetch_products_list().await.unwrap();

    assert_eq!(
      products,
      vec![ProductDto {
        id: 1,
        title: "Sample Product".to_string(),
        price: 19.99,
        category: "Electronics".to_string(),
        description: "A great product".to_string(),
        image: "https://example.com/image.jpg".to_string(),
      }]
    );
  }

  #[tokio::test]
  async fn test_non_success_status_keeps_body() {
    let client = client_for(serve_once(503, r#"{"message":"maintenance"}"#).await);

    let err = client.fetch_products_list().await.unwrap_err();
    let status = err.downcast_ref::<HttpStatusError>().unwrap();

    assert_eq!(status.status, 503);
    assert_eq!(status.body, br#"{"message":"maintenance"}"#.to_vec());
  }

  #[tokio::test]
  async fn test_login_decodes_token() {
    let client = client_for(serve_once(200, r#"{"token":"abc.def"}"#).await);

    let response = client.login("mor_2314", "83r5^_").await.unwrap();

    assert_eq!(response.token, "abc.def");
  }

  #[tokio::test]
  async fn test_sign_up_returns_new_id() {
    let client = client_for(serve_once(200, r#"{"id":11}"#).await);

    let response = client.sign_up("john@gmail.com", "johnd", "m38rmF$").await.unwrap();

    assert_eq!(response.id, 11);
  }

  #[tokio::test]
  async fn test_sign_up_conflict_is_status_error() {
    let client = client_for(serve_once(400, r#"{"message":"username taken"}"#).await);

    let err = client.sign_up("john@gmail.com", "johnd", "m38rmF$").await.unwrap_err();

    assert_eq!(err.downcast_ref::<HttpStatusError>().map(|e| e.status), Some(400));
  }
}

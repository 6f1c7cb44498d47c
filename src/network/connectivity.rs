//! Connectivity checks used to pick between the network and the local cache.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// Reports whether the remote API is currently reachable.
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
  async fn is_network_available(&self) -> bool;
}

/// Checks connectivity by opening a TCP connection to the API host.
#[derive(Debug, Clone)]
pub struct TcpReachability {
  host: String,
  port: u16,
  timeout: Duration,
}

impl TcpReachability {
  pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
    Self {
      host: host.into(),
      port,
      timeout,
    }
  }

  /// Check the host and port the given base URL points at.
  pub fn for_url(url: &Url, timeout: Duration) -> Result<Self> {
    let host = url
      .host_str()
      .ok_or_else(|| eyre!("API URL has no host: {}", url))?;
    let port = url
      .port_or_known_default()
      .ok_or_else(|| eyre!("API URL has no port: {}", url))?;

    Ok(Self::new(host, port, timeout))
  }
}

#[async_trait]
impl NetworkMonitor for TcpReachability {
  async fn is_network_available(&self) -> bool {
    let target = (self.host.as_str(), self.port);
    match tokio::time::timeout(self.timeout, TcpStream::connect(target)).await {
      Ok(Ok(_)) => true,
      Ok(Err(e)) => {
        debug!(host = %self.host, port = self.port, error = %e, "Connectivity check failed");
        false
      }
      Err(_) => {
        debug!(host = %self.host, port = self.port, "Connectivity check timed out");
        false
      }
    }
  }
}

/// Connectivity fixed at construction (forced offline mode, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub bool);

#[async_trait]
impl NetworkMonitor for FixedConnectivity {
  async fn is_network_available(&self) -> bool {
    self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::net::TcpListener;

  #[tokio::test]
  async fn test_check_reaches_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let check = TcpReachability::new("127.0.0.1", port, Duration::from_secs(1));
    assert!(check.is_network_available().await);
  }

  #[tokio::test]
  async fn test_check_fails_on_closed_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let check = TcpReachability::new("127.0.0.1", port, Duration::from_secs(1));
    assert!(!check.is_network_available().await);
  }

  #[test]
  fn test_for_url_uses_default_https_port() {
    let url = Url::parse("https://fakestoreapi.com/").unwrap();
    let check = TcpReachability::for_url(&url, Duration::from_millis(100)).unwrap();
    assert_eq!(check.host, "fakestoreapi.com");
    assert_eq!(check.port, 443);
  }
}

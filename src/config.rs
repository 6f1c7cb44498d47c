use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  /// Tracing filter directive (overridden by QUICKMART_LOG)
  pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Whole-request timeout for catalog and login calls
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
  /// How long the connectivity check waits for a TCP handshake
  #[serde(default = "default_connect_timeout_ms")]
  pub connect_timeout_ms: u64,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      connect_timeout_ms: default_connect_timeout_ms(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Directory for the database, the secure key and log files
  pub data_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
  "https://fakestoreapi.com".to_string()
}

fn default_timeout_secs() -> u64 {
  15
}

fn default_connect_timeout_ms() -> u64 {
  1500
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./quickmart.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/quickmart/config.yaml
  ///
  /// Every field has a default, so running without any file is fine.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("quickmart.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("quickmart").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty document deserializes to unit, not to a map
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Directory holding the database, the secure storage key and logs.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.storage.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("quickmart"))
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn connect_check_timeout(&self) -> Duration {
    Duration::from_millis(self.network.connect_timeout_ms)
  }

  /// Get the account password from the environment.
  ///
  /// Checks QUICKMART_PASSWORD.
  pub fn get_password() -> Option<String> {
    std::env::var("QUICKMART_PASSWORD").ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_document_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, "https://fakestoreapi.com");
    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.network.connect_timeout_ms, 1500);
    assert!(config.storage.data_dir.is_none());
  }

  #[test]
  fn test_partial_document_keeps_other_defaults() {
    let config = Config::parse("api:\n  base_url: http://localhost:9000\n").unwrap();
    assert_eq!(config.api.base_url, "http://localhost:9000");
    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.connect_check_timeout(), Duration::from_millis(1500));
  }

  #[test]
  fn test_explicit_data_dir_wins() {
    let config = Config::parse("storage:\n  data_dir: /tmp/qm\n").unwrap();
    assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/qm"));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }
}

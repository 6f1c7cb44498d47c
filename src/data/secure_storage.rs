//! Encrypted key/value storage for credentials and session tokens.
//!
//! Values are sealed with AES-256-GCM under a device key kept next to the
//! database. Each stored value is `hex(nonce || ciphertext)`, and row keys
//! are SHA-256 digests so key names never hit the disk in clear.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use color_eyre::Result;
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::db::PrefsDao;

const KEY_FILE: &str = "secure.key";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum SecureStorageError {
  #[error("failed to access key file {path}")]
  KeyFile {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("key file {0} is corrupt")]
  CorruptKey(String),
  #[error("encryption failed")]
  Encrypt,
  #[error("stored value is not valid hex")]
  Encoding,
  #[error("stored value is shorter than a nonce")]
  Truncated,
  #[error("decryption failed")]
  Decrypt,
  #[error("decrypted value is not valid UTF-8")]
  Utf8,
}

#[derive(Clone)]
pub struct SecureStorage {
  cipher: Aes256Gcm,
  prefs: PrefsDao,
}

impl SecureStorage {
  /// Open storage using the device key in `data_dir`, creating the key on
  /// first use.
  pub fn open(data_dir: &Path, prefs: PrefsDao) -> Result<Self> {
    let key = load_or_create_key(&data_dir.join(KEY_FILE))?;
    Ok(Self::with_key(&key, prefs))
  }

  pub fn with_key(key: &[u8; KEY_LEN], prefs: PrefsDao) -> Self {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    Self { cipher, prefs }
  }

  pub fn save(&self, key: &str, value: &str) -> Result<()> {
    let sealed = self.encrypt(value)?;
    self.prefs.put(&hash_key(key), &sealed)
  }

  /// Read a value. A value that cannot be decrypted reads as absent.
  pub fn get(&self, key: &str) -> Result<Option<String>> {
    let Some(sealed) = self.prefs.get(&hash_key(key))? else {
      return Ok(None);
    };

    match self.decrypt(&sealed) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        warn!(key, error = %e, "Discarding unreadable secure value");
        Ok(None)
      }
    }
  }

  pub fn remove(&self, key: &str) -> Result<()> {
    self.prefs.delete(&hash_key(key))
  }

  fn encrypt(&self, plain_text: &str) -> std::result::Result<String, SecureStorageError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let cipher_text = self
      .cipher
      .encrypt(&nonce, plain_text.as_bytes())
      .map_err(|_| SecureStorageError::Encrypt)?;

    let mut combined = nonce.to_vec();
    combined.extend_from_slice(&cipher_text);
    Ok(hex::encode(combined))
  }

  fn decrypt(&self, sealed: &str) -> std::result::Result<String, SecureStorageError> {
    let bytes = hex::decode(sealed).map_err(|_| SecureStorageError::Encoding)?;
    if bytes.len() < NONCE_LEN {
      return Err(SecureStorageError::Truncated);
    }

    let (nonce, cipher_text) = bytes.split_at(NONCE_LEN);
    let plain = self
      .cipher
      .decrypt(Nonce::from_slice(nonce), cipher_text)
      .map_err(|_| SecureStorageError::Decrypt)?;

    String::from_utf8(plain).map_err(|_| SecureStorageError::Utf8)
  }
}

fn hash_key(key: &str) -> String {
  hex::encode(Sha256::digest(key.as_bytes()))
}

fn load_or_create_key(path: &Path) -> std::result::Result<[u8; KEY_LEN], SecureStorageError> {
  let key_file_error = |source| SecureStorageError::KeyFile {
    path: path.display().to_string(),
    source,
  };

  match std::fs::read_to_string(path) {
    Ok(contents) => {
      let bytes = hex::decode(contents.trim())
        .map_err(|_| SecureStorageError::CorruptKey(path.display().to_string()))?;
      bytes
        .try_into()
        .map_err(|_| SecureStorageError::CorruptKey(path.display().to_string()))
    }
    Err(e) if e.kind() == ErrorKind::NotFound => {
      let key = Aes256Gcm::generate_key(OsRng);
      let mut bytes = [0u8; KEY_LEN];
      bytes.copy_from_slice(&key);

      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(key_file_error)?;
      }
      write_private(path, hex::encode(bytes).as_bytes()).map_err(key_file_error)?;

      info!(path = %path.display(), "Created secure storage key");
      Ok(bytes)
    }
    Err(e) => Err(key_file_error(e)),
  }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  use std::os::unix::fs::OpenOptionsExt;

  let mut file = std::fs::OpenOptions::new()
    .write(true)
    .create_new(true)
    .mode(0o600)
    .open(path)?;
  file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  let mut file = std::fs::OpenOptions::new()
    .write(true)
    .create_new(true)
    .open(path)?;
  file.write_all(contents)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;

  fn storage_with_key(db: &Database, byte: u8) -> SecureStorage {
    SecureStorage::with_key(&[byte; KEY_LEN], db.prefs())
  }

  #[test]
  fn test_save_and_get_round_trip() {
    let db = Database::open_in_memory().unwrap();
    let storage = storage_with_key(&db, 7);

    storage.save("email", "user@example.com").unwrap();

    assert_eq!(
      storage.get("email").unwrap(),
      Some("user@example.com".to_string())
    );
    assert_eq!(storage.get("password").unwrap(), None);
  }

  #[test]
  fn test_value_is_encrypted_at_rest() {
    let db = Database::open_in_memory().unwrap();
    let storage = storage_with_key(&db, 7);

    storage.save("password", "hunter2").unwrap();

    assert_eq!(db.prefs().get("password").unwrap(), None);
    let sealed = db.prefs().get(&hash_key("password")).unwrap().unwrap();
    assert!(!sealed.contains(&hex::encode("hunter2")));
    assert!(sealed.len() > NONCE_LEN * 2);
  }

  #[test]
  fn test_same_value_encrypts_differently() {
    let db = Database::open_in_memory().unwrap();
    let storage = storage_with_key(&db, 7);

    assert_ne!(
      storage.encrypt("same").unwrap(),
      storage.encrypt("same").unwrap()
    );
  }

  #[test]
  fn test_other_key_cannot_read() {
    let db = Database::open_in_memory().unwrap();
    storage_with_key(&db, 1).save("token", "secret").unwrap();

    assert_eq!(storage_with_key(&db, 2).get("token").unwrap(), None);
  }

  #[test]
  fn test_remove() {
    let db = Database::open_in_memory().unwrap();
    let storage = storage_with_key(&db, 7);

    storage.save("token", "secret").unwrap();
    storage.remove("token").unwrap();

    assert_eq!(storage.get("token").unwrap(), None);
  }

  #[test]
  fn test_key_file_is_created_once_and_reused() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();

    SecureStorage::open(dir.path(), db.prefs())
      .unwrap()
      .save("email", "a@b.c")
      .unwrap();
    let reopened = SecureStorage::open(dir.path(), db.prefs()).unwrap();

    assert!(dir.path().join(KEY_FILE).exists());
    assert_eq!(reopened.get("email").unwrap(), Some("a@b.c".to_string()));
  }

  #[test]
  fn test_corrupt_key_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(KEY_FILE), "not hex").unwrap();
    let db = Database::open_in_memory().unwrap();

    assert!(SecureStorage::open(dir.path(), db.prefs()).is_err());
  }
}

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::Database;

/// Raw rows behind `SecureStorage`. Values arrive already encrypted.
#[derive(Clone)]
pub struct PrefsDao {
  db: Database,
}

impl PrefsDao {
  pub(super) fn new(db: Database) -> Self {
    Self { db }
  }

  pub fn put(&self, key_hash: &str, value: &str) -> Result<()> {
    self.db.with_conn(|conn| {
      conn
        .execute(
          "INSERT OR REPLACE INTO secure_prefs (key_hash, value, updated_at)
           VALUES (?, ?, datetime('now'))",
          params![key_hash, value],
        )
        .map_err(|e| eyre!("Failed to store preference: {}", e))?;
      Ok(())
    })
  }

  pub fn get(&self, key_hash: &str) -> Result<Option<String>> {
    self.db.with_conn(|conn| {
      conn
        .query_row(
          "SELECT value FROM secure_prefs WHERE key_hash = ?",
          params![key_hash],
          |row| row.get(0),
        )
        .optional()
        .map_err(|e| eyre!("Failed to query preference: {}", e))
    })
  }

  pub fn delete(&self, key_hash: &str) -> Result<()> {
    self.db.with_conn(|conn| {
      conn
        .execute(
          "DELETE FROM secure_prefs WHERE key_hash = ?",
          params![key_hash],
        )
        .map_err(|e| eyre!("Failed to delete preference: {}", e))?;
      Ok(())
    })
  }
}

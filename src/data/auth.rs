use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::sync::Arc;
use tracing::{error, info};

use crate::data::secure_storage::SecureStorage;
use crate::data::types::{Account, Session};
use crate::network::{safe_api_call, NetworkResult, QuickMartApi};

const KEY_EMAIL: &str = "email";
const KEY_USERNAME: &str = "username";
const KEY_PASSWORD: &str = "password";
const KEY_TOKEN: &str = "token";
const KEY_SIGNED_IN_AT: &str = "signed_in_at";

/// Sign-in against the API with credentials remembered in secure storage.
#[derive(Clone)]
pub struct AuthRepository {
  api: Arc<dyn QuickMartApi>,
  storage: SecureStorage,
}

impl AuthRepository {
  pub fn new(api: Arc<dyn QuickMartApi>, storage: SecureStorage) -> Self {
    Self { api, storage }
  }

  /// Log in and, on success, remember the credentials and the session token.
  pub async fn sign_in(&self, username: &str, password: &str) -> NetworkResult<Session> {
    let outcome = safe_api_call(|| self.api.login(username, password))
      .await
      .map(|response| Session {
        username: username.to_string(),
        token: response.token,
        signed_in_at: Utc::now(),
      });

    if let NetworkResult::Success(session) = &outcome {
      if let Err(e) = self.save_session(session, password) {
        error!(error = ?e, "Failed to persist session");
        return NetworkResult::UnexpectedError {
          message: format!("Signed in but could not store the session: {}", e),
          cause: Arc::new(e),
        };
      }
      info!(username, "Signed in");
    }

    outcome
  }

  /// Register a new user. On success the email, username and password are
  /// remembered so a later `sign_in` needs no password prompt.
  pub async fn sign_up(&self, email: &str, username: &str, password: &str) -> NetworkResult<Account> {
    let outcome = safe_api_call(|| self.api.sign_up(email, username, password))
      .await
      .map(|response| Account {
        id: response.id,
        username: username.to_string(),
        email: email.to_string(),
      });

    if let NetworkResult::Success(account) = &outcome {
      if let Err(e) = self.save_credentials(account, password) {
        error!(error = ?e, "Failed to persist new account");
        return NetworkResult::UnexpectedError {
          message: format!("Signed up but could not store the credentials: {}", e),
          cause: Arc::new(e),
        };
      }
      info!(username, id = account.id, "Signed up");
    }

    outcome
  }

  fn save_credentials(&self, account: &Account, password: &str) -> Result<()> {
    self.storage.save(KEY_EMAIL, &account.email)?;
    self.storage.save(KEY_USERNAME, &account.username)?;
    self.storage.save(KEY_PASSWORD, password)
  }

  fn save_session(&self, session: &Session, password: &str) -> Result<()> {
    self.storage.save(KEY_USERNAME, &session.username)?;
    self.storage.save(KEY_PASSWORD, password)?;
    self.storage.save(KEY_TOKEN, &session.token)?;
    self
      .storage
      .save(KEY_SIGNED_IN_AT, &session.signed_in_at.to_rfc3339())
  }

  /// Username and password from the last successful sign-in.
  pub fn saved_credentials(&self) -> Result<(Option<String>, Option<String>)> {
    let username = self.storage.get(KEY_USERNAME)?;
    let password = self.storage.get(KEY_PASSWORD)?;
    Ok((username, password))
  }

  pub fn current_session(&self) -> Result<Option<Session>> {
    let (Some(username), Some(token)) = (
      self.storage.get(KEY_USERNAME)?,
      self.storage.get(KEY_TOKEN)?,
    ) else {
      return Ok(None);
    };

    let signed_in_at = self
      .storage
      .get(KEY_SIGNED_IN_AT)?
      .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
      .map(|dt| dt.with_timezone(&Utc))
      .unwrap_or_else(Utc::now);

    Ok(Some(Session {
      username,
      token,
      signed_in_at,
    }))
  }

  /// Drop the session token; saved credentials stay for the next sign-in.
  pub fn sign_out(&self) -> Result<()> {
    self.storage.remove(KEY_TOKEN)?;
    self.storage.remove(KEY_SIGNED_IN_AT)?;
    info!("Signed out");
    Ok(())
  }

  /// Sign out and forget the stored credentials.
  pub fn forget_user(&self) -> Result<()> {
    self.sign_out()?;
    self.storage.remove(KEY_EMAIL)?;
    self.storage.remove(KEY_USERNAME)?;
    self.storage.remove(KEY_PASSWORD)
  }
}

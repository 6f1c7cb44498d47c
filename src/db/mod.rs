//! Local SQLite store for the product cache, the cart and secure preferences.
//!
//! Every committed write bumps a per-table change counter, which is what
//! lets `ProductsDao::cache_products` and `CartDao::get_all_cart_items`
//! behave as continuous queries.

pub mod cart;
pub mod prefs;
pub mod products;
pub mod schema;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use futures::future::ready;
use futures::stream::{BoxStream, StreamExt};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

pub use cart::CartDao;
pub use prefs::PrefsDao;
pub use products::ProductsDao;

/// Tables whose changes can be observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
  Products,
  Cart,
}

struct Inner {
  conn: Mutex<Connection>,
  products_version: watch::Sender<u64>,
  cart_version: watch::Sender<u64>,
}

/// Shared database handle
#[derive(Clone)]
pub struct Database {
  inner: Arc<Inner>,
}

impl Database {
  /// Open or create the database file at `path`
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    debug!(path = %path.display(), "Opened database");
    Self::from_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let (products_version, _) = watch::channel(0);
    let (cart_version, _) = watch::channel(0);

    let db = Self {
      inner: Arc::new(Inner {
        conn: Mutex::new(conn),
        products_version,
        cart_version,
      }),
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self.with_conn(|conn| {
      conn
        .execute_batch(schema::SCHEMA)
        .map_err(|e| eyre!("Failed to run migrations: {}", e))
    })
  }

  pub fn products(&self) -> ProductsDao {
    ProductsDao::new(self.clone())
  }

  pub fn cart(&self) -> CartDao {
    CartDao::new(self.clone())
  }

  pub fn prefs(&self) -> PrefsDao {
    PrefsDao::new(self.clone())
  }

  /// Run `f` with exclusive access to the connection.
  pub(crate) fn with_conn<R>(&self, f: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
    let mut conn = self
      .inner
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    f(&mut conn)
  }

  fn version(&self, table: Table) -> &watch::Sender<u64> {
    match table {
      Table::Products => &self.inner.products_version,
      Table::Cart => &self.inner.cart_version,
    }
  }

  /// Record that `table` changed. Call after the write is committed.
  pub(crate) fn notify(&self, table: Table) {
    self.version(table).send_modify(|v| *v = v.wrapping_add(1));
  }

  /// Stream the result of `query` now and again after every change to `table`.
  ///
  /// Several writes between two polls collapse into one snapshot. A failing
  /// query is logged and skipped rather than ending the stream.
  pub(crate) fn observe<T, F>(&self, table: Table, query: F) -> BoxStream<'static, Vec<T>>
  where
    T: Send + 'static,
    F: Fn(&Database) -> Result<Vec<T>> + Send + 'static,
  {
    let db = self.clone();
    WatchStream::new(self.version(table).subscribe())
      .filter_map(move |_| {
        let snapshot = match query(&db) {
          Ok(rows) => Some(rows),
          Err(e) => {
            warn!(?table, error = %e, "Failed to read snapshot");
            None
          }
        };
        ready(snapshot)
      })
      .boxed()
  }
}

/// Parse a datetime string from SQLite format.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

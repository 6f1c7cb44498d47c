//! Background driver for the streams the repositories return.
//!
//! A `Query<T>` owns a factory for a stream, runs the stream on a tokio task
//! and hands items to the render loop through a channel, so the UI thread
//! never waits on the network or the database.
//!
//! # Example
//!
//! ```ignore
//! let repo = products_repository.clone();
//! let mut query = Query::new(move || repo.fetch_products());
//!
//! // Start the stream
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // New item arrived, trigger re-render
//! }
//!
//! // In render
//! match query.latest() {
//!     Some(NetworkResult::Loading) | None => render_spinner(),
//!     Some(NetworkResult::Success(data)) => render_data(data),
//!     Some(other) => render_error(other),
//! }
//! ```

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// A factory function that creates the stream to drive
type SourceFn<T> = Box<dyn Fn() -> BoxStream<'static, T> + Send + Sync>;

pub struct Query<T> {
  latest: Option<T>,
  source: SourceFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<T>>,
  task: Option<AbortHandle>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given stream factory.
  ///
  /// The factory is called each time `fetch()` or `refetch()` starts a run.
  pub fn new<F>(source: F) -> Self
  where
    F: Fn() -> BoxStream<'static, T> + Send + Sync + 'static,
  {
    Self {
      latest: None,
      source: Box::new(source),
      receiver: None,
      task: None,
    }
  }

  /// Most recent item, kept across runs until a new one arrives.
  pub fn latest(&self) -> Option<&T> {
    self.latest.as_ref()
  }

  /// Whether a stream is still being driven.
  pub fn is_running(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start the stream if it is not already running.
  pub fn fetch(&mut self) {
    if self.is_running() {
      return;
    }
    self.start();
  }

  /// Cancel the running stream, if any, and start a new one.
  pub fn refetch(&mut self) {
    self.cancel();
    self.start();
  }

  /// Stop the running stream. Dropping it cancels whatever it was awaiting.
  pub fn cancel(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
    self.receiver = None;
  }

  /// Take every item that arrived since the last poll.
  ///
  /// Returns `true` if anything changed. Call this in the tick handler.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };

    let mut changed = false;
    loop {
      match receiver.try_recv() {
        Ok(item) => {
          self.latest = Some(item);
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => break,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          // Stream finished
          self.receiver = None;
          self.task = None;
          break;
        }
      }
    }
    changed
  }

  fn start(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut stream = (self.source)();

    let handle = tokio::spawn(async move {
      while let Some(item) = stream.next().await {
        // Receiver dropped means nobody is listening anymore
        if tx.send(item).is_err() {
          break;
        }
      }
    });

    self.receiver = Some(rx);
    self.task = Some(handle.abort_handle());
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("latest", &self.latest)
      .field("running", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}

use tokio::sync::mpsc;

/// One-line feedback for a view.
///
/// Store writes triggered by keys run on the blocking pool; their outcome
/// message arrives here and is picked up on the next tick.
#[derive(Debug)]
pub struct Notices {
  tx: mpsc::UnboundedSender<String>,
  rx: mpsc::UnboundedReceiver<String>,
  current: Option<String>,
}

impl Notices {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      tx,
      rx,
      current: None,
    }
  }

  /// Run `job` off the render loop. Whatever it returns becomes the notice.
  pub fn run_blocking<F>(&self, job: F)
  where
    F: FnOnce() -> String + Send + 'static,
  {
    let tx = self.tx.clone();
    tokio::task::spawn_blocking(move || {
      // View gone, nobody to tell
      let _ = tx.send(job());
    });
  }

  /// Pick up finished jobs. Returns `true` if the notice changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(message) = self.rx.try_recv() {
      self.current = Some(message);
      changed = true;
    }
    changed
  }

  pub fn current(&self) -> Option<&str> {
    self.current.as_deref()
  }

  pub fn set(&mut self, message: impl Into<String>) {
    self.current = Some(message.into());
  }

  pub fn clear(&mut self) {
    self.current = None;
  }
}

impl Default for Notices {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
pub(crate) async fn settle(notices: &mut Notices) {
  for _ in 0..200 {
    if notices.poll() {
      return;
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  }
  panic!("no notice arrived");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_blocking_job_result_becomes_notice() {
    let mut notices = Notices::new();
    assert!(!notices.poll());

    notices.run_blocking(|| "Added Jacket (x1)".to_string());
    settle(&mut notices).await;

    assert_eq!(notices.current(), Some("Added Jacket (x1)"));
  }

  #[tokio::test]
  async fn test_latest_job_wins() {
    let mut notices = Notices::new();
    notices.set("Working");

    notices.run_blocking(|| "first".to_string());
    settle(&mut notices).await;
    notices.run_blocking(|| "second".to_string());
    settle(&mut notices).await;

    assert_eq!(notices.current(), Some("second"));
    notices.clear();
    assert_eq!(notices.current(), None);
  }
}

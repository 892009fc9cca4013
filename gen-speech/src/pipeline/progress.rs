//! Observable conversion status.

use tokio::sync::watch;

/// Initial status before any step has run.
pub const RECEIVED: &str = "Conversion request received";

/// Write side of the status string, owned by the conversion.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<String>,
}

/// Read-only view of the status string; cheap to clone and hand out.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    rx: watch::Receiver<String>,
}

impl ProgressReporter {
    pub fn new() -> (Self, ProgressHandle) {
        let (tx, rx) = watch::channel(RECEIVED.to_string());
        (Self { tx }, ProgressHandle { rx })
    }

    pub fn set(&self, message: impl Into<String>) {
        // send_replace succeeds with no receivers
        self.tx.send_replace(message.into());
    }

    #[cfg(test)]
    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> ProgressHandle {
        ProgressHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl ProgressHandle {
    /// The status right now.
    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    /// Wait for the next status change. Returns `None` once the conversion is gone.
    pub async fn changed(&mut self) -> Option<String> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

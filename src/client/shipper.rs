//! Background shipping of log entries
//!
//! Entries are queued on an unbounded channel and posted one at a time by a
//! dedicated task, so the producer (usually a tracing layer) never waits on
//! the network.

use super::LogClient;
use crate::models::NewLogEntry;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub(crate) enum ShipperMessage {
    Entry(NewLogEntry),
    Flush(oneshot::Sender<()>),
}

/// Handle to the shipper task
///
/// Cloning is cheap. The task exits once every handle is dropped and the
/// queue is drained.
#[derive(Debug, Clone)]
pub struct AsyncShipper {
    sender: mpsc::UnboundedSender<ShipperMessage>,
}

impl AsyncShipper {
    /// Spawn the shipper on the current tokio runtime
    pub fn spawn(client: Arc<LogClient>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(shipper_task(client, rx));
        (Self { sender: tx }, handle)
    }

    /// Handle wired to a bare channel, no task attached
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<ShipperMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }

    /// Queue an entry (non-blocking)
    pub fn ship(&self, entry: NewLogEntry) {
        // Closed channel means the runtime is gone; nothing left to report to
        let _ = self.sender.send(ShipperMessage::Entry(entry));
    }

    /// Wait until everything queued before this call has been attempted
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(ShipperMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn shipper_task(client: Arc<LogClient>, mut rx: mpsc::UnboundedReceiver<ShipperMessage>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            ShipperMessage::Entry(entry) => {
                // stderr, not tracing: a failing shipper must not feed itself
                if let Err(e) = client.send(&entry).await {
                    eprintln!("log-aggregator client: failed to ship log entry: {}", e);
                }
            }
            ShipperMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

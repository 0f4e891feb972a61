pub mod telegram;

pub use telegram::TelegramNotifier;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::AppError;

/// Outbound delivery of rendered alert text.
pub trait Notifier: Send + Sync + 'static {
    fn send(&self, text: &str) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Deliver once, logging any failure. Never retries.
pub async fn deliver<N: Notifier>(notifier: &N, text: &str) -> bool {
    match notifier.send(text).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Alert delivery failed");
            false
        }
    }
}

/// Producer side of the alert queue. Never blocks the caller.
#[derive(Debug, Clone)]
pub struct AlertSender {
    tx: mpsc::Sender<String>,
}

impl AlertSender {
    /// Queue a message for delivery. Returns false if it had to be dropped.
    pub fn emit(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Alert queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Alert dispatcher stopped, dropping message");
                false
            }
        }
    }
}

pub fn alert_channel(capacity: usize) -> (AlertSender, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity);
    (AlertSender { tx }, rx)
}

/// Drain the alert queue until every sender is dropped.
pub async fn run_dispatcher<N: Notifier>(mut rx: mpsc::Receiver<String>, notifier: Arc<N>) {
    let mut delivered = 0u64;
    let mut failed = 0u64;
    while let Some(text) = rx.recv().await {
        if deliver(notifier.as_ref(), &text).await {
            delivered += 1;
        } else {
            failed += 1;
        }
    }
    tracing::info!(delivered, failed, "Alert dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Notifier for Recorder {
        async fn send(&self, text: &str) -> Result<(), AppError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(AppError::Notify {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_in_order_then_stops() {
        let notifier = Arc::new(Recorder::default());
        let (sender, rx) = alert_channel(8);
        assert!(sender.emit("one".to_string()));
        assert!(sender.emit("two".to_string()));
        drop(sender);

        run_dispatcher(rx, notifier.clone()).await;
        assert_eq!(*notifier.sent.lock().unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn failed_delivery_is_not_retried() {
        let notifier = Recorder {
            fail: true,
            ..Default::default()
        };
        assert!(!deliver(&notifier, "x").await);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (sender, _rx) = alert_channel(1);
        assert!(sender.emit("a".to_string()));
        assert!(!sender.emit("b".to_string()));
    }
}

//! Mock notifiers for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crew_core::{Error, Notifier, Result};

use crate::dispatcher::Notification;

/// Records every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    signal: Notify,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` notifications were recorded.
    pub async fn wait_for(&self, count: usize) {
        loop {
            // Register for the wakeup before checking, so a notify between
            // the check and the await is not lost.
            let notified = self.signal.notified();
            if self.sent.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Notification {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        self.signal.notify_waiters();
        Ok(())
    }
}

/// Fails every delivery. For exercising the swallow-errors contract.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<()> {
        Err(Error::Notification(format!("refusing to deliver to {}", to)))
    }
}

//! Fire-and-forget notification dispatch.
//!
//! Lifecycle transitions hand notifications to a channel and move on; a
//! spawned consumer task performs the actual delivery. Delivery failures are
//! logged and dropped — they never propagate into business state, which has
//! already committed by the time the hand-off happens. Duplicate sends are
//! acceptable; exactly-once is not promised.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crew_core::Notifier;

/// One outbound notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Cheap, cloneable hand-off to the dispatcher task.
///
/// A disabled handle (no consumer) drops everything silently — useful for
/// tests and for running without SMTP credentials.
#[derive(Clone)]
pub struct NotifyHandle {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl NotifyHandle {
    /// A handle that drops all notifications.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue a notification and return immediately.
    ///
    /// Never blocks and never fails: a closed or absent channel means the
    /// notification is dropped, by design.
    pub fn send(&self, to: &str, subject: &str, body: &str) {
        let Some(tx) = &self.tx else {
            debug!(
                subsystem = "notify",
                component = "dispatcher",
                recipient = to,
                "Notification dispatch disabled, dropping"
            );
            return;
        };

        let notification = Notification {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        if tx.send(notification).is_err() {
            warn!(
                subsystem = "notify",
                component = "dispatcher",
                recipient = to,
                "Dispatcher task gone, dropping notification"
            );
        }
    }
}

/// Spawn the consumer task and return the producer handle.
///
/// The task runs until every `NotifyHandle` clone is dropped.
pub fn spawn_dispatcher(notifier: Arc<dyn Notifier>) -> NotifyHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

    tokio::spawn(async move {
        while let Some(n) = rx.recv().await {
            match notifier.send(&n.to, &n.subject, &n.body).await {
                Ok(()) => debug!(
                    subsystem = "notify",
                    component = "dispatcher",
                    recipient = %n.to,
                    "Notification delivered"
                ),
                Err(e) => warn!(
                    subsystem = "notify",
                    component = "dispatcher",
                    recipient = %n.to,
                    error = %e,
                    "Notification delivery failed, dropping"
                ),
            }
        }
        debug!(
            subsystem = "notify",
            component = "dispatcher",
            "All handles dropped, dispatcher stopping"
        );
    });

    NotifyHandle { tx: Some(tx) }
}

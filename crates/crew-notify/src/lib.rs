//! # crew-notify
//!
//! Outbound email notification for crewdispatch.
//!
//! This crate provides:
//! - An SMTP [`Notifier`] implementation (lettre, STARTTLS)
//! - The fire-and-forget [`NotifyHandle`] / dispatcher task that decouples
//!   lifecycle transitions from delivery
//! - Mock notifiers for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crew_notify::{spawn_dispatcher, SmtpConfig, SmtpNotifier};
//!
//! let notifier = Arc::new(SmtpNotifier::new(SmtpConfig::from_env()?)?);
//! let notify = spawn_dispatcher(notifier);
//!
//! // Returns immediately; delivery happens on the dispatcher task.
//! notify.send("crew@example.com", "New job: fix pump", "Description: ...");
//! ```

pub mod dispatcher;
pub mod email;
pub mod mock;

pub use dispatcher::{spawn_dispatcher, Notification, NotifyHandle};
pub use email::{SmtpConfig, SmtpNotifier};
pub use mock::{FailingNotifier, RecordingNotifier};

// Re-export the trait implementations target
pub use crew_core::Notifier;

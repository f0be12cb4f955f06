//! # Notifications
//!
//! Outbound email is best-effort and must never hold up a request or a webhook. Callers hand messages to a
//! [`NotificationDispatcher`], which pushes them onto a bounded queue without waiting. A single
//! [`NotificationWorker`] drains the queue and delivers each message through an [`EmailSender`], retrying transient
//! failures a few times before giving up on that message.
//!
//! [`OrderNotifier`] knows which messages belong to which order event, and who receives them.
//!
//! [`EmailSender`]: crate::traits::EmailSender
mod dispatcher;
mod messages;
mod notifier;
mod senders;

pub use dispatcher::{NotificationDispatcher, NotificationWorker, RetryPolicy};
pub use messages::Notification;
pub use notifier::OrderNotifier;
pub use senders::LogOnlySender;

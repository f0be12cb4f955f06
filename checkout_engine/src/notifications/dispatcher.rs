//! Bounded, fire-and-forget notification queue with a single delivery worker.
use std::time::Duration;

use log::*;
use tokio::sync::{mpsc, mpsc::error::TrySendError};

use crate::{notifications::Notification, traits::EmailSender};

/// How hard the worker tries before it gives up on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// The delay before the first retry. It doubles on every subsequent retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff: Duration::from_millis(500) }
    }
}

/// Owns the receiving end of the notification queue and delivers messages one at a time.
pub struct NotificationWorker<S: EmailSender> {
    listener: mpsc::Receiver<Notification>,
    sender: mpsc::Sender<Notification>,
    email: S,
    retry: RetryPolicy,
}

impl<S: EmailSender> NotificationWorker<S> {
    pub fn new(buffer_size: usize, email: S, retry: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, email, retry }
    }

    /// A handle for enqueuing messages. Handles are cheap to clone.
    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(self.sender.clone())
    }

    /// Runs until every [`NotificationDispatcher`] has been dropped and the queue is empty.
    pub async fn run(mut self) {
        debug!("📬️ Starting notification worker");
        // drop the internal sender so that the worker shuts down once the last dispatcher is gone
        drop(self.sender);
        while let Some(notification) = self.listener.recv().await {
            deliver(&self.email, &self.retry, notification).await;
        }
        debug!("📬️ Notification worker has shut down");
    }
}

async fn deliver<S: EmailSender>(email: &S, retry: &RetryPolicy, notification: Notification) {
    let mut delay = retry.backoff;
    let mut attempt = 0;
    loop {
        match email.send(&notification).await {
            Ok(()) => {
                debug!("📬️ Sent \"{}\" to {}", notification.subject, notification.recipient);
                return;
            },
            Err(e) if e.is_transient() && attempt < retry.max_retries => {
                attempt += 1;
                debug!(
                    "📬️ Attempt {attempt} to send \"{}\" to {} failed: {e}. Retrying in {}ms",
                    notification.subject,
                    notification.recipient,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            },
            Err(e) => {
                warn!("📬️ Giving up on \"{}\" to {}: {e}", notification.subject, notification.recipient);
                return;
            },
        }
    }
}

/// The producer side of the notification queue.
///
/// Enqueuing never waits. If the queue is full, the message is dropped and the fact is logged.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender }
    }

    /// Queues the message for delivery. Returns `false` if it was dropped.
    pub fn enqueue(&self, notification: Notification) -> bool {
        match self.sender.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                warn!("📬️ Notification queue is full. Dropping \"{}\" to {}", n.subject, n.recipient);
                false
            },
            Err(TrySendError::Closed(n)) => {
                error!("📬️ Notification worker is not running. Dropping \"{}\" to {}", n.subject, n.recipient);
                false
            },
        }
    }
}

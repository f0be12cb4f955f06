use std::future::Future;

use thiserror::Error;

use crate::notifications::Notification;

#[derive(Debug, Clone, Error)]
pub enum EmailError {
    /// The provider could not be reached or asked us to slow down. Worth another try.
    #[error("Transient email delivery failure: {0}")]
    Transient(String),
    /// The provider rejected the message. Retrying will not help.
    #[error("Email rejected: {0}")]
    Permanent(String),
}

impl EmailError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EmailError::Transient(_))
    }
}

/// Delivers a single notification through an email provider.
///
/// Implementations are driven from a background worker task, so the returned future must be `Send`.
pub trait EmailSender: Send + Sync + 'static {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<(), EmailError>> + Send;
}

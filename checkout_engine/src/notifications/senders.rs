use log::*;

use crate::{
    notifications::Notification,
    traits::{EmailError, EmailSender},
};

/// Writes notifications to the log instead of sending them. Used when no email provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LogOnlySender;

impl EmailSender for LogOnlySender {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        info!("📬️ (not sent) To: {} Subject: {}", notification.recipient, notification.subject);
        trace!("📬️ (not sent) Body: {}", notification.body);
        Ok(())
    }
}

use log::*;

use super::messages;
use crate::{db_types::Order, notifications::NotificationDispatcher};

/// Maps order lifecycle events to customer and admin emails.
///
/// Admin copies are only sent when an admin address has been configured. A notifier without a dispatcher is silent.
#[derive(Clone, Debug, Default)]
pub struct OrderNotifier {
    dispatcher: Option<NotificationDispatcher>,
    admin_email: Option<String>,
}

impl OrderNotifier {
    pub fn new(dispatcher: NotificationDispatcher, admin_email: Option<String>) -> Self {
        let admin_email = admin_email.filter(|s| !s.trim().is_empty());
        if admin_email.is_none() {
            info!("📬️ No admin email address is configured. Admin notifications are disabled.");
        }
        Self { dispatcher: Some(dispatcher), admin_email }
    }

    /// A notifier that drops every message. Useful when email is not wanted at all.
    pub fn silent() -> Self {
        Self::default()
    }

    fn send(&self, build: impl FnOnce() -> messages::Notification) {
        if let Some(d) = &self.dispatcher {
            d.enqueue(build());
        }
    }

    fn send_admin(&self, build: impl FnOnce(&str) -> messages::Notification) {
        if let (Some(d), Some(admin)) = (&self.dispatcher, &self.admin_email) {
            d.enqueue(build(admin));
        }
    }

    pub fn order_created(&self, order: &Order) {
        trace!("📬️ Queueing order confirmation for {}", order.id);
        self.send(|| messages::order_received(order));
        self.send_admin(|admin| messages::order_received_admin(order, admin));
    }

    pub fn payment_succeeded(&self, order: &Order) {
        trace!("📬️ Queueing payment confirmation for {}", order.id);
        self.send(|| messages::payment_succeeded(order));
        self.send_admin(|admin| messages::payment_succeeded_admin(order, admin));
    }

    pub fn payment_failed(&self, order: &Order) {
        trace!("📬️ Queueing payment failure notice for {}", order.id);
        self.send(|| messages::payment_failed(order));
        self.send_admin(|admin| messages::payment_failed_admin(order, admin));
    }

    pub fn order_shipped(&self, order: &Order) {
        trace!("📬️ Queueing shipment notice for {}", order.id);
        self.send(|| messages::order_shipped(order));
    }
}

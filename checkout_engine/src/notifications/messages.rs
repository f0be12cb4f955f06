use std::fmt::Write;

use crate::db_types::Order;

/// A single outbound email. The body is HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub recipient_name: Option<String>,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new<R: Into<String>, S: Into<String>, B: Into<String>>(recipient: R, subject: S, body: B) -> Self {
        Self { recipient: recipient.into(), recipient_name: None, subject: subject.into(), body: body.into() }
    }

    pub fn with_recipient_name<S: Into<String>>(mut self, name: S) -> Self {
        self.recipient_name = Some(name.into());
        self
    }
}

fn item_table(order: &Order) -> String {
    let mut rows = String::new();
    for item in &order.items {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            item.product_name,
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    format!(
        "<table><tr><th>Item</th><th>Qty</th><th>Price</th><th>Total</th></tr>{rows}</table><p>Subtotal: \
         {}<br/>Delivery ({}): {}<br/><strong>Total: {}</strong></p>",
        order.subtotal, order.delivery_class, order.delivery_fee, order.total_price
    )
}

pub(crate) fn order_received(order: &Order) -> Notification {
    let body = format!(
        "<h2>Thank you for your order, {}!</h2><p>We have received order <b>{}</b> and will start preparing it as soon \
         as payment is confirmed.</p>{}",
        order.customer_name,
        order.id.as_str(),
        item_table(order)
    );
    Notification::new(&order.customer_email, format!("Order Confirmation - {}", order.id.as_str()), body)
        .with_recipient_name(&order.customer_name)
}

pub(crate) fn order_received_admin(order: &Order, admin: &str) -> Notification {
    let body = format!(
        "<h2>New order {}</h2><p>Customer: {} &lt;{}&gt;</p><p>Shipping address: {}</p>{}",
        order.id.as_str(),
        order.customer_name,
        order.customer_email,
        order.shipping_address.as_deref().unwrap_or("not supplied"),
        item_table(order)
    );
    Notification::new(admin, format!("New Order Created - {}", order.id.as_str()), body).with_recipient_name("Admin")
}

pub(crate) fn payment_succeeded(order: &Order) -> Notification {
    let body = format!(
        "<h2>Payment received</h2><p>Hi {}, we have received your payment of {} for order <b>{}</b>. We will let you \
         know when it ships.</p>",
        order.customer_name,
        order.total_price,
        order.id.as_str()
    );
    Notification::new(&order.customer_email, format!("Payment Successful - Order {}", order.id.as_str()), body)
        .with_recipient_name(&order.customer_name)
}

pub(crate) fn payment_succeeded_admin(order: &Order, admin: &str) -> Notification {
    let body = format!(
        "<p>Order <b>{}</b> from {} has been paid. Amount: {}.</p>{}",
        order.id.as_str(),
        order.customer_email,
        order.total_price,
        item_table(order)
    );
    Notification::new(admin, format!("Order Paid - {}", order.id.as_str()), body).with_recipient_name("Admin")
}

pub(crate) fn payment_failed(order: &Order) -> Notification {
    let body = format!(
        "<h2>Payment failed</h2><p>Hi {}, the payment for order <b>{}</b> did not go through. No money has been taken. \
         You are welcome to place the order again.</p>",
        order.customer_name,
        order.id.as_str()
    );
    Notification::new(&order.customer_email, format!("Payment Failed - Order {}", order.id.as_str()), body)
        .with_recipient_name(&order.customer_name)
}

pub(crate) fn payment_failed_admin(order: &Order, admin: &str) -> Notification {
    let body = format!(
        "<p>The payment for order <b>{}</b> from {} failed. Amount: {}.</p>",
        order.id.as_str(),
        order.customer_email,
        order.total_price
    );
    Notification::new(admin, format!("Payment FAILED - {}", order.id.as_str()), body).with_recipient_name("Admin")
}

pub(crate) fn order_shipped(order: &Order) -> Notification {
    let body = format!(
        "<h2>Your order is on its way!</h2><p>Hi {}, order <b>{}</b> has been shipped to {}.</p>",
        order.customer_name,
        order.id.as_str(),
        order.shipping_address.as_deref().unwrap_or("your delivery address")
    );
    Notification::new(&order.customer_email, format!("Your order {} has shipped", order.id.as_str()), body)
        .with_recipient_name(&order.customer_name)
}

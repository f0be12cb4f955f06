use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryClass, LineRequest, Money, Order, OrderId, PaymentReference};

/// A customer's checkout submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub delivery_class: DeliveryClass,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Returned to the customer when a payment intent has been opened for their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitialization {
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    pub payment_reference: PaymentReference,
    pub client_secret: String,
}

/// What a lifecycle transition actually did.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The order moved to the requested state.
    Applied(Order),
    /// The order was already in the requested state. Nothing changed.
    AlreadyApplied(Order),
    /// The order was in a state from which the transition does not apply. Nothing changed.
    NoOp(Order),
}

impl TransitionOutcome {
    pub fn order(&self) -> &Order {
        match self {
            TransitionOutcome::Applied(o) | TransitionOutcome::AlreadyApplied(o) | TransitionOutcome::NoOp(o) => o,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// The result of reconciling one gateway event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied,
    AlreadyApplied,
    /// The event did not apply to the order's current state.
    NoOp,
    /// No order carries the event's payment reference.
    UnknownReference,
    /// The event kind is not one we act on.
    Ignored,
}

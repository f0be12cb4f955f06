use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Money, OrderId, PaymentReference};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Webhook signature is invalid: {0}")]
    SignatureInvalid(String),
    #[error("Webhook payload could not be decoded: {0}")]
    MalformedPayload(String),
    #[error("The payment provider rejected the request: {0}")]
    ProviderError(String),
    #[error("The payment provider could not be reached: {0}")]
    Unavailable(String),
}

/// Everything the gateway needs to open a payment intent for an order.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub order_id: OrderId,
    /// The amount to charge, in minor units.
    pub amount: Money,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: String,
    /// Free-form key/value pairs attached to the intent for reconciliation in the provider's dashboard.
    pub metadata: Vec<(String, String)>,
}

/// The gateway's answer to [`PaymentGateway::create_intent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// The intent identifier. This becomes the order's payment reference.
    pub reference: PaymentReference,
    /// Handed to the customer's browser so that it can complete the payment.
    pub client_secret: String,
}

/// A verified, decoded webhook notification.
///
/// Deliveries are at-least-once and may arrive out of order, so every variant must be safe to apply more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentSucceeded { reference: PaymentReference, amount: Option<Money> },
    PaymentFailed { reference: PaymentReference, reason: Option<String> },
    Refunded { reference: PaymentReference },
    Disputed { reference: PaymentReference },
    /// An event kind we do not act on. These are accepted and ignored.
    Unrecognized { kind: String },
}

impl GatewayEvent {
    pub fn kind(&self) -> &str {
        match self {
            GatewayEvent::PaymentSucceeded { .. } => "payment_succeeded",
            GatewayEvent::PaymentFailed { .. } => "payment_failed",
            GatewayEvent::Refunded { .. } => "refunded",
            GatewayEvent::Disputed { .. } => "disputed",
            GatewayEvent::Unrecognized { kind } => kind.as_str(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a payment intent for the given amount. The returned reference is unique across all intents.
    async fn create_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Authenticates and decodes a raw webhook body.
    ///
    /// `signature` is the value of the provider's signature header, if one was sent. Implementations must return
    /// [`GatewayError::SignatureInvalid`] for any payload that cannot be authenticated, unless they have been explicitly
    /// configured to accept unsigned payloads for local development.
    fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<GatewayEvent, GatewayError>;
}

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::StripeApiError;

/// The fields we send when opening a payment intent. `amount` is in the currency's minor unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub receipt_email: Option<String>,
    pub description: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl NewPaymentIntent {
    /// Stripe takes form-encoded bodies, with nested fields flattened into `metadata[key]` style names.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.to_lowercase()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        if let Some(email) = &self.receipt_email {
            form.push(("receipt_email".to_string(), email.clone()));
        }
        if let Some(description) = &self.description {
            form.push(("description".to_string(), description.clone()));
        }
        form.extend(self.metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())));
        form
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Charge {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    #[serde(default)]
    pub refunded: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dispute {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub charge: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventData {
    pub object: Value,
}

/// A webhook event envelope. The payload in `data.object` depends on the event type.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
}

impl StripeEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self, StripeApiError> {
        serde_json::from_slice(payload).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }

    fn object_as<T: DeserializeOwned>(&self, expected: &str) -> Result<T, StripeApiError> {
        match self.data.object["object"].as_str() {
            Some(o) if o == expected => {},
            other => {
                return Err(StripeApiError::UnexpectedObject(format!(
                    "Event {} ({}) carries a {}, not a {expected}",
                    self.id,
                    self.kind,
                    other.unwrap_or("nameless object")
                )))
            },
        }
        serde_json::from_value(self.data.object.clone()).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }

    pub fn payment_intent(&self) -> Result<PaymentIntent, StripeApiError> {
        self.object_as("payment_intent")
    }

    pub fn charge(&self) -> Result<Charge, StripeApiError> {
        self.object_as("charge")
    }

    pub fn dispute(&self) -> Result<Dispute, StripeApiError> {
        self.object_as("dispute")
    }
}

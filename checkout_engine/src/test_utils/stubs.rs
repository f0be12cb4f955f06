//! In-memory stand-ins for the external collaborators, for use in tests.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    Mutex,
};

use crate::{
    db_types::PaymentReference,
    notifications::Notification,
    traits::{EmailError, EmailSender, GatewayError, GatewayEvent, PaymentGateway, PaymentIntent, PaymentIntentRequest},
};

/// Issues sequential payment references (`pi_test_1`, `pi_test_2`, ...) and decodes webhooks of the form
/// `<kind> <reference>`, e.g. `payment_intent.succeeded pi_test_1`. Any signature is accepted.
#[derive(Clone, Debug, Default)]
pub struct StubGateway {
    counter: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<PaymentIntentRequest>>>,
}

impl StubGateway {
    /// The intent requests received so far.
    pub fn requests(&self) -> Vec<PaymentIntentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl PaymentGateway for StubGateway {
    async fn create_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut r) = self.requests.lock() {
            r.push(request);
        }
        Ok(PaymentIntent {
            reference: PaymentReference::from(format!("pi_test_{n}")),
            client_secret: format!("pi_test_{n}_secret"),
        })
    }

    fn verify_webhook(&self, payload: &[u8], _signature: Option<&str>) -> Result<GatewayEvent, GatewayError> {
        let text = std::str::from_utf8(payload).map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;
        let (kind, reference) = text
            .trim()
            .split_once(' ')
            .ok_or_else(|| GatewayError::MalformedPayload(format!("Expected '<kind> <reference>', got '{text}'")))?;
        let reference = PaymentReference::from(reference.trim());
        let event = match kind {
            "payment_intent.succeeded" => GatewayEvent::PaymentSucceeded { reference, amount: None },
            "payment_intent.payment_failed" => GatewayEvent::PaymentFailed { reference, reason: None },
            "charge.refunded" => GatewayEvent::Refunded { reference },
            "charge.dispute.created" => GatewayEvent::Disputed { reference },
            other => GatewayEvent::Unrecognized { kind: other.to_string() },
        };
        Ok(event)
    }
}

/// Records every notification it is asked to deliver.
#[derive(Clone, Debug, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl EmailSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        self.sent.lock().map_err(|e| EmailError::Permanent(e.to_string()))?.push(notification.clone());
        Ok(())
    }
}

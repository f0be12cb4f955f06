//! Stripe as the payment gateway.
use checkout_engine::{
    db_types::{Money, PaymentReference},
    traits::{GatewayError, GatewayEvent, PaymentGateway, PaymentIntent, PaymentIntentRequest},
};
use log::*;
use stripe_tools::{
    webhook::{construct_event, SIGNATURE_HEADER},
    NewPaymentIntent,
    StripeApi,
    StripeApiError,
    StripeConfig,
    StripeEvent,
};

use crate::errors::ServerError;

#[derive(Clone, Debug)]
pub struct StripeGateway {
    api: StripeApi,
    allow_unsigned: bool,
}

impl StripeGateway {
    pub fn new(config: StripeConfig, allow_unsigned: bool) -> Result<Self, ServerError> {
        let api = StripeApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api, allow_unsigned })
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: PaymentIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let intent = NewPaymentIntent {
            amount: request.amount.value(),
            currency: request.currency,
            receipt_email: Some(request.customer_email),
            description: Some(format!("Order {} for {}", request.order_id, request.customer_name)),
            metadata: request.metadata,
        };
        let result = self.api.create_payment_intent(&intent).await.map_err(to_gateway_error)?;
        let client_secret = result
            .client_secret
            .ok_or_else(|| GatewayError::ProviderError(format!("Payment intent {} has no client secret", result.id)))?;
        Ok(PaymentIntent { reference: PaymentReference::from(result.id), client_secret })
    }

    fn verify_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<GatewayEvent, GatewayError> {
        let config = self.api.config();
        let event = match signature {
            Some(header) => {
                construct_event(payload, header, config.webhook_secret.reveal(), config.webhook_tolerance)
                    .map_err(to_gateway_error)?
            },
            None if self.allow_unsigned => {
                warn!("🚨️ Accepting a webhook without a {SIGNATURE_HEADER} header. Unsigned webhooks are enabled.");
                StripeEvent::from_slice(payload).map_err(to_gateway_error)?
            },
            None => return Err(GatewayError::SignatureInvalid(format!("Missing {SIGNATURE_HEADER} header"))),
        };
        trace!("💳️ Webhook event {} ({})", event.id, event.kind);
        to_gateway_event(&event)
    }
}

fn to_gateway_error(e: StripeApiError) -> GatewayError {
    match e {
        StripeApiError::InvalidSignature(s) => GatewayError::SignatureInvalid(s),
        StripeApiError::JsonError(s) | StripeApiError::UnexpectedObject(s) => GatewayError::MalformedPayload(s),
        e if e.is_transient() => GatewayError::Unavailable(e.to_string()),
        e => GatewayError::ProviderError(e.to_string()),
    }
}

/// Maps the event kinds that affect orders. Everything else is passed on as [`GatewayEvent::Unrecognized`].
pub fn to_gateway_event(event: &StripeEvent) -> Result<GatewayEvent, GatewayError> {
    let missing_intent =
        |what: &str, id: &str| GatewayError::MalformedPayload(format!("{what} {id} is not linked to a payment intent"));
    let result = match event.kind.as_str() {
        "payment_intent.succeeded" => {
            let intent = event.payment_intent().map_err(to_gateway_error)?;
            GatewayEvent::PaymentSucceeded {
                reference: PaymentReference::from(intent.id),
                amount: Some(Money::from(intent.amount)),
            }
        },
        "payment_intent.payment_failed" => {
            let intent = event.payment_intent().map_err(to_gateway_error)?;
            let reason = intent.last_payment_error.and_then(|e| e.message.or(e.code));
            GatewayEvent::PaymentFailed { reference: PaymentReference::from(intent.id), reason }
        },
        "charge.refunded" => {
            let charge = event.charge().map_err(to_gateway_error)?;
            let reference = charge.payment_intent.ok_or_else(|| missing_intent("Charge", &charge.id))?;
            GatewayEvent::Refunded { reference: PaymentReference::from(reference) }
        },
        "charge.dispute.created" => {
            let dispute = event.dispute().map_err(to_gateway_error)?;
            let reference = dispute.payment_intent.ok_or_else(|| missing_intent("Dispute", &dispute.id))?;
            GatewayEvent::Disputed { reference: PaymentReference::from(reference) }
        },
        other => GatewayEvent::Unrecognized { kind: other.to_string() },
    };
    Ok(result)
}

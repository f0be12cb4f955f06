//! A thin client for the parts of the Stripe API that the checkout gateway uses: creating payment intents and
//! receiving webhook events.
mod api;
mod config;
mod data_objects;
mod error;
pub mod webhook;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{Charge, Dispute, EventData, NewPaymentIntent, PaymentError, PaymentIntent, StripeEvent};
pub use error::StripeApiError;

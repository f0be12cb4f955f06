//! Checkout Payment Engine
//!
//! The engine turns a cart submission into a priced order, coordinates with an external payment gateway, and
//! reconciles the gateway's asynchronous callbacks (success, failure, refund, dispute) back into order and stock
//! state. It is provider-agnostic: the payment gateway, the email provider and the datastore are all reached through
//! the traits in [`mod@traits`].
//!
//! The library is divided into these main sections:
//! 1. Data types ([`mod@db_types`]) shared by every layer.
//! 2. Backend contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]).
//! 3. Pricing ([`mod@pricing`]), a pure function of the catalog and the cart.
//! 4. The public API ([`mod@cpe_api`]). [`OrderFlowApi`] owns the order state machine and the stock reservation
//!    protocol. [`OrderQueryApi`] serves customer and admin queries.
//! 5. Notifications ([`mod@notifications`]), a bounded, best-effort email queue with a single delivery worker.
mod cpe_api;
mod db;

pub mod db_types;
pub mod notifications;
pub mod pricing;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cpe_api::{
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects,
    order_query_api::OrderQueryApi,
};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, SqliteDatabase};
pub use notifications::{NotificationDispatcher, NotificationWorker, OrderNotifier, RetryPolicy};

//! # Backend and provider contracts
//!
//! The lifecycle manager never talks to a concrete datastore, payment provider or mail service. It talks to these
//! traits, and the server wires in concrete implementations at start-up.
//!
//! * [`OrderStore`] persists orders and supports compare-and-swap status updates.
//! * [`StockLedger`] holds the per-product stock counters and the conditional reserve/release operations.
//! * [`ProductCatalog`] resolves product price and name snapshots at order time.
//! * [`PaymentGateway`] creates payment intents and turns signed webhook payloads into [`GatewayEvent`]s.
//! * [`EmailSender`] delivers a single notification. It is driven by the notification worker.
mod email_sender;
mod order_store;
mod payment_gateway;
mod product_catalog;
mod stock_ledger;

pub use email_sender::{EmailError, EmailSender};
pub use order_store::{OrderStore, OrderStoreError};
pub use payment_gateway::{GatewayError, GatewayEvent, PaymentGateway, PaymentIntent, PaymentIntentRequest};
pub use product_catalog::{CatalogError, ProductCatalog};
pub use stock_ledger::{ReservationOutcome, StockLedger, StockLedgerError};

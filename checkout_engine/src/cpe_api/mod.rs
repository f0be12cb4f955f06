//! # Checkout payment engine public API
//!
//! The `cpe_api` module exposes the programmatic API of the checkout engine.
//!
//! * [`order_flow_api`] owns the order state machine. It creates and cancels orders, opens payment intents, and
//!   reconciles payment gateway events into order and stock state.
//! * [`order_query_api`] provides read access to orders and the sales summary used by the admin dashboard.
//!
//! # API usage
//!
//! Every API instance is created by supplying backends that implement the traits it needs. Construct them once at
//! start-up and share them.
//!
//! ```rust,ignore
//! use checkout_engine::{OrderFlowApi, OrderNotifier, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements OrderStore, StockLedger and ProductCatalog
//! let api = OrderFlowApi::new(db, my_gateway, OrderNotifier::silent());
//! let order = api.create_order(customer, request).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod order_query_api;

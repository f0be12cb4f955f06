//! # Checkout payment server
//!
//! The HTTP front end for the checkout payment engine. It is responsible for:
//! * Accepting orders from authenticated customers and opening payment intents for them.
//! * Receiving signed payment webhooks from Stripe and handing them to the engine for reconciliation.
//! * Serving the admin dashboard: listing orders, overriding order status and reporting sales figures.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/stripe`: The webhook route for receiving payment events from Stripe.
//! * `/api/orders`: Create orders (POST) and list the caller's orders (GET).
//! * `/api/orders/{order_id}`, `/api/orders/{order_id}/cancel`, `/api/orders/{order_id}/pay`: Per-order customer
//!   actions.
//! * `/api/admin/orders`, `/api/admin/orders/{order_id}/status`, `/api/admin/analytics/sales`: Admin only.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

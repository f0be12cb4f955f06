//! Adapters between the engine's traits and the external services the server talks to.
pub mod email;
pub mod stripe;

mod checkout_world;
mod steps;

pub use checkout_world::{CheckoutSystem, CheckoutWorld};

mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY_CODE, DEFAULT_CURRENCY_SYMBOL};
pub use secret::Secret;

mod money;

pub mod helpers;
mod secret;

pub use money::{Money, MoneyConversionError, STORE_MONEY_SCALE};
pub use secret::Secret;

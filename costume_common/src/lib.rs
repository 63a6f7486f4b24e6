//! Shared primitives for the costume platform settlement crates.
//!
//! * [`Vnd`] is the money type used throughout. It counts hundredths of a dong.
//! * [`Secret`] masks credentials in logs.
//! * [`op!`] derives arithmetic operators for newtypes.
mod vnd;

pub mod helpers;
pub mod op;
mod secret;

pub use secret::Secret;
pub use vnd::{Vnd, VndConversionError, MINOR_UNITS_PER_DONG, VND_CURRENCY_CODE, VND_NUMERIC_CODE};

//! Costume Platform Settlement Engine
//!
//! The settlement engine is the payment core of the costume rental platform. It signs outbound payment requests for
//! the supported gateways, authenticates their callbacks, reconciles payment, order and deposit state, and derives the
//! revenue split between the platform and costume owners. It performs no network I/O of its own.
//!
//! The library is divided into these sections:
//! 1. Pure building blocks: the signature engine and VietQR builder ([`mod@helpers`]), the gateway adapters
//!    ([`mod@gateways`]) and the earnings split ([`mod@earnings`]).
//! 2. Storage contracts ([`mod@traits`]) and their SQLite implementation. You should not need to access the
//!    database directly; use the public API instead. The data types stored in the database are defined in the
//!    [`mod@db_types`] module and are public.
//! 3. The public API ([`SettlementApi`] and [`OrderAdminApi`]).
//!
//! The engine also emits events when orders are settled and when earnings are rebuilt. See [`mod@events`] for how to
//! subscribe to them.
mod api;

pub mod db_types;
pub mod earnings;
pub mod events;
pub mod gateways;
pub mod helpers;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    errors::SettlementApiError,
    order_admin_api::OrderAdminApi,
    settlement_api::{CallbackOutcome, CheckoutStart, SettlementApi},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{OrderManagement, SettlementDatabase, SettlementError};

//! # Settlement backend contracts
//!
//! The traits in this module define what a storage backend must provide for the settlement core to run on it.
//!
//! * [`SettlementDatabase`] owns every state transition that has to be atomic: settling a payment, failing it,
//!   verifying a bank transfer and rebuilding collaborator earnings.
//! * [`OrderManagement`] provides order administration (creation, status changes, deletion) and the read queries the
//!   API layer and the HTTP server need.
//!
//! Backends must keep the reconciliation guarantees: a payment reference is settled at most once, however many
//! confirmations for it arrive and in whatever order.
mod data_objects;
mod order_management;
mod settlement_database;

pub use data_objects::{
    DeletedOrder,
    EarningsSummary,
    OrderSummary,
    PaymentConfirmation,
    SettledPayment,
    SettlementOutcome,
    TransferSubmission,
    TransferVerification,
};
pub use order_management::OrderManagement;
pub use settlement_database::{SettlementDatabase, SettlementError};

use thiserror::Error;

use crate::{
    db_types::{CollaboratorEarning, NewPaymentIntent, NewRejectedCallback, OrderId, OrderStatusType, Payment, Vnd},
    traits::data_objects::{PaymentConfirmation, SettlementOutcome, TransferSubmission, TransferVerification},
};

/// State transitions of the settlement core. Every method runs in a single database transaction.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new payment intent in the `Pending` state.
    ///
    /// Fails if the order does not exist, has no total, is already paid or has been cancelled.
    async fn insert_payment_intent(&self, intent: NewPaymentIntent) -> Result<Payment, SettlementError>;

    /// Applies a payment confirmation. This is the only way a payment becomes `Paid`.
    ///
    /// The first confirmation for a reference marks the payment as paid, marks the order as paid (confirming it if
    /// it was still pending), marks a pending deposit as paid, appends one status history entry, and rebuilds the
    /// collaborator earnings of rental orders. Later confirmations for the same reference change nothing and return
    /// [`SettlementOutcome::AlreadySettled`]. A payment for an order that another payment already settled is marked
    /// paid without touching the order, and comes back as [`SettlementOutcome::Duplicate`].
    ///
    /// Confirmations carrying an amount that differs from the intent are rejected with
    /// [`SettlementError::AmountMismatch`].
    async fn settle_payment(&self, confirmation: &PaymentConfirmation) -> Result<SettlementOutcome, SettlementError>;

    /// Moves a `Pending` payment to `Failed`. Payments in any other state are left alone, and `None` is returned.
    async fn fail_payment(&self, transaction_reference: &str) -> Result<Option<Payment>, SettlementError>;

    /// Keeps a record of an inbound callback that failed its authenticity check.
    async fn record_rejected_callback(&self, callback: NewRejectedCallback) -> Result<i64, SettlementError>;

    /// Checks a reported bank transfer against the order, records it and settles the order's bank transfer intent.
    ///
    /// Orders that are cancelled, or were paid some other way, are refused with [`SettlementError::OrderNotPayable`].
    async fn verify_bank_transfer(
        &self,
        submission: &TransferSubmission,
    ) -> Result<TransferVerification, SettlementError>;

    /// Throws away the earnings of a paid order and regenerates them from its items.
    async fn rebuild_earnings(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError>;
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("There is no payment with reference {0}")]
    PaymentNotFound(String),
    #[error("Order {0} has no total price, so it cannot be paid for")]
    OrderHasNoTotal(OrderId),
    #[error("Order {0} cannot take a new payment: {1}")]
    OrderNotPayable(OrderId, String),
    #[error("Order {0} has not been paid for yet")]
    OrderNotPaid(OrderId),
    #[error("The paid amount, {received}, does not match the expected amount, {expected}")]
    AmountMismatch { expected: Vnd, received: Vnd },
    #[error("A payment with reference {0} already exists")]
    DuplicateReference(String),
    #[error("Payment {0} has failed and cannot be settled")]
    PaymentAlreadyFailed(String),
    #[error("Bank transaction {transaction_id} has already been used to pay for order {order_id}")]
    DuplicateTransaction { transaction_id: String, order_id: OrderId },
    #[error("The order is already {0}. The requested change would result in a no-op.")]
    StatusUnchanged(OrderStatusType),
    #[error("Orders cannot move from {from} to {to}")]
    ForbiddenStatusChange { from: OrderStatusType, to: OrderStatusType },
    #[error("Costume {0} does not exist")]
    CostumeNotFound(i64),
    #[error("Invalid order. {0}")]
    InvalidOrder(String),
    #[error("Exactly one active platform account must exist, but {0} were found")]
    PlatformAccountMisconfigured(usize),
}

impl SettlementError {
    /// Invariant violations that need an operator. Retrying will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SettlementError::PlatformAccountMisconfigured(_) | SettlementError::OrderHasNoTotal(_)
        )
    }
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

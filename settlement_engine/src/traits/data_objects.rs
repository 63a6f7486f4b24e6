use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{
    BankTransferRecord,
    CollaboratorEarning,
    Deposit,
    Order,
    OrderId,
    OrderItem,
    Payment,
    PaymentMethod,
    StatusHistory,
    Vnd,
};

/// A normalized "this payment went through" notice, from a verified gateway callback or a verified bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub transaction_reference: String,
    pub provider: PaymentMethod,
    /// The amount the gateway says was paid. When present, it must match the payment intent exactly.
    pub amount: Option<Vnd>,
    /// Goes into the order's status history
    pub note: String,
}

impl PaymentConfirmation {
    pub fn new<S: Into<String>>(transaction_reference: S, provider: PaymentMethod) -> Self {
        let transaction_reference = transaction_reference.into();
        let note = format!("Payment {transaction_reference} confirmed by {provider}");
        Self { transaction_reference, provider, amount: None, note }
    }

    pub fn with_amount(mut self, amount: Vnd) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = note.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledPayment {
    pub payment: Payment,
    pub order: Order,
    /// Number of earnings rows written, if the order is a rental order and its earnings were rebuilt.
    pub earnings_rebuilt: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// This confirmation moved the payment to `Paid`.
    Settled(SettledPayment),
    /// The payment had already been settled by an earlier confirmation. Nothing was changed.
    AlreadySettled(Payment),
    /// The payment went through, but its order had already been paid by another payment. The payment is recorded as
    /// `Paid` and the order is left alone. The customer is owed a refund.
    Duplicate(Payment),
}

impl SettlementOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            SettlementOutcome::Settled(s) => &s.payment,
            SettlementOutcome::AlreadySettled(p) | SettlementOutcome::Duplicate(p) => p,
        }
    }

    pub fn is_new_settlement(&self) -> bool {
        matches!(self, SettlementOutcome::Settled(_))
    }
}

/// A customer's claim that they paid for an order by bank transfer, as checked by staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSubmission {
    pub order_id: OrderId,
    /// The bank's transaction id
    pub transaction_id: String,
    pub amount: Vnd,
    pub transfer_date: DateTime<Utc>,
    /// Who checked the bank statement
    pub verified_by: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferVerification {
    pub transfer: BankTransferRecord,
    pub settlement: SettlementOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub deposit: Option<Deposit>,
    pub payments: Vec<Payment>,
    pub bank_transfer: Option<BankTransferRecord>,
    pub history: Vec<StatusHistory>,
}

/// Row counts removed by the order deletion plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedOrder {
    pub order_id: Option<OrderId>,
    pub earnings: u64,
    pub deposits: u64,
    pub bank_transfers: u64,
    pub payments: u64,
    pub history: u64,
    pub items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSummary {
    pub order_id: OrderId,
    pub earnings: Vec<CollaboratorEarning>,
    pub total: Vnd,
}

impl EarningsSummary {
    pub fn new(order_id: OrderId, earnings: Vec<CollaboratorEarning>) -> Self {
        let total = earnings.iter().map(|e| e.amount).sum();
        Self { order_id, earnings, total }
    }

    /// Sum of the rows credited to `user_id`
    pub fn total_for_user(&self, user_id: i64) -> Vnd {
        self.earnings.iter().filter(|e| e.user_id == user_id).map(|e| e.amount).sum()
    }
}

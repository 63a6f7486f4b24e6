use crate::{
    db_types::{
        BankTransferRecord,
        CollaboratorEarning,
        Deposit,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payment,
        RejectedCallback,
        StatusHistory,
    },
    traits::{data_objects::DeletedOrder, SettlementError},
};

/// Order administration and read access to settlement records.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order, its items, its deposit and the first status history entry in one transaction.
    ///
    /// The deposit is calculated from the sale prices of the ordered costumes. If the order has no explicit total, the
    /// sum of its line totals is used.
    async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, SettlementError>;

    async fn fetch_deposit(&self, order_id: OrderId) -> Result<Option<Deposit>, SettlementError>;

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, SettlementError>;

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, SettlementError>;

    async fn fetch_bank_transfer(&self, order_id: OrderId) -> Result<Option<BankTransferRecord>, SettlementError>;

    /// Status history, oldest first
    async fn fetch_status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistory>, SettlementError>;

    async fn fetch_earnings_for_order(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError>;

    /// The most recent rejected callbacks, newest first
    async fn fetch_rejected_callbacks(&self, limit: u32) -> Result<Vec<RejectedCallback>, SettlementError>;

    /// Moves the order to `status`, if the transition is allowed, and appends a status history entry.
    ///
    /// Cancelling an order also cancels its pending earnings and its pending deposit.
    async fn modify_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        note: &str,
    ) -> Result<Order, SettlementError>;

    /// Deletes the order and everything that refers to it, in dependency order, in one transaction.
    async fn delete_order(&self, order_id: OrderId) -> Result<DeletedOrder, SettlementError>;
}

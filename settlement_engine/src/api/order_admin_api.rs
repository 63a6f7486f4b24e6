use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, RejectedCallback},
    traits::{DeletedOrder, EarningsSummary, OrderManagement, OrderSummary, SettlementError},
};

/// Order administration: creating orders, moving them through their life cycle, deleting them, and reading back
/// everything the settlement core knows about an order.
pub struct OrderAdminApi<B> {
    db: B,
}

impl<B> Debug for OrderAdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderAdminApi")
    }
}

impl<B> OrderAdminApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderAdminApi<B>
where B: OrderManagement
{
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError> {
        let order = self.db.create_order(order).await?;
        info!("📦️ Order {} created for customer {}", order.id, order.customer_id);
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: OrderId) -> Result<Order, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or(SettlementError::OrderNotFound(order_id))
    }

    /// The order together with its items, deposit, payments, bank transfer and status history.
    pub async fn order_summary(&self, order_id: OrderId) -> Result<OrderSummary, SettlementError> {
        let order = self.fetch_order(order_id).await?;
        let items = self.db.fetch_order_items(order_id).await?;
        let deposit = self.db.fetch_deposit(order_id).await?;
        let payments = self.db.fetch_payments_for_order(order_id).await?;
        let bank_transfer = self.db.fetch_bank_transfer(order_id).await?;
        let history = self.db.fetch_status_history(order_id).await?;
        Ok(OrderSummary { order, items, deposit, payments, bank_transfer, history })
    }

    pub async fn modify_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        note: &str,
    ) -> Result<Order, SettlementError> {
        let order = self.db.modify_order_status(order_id, status, note).await?;
        info!("📦️ Order {order_id} is now {status}");
        Ok(order)
    }

    pub async fn delete_order(&self, order_id: OrderId) -> Result<DeletedOrder, SettlementError> {
        let deleted = self.db.delete_order(order_id).await?;
        info!(
            "📦️ Order {order_id} deleted with {} items, {} payments and {} earnings rows",
            deleted.items, deleted.payments, deleted.earnings
        );
        Ok(deleted)
    }

    pub async fn earnings_for_order(&self, order_id: OrderId) -> Result<EarningsSummary, SettlementError> {
        self.fetch_order(order_id).await?;
        let earnings = self.db.fetch_earnings_for_order(order_id).await?;
        Ok(EarningsSummary::new(order_id, earnings))
    }

    /// The most recent callbacks that failed authentication, newest first.
    pub async fn rejected_callbacks(&self, limit: u32) -> Result<Vec<RejectedCallback>, SettlementError> {
        self.db.fetch_rejected_callbacks(limit).await
    }
}

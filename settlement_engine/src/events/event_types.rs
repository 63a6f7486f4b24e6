use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, Payment};

/// Emitted once, and only once, when a payment intent moves from `Pending` to `Paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderSettledEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

/// Emitted after the collaborator earnings of an order have been regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsRebuiltEvent {
    pub order_id: OrderId,
    pub rows_written: usize,
}

impl EarningsRebuiltEvent {
    pub fn new(order_id: OrderId, rows_written: usize) -> Self {
        Self { order_id, rows_written }
    }
}

use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use super::{accounts, orders};
use crate::{
    db_types::{CollaboratorEarning, EarningStatus, NewEarning, Order, OrderId, OrderStatusType},
    earnings::distribute,
    traits::SettlementError,
};

pub async fn insert_earning(earning: &NewEarning, conn: &mut SqliteConnection) -> Result<CollaboratorEarning, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO collaborator_earnings (order_item_id, user_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(earning.order_item_id)
    .bind(earning.user_id)
    .bind(earning.amount)
    .bind(earning.status)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CollaboratorEarning>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT collaborator_earnings.* FROM collaborator_earnings
            JOIN order_items ON order_items.id = collaborator_earnings.order_item_id
            WHERE order_items.order_id = $1
            ORDER BY collaborator_earnings.id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

pub async fn delete_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM collaborator_earnings WHERE order_item_id IN (SELECT id FROM order_items WHERE order_id = $1)",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn cancel_pending_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE collaborator_earnings SET status = 'Cancelled'
            WHERE status = 'Pending' AND order_item_id IN (SELECT id FROM order_items WHERE order_id = $1)
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Replaces the earnings of a paid order with freshly computed rows. Run this inside a transaction that already holds
/// the write lock on the order.
pub async fn rebuild_for_order(
    order: &Order,
    conn: &mut SqliteConnection,
) -> Result<Vec<CollaboratorEarning>, SettlementError> {
    if !order.is_paid {
        return Err(SettlementError::OrderNotPaid(order.id));
    }
    let platform = accounts::platform_account(&mut *conn).await?;
    let removed = delete_for_order(order.id, &mut *conn).await?;
    let items = orders::fetch_order_items(order.id, &mut *conn).await?;
    let costumes = accounts::fetch_costumes_for_order(order.id, &mut *conn).await?;
    let status = match order.status {
        OrderStatusType::Cancelled => EarningStatus::Cancelled,
        _ => EarningStatus::Pending,
    };
    let rows = distribute(order, &items, &costumes, platform.id, status)?;
    let mut result = Vec::with_capacity(rows.len());
    for row in &rows {
        result.push(insert_earning(row, &mut *conn).await?);
    }
    debug!("🧮️ Earnings for order {} rebuilt. {removed} rows replaced by {}", order.id, result.len());
    Ok(result)
}

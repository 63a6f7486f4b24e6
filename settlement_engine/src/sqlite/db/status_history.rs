use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, OrderStatusType, StatusHistory};

/// Appends an entry to the order's status history. History entries are never updated.
pub async fn append(
    order_id: OrderId,
    status: OrderStatusType,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<StatusHistory, sqlx::Error> {
    sqlx::query_as("INSERT INTO status_history (order_id, status, note, changed_at) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(order_id)
        .bind(status)
        .bind(note)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
}

pub async fn fetch_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<StatusHistory>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM status_history WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn delete_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM status_history WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

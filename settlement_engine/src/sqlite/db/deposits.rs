use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Deposit, DepositStatus, OrderId, Vnd};

pub async fn insert_deposit(order_id: OrderId, amount: Vnd, conn: &mut SqliteConnection) -> Result<Deposit, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as("INSERT INTO deposits (order_id, amount, created_at, updated_at) VALUES ($1, $2, $3, $3) RETURNING *")
        .bind(order_id)
        .bind(amount)
        .bind(now)
        .fetch_one(conn)
        .await
}

pub async fn fetch_deposit(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Deposit>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM deposits WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}

/// Moves the deposit to `to`, but only if it is currently in the `from` state. Returns the number of rows changed.
pub async fn transition(
    order_id: OrderId,
    from: DepositStatus,
    to: DepositStatus,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE deposits SET status = $1, updated_at = $2 WHERE order_id = $3 AND status = $4")
        .bind(to)
        .bind(Utc::now())
        .bind(order_id)
        .bind(from)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM deposits WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

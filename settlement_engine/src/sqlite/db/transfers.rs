use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{BankTransferRecord, OrderId},
    traits::TransferSubmission,
};

pub async fn fetch_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<BankTransferRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bank_transfers WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<BankTransferRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bank_transfers WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}

/// Records a verified transfer. An order has at most one transfer record, so verifying again overwrites it.
pub async fn upsert_completed(
    submission: &TransferSubmission,
    verified_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<BankTransferRecord, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO bank_transfers (
                order_id,
                transaction_id,
                amount,
                transfer_date,
                status,
                note,
                verified_by,
                verified_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, 'Completed', $5, $6, $7, $7, $7)
            ON CONFLICT (order_id) DO UPDATE SET
                transaction_id = excluded.transaction_id,
                amount = excluded.amount,
                transfer_date = excluded.transfer_date,
                status = 'Completed',
                note = excluded.note,
                verified_by = excluded.verified_by,
                verified_at = excluded.verified_at,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(submission.order_id)
    .bind(&submission.transaction_id)
    .bind(submission.amount)
    .bind(submission.transfer_date)
    .bind(&submission.note)
    .bind(&submission.verified_by)
    .bind(verified_at)
    .fetch_one(conn)
    .await
}

pub async fn delete_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM bank_transfers WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

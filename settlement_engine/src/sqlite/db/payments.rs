use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewPaymentIntent, OrderId, Payment, Vnd};

pub async fn insert_intent(intent: &NewPaymentIntent, conn: &mut SqliteConnection) -> Result<Payment, sqlx::Error> {
    let now = Utc::now();
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, amount, method, transaction_reference, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(intent.order_id)
    .bind(intent.amount)
    .bind(intent.method)
    .bind(&intent.transaction_reference)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("💰️ Payment intent [{}] stored for order {}", payment.transaction_reference, payment.order_id);
    Ok(payment)
}

pub async fn fetch_by_reference(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE transaction_reference = $1").bind(reference).fetch_optional(conn).await
}

pub async fn fetch_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

/// The settlement guard. Moves the payment from `Pending` to `Paid`, but only if it is still pending and, when
/// `amount` is given, only if the amount matches.
///
/// Returns the updated payment, or `None` if no row qualified. Exactly one of any number of concurrent callers for the
/// same reference gets `Some`.
pub async fn mark_paid_if_pending(
    reference: &str,
    amount: Option<Vnd>,
    paid_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payments SET status = 'Paid', paid_at = $1, updated_at = $1
            WHERE transaction_reference = $2 AND status = 'Pending' AND ($3 IS NULL OR amount = $3)
            RETURNING *;
        "#,
    )
    .bind(paid_at)
    .bind(reference)
    .bind(amount)
    .fetch_optional(conn)
    .await
}

/// Moves a `Pending` payment to `Failed`. Returns `None` if the payment was not pending.
pub async fn mark_failed_if_pending(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payments SET status = 'Failed', updated_at = $1
            WHERE transaction_reference = $2 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(reference)
    .fetch_optional(conn)
    .await
}

pub async fn delete_for_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM payments WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

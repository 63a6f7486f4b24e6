use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewRejectedCallback, RejectedCallback};

pub async fn insert_rejected(callback: &NewRejectedCallback, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO rejected_callbacks (provider, transaction_reference, provider_status, reason, payload, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(callback.provider)
    .bind(&callback.transaction_reference)
    .bind(&callback.provider_status)
    .bind(&callback.reason)
    .bind(&callback.payload)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_recent(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<RejectedCallback>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM rejected_callbacks ORDER BY id DESC LIMIT $1").bind(limit).fetch_all(conn).await
}

use std::collections::HashMap;

use sqlx::SqliteConnection;

use crate::{
    db_types::{Costume, OrderId, Role, UserAccount, Vnd},
    traits::SettlementError,
};

/// Resolves the platform account. Exactly one active user with the `Platform` role must exist. This is read on every
/// call so that a change of platform account takes effect immediately.
pub async fn platform_account(conn: &mut SqliteConnection) -> Result<UserAccount, SettlementError> {
    let mut accounts: Vec<UserAccount> =
        sqlx::query_as("SELECT * FROM users WHERE role = $1 AND is_active = 1 ORDER BY id LIMIT 2")
            .bind(Role::Platform)
            .fetch_all(conn)
            .await?;
    match accounts.len() {
        1 => Ok(accounts.remove(0)),
        n => Err(SettlementError::PlatformAccountMisconfigured(n)),
    }
}

pub async fn insert_user(
    name: &str,
    role: Role,
    is_active: bool,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, sqlx::Error> {
    sqlx::query_as("INSERT INTO users (name, role, is_active) VALUES ($1, $2, $3) RETURNING *")
        .bind(name)
        .bind(role)
        .bind(is_active)
        .fetch_one(conn)
        .await
}

pub async fn insert_costume(
    owner_id: i64,
    name: &str,
    rental_price: Vnd,
    sale_price: Vnd,
    conn: &mut SqliteConnection,
) -> Result<Costume, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO costumes (owner_id, name, rental_price, sale_price) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(owner_id)
    .bind(name)
    .bind(rental_price)
    .bind(sale_price)
    .fetch_one(conn)
    .await
}

pub async fn fetch_costume(costume_id: i64, conn: &mut SqliteConnection) -> Result<Option<Costume>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM costumes WHERE id = $1").bind(costume_id).fetch_optional(conn).await
}

/// All costumes referenced by the order's items, keyed by costume id.
pub async fn fetch_costumes_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, Costume>, sqlx::Error> {
    let costumes: Vec<Costume> = sqlx::query_as(
        r#"
            SELECT DISTINCT costumes.* FROM costumes
            JOIN order_items ON order_items.costume_id = costumes.id
            WHERE order_items.order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(costumes.into_iter().map(|c| (c.id, c)).collect())
}

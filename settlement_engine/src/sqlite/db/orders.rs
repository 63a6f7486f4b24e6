use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType, Vnd};

/// Touches the order row. This is the first statement of every write transaction that concerns an order: it takes
/// the database write lock up front and doubles as an existence check.
///
/// Returns `false` if the order does not exist.
pub async fn lock_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET id = id WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts a new order. This is not atomic; the items, deposit and history entry are written separately. Embed the
/// call in a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(
    order: &NewOrder,
    total_price: Option<Vnd>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (customer_id, total_price, rent_start, rent_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(total_price)
    .bind(order.rent_start)
    .bind(order.rent_end)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("📝️ Order {} inserted", order.id);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: OrderId,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO order_items (order_id, costume_id, quantity, price) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order_id)
    .bind(item.costume_id)
    .bind(item.quantity)
    .bind(item.price)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await
}

pub async fn fetch_order_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

/// Marks the order as paid. An order that is still `Pending` is confirmed at the same time.
pub async fn mark_paid(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                is_paid = 1,
                status = CASE WHEN status = 'Pending' THEN 'Confirmed' ELSE status END,
                updated_at = $1
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(order_id)
    .fetch_one(conn)
    .await
}

pub async fn update_status(
    order_id: OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(order_id)
        .fetch_one(conn)
        .await
}

pub async fn delete_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

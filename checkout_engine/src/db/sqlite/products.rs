use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, OrderId, OrderStatusType, Product, ProductId};

pub async fn fetch_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT id, name, price, stock, created_at, updated_at FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Inserts a product, or replaces its name, price and stock if it already exists.
///
/// The returned rows are drained so that the statement runs to completion and the write is committed before the
/// connection goes back to the pool.
pub async fn upsert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Product>(
        r#"
            INSERT INTO products (id, name, price, stock, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                stock = excluded.stock,
                updated_at = excluded.updated_at
            RETURNING id, name, price, stock, created_at, updated_at;
        "#,
    )
    .bind(product.id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)
}

pub async fn stock_level(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let stock: Option<(i64,)> =
        sqlx::query_as("SELECT stock FROM products WHERE id = ?").bind(id).fetch_optional(conn).await?;
    Ok(stock.map(|(s,)| s))
}

/// Decrements the stock counter if at least `quantity` units remain. Returns `true` if the decrement happened.
pub async fn decrement_stock(id: &ProductId, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET stock = stock - ?, updated_at = ? WHERE id = ? AND stock >= ?")
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Increments the stock counter. Returns `false` if the product no longer exists.
pub async fn increment_stock(id: &ProductId, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Claims the reservation flag on an order line, provided the line is unclaimed and the order is paid. Returns `true`
/// if the flag was claimed.
pub async fn claim_line(order_id: &OrderId, line_no: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE order_items SET reserved = TRUE
            WHERE order_id = ? AND line_no = ? AND reserved = FALSE
              AND EXISTS (SELECT 1 FROM orders WHERE orders.id = order_items.order_id AND orders.status = ?)
        "#,
    )
    .bind(order_id)
    .bind(line_no)
    .bind(OrderStatusType::Paid)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Clears the reservation flag on an order line. Returns `true` if the line was holding a reservation.
pub async fn unclaim_line(order_id: &OrderId, line_no: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE order_items SET reserved = FALSE WHERE order_id = ? AND line_no = ? AND reserved = TRUE")
            .bind(order_id)
            .bind(line_no)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() == 1)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LineState {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reserved: bool,
    pub order_status: OrderStatusType,
}

pub async fn fetch_line_state(
    order_id: &OrderId,
    line_no: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<LineState>, sqlx::Error> {
    let state = sqlx::query_as::<_, LineState>(
        r#"
            SELECT order_items.product_id, order_items.quantity, order_items.reserved, orders.status AS order_status
            FROM order_items JOIN orders ON orders.id = order_items.order_id
            WHERE order_items.order_id = ? AND order_items.line_no = ?
        "#,
    )
    .bind(order_id)
    .bind(line_no)
    .fetch_optional(conn)
    .await?;
    if state.is_none() {
        trace!("🗃️ No line {line_no} on order {order_id}");
    }
    Ok(state)
}

use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, PaymentReference, UserId},
    traits::OrderStoreError,
};

const ORDER_COLUMNS: &str = "id, user_id, customer_name, customer_email, customer_phone, shipping_address, subtotal, \
                             delivery_class, delivery_fee, total_price, currency, status, payment_reference, \
                             created_at, updated_at";

/// Inserts a new order with status `pending`, followed by its line items.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    let result = sqlx::query(
        r#"
            INSERT INTO orders (
                id,
                user_id,
                customer_name,
                customer_email,
                customer_phone,
                shipping_address,
                subtotal,
                delivery_class,
                delivery_fee,
                total_price,
                currency,
                status,
                created_at,
                updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer.user_id)
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer_phone)
    .bind(&order.shipping_address)
    .bind(order.subtotal)
    .bind(order.delivery_class)
    .bind(order.delivery_fee)
    .bind(order.total_price)
    .bind(&order.currency)
    .bind(OrderStatusType::Pending)
    .bind(order.created_at)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await;
    match result {
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(OrderStoreError::OrderAlreadyExists(order.id.clone()));
        },
        Err(e) => return Err(e.into()),
        Ok(_) => {},
    }
    for item in &order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, line_no, product_id, product_name, unit_price, quantity, reserved)
                VALUES (?, ?, ?, ?, ?, ?, FALSE);
            "#,
        )
        .bind(&order.id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ Order {} inserted with {} lines", order.id, order.items.len());
    Ok(())
}

/// Fetches the line items for the given order, in line order.
pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        r#"
            SELECT line_no, product_id, product_name, unit_price, quantity, reserved
            FROM order_items
            WHERE order_id = ?
            ORDER BY line_no ASC;
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

async fn with_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    match order {
        Some(mut order) => {
            order.items = fetch_items(&order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

pub async fn fetch_order_by_payment_reference(
    reference: &PaymentReference,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE payment_reference = ?"))
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(order, conn).await
}

/// Fetches every order, or only those placed by `user` if one is given. Newest first.
pub async fn fetch_orders(user: Option<&UserId>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if let Some(user_id) = user {
        builder.push("WHERE user_id = ");
        builder.push_bind(user_id.clone());
    }
    builder.push(" ORDER BY created_at DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let mut orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    for order in &mut orders {
        order.items = fetch_items(&order.id, conn).await?;
    }
    trace!("🗃️ Result of fetch_orders: {}", orders.len());
    Ok(orders)
}

/// Sets the order status to `to` if the current status is one of `from`. Returns `true` if the row was updated.
pub async fn update_order_status(
    id: &OrderId,
    from: &[OrderStatusType],
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    if from.is_empty() {
        return Ok(false);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(to);
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE id = ");
    builder.push_bind(id.clone());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Unconditionally sets the order status. Returns `false` if the order does not exist.
pub async fn overwrite_order_status(
    id: &OrderId,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(to)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Attaches a payment reference to an order that does not have one yet. Returns `false` if the order does not exist
/// or already carries a reference.
pub async fn set_payment_reference(
    id: &OrderId,
    reference: &PaymentReference,
    conn: &mut SqliteConnection,
) -> Result<bool, OrderStoreError> {
    let result =
        sqlx::query("UPDATE orders SET payment_reference = ?, updated_at = ? WHERE id = ? AND payment_reference IS NULL")
            .bind(reference)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await;
    match result {
        Ok(r) => Ok(r.rows_affected() == 1),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!("🗃️ Payment reference {reference} is already attached to another order. Refusing to attach it to {id}");
            Err(OrderStoreError::DuplicatePaymentReference(reference.clone()))
        },
        Err(e) => Err(e.into()),
    }
}

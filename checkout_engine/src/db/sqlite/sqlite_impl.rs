use std::fmt::Debug;

use log::*;
use sqlx::{migrate, migrate::MigrateError, SqlitePool};

use super::{db_url, new_pool, orders, products};
use crate::{
    db_types::{NewOrder, NewProduct, Order, OrderId, OrderStatusType, PaymentReference, Product, ProductId, UserId},
    traits::{
        CatalogError,
        OrderStore,
        OrderStoreError,
        ProductCatalog,
        ReservationOutcome,
        StockLedger,
        StockLedgerError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `CPG_DATABASE_URL` environment variable to find the database.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Adds a product to the catalog, or resets an existing product's details and stock level. Used to seed stock.
    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::upsert_product(product, &mut conn).await?;
        debug!("🗃️ Product {} ({}) stocked with {} units", product.id, product.name, product.stock);
        Ok(product)
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderStore for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let id = order.id.clone();
        let mut tx = self.pool.begin().await?;
        orders::insert_order(order, &mut tx).await?;
        let stored = orders::fetch_order_by_id(&id, &mut tx).await?.ok_or_else(|| {
            OrderStoreError::DatabaseError(format!("Order {id} could not be read back after it was inserted"))
        })?;
        tx.commit().await?;
        debug!("🗃️ Order {id} has been saved in the DB");
        Ok(stored)
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_reference(reference, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders(Some(user), &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders(None, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::update_order_status(id, from, to, &mut tx).await?;
        let result = if updated { orders::fetch_order_by_id(id, &mut tx).await? } else { None };
        tx.commit().await?;
        if updated {
            trace!("🗃️ Order {id} moved to {to}");
        }
        Ok(result)
    }

    async fn overwrite_order_status(
        &self,
        id: &OrderId,
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::overwrite_order_status(id, to, &mut tx).await?;
        let result = if updated { orders::fetch_order_by_id(id, &mut tx).await? } else { None };
        tx.commit().await?;
        Ok(result)
    }

    async fn set_payment_reference(
        &self,
        id: &OrderId,
        reference: &PaymentReference,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::set_payment_reference(id, reference, &mut tx).await?;
        let result = if updated { orders::fetch_order_by_id(id, &mut tx).await? } else { None };
        tx.commit().await?;
        Ok(result)
    }
}

impl StockLedger for SqliteDatabase {
    async fn reserve(&self, product: &ProductId, quantity: i64) -> Result<bool, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let reserved = products::decrement_stock(product, quantity, &mut conn).await?;
        Ok(reserved)
    }

    async fn release(&self, product: &ProductId, quantity: i64) -> Result<(), StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        if !products::increment_stock(product, quantity, &mut conn).await? {
            warn!("🗃️ Tried to return {quantity} units to product {product}, but it no longer exists");
        }
        Ok(())
    }

    async fn stock_level(&self, product: &ProductId) -> Result<Option<i64>, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let level = products::stock_level(product, &mut conn).await?;
        Ok(level)
    }

    async fn reserve_order_line(
        &self,
        order_id: &OrderId,
        line_no: i64,
    ) -> Result<ReservationOutcome, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        // Claiming the flag first takes the write lock, so the state read below cannot go stale before commit.
        if !products::claim_line(order_id, line_no, &mut tx).await? {
            let state = products::fetch_line_state(order_id, line_no, &mut tx)
                .await?
                .ok_or_else(|| StockLedgerError::LineNotFound { order_id: order_id.clone(), line_no })?;
            tx.rollback().await?;
            return if state.reserved {
                Ok(ReservationOutcome::AlreadyReserved)
            } else {
                Ok(ReservationOutcome::OrderNotPaid)
            };
        }
        let state = products::fetch_line_state(order_id, line_no, &mut tx)
            .await?
            .ok_or_else(|| StockLedgerError::LineNotFound { order_id: order_id.clone(), line_no })?;
        if !products::decrement_stock(&state.product_id, state.quantity, &mut tx).await? {
            tx.rollback().await?;
            return Ok(ReservationOutcome::InsufficientStock);
        }
        tx.commit().await?;
        trace!("🗃️ Reserved {} x {} for line {line_no} of order {order_id}", state.quantity, state.product_id);
        Ok(ReservationOutcome::Reserved)
    }

    async fn release_order_line(&self, order_id: &OrderId, line_no: i64) -> Result<bool, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        if !products::unclaim_line(order_id, line_no, &mut tx).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        let state = products::fetch_line_state(order_id, line_no, &mut tx)
            .await?
            .ok_or_else(|| StockLedgerError::LineNotFound { order_id: order_id.clone(), line_no })?;
        if !products::increment_stock(&state.product_id, state.quantity, &mut tx).await? {
            warn!("🗃️ Product {} no longer exists. Its reservation on order {order_id} is dropped", state.product_id);
        }
        tx.commit().await?;
        trace!("🗃️ Released {} x {} from line {line_no} of order {order_id}", state.quantity, state.product_id);
        Ok(true)
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }
}

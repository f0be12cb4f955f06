use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentReference, UserId};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Payment reference {0} is already attached to another order")]
    DuplicatePaymentReference(PaymentReference),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// Persistence for orders and their line items.
///
/// Orders are never deleted. Every status change goes through a conditional write so that concurrent webhook
/// deliveries and user actions cannot both win: the write only lands if the order is still in one of the expected
/// states, and the caller is told whether it did.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Stores a brand-new order and its lines in the `pending` state, returning the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_by_payment_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// All orders belonging to the given user, newest first.
    async fn fetch_orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderStoreError>;

    /// Every order in the store, newest first.
    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Moves the order to `to`, but only if its current status is one of `from`. Returns the updated order if the
    /// write happened, or `None` if the order does not exist or was not in an expected state.
    async fn update_order_status(
        &self,
        id: &OrderId,
        from: &[OrderStatusType],
        to: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Unconditionally overwrites the order status. Returns `None` if the order does not exist.
    async fn overwrite_order_status(&self, id: &OrderId, to: OrderStatusType)
        -> Result<Option<Order>, OrderStoreError>;

    /// Attaches the gateway's payment reference to the order. The write only happens if the order has no reference
    /// yet, in which case the updated order is returned. A reference that is already attached to a different order
    /// results in [`OrderStoreError::DuplicatePaymentReference`].
    async fn set_payment_reference(
        &self,
        id: &OrderId,
        reference: &PaymentReference,
    ) -> Result<Option<Order>, OrderStoreError>;
}

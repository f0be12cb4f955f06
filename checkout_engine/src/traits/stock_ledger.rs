use thiserror::Error;

use crate::db_types::{OrderId, ProductId};

#[derive(Debug, Clone, Error)]
pub enum StockLedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Line {line_no} of order {order_id} does not exist")]
    LineNotFound { order_id: OrderId, line_no: i64 },
}

impl From<sqlx::Error> for StockLedgerError {
    fn from(e: sqlx::Error) -> Self {
        StockLedgerError::DatabaseError(e.to_string())
    }
}

/// The result of trying to reserve stock for a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// The stock counter was decremented and the line now holds the reservation.
    Reserved,
    /// The line already held its reservation. Nothing changed.
    AlreadyReserved,
    /// There was not enough stock left. Nothing changed.
    InsufficientStock,
    /// The order is no longer `paid`, so it must not hold stock. Nothing changed.
    OrderNotPaid,
}

/// Per-product stock counters.
///
/// Counters never go negative. A reservation is a single conditional decrement that only succeeds if enough stock
/// remains, so concurrent reservations for the last units are decided by the datastore rather than by the caller.
#[allow(async_fn_in_trait)]
pub trait StockLedger {
    /// Decrements the product's stock by `quantity` if, and only if, at least that much stock remains. Returns whether
    /// the decrement happened.
    async fn reserve(&self, product: &ProductId, quantity: i64) -> Result<bool, StockLedgerError>;

    /// Increments the product's stock by `quantity`.
    async fn release(&self, product: &ProductId, quantity: i64) -> Result<(), StockLedgerError>;

    /// The current stock counter for the product, or `None` if the product does not exist.
    async fn stock_level(&self, product: &ProductId) -> Result<Option<i64>, StockLedgerError>;

    /// Reserves stock for one line of a paid order. The line's reservation flag and the stock counter change together,
    /// so calling this twice for the same line decrements the counter at most once.
    async fn reserve_order_line(&self, order_id: &OrderId, line_no: i64)
        -> Result<ReservationOutcome, StockLedgerError>;

    /// Returns the stock held by one order line. Lines that hold no reservation are left alone. Returns whether any
    /// stock was returned.
    async fn release_order_line(&self, order_id: &OrderId, line_no: i64) -> Result<bool, StockLedgerError>;
}

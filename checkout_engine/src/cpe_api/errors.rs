use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, PaymentReference, ProductId},
    pricing::PricingError,
    traits::{CatalogError, GatewayError, OrderStoreError, StockLedgerError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Product {0} does not exist")]
    InvalidReference(ProductId),
    #[error("Only {available} left of {product}")]
    InsufficientStock { product: String, available: i64 },
    #[error("{0} was not found")]
    NotFound(String),
    #[error("Cannot {action} order {order_id} while it is {status}")]
    InvalidTransition { order_id: OrderId, status: OrderStatusType, action: &'static str },
    #[error("Not allowed: {0}")]
    Unauthorized(String),
    #[error("Payment reference {0} is already in use")]
    DuplicatePaymentReference(PaymentReference),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(#[from] GatewayError),
}

impl OrderFlowError {
    pub fn order_not_found(id: &OrderId) -> Self {
        Self::NotFound(format!("Order {id}"))
    }

    pub fn reference_not_found(reference: &PaymentReference) -> Self {
        Self::NotFound(format!("Order with payment reference {reference}"))
    }
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::DatabaseError(s) => Self::DatabaseError(s),
            OrderStoreError::OrderAlreadyExists(id) => Self::ValidationError(format!("Order {id} already exists")),
            OrderStoreError::DuplicatePaymentReference(r) => Self::DuplicatePaymentReference(r),
        }
    }
}

impl From<StockLedgerError> for OrderFlowError {
    fn from(e: StockLedgerError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<PricingError> for OrderFlowError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::EmptyOrder | PricingError::InvalidQuantity(_) => Self::ValidationError(e.to_string()),
            PricingError::InvalidReference(id) => Self::InvalidReference(id),
            PricingError::InsufficientStock { product, available } => Self::InsufficientStock { product, available },
            PricingError::CatalogError(e) => e.into(),
        }
    }
}

use thiserror::Error;

use crate::db_types::{Product, ProductId};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Read access to the product catalog. Catalog management lives elsewhere.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;
}

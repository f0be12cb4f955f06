//! # Pricing
//!
//! Turns a cart into priced order lines. Each line captures the product's name and unit price at the moment the order
//! is placed, so later catalog changes never alter an existing order. The delivery fee depends only on the delivery
//! class.
//!
//! Pricing checks stock, but it does not hold any. Stock is only reserved once the order is paid.
use std::collections::HashMap;

use log::*;
use thiserror::Error;

use crate::{
    db_types::{DeliveryClass, LineRequest, Money, OrderItem, ProductId},
    traits::{CatalogError, ProductCatalog},
};

#[derive(Debug, Clone, Error)]
pub enum PricingError {
    #[error("An order must contain at least one item")]
    EmptyOrder,
    #[error("Quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),
    #[error("Product {0} does not exist")]
    InvalidReference(ProductId),
    #[error("Only {available} left of {product}")]
    InsufficientStock { product: String, available: i64 },
    #[error("{0}")]
    CatalogError(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub delivery_class: DeliveryClass,
    pub delivery_fee: Money,
    pub total_price: Money,
}

/// Prices every line against the current catalog.
///
/// Fails without side effects if the cart is empty, a quantity is not positive, a product is missing, or the requested
/// quantity of a product exceeds its stock. Several lines for the same product are checked against stock together.
pub async fn price_order<C: ProductCatalog>(
    catalog: &C,
    lines: &[LineRequest],
    delivery_class: DeliveryClass,
) -> Result<PricedOrder, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyOrder);
    }
    let mut requested = HashMap::<&ProductId, i64>::new();
    let mut items = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if line.quantity < 1 {
            return Err(PricingError::InvalidQuantity(line.product_id.clone()));
        }
        let product = catalog
            .fetch_product(&line.product_id)
            .await?
            .ok_or_else(|| PricingError::InvalidReference(line.product_id.clone()))?;
        let total_requested = requested.entry(&line.product_id).or_insert(0);
        *total_requested += line.quantity;
        if *total_requested > product.stock {
            debug!("💲️ {} x {} requested, but only {} in stock", total_requested, product.name, product.stock);
            return Err(PricingError::InsufficientStock { product: product.name, available: product.stock });
        }
        items.push(OrderItem {
            line_no: (i + 1) as i64,
            product_id: product.id,
            product_name: product.name,
            unit_price: product.price,
            quantity: line.quantity,
            reserved: false,
        });
    }
    let subtotal = items.iter().map(OrderItem::line_total).sum::<Money>();
    let delivery_fee = delivery_class.fee();
    let total_price = subtotal + delivery_fee;
    trace!("💲️ Priced {} lines: {subtotal} + {delivery_fee} ({delivery_class}) = {total_price}", items.len());
    Ok(PricedOrder { items, subtotal, delivery_class, delivery_fee, total_price })
}

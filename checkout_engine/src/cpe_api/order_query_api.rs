//! Read access to orders, for customers and for the admin dashboard.
use std::{collections::HashMap, fmt::Debug};

use log::*;

use crate::{
    cpe_api::errors::OrderFlowError,
    db_types::{Money, Order, OrderId, OrderStatusType, SalesSummary, StatusCount, UserId},
    traits::OrderStore,
};

pub struct OrderQueryApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi ({:?})", self.db)
    }
}

impl<B> OrderQueryApi<B>
where B: OrderStore
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Fetches a single order on behalf of a customer. Another customer's order is `Unauthorized`, which is distinct
    /// from `NotFound`.
    pub async fn order_for_user(&self, order_id: &OrderId, user: &UserId) -> Result<Order, OrderFlowError> {
        let order = self.order_by_id(order_id).await?.ok_or_else(|| OrderFlowError::order_not_found(order_id))?;
        if !order.is_owned_by(user) {
            warn!("💻️ User {user} asked for order {order_id}, which belongs to {}", order.user_id);
            return Err(OrderFlowError::Unauthorized(format!("Order {order_id} does not belong to you")));
        }
        Ok(order)
    }

    pub async fn order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order_by_id(order_id).await?)
    }

    /// The customer's orders, newest first.
    pub async fn orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.db.fetch_orders_for_user(user).await?)
    }

    /// Every order, newest first.
    pub async fn all_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        Ok(self.db.fetch_all_orders().await?)
    }

    /// Aggregates order counts per status and the revenue from orders whose payment stands (paid, shipped and
    /// delivered).
    pub async fn sales_summary(&self) -> Result<SalesSummary, OrderFlowError> {
        let orders = self.db.fetch_all_orders().await?;
        let summary = summarize(&orders);
        trace!("💻️ Sales summary over {} orders: {}", summary.total_orders, summary.total_revenue);
        Ok(summary)
    }
}

fn summarize(orders: &[Order]) -> SalesSummary {
    let mut counts = HashMap::<OrderStatusType, i64>::new();
    for order in orders {
        *counts.entry(order.status).or_insert(0) += 1;
    }
    let total_revenue = orders.iter().filter(|o| o.status.is_revenue()).map(|o| o.total_price).sum::<Money>();
    let orders_by_status = OrderStatusType::ALL
        .iter()
        .filter_map(|s| counts.get(s).map(|count| StatusCount { status: *s, count: *count }))
        .collect();
    #[allow(clippy::cast_possible_wrap)]
    let total_orders = orders.len() as i64;
    SalesSummary { total_orders, total_revenue, orders_by_status }
}

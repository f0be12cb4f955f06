use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use cpg_common::Money;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh, globally unique order identifier.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        UserId         ---------------------------------------------------------
/// The identifier of the customer that owns an order, as issued by the user service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl<S: Into<String>> From<S> for ProductId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   PaymentReference    ---------------------------------------------------------
/// The opaque identifier the payment gateway assigns to a payment intent. Once attached to an order it never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PaymentReference(pub String);

impl<S: Into<String>> From<S> for PaymentReference {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PaymentReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created and is awaiting payment. No stock is held.
    Pending,
    /// The payment gateway has confirmed the payment. Stock has been reserved where available.
    Paid,
    /// An admin has marked the order as shipped.
    Shipped,
    /// An admin has marked the order as delivered.
    Delivered,
    /// The customer cancelled the order before paying.
    Cancelled,
    /// The payment attempt failed.
    Failed,
    /// The payment was refunded through the payment gateway.
    Refunded,
    /// The customer disputed the charge with their card issuer.
    Disputed,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        OrderStatusType::Pending,
        OrderStatusType::Paid,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
        OrderStatusType::Cancelled,
        OrderStatusType::Failed,
        OrderStatusType::Refunded,
        OrderStatusType::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "pending",
            OrderStatusType::Paid => "paid",
            OrderStatusType::Shipped => "shipped",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Cancelled => "cancelled",
            OrderStatusType::Failed => "failed",
            OrderStatusType::Refunded => "refunded",
            OrderStatusType::Disputed => "disputed",
        }
    }

    /// Cancelled, failed, refunded and disputed orders never return to the normal flow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatusType::Cancelled | OrderStatusType::Failed | OrderStatusType::Refunded | OrderStatusType::Disputed
        )
    }

    /// Orders in these states count towards revenue.
    pub fn is_revenue(&self) -> bool {
        matches!(self, OrderStatusType::Paid | OrderStatusType::Shipped | OrderStatusType::Delivered)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "disputed" => Ok(Self::Disputed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    DeliveryClass      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryClass {
    #[default]
    Standard,
    Express,
}

impl DeliveryClass {
    /// The flat delivery fee for this class, in pence.
    pub fn fee(&self) -> Money {
        match self {
            DeliveryClass::Standard => Money::from(399),
            DeliveryClass::Express => Money::from(499),
        }
    }

    /// Resolves a delivery class name. Anything unrecognised gets the cheapest class.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "express" => DeliveryClass::Express,
            _ => DeliveryClass::Standard,
        }
    }
}

impl Display for DeliveryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryClass::Standard => f.write_str("standard"),
            DeliveryClass::Express => f.write_str("express"),
        }
    }
}

impl<'de> Deserialize<'de> for DeliveryClass {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        let name = String::deserialize(deserializer)?;
        Ok(DeliveryClass::from_name(&name))
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

impl NewProduct {
    pub fn new<P: Into<ProductId>, S: Into<String>>(id: P, name: S, price: Money, stock: i64) -> Self {
        Self { id: id.into(), name: name.into(), price, stock }
    }
}

//--------------------------------------      LineRequest      ---------------------------------------------------------
/// A single cart line as submitted by the customer: which product, and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new<P: Into<ProductId>>(product_id: P, quantity: i64) -> Self {
        Self { product_id: product_id.into(), quantity }
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
/// A priced order line. The name and unit price are snapshots taken when the order was created.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: i64,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    /// True while this line holds a stock reservation.
    pub reserved: bool,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------       Customer        ---------------------------------------------------------
/// The authenticated identity placing or acting on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl Customer {
    pub fn new<U: Into<UserId>, S: Into<String>, E: Into<String>>(user_id: U, name: S, email: E) -> Self {
        Self { user_id: user_id.into(), name: name.into(), email: email.into() }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub delivery_class: DeliveryClass,
    pub delivery_fee: Money,
    pub total_price: Money,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_reference: Option<PaymentReference>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be persisted in the `pending` state.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer: Customer,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub delivery_class: DeliveryClass,
    pub delivery_fee: Money,
    pub total_price: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      SalesSummary     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_orders: i64,
    pub total_revenue: Money,
    pub orders_by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: OrderStatusType,
    pub count: i64,
}

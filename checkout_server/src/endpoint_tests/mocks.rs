use checkout_engine::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentReference, Product, ProductId, UserId},
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
use mockall::mock;

mock! {
    pub Backend {}
    impl OrderStore for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_order_by_payment_reference(&self, reference: &PaymentReference) -> Result<Option<Order>, OrderStoreError>;
        async fn fetch_orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderStoreError>;
        async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderStoreError>;
        async fn update_order_status(&self, id: &OrderId, from: &[OrderStatusType], to: OrderStatusType) -> Result<Option<Order>, OrderStoreError>;
        async fn overwrite_order_status(&self, id: &OrderId, to: OrderStatusType) -> Result<Option<Order>, OrderStoreError>;
        async fn set_payment_reference(&self, id: &OrderId, reference: &PaymentReference) -> Result<Option<Order>, OrderStoreError>;
    }
    impl StockLedger for Backend {
        async fn reserve(&self, product: &ProductId, quantity: i64) -> Result<bool, StockLedgerError>;
        async fn release(&self, product: &ProductId, quantity: i64) -> Result<(), StockLedgerError>;
        async fn stock_level(&self, product: &ProductId) -> Result<Option<i64>, StockLedgerError>;
        async fn reserve_order_line(&self, order_id: &OrderId, line_no: i64) -> Result<ReservationOutcome, StockLedgerError>;
        async fn release_order_line(&self, order_id: &OrderId, line_no: i64) -> Result<bool, StockLedgerError>;
    }
    impl ProductCatalog for Backend {
        async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;
    }
}

use std::collections::HashMap;

use checkout_engine::{
    db_types::{Customer, OrderId, PaymentReference},
    order_objects::ReconcileOutcome,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        stubs::{RecordingSender, StubGateway},
    },
    NotificationWorker,
    OrderFlowApi,
    OrderFlowError,
    OrderNotifier,
    OrderQueryApi,
    RetryPolicy,
    SqliteDatabase,
};
use cucumber::World;
use log::*;

pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Default, Debug, World)]
pub struct CheckoutWorld {
    pub system: Option<CheckoutSystem>,
}

#[derive(Debug)]
pub struct CheckoutSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: OrderFlowApi<SqliteDatabase, StubGateway>,
    pub queries: OrderQueryApi<SqliteDatabase>,
    pub emails: RecordingSender,
    pub orders: HashMap<String, OrderId>,
    pub references: HashMap<String, PaymentReference>,
    pub last_error: Option<OrderFlowError>,
    pub last_outcome: Option<ReconcileOutcome>,
}

impl CheckoutWorld {
    pub fn system(&mut self) -> &mut CheckoutSystem {
        self.system.as_mut().expect("Checkout system not initialised")
    }

    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase, StubGateway> {
        &self.system.as_ref().expect("Checkout system not initialised").api
    }
}

impl CheckoutSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let emails = RecordingSender::default();
        let worker = NotificationWorker::new(32, emails.clone(), RetryPolicy::default());
        let notifier = OrderNotifier::new(worker.dispatcher(), Some(ADMIN_EMAIL.to_string()));
        tokio::spawn(worker.run());
        let api = OrderFlowApi::new(db.clone(), StubGateway::default(), notifier);
        let queries = OrderQueryApi::new(db.clone());
        Self {
            db_path: url,
            db,
            api,
            queries,
            emails,
            orders: HashMap::new(),
            references: HashMap::new(),
            last_error: None,
            last_outcome: None,
        }
    }

    pub fn order_id(&self, alias: &str) -> OrderId {
        self.orders.get(alias).cloned().unwrap_or_else(|| panic!("No order called {alias}"))
    }

    pub fn reference(&self, alias: &str) -> PaymentReference {
        self.references.get(alias).cloned().unwrap_or_else(|| panic!("Order {alias} has no payment reference"))
    }
}

/// Test customers are identified by a single lowercase name, e.g. `alice`.
pub fn customer(name: &str) -> Customer {
    let mut display = name.to_string();
    if let Some(first) = display.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Customer::new(name, display, format!("{name}@example.com"))
}


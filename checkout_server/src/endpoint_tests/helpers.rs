use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use checkout_engine::{
    db_types::{DeliveryClass, Money, NewOrder, Order, OrderId, OrderItem, OrderStatusType, UserId},
    test_utils::stubs::StubGateway,
    OrderFlowApi,
    OrderNotifier,
    OrderQueryApi,
};
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::debug;

use super::mocks::MockBackend;
use crate::{
    auth::{JwtClaims, TokenValidator},
    config::AuthConfig,
};

// Only used to sign tokens in these tests
const TEST_JWT_SECRET: &str = "endpoint-tests-only-0a8f3c2e9d";

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn claims(user: &str, admin: bool) -> JwtClaims {
    JwtClaims {
        sub: user.to_string(),
        email: format!("{user}@example.com"),
        name: user.to_string(),
        admin,
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    }
}

pub fn issue_token(claims: &JwtClaims) -> String {
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), claims, &key).expect("Failed to sign token")
}

pub fn bearer(user: &str, admin: bool) -> String {
    format!("Bearer {}", issue_token(&claims(user, admin)))
}

/// Registers the engine APIs over the given mock, with a stub gateway and no email.
pub fn register_apis(cfg: &mut ServiceConfig, backend: MockBackend) -> &mut ServiceConfig {
    let flow = OrderFlowApi::new(backend, StubGateway::default(), OrderNotifier::silent());
    cfg.app_data(web::Data::new(flow))
}

/// Some endpoints need the query API too. Mocks can't be cloned, so it gets its own.
pub fn register_query_api(cfg: &mut ServiceConfig, backend: MockBackend) -> &mut ServiceConfig {
    cfg.app_data(web::Data::new(OrderQueryApi::new(backend)))
}

/// Sends the request through a test app and returns the status and body. Errors raised by middleware are turned into
/// their HTTP form, just as the real server does.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(web::Data::new(TokenValidator::new(&auth_config()))).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub fn order(id: &str, user: &str, status: OrderStatusType) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 10, 16, 9, 30, 0).unwrap();
    Order {
        id: OrderId::from(id.to_string()),
        user_id: UserId::from(user),
        customer_name: user.to_string(),
        customer_email: format!("{user}@example.com"),
        customer_phone: None,
        shipping_address: Some("1 High Street".into()),
        items: vec![OrderItem {
            line_no: 1,
            product_id: "oil-500".into(),
            product_name: "Olive oil".into(),
            unit_price: Money::from(1500),
            quantity: 2,
            reserved: status == OrderStatusType::Paid,
        }],
        subtotal: Money::from(3000),
        delivery_class: DeliveryClass::Standard,
        delivery_fee: Money::from(399),
        total_price: Money::from(3399),
        currency: "gbp".into(),
        status,
        payment_reference: None,
        created_at: created,
        updated_at: created,
    }
}

/// What the datastore would hand back after storing a new order.
pub fn stored(order: NewOrder) -> Order {
    Order {
        id: order.id,
        user_id: order.customer.user_id,
        customer_name: order.customer.name,
        customer_email: order.customer.email,
        customer_phone: order.customer_phone,
        shipping_address: order.shipping_address,
        items: order.items,
        subtotal: order.subtotal,
        delivery_class: order.delivery_class,
        delivery_fee: order.delivery_fee,
        total_price: order.total_price,
        currency: order.currency,
        status: OrderStatusType::Pending,
        payment_reference: None,
        created_at: order.created_at,
        updated_at: order.created_at,
    }
}

use actix_web::{http::StatusCode, test::TestRequest};
use checkout_engine::{
    db_types::{Money, OrderId, OrderStatusType, Product, UserId},
    test_utils::stubs::StubGateway,
};
use chrono::Utc;
use mockall::predicate::eq;
use serde_json::{json, Value};

use super::{
    helpers::{bearer, order, register_apis, register_query_api, send_request, stored},
    mocks::MockBackend,
};
use crate::routes::{CancelOrderRoute, CreateOrderRoute, MyOrdersRoute, OrderByIdRoute, PayForOrderRoute};

fn olive_oil() -> Product {
    Product {
        id: "oil-500".into(),
        name: "Olive oil".into(),
        price: Money::from(1500),
        stock: 10,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn create_order_without_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders").set_json(json!({"items": []}));
    let (status, body) = send_request(req, |cfg| {
        register_apis(cfg, MockBackend::new()).service(CreateOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token"), "{body}");
}

#[actix_web::test]
async fn create_order_with_bad_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", "Bearer not.a.token"))
        .set_json(json!({"items": []}));
    let (status, _) = send_request(req, |cfg| {
        register_apis(cfg, MockBackend::new()).service(CreateOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_order_prices_the_cart() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders").insert_header(("Authorization", bearer("alice", false))).set_json(
        json!({
            "items": [{"product_id": "oil-500", "quantity": 2}],
            "delivery_class": "express",
            "shipping_address": "1 High Street"
        }),
    );
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_product().returning(|_| Ok(Some(olive_oil())));
        backend.expect_insert_order().times(1).returning(|o| Ok(stored(o)));
        register_apis(cfg, backend).service(CreateOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["user_id"], "alice");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], 3000);
    assert_eq!(order["delivery_fee"], 499);
    assert_eq!(order["total_price"], 3499);
    assert_eq!(order["items"][0]["product_name"], "Olive oil");
}

#[actix_web::test]
async fn create_order_with_too_many_items() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", bearer("alice", false)))
        .set_json(json!({"items": [{"product_id": "oil-500", "quantity": 11}]}));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_product().returning(|_| Ok(Some(olive_oil())));
        backend.expect_insert_order().never();
        register_apis(cfg, backend).service(CreateOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Only 10 left of Olive oil"), "{body}");
}

#[actix_web::test]
async fn create_order_for_unknown_product() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", bearer("alice", false)))
        .set_json(json!({"items": [{"product_id": "ghost", "quantity": 1}]}));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_product().returning(|_| Ok(None));
        register_apis(cfg, backend).service(CreateOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("ghost"), "{body}");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/orders").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_fetch_orders_for_user()
            .with(eq(UserId::from("alice")))
            .returning(|_| {
                Ok(vec![order("ord-2", "alice", OrderStatusType::Paid), order("ord-1", "alice", OrderStatusType::Cancelled)])
            });
        register_query_api(cfg, backend).service(MyOrdersRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], "ord-2");
    assert_eq!(orders[1]["status"], "cancelled");
}

#[actix_web::test]
async fn fetch_someone_elses_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/orders/ord-1").insert_header(("Authorization", bearer("mallory", false)));
    let (status, _) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-1", "alice", OrderStatusType::Paid))));
        register_query_api(cfg, backend).service(OrderByIdRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/orders/ord-404").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().with(eq(OrderId::from("ord-404".to_string()))).returning(|_| Ok(None));
        register_query_api(cfg, backend).service(OrderByIdRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("#ord-404"), "{body}");
}

#[actix_web::test]
async fn cancel_pending_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::put().uri("/orders/ord-1/cancel").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-1", "alice", OrderStatusType::Pending))));
        backend
            .expect_update_order_status()
            .withf(|_, from, to| from.len() == 1 && from.contains(&OrderStatusType::Pending) && *to == OrderStatusType::Cancelled)
            .times(1)
            .returning(|_, _, _| Ok(Some(order("ord-1", "alice", OrderStatusType::Cancelled))));
        backend.expect_release_order_line().returning(|_, _| Ok(false));
        register_apis(cfg, backend).service(CancelOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["status"], "cancelled");
}

#[actix_web::test]
async fn cancel_paid_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::put().uri("/orders/ord-1/cancel").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-1", "alice", OrderStatusType::Paid))));
        backend.expect_update_order_status().never();
        register_apis(cfg, backend).service(CancelOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Cannot cancel order #ord-1 while it is paid"), "{body}");
}

#[actix_web::test]
async fn pay_for_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders/ord-1/pay").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-1", "alice", OrderStatusType::Pending))));
        backend.expect_set_payment_reference().times(1).returning(|_, r| {
            let mut o = order("ord-1", "alice", OrderStatusType::Pending);
            o.payment_reference = Some(r.clone());
            Ok(Some(o))
        });
        register_apis(cfg, backend).service(PayForOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let payment: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payment["order_id"], "ord-1");
    assert_eq!(payment["amount"], 3399);
    assert_eq!(payment["payment_reference"], "pi_test_1");
    assert_eq!(payment["client_secret"], "pi_test_1_secret");
}

#[actix_web::test]
async fn pay_twice() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders/ord-1/pay").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_id().returning(|_| {
            let mut o = order("ord-1", "alice", OrderStatusType::Pending);
            o.payment_reference = Some("pi_earlier".into());
            Ok(Some(o))
        });
        backend.expect_set_payment_reference().never();
        register_apis(cfg, backend).service(PayForOrderRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("already been started"), "{body}");
}

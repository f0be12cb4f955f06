use actix_web::{http::StatusCode, test::TestRequest};
use checkout_engine::{db_types::OrderStatusType, test_utils::stubs::StubGateway};
use serde_json::{json, Value};

use super::{
    helpers::{bearer, order, register_apis, register_query_api, send_request},
    mocks::MockBackend,
};
use crate::routes::{AllOrdersRoute, SalesSummaryRoute, UpdateOrderStatusRoute};

fn all_orders_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_all_orders().returning(|| {
        Ok(vec![
            order("ord-3", "carol", OrderStatusType::Shipped),
            order("ord-2", "bob", OrderStatusType::Paid),
            order("ord-1", "alice", OrderStatusType::Refunded),
        ])
    });
    backend
}

#[actix_web::test]
async fn list_all_orders_as_admin() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/admin/orders").insert_header(("Authorization", bearer("root", true)));
    let (status, body) = send_request(req, |cfg| {
        register_query_api(cfg, all_orders_backend()).service(AllOrdersRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let orders: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[2]["user_id"], "alice");
}

#[actix_web::test]
async fn list_all_orders_as_customer() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/admin/orders").insert_header(("Authorization", bearer("alice", false)));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_all_orders().never();
        register_query_api(cfg, backend).service(AllOrdersRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"), "{body}");
}

#[actix_web::test]
async fn list_all_orders_without_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/admin/orders");
    let (status, _) = send_request(req, |cfg| {
        register_query_api(cfg, MockBackend::new()).service(AllOrdersRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn sales_summary() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/admin/analytics/sales").insert_header(("Authorization", bearer("root", true)));
    let (status, body) = send_request(req, |cfg| {
        register_query_api(cfg, all_orders_backend()).service(SalesSummaryRoute::<MockBackend>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["total_orders"], 3);
    // shipped and paid count, refunded does not
    assert_eq!(summary["total_revenue"], 2 * 3399);
    assert_eq!(
        summary["orders_by_status"],
        json!([{"status": "paid", "count": 1}, {"status": "shipped", "count": 1}, {"status": "refunded", "count": 1}])
    );
}

#[actix_web::test]
async fn ship_an_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch()
        .uri("/admin/orders/ord-2/status")
        .insert_header(("Authorization", bearer("root", true)))
        .set_json(json!({"status": "shipped"}));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_overwrite_order_status()
            .withf(|id, to| id.as_str() == "ord-2" && *to == OrderStatusType::Shipped)
            .times(1)
            .returning(|_, _| Ok(Some(order("ord-2", "bob", OrderStatusType::Shipped))));
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-2", "bob", OrderStatusType::Shipped))));
        backend.expect_release_order_line().never();
        register_apis(cfg, backend).service(UpdateOrderStatusRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["status"], "shipped");
}

#[actix_web::test]
async fn refunding_by_hand_returns_stock() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch()
        .uri("/admin/orders/ord-2/status")
        .insert_header(("Authorization", bearer("root", true)))
        .set_json(json!({"status": "Refunded"}));
    let (status, _) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_overwrite_order_status()
            .returning(|_, _| Ok(Some(order("ord-2", "bob", OrderStatusType::Refunded))));
        backend.expect_release_order_line().times(1).returning(|_, _| Ok(true));
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(order("ord-2", "bob", OrderStatusType::Refunded))));
        register_apis(cfg, backend).service(UpdateOrderStatusRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_status() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch()
        .uri("/admin/orders/ord-2/status")
        .insert_header(("Authorization", bearer("root", true)))
        .set_json(json!({"status": "lost"}));
    let (status, body) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_overwrite_order_status().never();
        register_apis(cfg, backend).service(UpdateOrderStatusRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid order status: lost"), "{body}");
}

#[actix_web::test]
async fn status_of_missing_order() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch()
        .uri("/admin/orders/ord-404/status")
        .insert_header(("Authorization", bearer("root", true)))
        .set_json(json!({"status": "delivered"}));
    let (status, _) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_overwrite_order_status().returning(|_, _| Ok(None));
        register_apis(cfg, backend).service(UpdateOrderStatusRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn customers_cannot_set_status() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch()
        .uri("/admin/orders/ord-2/status")
        .insert_header(("Authorization", bearer("bob", false)))
        .set_json(json!({"status": "delivered"}));
    let (status, _) = send_request(req, |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_overwrite_order_status().never();
        register_apis(cfg, backend).service(UpdateOrderStatusRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

use actix_web::{http::StatusCode, test::TestRequest};
use checkout_engine::{
    db_types::{Order, OrderStatusType, PaymentReference},
    test_utils::stubs::StubGateway,
    traits::{OrderStoreError, ReservationOutcome},
};
use mockall::predicate::eq;
use serde_json::Value;

use super::{
    helpers::{order, register_apis, send_request},
    mocks::MockBackend,
};
use crate::routes::StripeWebhookRoute;

fn webhook(body: &'static str) -> TestRequest {
    TestRequest::post().uri("/webhook/stripe").insert_header(("Stripe-Signature", "t=1,v1=00")).set_payload(body)
}

fn outcome(body: &str) -> String {
    let ack: Value = serde_json::from_str(body).unwrap();
    assert_eq!(ack["received"], true);
    ack["outcome"].as_str().unwrap().to_string()
}

fn with_reference(status: OrderStatusType) -> Order {
    let mut o = order("ord-1", "alice", status);
    o.payment_reference = Some(PaymentReference::from("pi_1"));
    o
}

#[actix_web::test]
async fn payment_succeeded() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("payment_intent.succeeded pi_1"), |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_fetch_order_by_payment_reference()
            .with(eq(PaymentReference::from("pi_1")))
            .returning(|_| Ok(Some(with_reference(OrderStatusType::Pending))));
        backend
            .expect_update_order_status()
            .withf(|_, from, to| from.contains(&OrderStatusType::Pending) && *to == OrderStatusType::Paid)
            .times(1)
            .returning(|_, _, _| Ok(Some(with_reference(OrderStatusType::Paid))));
        backend.expect_reserve_order_line().times(1).returning(|_, _| Ok(ReservationOutcome::Reserved));
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(with_reference(OrderStatusType::Paid))));
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(outcome(&body), "applied");
}

#[actix_web::test]
async fn repeated_delivery() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("payment_intent.succeeded pi_1"), |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_payment_reference().returning(|_| Ok(Some(with_reference(OrderStatusType::Paid))));
        backend.expect_update_order_status().never();
        backend.expect_reserve_order_line().never();
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome(&body), "already_applied");
}

#[actix_web::test]
async fn unknown_reference() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("payment_intent.payment_failed pi_nobody"), |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_payment_reference().returning(|_| Ok(None));
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome(&body), "unknown_reference");
}

#[actix_web::test]
async fn failure_after_payment_returns_stock() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("payment_intent.payment_failed pi_1"), |cfg| {
        let mut backend = MockBackend::new();
        backend.expect_fetch_order_by_payment_reference().returning(|_| Ok(Some(with_reference(OrderStatusType::Paid))));
        backend
            .expect_update_order_status()
            .withf(|_, from, to| {
                from.contains(&OrderStatusType::Paid) &&
                    !from.contains(&OrderStatusType::Failed) &&
                    *to == OrderStatusType::Failed
            })
            .times(1)
            .returning(|_, _, _| Ok(Some(with_reference(OrderStatusType::Failed))));
        backend.expect_release_order_line().times(1).returning(|_, _| Ok(true));
        backend.expect_fetch_order_by_id().returning(|_| Ok(Some(with_reference(OrderStatusType::Failed))));
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(outcome(&body), "applied");
}

#[actix_web::test]
async fn repeated_failure_notice() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("payment_intent.payment_failed pi_1"), |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_fetch_order_by_payment_reference()
            .returning(|_| Ok(Some(with_reference(OrderStatusType::Failed))));
        backend.expect_update_order_status().never();
        backend.expect_release_order_line().never();
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome(&body), "already_applied");
}

#[actix_web::test]
async fn unhandled_event_kind() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("customer.created cus_1"), |cfg| {
        register_apis(cfg, MockBackend::new()).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome(&body), "ignored");
}

#[actix_web::test]
async fn malformed_payload() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(webhook("gibberish"), |cfg| {
        register_apis(cfg, MockBackend::new()).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Webhook rejected"), "{body}");
}

#[actix_web::test]
async fn backend_failure_asks_for_redelivery() {
    let _ = env_logger::try_init();
    let (status, _) = send_request(webhook("charge.refunded pi_1"), |cfg| {
        let mut backend = MockBackend::new();
        backend
            .expect_fetch_order_by_payment_reference()
            .returning(|_| Err(OrderStoreError::DatabaseError("locked".into())));
        register_apis(cfg, backend).service(StripeWebhookRoute::<MockBackend, StubGateway>::new());
    })
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

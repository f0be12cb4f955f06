use std::time::Duration;

use checkout_engine::{
    db_types::{DeliveryClass, LineRequest, Money, OrderStatusType, ProductId},
    order_objects::{NewOrderRequest, ReconcileOutcome},
    traits::{GatewayEvent, PaymentGateway, StockLedger},
};
use cucumber::{then, when};
use log::*;

use crate::cucumber::{checkout_world::customer, CheckoutWorld};

fn order_request(quantity: i64, product: &str, delivery: &str) -> NewOrderRequest {
    NewOrderRequest {
        items: vec![LineRequest::new(product, quantity)],
        delivery_class: DeliveryClass::from_name(delivery),
        shipping_address: Some("1 Test Street, London".into()),
        phone: None,
    }
}

#[when(expr = "{word} orders {int} of product {word} with {word} delivery as order {word}")]
async fn place_order(world: &mut CheckoutWorld, who: String, quantity: i64, product: String, delivery: String, alias: String) {
    let request = order_request(quantity, &product, &delivery);
    let order = world.api().create_order(customer(&who), request).await.expect("Error placing order");
    debug!("Order {alias} is {}", order.id);
    world.system().orders.insert(alias, order.id);
}

#[when(expr = "{word} tries to order {int} of product {word} with {word} delivery")]
async fn try_order(world: &mut CheckoutWorld, who: String, quantity: i64, product: String, delivery: String) {
    let request = order_request(quantity, &product, &delivery);
    let result = world.api().create_order(customer(&who), request).await;
    world.system().last_error = result.err();
}

#[when(expr = "{word} starts payment for order {word}")]
async fn start_payment(world: &mut CheckoutWorld, who: String, alias: String) {
    let order_id = world.system().order_id(&alias);
    let user = customer(&who).user_id;
    match world.api().initialize_payment(&order_id, &user).await {
        Ok(payment) => {
            world.system().references.insert(alias, payment.payment_reference);
        },
        Err(e) => {
            debug!("Payment for order {alias} was refused: {e}");
            world.system().last_error = Some(e);
        },
    }
}

#[when(expr = "{word} cancels order {word}")]
async fn cancel_order(world: &mut CheckoutWorld, who: String, alias: String) {
    let order_id = world.system().order_id(&alias);
    let user = customer(&who).user_id;
    let result = world.api().cancel_order(&order_id, &user).await;
    world.system().last_error = result.err();
}

#[when(expr = "the admin sets order {word} to '{word}'")]
async fn admin_sets_status(world: &mut CheckoutWorld, alias: String, status: String) {
    let order_id = world.system().order_id(&alias);
    let status = status.parse::<OrderStatusType>().expect("Invalid status");
    world.api().update_status(&order_id, status).await.expect("Error updating order status");
}

async fn reconcile(world: &mut CheckoutWorld, event: GatewayEvent) {
    let outcome = world.api().reconcile(event).await.expect("Error reconciling gateway event");
    world.system().last_outcome = Some(outcome);
}

#[when(expr = "the gateway reports that payment for order {word} succeeded")]
async fn payment_succeeded(world: &mut CheckoutWorld, alias: String) {
    let reference = world.system().reference(&alias);
    reconcile(world, GatewayEvent::PaymentSucceeded { reference, amount: None }).await;
}

#[when(expr = "the gateway reports that payment for order {word} failed")]
async fn payment_failed(world: &mut CheckoutWorld, alias: String) {
    let reference = world.system().reference(&alias);
    reconcile(world, GatewayEvent::PaymentFailed { reference, reason: Some("card_declined".into()) }).await;
}

#[when(expr = "the gateway reports that payment for order {word} was refunded")]
async fn payment_refunded(world: &mut CheckoutWorld, alias: String) {
    let reference = world.system().reference(&alias);
    reconcile(world, GatewayEvent::Refunded { reference }).await;
}

#[when(expr = "the gateway reports that payment for order {word} was disputed")]
async fn payment_disputed(world: &mut CheckoutWorld, alias: String) {
    let reference = world.system().reference(&alias);
    reconcile(world, GatewayEvent::Disputed { reference }).await;
}

#[when(expr = "the gateway sends the webhook {string}")]
async fn raw_webhook(world: &mut CheckoutWorld, payload: String) {
    let event = world.api().gateway().verify_webhook(payload.as_bytes(), None).expect("Webhook was rejected");
    reconcile(world, event).await;
}

#[when(expr = "the payments for orders {word} and {word} succeed at the same time")]
async fn simultaneous_payments(world: &mut CheckoutWorld, first: String, second: String) {
    let ref_a = world.system().reference(&first);
    let ref_b = world.system().reference(&second);
    let api = world.api();
    let (a, b) = tokio::join!(
        api.reconcile(GatewayEvent::PaymentSucceeded { reference: ref_a, amount: None }),
        api.reconcile(GatewayEvent::PaymentSucceeded { reference: ref_b, amount: None })
    );
    assert_eq!(a.expect("Error reconciling first payment"), ReconcileOutcome::Applied);
    assert_eq!(b.expect("Error reconciling second payment"), ReconcileOutcome::Applied);
}

#[then(expr = "the last action failed with {string}")]
async fn last_action_failed(world: &mut CheckoutWorld, expected: String) {
    let err = world.system().last_error.take().expect("The last action did not fail");
    let message = err.to_string();
    assert!(message.contains(&expected), "Expected error containing '{expected}', got '{message}'");
}

#[then(expr = "order {word} has {word} of '{word}'")]
async fn order_field(world: &mut CheckoutWorld, alias: String, field: String, expected: String) {
    let order_id = world.system().order_id(&alias);
    let order = world.system().queries.order_by_id(&order_id).await.expect("Error fetching order").expect("No order");
    let money = |m: Money| m.to_decimal_string();
    let actual = match field.as_str() {
        "status" => order.status.to_string(),
        "subtotal" => money(order.subtotal),
        "delivery_fee" => money(order.delivery_fee),
        "total_price" => money(order.total_price),
        "delivery_class" => order.delivery_class.to_string(),
        other => panic!("Unknown order field {other}"),
    };
    assert_eq!(actual, expected, "Order {alias} {field}");
}

#[then(expr = "product {word} has {int} in stock")]
async fn stock_level(world: &mut CheckoutWorld, product: String, expected: i64) {
    let level = world.system().db.stock_level(&ProductId::from(product)).await.expect("Error fetching stock level");
    assert_eq!(level, Some(expected));
}

#[then(expr = "the last reconcile outcome is '{word}'")]
async fn last_outcome(world: &mut CheckoutWorld, expected: String) {
    let outcome = world.system().last_outcome.expect("Nothing has been reconciled");
    let actual = serde_json::to_value(outcome).expect("Outcome is serializable");
    assert_eq!(actual.as_str(), Some(expected.as_str()));
}

#[then(expr = "{int} notifications are sent to '{word}'")]
async fn notifications_sent(world: &mut CheckoutWorld, expected: usize, recipient: String) {
    let emails = world.system().emails.clone();
    let count = || emails.sent().iter().filter(|n| n.recipient == recipient).count();
    for _ in 0..50 {
        if count() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // give stray messages a moment to show up before counting
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(count(), expected, "Notifications to {recipient}");
}

#[then(expr = "exactly {int} of orders {word} and {word} holds stock")]
async fn orders_holding_stock(world: &mut CheckoutWorld, expected: usize, first: String, second: String) {
    let mut holding = 0;
    for alias in [first, second] {
        let order_id = world.system().order_id(&alias);
        let order = world.system().queries.order_by_id(&order_id).await.expect("Error fetching order").expect("No order");
        if order.items.iter().all(|i| i.reserved) {
            holding += 1;
        } else {
            assert!(order.items.iter().all(|i| !i.reserved), "Order {alias} is partially reserved");
        }
    }
    assert_eq!(holding, expected);
}

#[then(expr = "the sales summary shows {int} orders and revenue of '{word}'")]
async fn sales_summary(world: &mut CheckoutWorld, orders: i64, revenue: String) {
    let summary = world.system().queries.sales_summary().await.expect("Error fetching sales summary");
    assert_eq!(summary.total_orders, orders);
    assert_eq!(summary.total_revenue, revenue.parse::<Money>().expect("Invalid amount"));
}

#[then(expr = "{word} has {int} orders, newest first")]
async fn orders_for_customer(world: &mut CheckoutWorld, who: String, expected: usize) {
    let user = customer(&who).user_id;
    let orders = world.system().queries.orders_for_user(&user).await.expect("Error fetching orders");
    assert_eq!(orders.len(), expected, "Orders for {who}");
    assert!(orders.iter().all(|o| o.user_id == user));
    assert!(orders.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[then(expr = "there are {int} orders in total")]
async fn all_orders(world: &mut CheckoutWorld, expected: usize) {
    let orders = world.system().queries.all_orders().await.expect("Error fetching orders");
    assert_eq!(orders.len(), expected);
}

//! The order lifecycle manager.
//!
//! ```text
//!                      ┌──────────► cancelled   (customer, while pending)
//!                      │
//!   create ──► pending ┼──────────► failed      (gateway: payment failed, from any state)
//!                      │
//!                      └──► paid ─┬─► refunded  (gateway: refund, from pending or paid)
//!                                 └─► disputed  (gateway: dispute, from pending or paid)
//! ```
//!
//! Admins can additionally overwrite the status of any order (e.g. to `shipped` or `delivered`).
//!
//! Stock is only held by paid orders. It is reserved line by line straight after the `paid` write lands, and returned
//! whenever an order moves to a terminal state. A reservation that fails for lack of stock is logged, but it never
//! undoes a payment the gateway has already confirmed.
use std::fmt::Debug;

use chrono::Utc;
use cpg_common::DEFAULT_CURRENCY_CODE;
use log::*;

use crate::{
    cpe_api::{
        errors::OrderFlowError,
        order_objects::{NewOrderRequest, PaymentInitialization, ReconcileOutcome, TransitionOutcome},
    },
    db_types::{
        Customer,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        OrderStatusType::{Cancelled, Disputed, Failed, Paid, Pending, Refunded, Shipped},
        PaymentReference,
        UserId,
    },
    notifications::OrderNotifier,
    pricing::price_order,
    traits::{
        GatewayEvent,
        OrderStore,
        PaymentGateway,
        PaymentIntentRequest,
        ProductCatalog,
        ReservationOutcome,
        StockLedger,
    },
};

/// `OrderFlowApi` is the primary API for moving orders through their lifecycle, in response to customer actions,
/// admin actions and payment gateway events.
///
/// It holds no state of its own between calls. All consistency comes from conditional writes in the backend.
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    notifier: OrderNotifier,
    currency: String,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.currency)
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, notifier: OrderNotifier) -> Self {
        Self { db, gateway, notifier, currency: DEFAULT_CURRENCY_CODE.to_string() }
    }

    /// Sets the currency that new orders are priced and charged in.
    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: OrderStore + StockLedger + ProductCatalog,
    G: PaymentGateway,
{
    /// Prices the cart and stores a new `pending` order for the customer. No stock is held until the order is paid.
    ///
    /// Fails with a validation error for an empty cart, and with `InvalidReference` or `InsufficientStock` if any line
    /// cannot be priced. Nothing is written in that case.
    pub async fn create_order(&self, customer: Customer, request: NewOrderRequest) -> Result<Order, OrderFlowError> {
        if customer.email.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("A customer email address is required".into()));
        }
        let priced = price_order(&self.db, &request.items, request.delivery_class).await?;
        let order = NewOrder {
            id: OrderId::random(),
            customer,
            customer_phone: request.phone,
            shipping_address: request.shipping_address,
            items: priced.items,
            subtotal: priced.subtotal,
            delivery_class: priced.delivery_class,
            delivery_fee: priced.delivery_fee,
            total_price: priced.total_price,
            currency: self.currency.clone(),
            created_at: Utc::now(),
        };
        let order = self.db.insert_order(order).await?;
        info!(
            "🔄️📦️ Order {} created for {} with {} lines. Total {}",
            order.id,
            order.user_id,
            order.items.len(),
            order.total_price
        );
        self.notifier.order_created(&order);
        Ok(order)
    }

    /// Cancels a pending order on behalf of its owner.
    pub async fn cancel_order(&self, order_id: &OrderId, user: &UserId) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if !order.is_owned_by(user) {
            warn!("🔄️❌️ User {user} tried to cancel order {order_id}, which belongs to {}", order.user_id);
            return Err(OrderFlowError::Unauthorized(format!("Order {order_id} does not belong to you")));
        }
        if order.status != Pending {
            return Err(invalid_transition(&order, "cancel"));
        }
        match self.db.update_order_status(order_id, &[Pending], Cancelled).await? {
            Some(order) => {
                self.release_stock(&order).await;
                info!("🔄️❌️ Order {order_id} cancelled by its owner");
                Ok(order)
            },
            None => {
                let current = self.fetch_order(order_id).await?;
                Err(invalid_transition(&current, "cancel"))
            },
        }
    }

    /// Opens a payment intent with the gateway for the order total, and records the intent id as the order's payment
    /// reference.
    ///
    /// Only the owner can pay for an order, only while it is pending, and only once: an order that already carries a
    /// payment reference is rejected.
    pub async fn initialize_payment(
        &self,
        order_id: &OrderId,
        user: &UserId,
    ) -> Result<PaymentInitialization, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        if !order.is_owned_by(user) {
            warn!("🔄️💳️ User {user} tried to pay for order {order_id}, which belongs to {}", order.user_id);
            return Err(OrderFlowError::Unauthorized(format!("Order {order_id} does not belong to you")));
        }
        if order.status != Pending {
            return Err(invalid_transition(&order, "pay for"));
        }
        if !order.total_price.is_positive() {
            return Err(OrderFlowError::ValidationError(format!("Order {order_id} has nothing to pay")));
        }
        if let Some(reference) = &order.payment_reference {
            debug!("🔄️💳️ Order {order_id} already has payment {reference}");
            return Err(already_started(order_id));
        }
        let request = PaymentIntentRequest {
            order_id: order.id.clone(),
            amount: order.total_price,
            currency: order.currency.clone(),
            customer_email: order.customer_email.clone(),
            customer_name: order.customer_name.clone(),
            metadata: vec![
                ("order_id".into(), order.id.as_str().to_string()),
                ("user_email".into(), order.customer_email.clone()),
                ("user_name".into(), order.customer_name.clone()),
                ("delivery_type".into(), order.delivery_class.to_string()),
                ("subtotal".into(), order.subtotal.to_decimal_string()),
                ("shipping_fee".into(), order.delivery_fee.to_decimal_string()),
                ("total_price".into(), order.total_price.to_decimal_string()),
            ],
        };
        let intent = self.gateway.create_intent(request).await?;
        if self.db.set_payment_reference(order_id, &intent.reference).await?.is_none() {
            warn!(
                "🔄️💳️ Order {order_id} was given a payment reference by a concurrent request. Intent {} is orphaned.",
                intent.reference
            );
            return Err(already_started(order_id));
        }
        info!("🔄️💳️ Payment {} opened for order {order_id} ({})", intent.reference, order.total_price);
        Ok(PaymentInitialization {
            order_id: order.id,
            amount: order.total_price,
            currency: order.currency,
            payment_reference: intent.reference,
            client_secret: intent.client_secret,
        })
    }

    /// Marks the order carrying this payment reference as paid, then reserves stock for each of its lines.
    ///
    /// Calling this again for an order that is already paid succeeds without touching stock or sending email.
    pub async fn mark_paid(&self, reference: &PaymentReference) -> Result<TransitionOutcome, OrderFlowError> {
        let order = self.fetch_order_by_reference(reference).await?;
        match order.status {
            Paid => {
                debug!("🔄️✅️ Order {} is already paid. Nothing to do.", order.id);
                return Ok(TransitionOutcome::AlreadyApplied(order));
            },
            Pending => {},
            _ => return Err(invalid_transition(&order, "mark as paid")),
        }
        let order = match self.db.update_order_status(&order.id, &[Pending], Paid).await? {
            Some(o) => o,
            None => {
                let current = self.fetch_order(&order.id).await?;
                return if current.status == Paid {
                    Ok(TransitionOutcome::AlreadyApplied(current))
                } else {
                    Err(invalid_transition(&current, "mark as paid"))
                };
            },
        };
        info!("🔄️✅️ Order {} has been paid ({})", order.id, order.total_price);
        self.reserve_stock(&order).await;
        let order = self.refresh(order).await;
        self.notifier.payment_succeeded(&order);
        Ok(TransitionOutcome::Applied(order))
    }

    /// Marks an order as failed, from whatever state it is in, and notifies the customer. Any stock the order holds is
    /// returned.
    pub async fn mark_failed(&self, reference: &PaymentReference) -> Result<TransitionOutcome, OrderFlowError> {
        let order = self.fetch_order_by_reference(reference).await?;
        if order.status == Failed {
            return Ok(TransitionOutcome::AlreadyApplied(order));
        }
        let previous = order.status;
        let from = OrderStatusType::ALL.into_iter().filter(|s| *s != Failed).collect::<Vec<_>>();
        let order = match self.db.update_order_status(&order.id, &from, Failed).await? {
            Some(o) => o,
            None => {
                let current = self.fetch_order(&order.id).await?;
                return Ok(TransitionOutcome::AlreadyApplied(current));
            },
        };
        if previous != Pending {
            warn!("🔄️❌️ Order {} was {previous} when the gateway reported its payment as failed", order.id);
        }
        info!("🔄️❌️ Payment for order {} failed", order.id);
        self.release_stock(&order).await;
        let order = self.refresh(order).await;
        self.notifier.payment_failed(&order);
        Ok(TransitionOutcome::Applied(order))
    }

    /// Marks a pending or paid order as refunded and returns any stock it holds. Any other state is left alone.
    pub async fn mark_refunded(&self, reference: &PaymentReference) -> Result<TransitionOutcome, OrderFlowError> {
        self.compensate(reference, Refunded).await
    }

    /// Marks a pending or paid order as disputed and returns any stock it holds. Any other state is left alone.
    pub async fn mark_disputed(&self, reference: &PaymentReference) -> Result<TransitionOutcome, OrderFlowError> {
        self.compensate(reference, Disputed).await
    }

    async fn compensate(
        &self,
        reference: &PaymentReference,
        to: OrderStatusType,
    ) -> Result<TransitionOutcome, OrderFlowError> {
        let order = self.fetch_order_by_reference(reference).await?;
        if order.status == to {
            return Ok(TransitionOutcome::AlreadyApplied(order));
        }
        match self.db.update_order_status(&order.id, &[Pending, Paid], to).await? {
            Some(order) => {
                info!("🔄️↩️ Order {} is now {to}", order.id);
                self.release_stock(&order).await;
                let order = self.refresh(order).await;
                Ok(TransitionOutcome::Applied(order))
            },
            None => {
                let current = self.fetch_order(&order.id).await?;
                if current.status == to {
                    Ok(TransitionOutcome::AlreadyApplied(current))
                } else {
                    debug!("🔄️↩️ Order {} is {}. Not marking it as {to}.", current.id, current.status);
                    Ok(TransitionOutcome::NoOp(current))
                }
            },
        }
    }

    /// Admin override. Sets the order status to anything, bypassing the lifecycle rules.
    ///
    /// Stock still follows the status: moving to a terminal state returns held stock, moving to `paid` reserves it.
    /// Moving to `shipped` emails the customer.
    pub async fn update_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .overwrite_order_status(order_id, status)
            .await?
            .ok_or_else(|| OrderFlowError::order_not_found(order_id))?;
        info!("🔄️🪛️ Order {order_id} status set to {status} by an admin");
        if status.is_terminal() {
            self.release_stock(&order).await;
        } else if status == Paid {
            self.reserve_stock(&order).await;
        }
        let order = self.refresh(order).await;
        if status == Shipped {
            self.notifier.order_shipped(&order);
        }
        Ok(order)
    }

    /// Applies a verified gateway event.
    ///
    /// Gateway deliveries repeat and arrive out of order, so unknown references and events that no longer apply are
    /// logged and reported as outcomes rather than errors. Only backend failures are returned as errors, so that the
    /// gateway retries the delivery.
    pub async fn reconcile(&self, event: GatewayEvent) -> Result<ReconcileOutcome, OrderFlowError> {
        trace!("🔄️💳️ Reconciling {} event", event.kind());
        let result = match &event {
            GatewayEvent::PaymentSucceeded { reference, amount } => {
                let result = self.mark_paid(reference).await;
                if let (Ok(TransitionOutcome::Applied(order)), Some(amount)) = (&result, amount) {
                    if *amount != order.total_price {
                        warn!(
                            "🔄️💳️ Payment {reference} was for {amount}, but order {} totals {}",
                            order.id, order.total_price
                        );
                    }
                }
                result
            },
            GatewayEvent::PaymentFailed { reference, reason } => {
                if let Some(reason) = reason {
                    debug!("🔄️💳️ Payment {reference} failed: {reason}");
                }
                self.mark_failed(reference).await
            },
            GatewayEvent::Refunded { reference } => self.mark_refunded(reference).await,
            GatewayEvent::Disputed { reference } => self.mark_disputed(reference).await,
            GatewayEvent::Unrecognized { kind } => {
                info!("🔄️💳️ Ignoring unhandled gateway event: {kind}");
                return Ok(ReconcileOutcome::Ignored);
            },
        };
        match result {
            Ok(TransitionOutcome::Applied(_)) => Ok(ReconcileOutcome::Applied),
            Ok(TransitionOutcome::AlreadyApplied(_)) => Ok(ReconcileOutcome::AlreadyApplied),
            Ok(TransitionOutcome::NoOp(_)) => Ok(ReconcileOutcome::NoOp),
            Err(OrderFlowError::NotFound(what)) => {
                warn!("🔄️💳️ Received a {} event, but {what} does not exist", event.kind());
                Ok(ReconcileOutcome::UnknownReference)
            },
            Err(e @ OrderFlowError::InvalidTransition { .. }) => {
                warn!("🔄️💳️ Ignoring {} event: {e}", event.kind());
                Ok(ReconcileOutcome::NoOp)
            },
            Err(e) => Err(e),
        }
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_id(order_id).await?.ok_or_else(|| OrderFlowError::order_not_found(order_id))
    }

    async fn fetch_order_by_reference(&self, reference: &PaymentReference) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_by_payment_reference(reference)
            .await?
            .ok_or_else(|| OrderFlowError::reference_not_found(reference))
    }

    /// Re-reads the order so that callers see the reservation flags as they now stand.
    async fn refresh(&self, order: Order) -> Order {
        match self.db.fetch_order_by_id(&order.id).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => order,
            Err(e) => {
                warn!("🔄️ Could not re-read order {}: {e}", order.id);
                order
            },
        }
    }

    async fn reserve_stock(&self, order: &Order) {
        for item in &order.items {
            match self.db.reserve_order_line(&order.id, item.line_no).await {
                Ok(ReservationOutcome::Reserved) => {
                    trace!("🔄️📦️ Reserved {} x {} for order {}", item.quantity, item.product_id, order.id);
                },
                Ok(ReservationOutcome::AlreadyReserved) => {
                    trace!("🔄️📦️ Line {} of order {} is already reserved", item.line_no, order.id);
                },
                Ok(ReservationOutcome::InsufficientStock) => {
                    error!(
                        "🔄️📦️ Order {} is paid, but there is not enough stock of {} ({}) to cover {} units. The payment \
                         stands. This line needs manual attention.",
                        order.id, item.product_name, item.product_id, item.quantity
                    );
                },
                Ok(ReservationOutcome::OrderNotPaid) => {
                    warn!("🔄️📦️ Order {} left the paid state before line {} was reserved", order.id, item.line_no);
                },
                Err(e) => {
                    error!("🔄️📦️ Could not reserve stock for line {} of order {}: {e}", item.line_no, order.id);
                },
            }
        }
    }

    async fn release_stock(&self, order: &Order) {
        for item in &order.items {
            match self.db.release_order_line(&order.id, item.line_no).await {
                Ok(true) => debug!("🔄️📦️ Returned {} x {} from order {}", item.quantity, item.product_id, order.id),
                Ok(false) => {},
                Err(e) => {
                    error!("🔄️📦️ Could not return stock for line {} of order {}: {e}", item.line_no, order.id);
                },
            }
        }
    }
}

fn invalid_transition(order: &Order, action: &'static str) -> OrderFlowError {
    OrderFlowError::InvalidTransition { order_id: order.id.clone(), status: order.status, action }
}

fn already_started(order_id: &OrderId) -> OrderFlowError {
    OrderFlowError::ValidationError(format!("A payment has already been started for order {order_id}"))
}

//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a few lines belong in the engine, not here.
//!
//! Every handler is async. Database and gateway calls are awaited, so a slow request never blocks the worker thread
//! that is serving it.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    db_types::{OrderId, OrderStatusType},
    order_objects::NewOrderRequest,
    traits::{OrderStore, PaymentGateway, ProductCatalog, StockLedger},
    OrderFlowApi,
    OrderQueryApi,
};
use log::*;
use stripe_tools::webhook::SIGNATURE_HEADER;

use crate::{
    auth::{JwtClaims, Role},
    data_objects::{UpdateStatusRequest, WebhookAck},
    errors::ServerError,
};

/// Everything the order lifecycle needs from a datastore.
pub trait CheckoutBackend: OrderStore + StockLedger + ProductCatalog {}

impl<T> CheckoutBackend for T where T: OrderStore + StockLedger + ProductCatalog {}

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn parse_order_id(path: web::Path<String>) -> Result<OrderId, ServerError> {
    OrderId::from_str(&path.into_inner()).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl CheckoutBackend, PaymentGateway);
/// Places a new order for the caller.
///
/// The cart is priced from the current catalog and the order is stored as `pending`. Responds with `201 Created` and
/// the stored order, including the computed subtotal, delivery fee and total.
pub async fn create_order<B, G>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    G: PaymentGateway,
{
    debug!("💻️ POST create_order for {}", claims.sub);
    let order = api.create_order(claims.customer(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderStore);
/// The caller's orders, newest first.
pub async fn my_orders<B: OrderStore>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.orders_for_user(&claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderStore);
/// A single order. Asking for someone else's order is a 403, which is distinct from the 404 for an order that does not
/// exist.
pub async fn order_by_id<B: OrderStore>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_order_id(path)?;
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api.order_for_user(&order_id, &claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Put "/orders/{order_id}/cancel" impl CheckoutBackend, PaymentGateway);
pub async fn cancel_order<B, G>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    G: PaymentGateway,
{
    let order_id = parse_order_id(path)?;
    debug!("💻️ PUT cancel order {order_id} for {}", claims.sub);
    let order = api.cancel_order(&order_id, &claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(pay_for_order => Post "/orders/{order_id}/pay" impl CheckoutBackend, PaymentGateway);
/// Opens a payment intent for a pending order and hands back the client secret the browser needs to complete payment.
/// An order can only be paid for once.
pub async fn pay_for_order<B, G>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    G: PaymentGateway,
{
    let order_id = parse_order_id(path)?;
    debug!("💻️ POST pay for order {order_id} for {}", claims.sub);
    let payment = api.initialize_payment(&order_id, &claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(all_orders => Get "/admin/orders" impl OrderStore where requires [Role::Admin]);
pub async fn all_orders<B: OrderStore>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.all_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Patch "/admin/orders/{order_id}/status" impl CheckoutBackend, PaymentGateway where requires [Role::Admin]);
/// Sets the status of any order, regardless of the lifecycle rules. Stock follows the new status, and moving an order
/// to `shipped` emails the customer.
pub async fn update_order_status<B, G>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    G: PaymentGateway,
{
    let order_id = parse_order_id(path)?;
    let status = OrderStatusType::from_str(&body.status).map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
    info!("💻️ PATCH order {order_id} status to {status}");
    let order = api.update_status(&order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(sales_summary => Get "/admin/analytics/sales" impl OrderStore where requires [Role::Admin]);
pub async fn sales_summary<B: OrderStore>(api: web::Data<OrderQueryApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET sales summary");
    let summary = api.sales_summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(stripe_webhook => Post "/webhook/stripe" impl CheckoutBackend, PaymentGateway);
/// Receives payment events from the gateway.
///
/// The raw body is verified before anything is parsed. Events that do not apply (unknown references, repeats, event
/// kinds we don't handle) are acknowledged with a 200 so that the gateway stops redelivering them. Backend failures
/// return a 5xx so that it tries again later.
pub async fn stripe_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    G: PaymentGateway,
{
    trace!("💻️ Received webhook ({} bytes)", body.len());
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .map(|v| v.to_str())
        .transpose()
        .map_err(|e| ServerError::WebhookRejected(format!("Unreadable {SIGNATURE_HEADER} header. {e}")))?;
    let event = api.gateway().verify_webhook(&body, signature).map_err(|e| {
        warn!("💻️ Rejected webhook. {e}");
        ServerError::from(e)
    })?;
    let outcome = api.reconcile(event).await?;
    debug!("💻️ Webhook processed: {outcome:?}");
    Ok(HttpResponse::Ok().json(WebhookAck { received: true, outcome }))
}

use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    notifications::LogOnlySender,
    traits::{EmailSender, PaymentGateway},
    NotificationDispatcher,
    NotificationWorker,
    OrderFlowApi,
    OrderNotifier,
    OrderQueryApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    auth::TokenValidator,
    config::{NotificationConfig, ServerConfig},
    errors::ServerError,
    integrations::{email::BrevoSender, stripe::StripeGateway},
    routes::{
        health,
        AllOrdersRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PayForOrderRoute,
        SalesSummaryRoute,
        StripeWebhookRoute,
        UpdateOrderStatusRoute,
    },
};

const MAX_PAYLOAD_SIZE: usize = 65_536;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let url = config.database_url.as_str();
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        info!("🚀️ Creating database {url}");
        Sqlite::create_database(url).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let db = SqliteDatabase::new_with_url(url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = StripeGateway::new(config.stripe.clone(), config.allow_unsigned_webhooks)?;
    let notifier = start_notifications(&config)?;
    let srv = create_server_instance(config, db, gateway, notifier)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Spawns the notification worker and returns the notifier that feeds it.
fn start_notifications(config: &ServerConfig) -> Result<OrderNotifier, ServerError> {
    let dispatcher = if config.email.is_configured() {
        info!("📬️ Sending email as {}", config.email.sender_email);
        spawn_worker(BrevoSender::new(config.email.clone())?, &config.notifications)
    } else {
        spawn_worker(LogOnlySender, &config.notifications)
    };
    Ok(OrderNotifier::new(dispatcher, config.admin_email.clone()))
}

fn spawn_worker<S: EmailSender>(sender: S, config: &NotificationConfig) -> NotificationDispatcher {
    let worker = NotificationWorker::new(config.queue_size, sender, config.retry);
    let dispatcher = worker.dispatcher();
    tokio::spawn(worker.run());
    dispatcher
}

pub fn create_server_instance<G>(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: G,
    notifier: OrderNotifier,
) -> Result<Server, ServerError>
where
    G: PaymentGateway + Clone + Send + 'static,
{
    let validator = web::Data::new(TokenValidator::new(&config.auth));
    let currency = config.currency.clone();
    let srv = HttpServer::new(move || {
        let orders_api =
            OrderFlowApi::new(db.clone(), gateway.clone(), notifier.clone()).with_currency(currency.as_str());
        let query_api = OrderQueryApi::new(db.clone());
        let json_config = web::JsonConfig::default()
            .limit(MAX_PAYLOAD_SIZE)
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase, G>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase, G>::new())
            .service(PayForOrderRoute::<SqliteDatabase, G>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase, G>::new())
            .service(SalesSummaryRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cpg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api))
            .app_data(validator.clone())
            .app_data(json_config)
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD_SIZE))
            .service(health)
            .service(StripeWebhookRoute::<SqliteDatabase, G>::new())
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::GatewayApi;
use log::*;
use settlement_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    OrderAdminApi,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    routes::{
        health,
        CheckoutRoute,
        CreateOrderRoute,
        DeleteOrderRoute,
        MomoIpnRoute,
        OrderByIdRoute,
        OrderEarningsRoute,
        PayosWebhookRoute,
        RebuildEarningsRoute,
        RejectedCallbacksRoute,
        TransferDetailsRoute,
        UpdateOrderStatusRoute,
        VerifyTransferRoute,
        VnpayIpnRoute,
        VnpayReturnRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_settled(|ev| {
            Box::pin(async move {
                info!(
                    "📦️ Order {} has been paid. Payment [{}] for {}",
                    ev.order.id, ev.payment.transaction_reference, ev.payment.amount
                );
            })
        })
        .on_earnings_rebuilt(|ev| {
            Box::pin(async move {
                info!("📦️ {} earnings rows written for order {}", ev.rows_written, ev.order_id);
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let client = GatewayApi::new(config.gateway_client.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not create the gateway client. {e}")))?;
    if config.bank_account.is_none() {
        warn!("🏦️ No bank account has been configured. Bank transfer details will not be available.");
    }
    let options = ServerOptions::from_config(&config);
    let gateways = config.gateways.clone();
    let bank_account = config.bank_account.clone();
    let srv = HttpServer::new(move || {
        let settlement_api = SettlementApi::new(db.clone(), producers.clone(), gateways.clone());
        let admin_api = OrderAdminApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("csp::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(admin_api))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(bank_account.clone()));
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(TransferDetailsRoute::<SqliteDatabase>::new())
            .service(VerifyTransferRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(RebuildEarningsRoute::<SqliteDatabase>::new())
            .service(OrderEarningsRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(RejectedCallbacksRoute::<SqliteDatabase>::new());
        let callback_scope = web::scope("/callbacks")
            .service(VnpayIpnRoute::<SqliteDatabase>::new())
            .service(VnpayReturnRoute::<SqliteDatabase>::new())
            .service(MomoIpnRoute::<SqliteDatabase>::new())
            .service(PayosWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(callback_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

//! Request handler definitions
//!
//! Routes under `/api` are called by the storefront and by staff tools. Routes under `/callbacks` are called by the
//! payment gateways, and each gateway expects its own reply format, so the outcome mapping lives next to the handler.
//!
//! Handlers only translate between HTTP and the engine APIs. Anything longer than that belongs in the engine.
//! Every database call is async. Never block a worker thread in a handler, since the worker serves its requests one at
//! a time.
use std::collections::BTreeMap;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use gateway_tools::GatewayApi;
use log::*;
use serde_json::Value;
use settlement_engine::{
    db_types::{NewOrder, OrderId, PaymentMethod},
    gateways::{CheckoutSession, GatewayRequest, InboundCallback, VnPayIpnReply},
    helpers::transfer_qr,
    traits::{OrderManagement, SettlementDatabase, SettlementError, SettlementOutcome, TransferSubmission},
    CallbackOutcome,
    OrderAdminApi,
    SettlementApi,
    SettlementApiError,
};

use crate::{
    config::{BankAccountConfig, ServerOptions},
    data_objects::{
        CheckoutRequest,
        CheckoutResponse,
        JsonResponse,
        RejectedCallbackQuery,
        StatusUpdateRequest,
        TransferDetailsResponse,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

const PAYOS_SIGNATURE_HEADER: &str = "x-payos-signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl SettlementDatabase, OrderManagement);
/// Starts an online payment for an order and returns where the customer should be sent to pay.
///
/// Redirect gateways (VNPay) are answered straight away. For JSON gateways (MoMo, PayOS) the signed request is sent to
/// the gateway first, and its checkout URL is returned. If the gateway refuses to create the payment, the new payment
/// intent is marked as failed.
pub async fn checkout<B>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<SettlementApi<B>>,
    client: web::Data<GatewayApi>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase + OrderManagement,
{
    let CheckoutRequest { order_id, method, bank_code } = body.into_inner();
    debug!("💻️ Checkout request for order {order_id} using {method}");
    let client_ip = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| {
            warn!("💻️ Could not determine the client IP for order {order_id}. Using the loopback address.");
            "127.0.0.1".to_string()
        });
    let start = api.start_checkout(order_id, method, &client_ip, bank_code).await?;
    let reference = start.payment.transaction_reference.clone();
    let session = match &start.request {
        GatewayRequest::Redirect { .. } => CheckoutSession::from_redirect(&start.request),
        GatewayRequest::JsonPost { endpoint, headers, body } => {
            let created = match client.post_json::<Value>(endpoint, headers, body).await {
                Ok(reply) => start.adapter.parse_create_response(&reply).map_err(ServerError::from),
                Err(e) => Err(ServerError::from(e)),
            };
            match created {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("💻️ {method} could not create payment [{reference}]. {e}");
                    api.abandon_checkout(&reference).await?;
                    return Err(e);
                },
            }
        },
    };
    let session = session.ok_or_else(|| ServerError::Unspecified("The gateway returned no checkout URL".into()))?;
    let response = CheckoutResponse {
        order_id,
        method,
        transaction_reference: reference,
        amount: start.payment.amount,
        checkout_url: session.checkout_url,
        qr_code: session.qr_code,
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Bank transfers  ----------------------------------------------------
route!(transfer_details => Get "/transfer_details/{order_id}" impl OrderManagement);
/// Bank account details and the VietQR payload a customer needs to pay for an order by bank transfer.
pub async fn transfer_details<B>(
    path: web::Path<OrderId>,
    api: web::Data<OrderAdminApi<B>>,
    bank: web::Data<Option<BankAccountConfig>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
{
    let order_id = path.into_inner();
    let bank = bank
        .get_ref()
        .as_ref()
        .ok_or_else(|| ServerError::ConfigurationError("Bank transfers have not been configured".into()))?;
    let order = api.fetch_order(order_id).await?;
    if order.is_paid {
        return Err(ServerError::Conflict(format!("Order {order_id} has already been paid")));
    }
    let details = bank.transfer_details(order_id, order.total_price);
    let qr = transfer_qr(&details)?;
    let response = TransferDetailsResponse {
        order_id,
        bank_name: details.bank_name,
        account_number: details.account_number,
        account_name: details.account_name,
        amount: details.amount,
        transfer_content: details.transfer_content,
        qr,
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(verify_transfer => Post "/transfers/verify" impl SettlementDatabase, OrderManagement);
/// Staff confirmation that a bank transfer for an order has arrived.
pub async fn verify_transfer<B>(
    body: web::Json<TransferSubmission>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase + OrderManagement,
{
    let submission = body.into_inner();
    debug!("💻️ Transfer {} for order {} submitted for verification", submission.transaction_id, submission.order_id);
    let verification = api.verify_bank_transfer(&submission).await?;
    Ok(HttpResponse::Ok().json(verification))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderManagement);
pub async fn create_order<B: OrderManagement>(
    body: web::Json<NewOrder>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.create_order(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    path: web::Path<OrderId>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let summary = api.order_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(update_order_status => Post "/orders/{order_id}/status" impl OrderManagement);
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let StatusUpdateRequest { status, note } = body.into_inner();
    let note = note.unwrap_or_else(|| format!("Status changed to {status}"));
    let order = api.modify_order_status(order_id, status, &note).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(delete_order => Delete "/orders/{order_id}" impl OrderManagement);
pub async fn delete_order<B: OrderManagement>(
    path: web::Path<OrderId>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let deleted = api.delete_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(deleted))
}

route!(rebuild_earnings => Post "/orders/{order_id}/earnings/rebuild" impl SettlementDatabase, OrderManagement);
pub async fn rebuild_earnings<B>(
    path: web::Path<OrderId>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase + OrderManagement,
{
    let summary = api.rebuild_earnings(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(order_earnings => Get "/orders/{order_id}/earnings" impl OrderManagement);
pub async fn order_earnings<B: OrderManagement>(
    path: web::Path<OrderId>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let summary = api.earnings_for_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(rejected_callbacks => Get "/callbacks/rejected" impl OrderManagement);
pub async fn rejected_callbacks<B: OrderManagement>(
    query: web::Query<RejectedCallbackQuery>,
    api: web::Data<OrderAdminApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let callbacks = api.rejected_callbacks(query.limit).await?;
    Ok(HttpResponse::Ok().json(callbacks))
}

//----------------------------------------------   Gateway callbacks  ----------------------------------------------
route!(vnpay_ipn => Get "/vnpay/ipn" impl SettlementDatabase, OrderManagement);
/// VNPay's server-to-server payment notification.
///
/// VNPay keeps retrying until it receives one of its `RspCode` replies, so this handler always answers with HTTP 200
/// and encodes the outcome in the body.
pub async fn vnpay_ipn<B>(
    query: web::Query<BTreeMap<String, String>>,
    api: web::Data<SettlementApi<B>>,
) -> HttpResponse
where
    B: SettlementDatabase + OrderManagement,
{
    let callback = InboundCallback::from_params(query.into_inner());
    let reply = match api.handle_callback(PaymentMethod::VnPay, &callback).await {
        Ok(CallbackOutcome::Settled(SettlementOutcome::Settled(_))) => VnPayIpnReply::confirmed(),
        Ok(CallbackOutcome::Settled(SettlementOutcome::AlreadySettled(_) | SettlementOutcome::Duplicate(_))) => {
            VnPayIpnReply::already_confirmed()
        },
        Ok(CallbackOutcome::PaymentFailed { payment: Some(_), .. }) => VnPayIpnReply::confirmed(),
        Ok(CallbackOutcome::PaymentFailed { payment: None, .. }) => VnPayIpnReply::already_confirmed(),
        Ok(CallbackOutcome::Rejected { .. }) => VnPayIpnReply::invalid_signature(),
        Err(e) => vnpay_error_reply(&e),
    };
    debug!("💻️ VNPay IPN answered with {}", reply.rsp_code);
    HttpResponse::Ok().json(reply)
}

fn vnpay_error_reply(e: &SettlementApiError) -> VnPayIpnReply {
    warn!("💻️ VNPay IPN could not be processed. {e}");
    match e {
        SettlementApiError::Settlement(SettlementError::PaymentNotFound(_) | SettlementError::OrderNotFound(_)) => {
            VnPayIpnReply::order_not_found()
        },
        SettlementApiError::Settlement(SettlementError::AmountMismatch { .. }) => VnPayIpnReply::invalid_amount(),
        SettlementApiError::Settlement(SettlementError::PaymentAlreadyFailed(_)) => VnPayIpnReply::already_confirmed(),
        _ => VnPayIpnReply::unknown_error(),
    }
}

route!(vnpay_return => Get "/vnpay/return" impl SettlementDatabase, OrderManagement);
/// The page VNPay sends the customer back to. It carries the same signed parameters as the IPN, so it is processed the
/// same way. Whichever of the two arrives first settles the payment.
pub async fn vnpay_return<B>(
    query: web::Query<BTreeMap<String, String>>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase + OrderManagement,
{
    let callback = InboundCallback::from_params(query.into_inner());
    match api.handle_callback(PaymentMethod::VnPay, &callback).await? {
        CallbackOutcome::Settled(outcome) => {
            let reference = &outcome.payment().transaction_reference;
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Payment {reference} has been confirmed"))))
        },
        CallbackOutcome::PaymentFailed { reference, .. } => {
            Ok(HttpResponse::Ok().json(JsonResponse::failure(format!("Payment {reference} was not completed"))))
        },
        CallbackOutcome::Rejected { reason, .. } => Err(ServerError::InvalidSignature(reason)),
    }
}

route!(momo_ipn => Post "/momo/ipn" impl SettlementDatabase, OrderManagement);
/// MoMo's payment notification. MoMo expects `204 No Content` once the notification has been handled.
pub async fn momo_ipn<B>(body: String, api: web::Data<SettlementApi<B>>) -> Result<HttpResponse, ServerError>
where B: SettlementDatabase + OrderManagement {
    let callback = InboundCallback::from_body(body, None);
    match api.handle_callback(PaymentMethod::Momo, &callback).await? {
        CallbackOutcome::Rejected { reason, .. } => Err(ServerError::InvalidSignature(reason)),
        _ => Ok(HttpResponse::NoContent().finish()),
    }
}

route!(payos_webhook => Post "/payos/webhook" impl SettlementDatabase, OrderManagement);
/// PayOS payment webhook. The HMAC of the raw body arrives in the `x-payos-signature` header.
pub async fn payos_webhook<B>(
    req: HttpRequest,
    body: String,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase + OrderManagement,
{
    let signature =
        req.headers().get(PAYOS_SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string());
    let callback = InboundCallback::from_body(body, signature);
    match api.handle_callback(PaymentMethod::PayOs, &callback).await {
        Ok(CallbackOutcome::Rejected { reason, .. }) => Err(ServerError::InvalidSignature(reason)),
        Ok(_) => Ok(HttpResponse::Ok().json(JsonResponse::success("Webhook processed"))),
        // PayOS test deliveries refer to payments that don't exist. They must still be acknowledged.
        Err(SettlementApiError::Settlement(SettlementError::PaymentNotFound(reference))) => {
            info!("💻️ PayOS webhook for unknown payment [{reference}] acknowledged");
            Ok(HttpResponse::Ok().json(JsonResponse::failure(format!("Unknown payment {reference}"))))
        },
        Err(e) => Err(e.into()),
    }
}

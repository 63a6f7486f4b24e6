use std::collections::BTreeMap;

use actix_web::{http::StatusCode, test::TestRequest, web};
use gateway_tools::{GatewayApi, GatewayClientConfig};
use mockall::Sequence;
use settlement_engine::{
    db_types::{OrderStatusType, PaymentMethod, PaymentStatus, Vnd},
    events::EventProducers,
    gateways::{GatewayConfig, VnPayIpnReply},
    helpers::{canonical_query, sign, HashAlgorithm},
    traits::{SettledPayment, SettlementError, SettlementOutcome},
    SettlementApi,
};

use super::{
    helpers::{gateways, order, payment, post_request, send_request, settlement_api, PAYOS_CHECKSUM, VNPAY_SECRET},
    mocks::MockSettlementDb,
};
use crate::{
    config::ServerOptions,
    data_objects::{CheckoutResponse, JsonResponse},
    routes::{CheckoutRoute, PayosWebhookRoute, VnpayIpnRoute},
};

const REFERENCE: &str = "171200000042";

/// The query string VNPay sends to the IPN endpoint, signed with `secret`.
fn vnpay_ipn_uri(amount: Vnd, response_code: &str, secret: &str) -> String {
    let mut params = BTreeMap::new();
    for (k, v) in [
        ("vnp_Amount", amount.minor().to_string()),
        ("vnp_BankCode", "NCB".to_string()),
        ("vnp_OrderInfo", "Thanh toan don hang 7".to_string()),
        ("vnp_ResponseCode", response_code.to_string()),
        ("vnp_TmnCode", "COSTUME1".to_string()),
        ("vnp_TransactionNo", "14226112".to_string()),
        ("vnp_TransactionStatus", response_code.to_string()),
        ("vnp_TxnRef", REFERENCE.to_string()),
    ] {
        params.insert(k.to_string(), v);
    }
    let canonical = canonical_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())), &[]);
    let signature = sign(secret, &canonical, HashAlgorithm::HmacSha512).unwrap();
    format!("/vnpay/ipn?{canonical}&vnp_SecureHashType=HmacSHA512&vnp_SecureHash={signature}")
}

async fn call_vnpay_ipn(uri: &str, db: MockSettlementDb) -> VnPayIpnReply {
    let (status, body) = send_request(TestRequest::get().uri(uri), move |cfg| {
        cfg.app_data(web::Data::new(settlement_api(db))).service(VnpayIpnRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK, "VNPay replies are always 200. {body}");
    serde_json::from_str(&body).expect("Not a VNPay reply")
}

fn settled() -> SettlementOutcome {
    SettlementOutcome::Settled(SettledPayment {
        payment: payment(7, REFERENCE, 50_000, PaymentStatus::Paid),
        order: order(7, 50_000, true, OrderStatusType::Confirmed),
        earnings_rebuilt: None,
    })
}

#[actix_web::test]
async fn signed_vnpay_ipn_confirms_the_payment() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_settle_payment()
        .withf(|c| c.transaction_reference == REFERENCE && c.amount == Some(Vnd::from_dong(50_000)))
        .times(1)
        .returning(|_| Ok(settled()));
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "00", VNPAY_SECRET);
    let reply = call_vnpay_ipn(&uri, db).await;
    assert_eq!(reply, VnPayIpnReply::confirmed());
}

#[actix_web::test]
async fn repeated_vnpay_ipn_is_already_confirmed() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_settle_payment()
        .returning(|_| Ok(SettlementOutcome::AlreadySettled(payment(7, REFERENCE, 50_000, PaymentStatus::Paid))));
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "00", VNPAY_SECRET);
    let reply = call_vnpay_ipn(&uri, db).await;
    assert_eq!(reply.rsp_code, "02");
}

#[actix_web::test]
async fn vnpay_ipn_for_an_order_paid_another_way_is_already_confirmed() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_settle_payment()
        .times(1)
        .returning(|_| Ok(SettlementOutcome::Duplicate(payment(7, REFERENCE, 50_000, PaymentStatus::Paid))));
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "00", VNPAY_SECRET);
    let reply = call_vnpay_ipn(&uri, db).await;
    assert_eq!(reply.rsp_code, "02");
}

#[actix_web::test]
async fn forged_vnpay_ipn_is_recorded_and_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_record_rejected_callback()
        .withf(|r| r.provider == PaymentMethod::VnPay && r.transaction_reference.as_deref() == Some(REFERENCE))
        .times(1)
        .returning(|_| Ok(1));
    db.expect_settle_payment().never();
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "00", "NOT-THE-SECRET");
    let reply = call_vnpay_ipn(&uri, db).await;
    assert_eq!(reply, VnPayIpnReply::invalid_signature());
}

#[actix_web::test]
async fn vnpay_ipn_error_codes() {
    let _ = env_logger::try_init().ok();
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "00", VNPAY_SECRET);

    let mut db = MockSettlementDb::new();
    db.expect_settle_payment().returning(|_| Err(SettlementError::PaymentNotFound(REFERENCE.into())));
    assert_eq!(call_vnpay_ipn(&uri, db).await.rsp_code, "01");

    let mut db = MockSettlementDb::new();
    db.expect_settle_payment().returning(|_| {
        Err(SettlementError::AmountMismatch { expected: Vnd::from_dong(60_000), received: Vnd::from_dong(50_000) })
    });
    assert_eq!(call_vnpay_ipn(&uri, db).await.rsp_code, "04");

    let mut db = MockSettlementDb::new();
    db.expect_settle_payment().returning(|_| Err(SettlementError::DatabaseError("disk I/O error".into())));
    assert_eq!(call_vnpay_ipn(&uri, db).await.rsp_code, "99");
}

#[actix_web::test]
async fn vnpay_failure_notice_fails_the_payment() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fail_payment()
        .withf(|r| r.to_string() == REFERENCE)
        .times(1)
        .returning(|_| Ok(Some(payment(7, REFERENCE, 50_000, PaymentStatus::Failed))));
    db.expect_settle_payment().never();
    let uri = vnpay_ipn_uri(Vnd::from_dong(50_000), "24", VNPAY_SECRET);
    let reply = call_vnpay_ipn(&uri, db).await;
    assert_eq!(reply, VnPayIpnReply::confirmed());
}

//----------------------------------------------   PayOS  ----------------------------------------------------

fn payos_body() -> String {
    format!(
        r#"{{"code":"00","desc":"success","success":true,"data":{{"orderCode":{REFERENCE},"amount":50000,"code":"00","reference":"FT1"}}}}"#
    )
}

async fn call_payos(body: String, signature: Option<String>, db: MockSettlementDb) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/payos/webhook").insert_header(("Content-Type", "application/json"));
    if let Some(signature) = signature {
        req = req.insert_header(("x-payos-signature", signature));
    }
    send_request(req.set_payload(body), move |cfg| {
        cfg.app_data(web::Data::new(settlement_api(db))).service(PayosWebhookRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed")
}

#[actix_web::test]
async fn signed_payos_webhook_confirms_the_payment() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_settle_payment().times(1).returning(|_| Ok(settled()));
    let body = payos_body();
    let signature = sign(PAYOS_CHECKSUM, &body, HashAlgorithm::HmacSha256).unwrap();
    let (status, body) = call_payos(body, Some(signature), db).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let reply: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(reply.success);
}

#[actix_web::test]
async fn unsigned_payos_webhook_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_record_rejected_callback().times(1).returning(|_| Ok(3));
    db.expect_settle_payment().never();
    let (status, _) = call_payos(payos_body(), None, db).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn forged_payos_webhook_with_an_oversized_amount_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_record_rejected_callback().times(1).returning(|_| Ok(4));
    db.expect_settle_payment().never();
    let body = payos_body().replace(r#""amount":50000"#, r#""amount":100000000000000000"#);
    let (status, _) = call_payos(body, Some("00".into()), db).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signed_payos_webhook_with_an_oversized_amount_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_record_rejected_callback().times(1).returning(|_| Ok(5));
    db.expect_settle_payment().never();
    let body = payos_body().replace(r#""amount":50000"#, r#""amount":100000000000000000"#);
    let signature = sign(PAYOS_CHECKSUM, &body, HashAlgorithm::HmacSha256).unwrap();
    let (status, body) = call_payos(body, Some(signature), db).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[actix_web::test]
async fn payos_webhook_for_an_unknown_payment_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_settle_payment().returning(|_| Err(SettlementError::PaymentNotFound(REFERENCE.into())));
    let body = payos_body();
    let signature = sign(PAYOS_CHECKSUM, &body, HashAlgorithm::HmacSha256).unwrap();
    let (status, body) = call_payos(body, Some(signature), db).await;
    assert_eq!(status, StatusCode::OK);
    let reply: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!reply.success);
}

//----------------------------------------------   Checkout  ----------------------------------------------------

fn checkout_config(db: MockSettlementDb, gateways: GatewayConfig) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, EventProducers::default(), gateways);
        let client = GatewayApi::new(GatewayClientConfig::default()).expect("Could not create gateway client");
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(client))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(CheckoutRoute::<MockSettlementDb>::new());
    }
}

#[actix_web::test]
async fn vnpay_checkout_returns_a_signed_redirect() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 50_000, false, OrderStatusType::Pending))));
    db.expect_insert_payment_intent().times(1).returning(|intent| {
        let mut stored = payment(7, &intent.transaction_reference, 50_000, PaymentStatus::Pending);
        stored.amount = intent.amount;
        Ok(stored)
    });
    let body = r#"{"order_id":7,"method":"VnPay"}"#;
    let (status, body) = post_request("/checkout", body, checkout_config(db, gateways())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    let checkout: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(checkout.amount, Vnd::from_dong(50_000));
    assert!(checkout.checkout_url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
    assert!(checkout.checkout_url.contains(&format!("vnp_TxnRef={}", checkout.transaction_reference)));
    assert!(checkout.checkout_url.contains("vnp_SecureHash="));
}

#[actix_web::test]
async fn checkout_retries_a_taken_reference() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    let mut seq = Sequence::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 50_000, false, OrderStatusType::Pending))));
    db.expect_insert_payment_intent()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|intent| Err(SettlementError::DuplicateReference(intent.transaction_reference)));
    db.expect_insert_payment_intent().times(1).in_sequence(&mut seq).returning(|intent| {
        Ok(payment(7, &intent.transaction_reference, 50_000, PaymentStatus::Pending))
    });
    let body = r#"{"order_id":7,"method":"VnPay"}"#;
    let (status, body) = post_request("/checkout", body, checkout_config(db, gateways())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    let checkout: CheckoutResponse = serde_json::from_str(&body).unwrap();
    assert!(checkout.checkout_url.contains(&format!("vnp_TxnRef={}", checkout.transaction_reference)));
}

#[actix_web::test]
async fn checkout_gives_up_after_repeated_reference_collisions() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 50_000, false, OrderStatusType::Pending))));
    db.expect_insert_payment_intent()
        .times(3)
        .returning(|intent| Err(SettlementError::DuplicateReference(intent.transaction_reference)));
    let body = r#"{"order_id":7,"method":"VnPay"}"#;
    let (status, _) = post_request("/checkout", body, checkout_config(db, gateways())).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn checkout_below_the_gateway_minimum_stores_nothing() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 300, false, OrderStatusType::Pending))));
    db.expect_insert_payment_intent().never();
    let body = r#"{"order_id":7,"method":"VnPay"}"#;
    let (status, _) = post_request("/checkout", body, checkout_config(db, gateways())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unreachable_gateway_abandons_the_checkout() {
    let _ = env_logger::try_init().ok();
    let mut gateways = gateways();
    if let Some(payos) = gateways.payos.as_mut() {
        payos.endpoint = "http://127.0.0.1:9/v2/payment-requests".into();
    }
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 50_000, false, OrderStatusType::Pending))));
    db.expect_insert_payment_intent().times(1).returning(|intent| {
        let mut stored = payment(7, &intent.transaction_reference, 50_000, PaymentStatus::Pending);
        stored.method = intent.method;
        Ok(stored)
    });
    db.expect_fail_payment().times(1).returning(|reference| {
        let mut failed = payment(7, reference, 50_000, PaymentStatus::Failed);
        failed.method = PaymentMethod::PayOs;
        Ok(Some(failed))
    });
    let body = r#"{"order_id":7,"method":"PayOs"}"#;
    let (status, body) = post_request("/checkout", body, checkout_config(db, gateways)).await.expect("Request failed");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");
}

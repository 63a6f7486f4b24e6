use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use settlement_engine::{
    db_types::{Order, OrderId, OrderStatusType, Payment, PaymentMethod, PaymentStatus, Vnd},
    events::EventProducers,
    gateways::{GatewayConfig, PayOsConfig, VnPayConfig},
    OrderAdminApi,
    SettlementApi,
};

use super::mocks::MockSettlementDb;

pub const VNPAY_SECRET: &str = "VNPAYSECRETKEY";
pub const PAYOS_CHECKSUM: &str = "payos-checksum-key";

pub async fn get_request<F>(path: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<F>(path: &str, body: &str, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body.to_string());
    send_request(req, configure).await
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = res.into_body().try_into_bytes().map_err(|_| "Could not read response body".to_string())?;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

pub fn gateways() -> GatewayConfig {
    GatewayConfig {
        vnpay: Some(VnPayConfig {
            tmn_code: "COSTUME1".into(),
            hash_secret: VNPAY_SECRET.into(),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
            return_url: "https://shop.example.vn/payment/vnpay/return".into(),
            locale: "vn".into(),
        }),
        momo: None,
        payos: Some(PayOsConfig {
            client_id: "client".into(),
            api_key: "api-key".into(),
            checksum_key: PAYOS_CHECKSUM.into(),
            endpoint: "https://api-merchant.payos.vn/v2/payment-requests".into(),
            return_url: "https://shop.example.vn/payment/payos/return".into(),
            cancel_url: "https://shop.example.vn/payment/payos/cancel".into(),
        }),
    }
}

pub fn settlement_api(db: MockSettlementDb) -> SettlementApi<MockSettlementDb> {
    SettlementApi::new(db, EventProducers::default(), gateways())
}

pub fn admin_api(db: MockSettlementDb) -> OrderAdminApi<MockSettlementDb> {
    OrderAdminApi::new(db)
}

pub fn order(id: i64, total: i64, is_paid: bool, status: OrderStatusType) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    Order {
        id: OrderId(id),
        customer_id: 3,
        total_price: Some(Vnd::from_dong(total)),
        is_paid,
        status,
        rent_start: None,
        rent_end: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn payment(order_id: i64, reference: &str, amount: i64, status: PaymentStatus) -> Payment {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 35, 0).unwrap();
    Payment {
        id: 1,
        order_id: OrderId(order_id),
        amount: Vnd::from_dong(amount),
        method: PaymentMethod::VnPay,
        status,
        transaction_reference: reference.to_string(),
        paid_at: (status == PaymentStatus::Paid).then_some(created_at),
        created_at,
        updated_at: created_at,
    }
}

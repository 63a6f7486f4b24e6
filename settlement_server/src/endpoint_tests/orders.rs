use actix_web::{http::StatusCode, test::TestRequest, web};
use settlement_engine::{
    db_types::{OrderId, OrderStatusType, PaymentStatus, RejectedCallback},
    helpers::TransferQr,
    traits::{DeletedOrder, OrderSummary, SettlementError},
};

use super::{
    helpers::{admin_api, get_request, order, payment, post_request, send_request},
    mocks::MockSettlementDb,
};
use crate::{
    config::BankAccountConfig,
    data_objects::TransferDetailsResponse,
    routes::{
        CreateOrderRoute,
        DeleteOrderRoute,
        OrderByIdRoute,
        RejectedCallbacksRoute,
        TransferDetailsRoute,
        UpdateOrderStatusRoute,
    },
};

#[actix_web::test]
async fn fetch_order_summary() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order()
        .withf(|id| *id == OrderId(7))
        .returning(|_| Ok(Some(order(7, 300, false, OrderStatusType::Pending))));
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    db.expect_fetch_deposit().returning(|_| Ok(None));
    db.expect_fetch_payments_for_order()
        .returning(|_| Ok(vec![payment(7, "171200000001", 300, PaymentStatus::Pending)]));
    db.expect_fetch_bank_transfer().returning(|_| Ok(None));
    db.expect_fetch_status_history().returning(|_| Ok(vec![]));
    let (status, body) = get_request("/orders/7", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(OrderByIdRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let summary: OrderSummary = serde_json::from_str(&body).expect("Not an order summary");
    assert_eq!(summary.order.id, OrderId(7));
    assert_eq!(summary.payments.len(), 1);
    assert_eq!(summary.payments[0].transaction_reference, "171200000001");
}

#[actix_web::test]
async fn fetch_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let (status, body) = get_request("/orders/99", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(OrderByIdRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("The requested order #99 does not exist"), "{body}");
}

#[actix_web::test]
async fn non_numeric_order_id_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = MockSettlementDb::new();
    let (status, _) = get_request("/orders/abc", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(OrderByIdRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_create_order()
        .withf(|o| o.customer_id == 3 && o.items.len() == 1 && o.items[0].quantity == 2)
        .times(1)
        .returning(|_| Ok(order(12, 400, false, OrderStatusType::Pending)));
    let body = r#"{"customer_id":3,"items":[{"costume_id":1,"quantity":2,"price":20000}]}"#;
    let (status, body) = post_request("/orders", body, move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(CreateOrderRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body.contains(r#""id":12"#), "{body}");
}

#[actix_web::test]
async fn create_invalid_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_create_order().returning(|_| Err(SettlementError::InvalidOrder("An order needs at least one item".into())));
    let (status, body) = post_request("/orders", r#"{"customer_id":3,"items":[]}"#, move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(CreateOrderRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("at least one item"), "{body}");
}

#[actix_web::test]
async fn status_change_uses_a_default_note() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_modify_order_status()
        .withf(|id, status, note| {
            *id == OrderId(5) && *status == OrderStatusType::Shipped && note.to_string() == "Status changed to Shipped"
        })
        .times(1)
        .returning(|_, _, _| Ok(order(5, 300, true, OrderStatusType::Shipped)));
    let (status, body) = post_request("/orders/5/status", r#"{"status":"Shipped"}"#, move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(UpdateOrderStatusRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains(r#""status":"Shipped""#), "{body}");
}

#[actix_web::test]
async fn forbidden_status_change() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_modify_order_status().returning(|_, _, _| {
        Err(SettlementError::ForbiddenStatusChange { from: OrderStatusType::Shipped, to: OrderStatusType::Pending })
    });
    let (status, body) =
        post_request("/orders/5/status", r#"{"status":"Pending","note":"Customer asked"}"#, move |cfg| {
            cfg.app_data(web::Data::new(admin_api(db))).service(UpdateOrderStatusRoute::<MockSettlementDb>::new());
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Orders cannot move from Shipped to Pending"), "{body}");
}

#[actix_web::test]
async fn delete_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_delete_order().times(1).returning(|id| {
        Ok(DeletedOrder { order_id: Some(id), earnings: 4, deposits: 1, payments: 2, history: 2, items: 2, ..Default::default() })
    });
    let req = TestRequest::delete().uri("/orders/8");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(DeleteOrderRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let deleted: DeletedOrder = serde_json::from_str(&body).expect("Not a deletion summary");
    assert_eq!(deleted.order_id, Some(OrderId(8)));
    assert_eq!(deleted.earnings, 4);
    assert_eq!(deleted.bank_transfers, 0);
}

#[actix_web::test]
async fn rejected_callbacks_default_limit() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_rejected_callbacks().withf(|limit| *limit == 50).times(1).returning(|_| Ok(vec![]));
    let (status, body) = get_request("/callbacks/rejected", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db))).service(RejectedCallbacksRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let callbacks: Vec<RejectedCallback> = serde_json::from_str(&body).expect("Not a list of callbacks");
    assert!(callbacks.is_empty());
}

//----------------------------------------------   Bank transfers  ----------------------------------------------------

fn bank() -> Option<BankAccountConfig> {
    Some(BankAccountConfig {
        bank_name: "Vietcombank".into(),
        bank_bin: Some("970436".into()),
        account_number: "0011001234567".into(),
        account_name: "COSTUME PLATFORM".into(),
    })
}

#[actix_web::test]
async fn transfer_details_for_an_unpaid_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 300, false, OrderStatusType::Pending))));
    let (status, body) = get_request("/transfer_details/7", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db)))
            .app_data(web::Data::new(bank()))
            .service(TransferDetailsRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    let details: TransferDetailsResponse = serde_json::from_str(&body).expect("Not transfer details");
    assert_eq!(details.transfer_content, "BANK-7");
    assert_eq!(details.account_number, "0011001234567");
    let TransferQr::VietQr(payload) = &details.qr else {
        panic!("A BIN is configured, so a VietQR payload is expected");
    };
    assert!(payload.starts_with("000201"));
    assert!(payload.contains("BANK-7"));
}

#[actix_web::test]
async fn transfer_details_for_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order(7, 300, true, OrderStatusType::Confirmed))));
    let (status, _) = get_request("/transfer_details/7", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db)))
            .app_data(web::Data::new(bank()))
            .service(TransferDetailsRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn transfer_details_without_a_bank_account() {
    let _ = env_logger::try_init().ok();
    let db = MockSettlementDb::new();
    let (status, body) = get_request("/transfer_details/7", move |cfg| {
        cfg.app_data(web::Data::new(admin_api(db)))
            .app_data(web::Data::new(None::<BankAccountConfig>))
            .service(TransferDetailsRoute::<MockSettlementDb>::new());
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Bank transfers have not been configured"), "{body}");
}

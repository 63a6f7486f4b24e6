use chrono::Utc;
use settlement_engine::{
    db_types::{DepositStatus, NewPaymentIntent, OrderId, OrderStatusType, PaymentMethod, PaymentStatus, TransferStatus, Vnd},
    events::EventProducers,
    gateways::GatewayConfig,
    traits::{PaymentConfirmation, SettlementOutcome, TransferSubmission},
    OrderManagement,
    SettlementApi,
    SettlementDatabase,
    SettlementError,
    SqliteDatabase,
};
use support::{setup, tear_down};

mod support;

fn api(db: &SqliteDatabase) -> SettlementApi<SqliteDatabase> {
    SettlementApi::new(db.clone(), EventProducers::default(), GatewayConfig::default())
}

fn submission(order_id: OrderId, transaction_id: &str, amount: Vnd) -> TransferSubmission {
    TransferSubmission {
        order_id,
        transaction_id: transaction_id.to_string(),
        amount,
        transfer_date: Utc::now(),
        verified_by: "staff@costumes.vn".to_string(),
        note: Some("Matched against the Vietcombank statement".to_string()),
    }
}

#[tokio::test]
async fn verified_transfer_settles_the_order() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.rental_order().await;
    // Off by one hundredth of a dong is still accepted
    let sub = submission(order.id, "FT24123456789", Vnd::from_minor(29_999));
    let verification = api(&db).verify_bank_transfer(&sub).await.unwrap();
    assert_eq!(verification.transfer.status, TransferStatus::Completed);
    assert_eq!(verification.transfer.verified_by.as_deref(), Some("staff@costumes.vn"));
    assert!(verification.transfer.verified_at.is_some());
    let SettlementOutcome::Settled(settled) = &verification.settlement else {
        panic!("Expected a new settlement");
    };
    assert_eq!(settled.payment.method, PaymentMethod::BankTransfer);
    assert_eq!(settled.payment.transaction_reference, format!("BANK-{}", order.id.value()));
    assert_eq!(settled.payment.status, PaymentStatus::Paid);
    assert!(settled.order.is_paid);

    assert_eq!(db.fetch_deposit(order.id).await.unwrap().unwrap().status, DepositStatus::Paid);
    let history = db.fetch_status_history(order.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].note.contains("FT24123456789"));
    assert_eq!(db.fetch_earnings_for_order(order.id).await.unwrap().len(), 4);
    tear_down(db).await;
}

#[tokio::test]
async fn amounts_outside_tolerance_are_rejected() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.rental_order().await;
    for minor in [29_998, 30_002, 0] {
        let sub = submission(order.id, "FT1", Vnd::from_minor(minor));
        let err = api(&db).verify_bank_transfer(&sub).await.unwrap_err();
        assert!(matches!(err, SettlementError::AmountMismatch { expected, .. } if expected == Vnd::from_dong(300)));
    }
    assert!(db.fetch_bank_transfer(order.id).await.unwrap().is_none());
    assert!(db.fetch_payments_for_order(order.id).await.unwrap().is_empty());
    assert!(!db.fetch_order(order.id).await.unwrap().unwrap().is_paid);
    tear_down(db).await;
}

#[tokio::test]
async fn transaction_ids_cannot_pay_for_two_orders() {
    let world = setup().await;
    let db = world.db.clone();
    let first = world.rental_order().await;
    let second = world.rental_order().await;
    api(&db).verify_bank_transfer(&submission(first.id, "FT777", Vnd::from_dong(300))).await.unwrap();
    let err = api(&db).verify_bank_transfer(&submission(second.id, "FT777", Vnd::from_dong(300))).await.unwrap_err();
    assert!(matches!(err, SettlementError::DuplicateTransaction { order_id, .. } if order_id == first.id));
    assert!(!db.fetch_order(second.id).await.unwrap().unwrap().is_paid);
    tear_down(db).await;
}

#[tokio::test]
async fn resubmission_updates_the_record_in_place() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.sale_order(1).await;
    let first = api(&db).verify_bank_transfer(&submission(order.id, "FT100", Vnd::from_dong(1000))).await.unwrap();
    let mut corrected = submission(order.id, "FT101", Vnd::from_dong(1000));
    corrected.note = None;
    let second = api(&db).verify_bank_transfer(&corrected).await.unwrap();
    assert_eq!(second.transfer.id, first.transfer.id);
    assert_eq!(second.transfer.transaction_id, "FT101");
    assert_eq!(second.transfer.note, None);
    assert!(matches!(second.settlement, SettlementOutcome::AlreadySettled(_)));
    // Still one bank transfer payment and one settlement entry in the history
    assert_eq!(db.fetch_payments_for_order(order.id).await.unwrap().len(), 1);
    assert_eq!(db.fetch_status_history(order.id).await.unwrap().len(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn pending_bank_intent_is_reused() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.sale_order(2).await;
    let intent = api(&db).create_payment_intent(order.id, PaymentMethod::BankTransfer).await.unwrap();
    let again = api(&db).create_payment_intent(order.id, PaymentMethod::BankTransfer).await.unwrap();
    assert_eq!(intent.id, again.id);
    let verification =
        api(&db).verify_bank_transfer(&submission(order.id, "FT5", Vnd::from_dong(2000))).await.unwrap();
    assert_eq!(verification.settlement.payment().id, intent.id);
    tear_down(db).await;
}

#[tokio::test]
async fn orders_without_total_cannot_be_verified() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.sale_order(1).await;
    sqlx::query("UPDATE orders SET total_price = NULL WHERE id = $1").bind(order.id).execute(db.pool()).await.unwrap();
    let err = api(&db).verify_bank_transfer(&submission(order.id, "FT9", Vnd::from_dong(1000))).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderHasNoTotal(id) if id == order.id));
    let err = api(&db).verify_bank_transfer(&submission(OrderId(9999), "FT9", Vnd::from_dong(1000))).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn transfers_cannot_pay_an_order_settled_by_a_gateway() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.rental_order().await;
    let intent = NewPaymentIntent::new(order.id, Vnd::from_dong(300), PaymentMethod::VnPay, "171200000001".into());
    db.insert_payment_intent(intent).await.unwrap();
    let outcome =
        api(&db).confirm_payment(&PaymentConfirmation::new("171200000001", PaymentMethod::VnPay)).await.unwrap();
    assert!(outcome.is_new_settlement());

    let err = api(&db).verify_bank_transfer(&submission(order.id, "FT300", Vnd::from_dong(300))).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotPayable(id, _) if id == order.id));
    let payments = db.fetch_payments_for_order(order.id).await.unwrap();
    assert_eq!(payments.iter().filter(|p| p.status == PaymentStatus::Paid).count(), 1);
    assert!(payments.iter().all(|p| p.method == PaymentMethod::VnPay));
    assert_eq!(db.fetch_status_history(order.id).await.unwrap().len(), 2);
    assert!(db.fetch_bank_transfer(order.id).await.unwrap().is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn transfers_cannot_pay_a_cancelled_order() {
    let world = setup().await;
    let db = world.db.clone();
    let order = world.sale_order(1).await;
    db.modify_order_status(order.id, OrderStatusType::Cancelled, "Customer changed their mind").await.unwrap();
    let err = api(&db).verify_bank_transfer(&submission(order.id, "FT400", Vnd::from_dong(1000))).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotPayable(id, _) if id == order.id));
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert!(!order.is_paid);
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert!(db.fetch_payments_for_order(order.id).await.unwrap().is_empty());
    tear_down(db).await;
}

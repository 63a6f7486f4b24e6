use mockall::mock;
use settlement_engine::{
    db_types::{
        BankTransferRecord,
        CollaboratorEarning,
        Deposit,
        NewOrder,
        NewPaymentIntent,
        NewRejectedCallback,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payment,
        RejectedCallback,
        StatusHistory,
    },
    traits::{
        DeletedOrder,
        OrderManagement,
        PaymentConfirmation,
        SettlementDatabase,
        SettlementError,
        SettlementOutcome,
        TransferSubmission,
        TransferVerification,
    },
};

mock! {
    pub SettlementDb {}
    impl SettlementDatabase for SettlementDb {
        fn url(&self) -> &str;
        async fn insert_payment_intent(&self, intent: NewPaymentIntent) -> Result<Payment, SettlementError>;
        async fn settle_payment(&self, confirmation: &PaymentConfirmation) -> Result<SettlementOutcome, SettlementError>;
        async fn fail_payment(&self, transaction_reference: &str) -> Result<Option<Payment>, SettlementError>;
        async fn record_rejected_callback(&self, callback: NewRejectedCallback) -> Result<i64, SettlementError>;
        async fn verify_bank_transfer(&self, submission: &TransferSubmission) -> Result<TransferVerification, SettlementError>;
        async fn rebuild_earnings(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError>;
    }
    impl OrderManagement for SettlementDb {
        async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError>;
        async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, SettlementError>;
        async fn fetch_deposit(&self, order_id: OrderId) -> Result<Option<Deposit>, SettlementError>;
        async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, SettlementError>;
        async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, SettlementError>;
        async fn fetch_bank_transfer(&self, order_id: OrderId) -> Result<Option<BankTransferRecord>, SettlementError>;
        async fn fetch_status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistory>, SettlementError>;
        async fn fetch_earnings_for_order(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError>;
        async fn fetch_rejected_callbacks(&self, limit: u32) -> Result<Vec<RejectedCallback>, SettlementError>;
        async fn modify_order_status(&self, order_id: OrderId, status: OrderStatusType, note: &str) -> Result<Order, SettlementError>;
        async fn delete_order(&self, order_id: OrderId) -> Result<DeletedOrder, SettlementError>;
    }
}

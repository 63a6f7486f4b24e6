//! `SqliteDatabase` is a concrete implementation of a settlement backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate::MigrateError, SqliteConnection, SqlitePool};

use super::db::{
    accounts,
    callbacks,
    db_url,
    deposits,
    earnings,
    new_pool,
    orders,
    payments,
    status_history,
    transfers,
};
use crate::{
    db_types::{
        calculate_deposit,
        BankTransferRecord,
        CollaboratorEarning,
        Costume,
        Deposit,
        DepositStatus,
        NewOrder,
        NewPaymentIntent,
        NewRejectedCallback,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payment,
        PaymentMethod,
        PaymentStatus,
        RejectedCallback,
        Role,
        StatusHistory,
        UserAccount,
        Vnd,
    },
    traits::{
        DeletedOrder,
        OrderManagement,
        PaymentConfirmation,
        SettledPayment,
        SettlementDatabase,
        SettlementError,
        SettlementOutcome,
        TransferSubmission,
        TransferVerification,
    },
};

/// Largest difference between a reported bank transfer and the order total that is still accepted: 0.01 dong.
const TRANSFER_TOLERANCE_MINOR: i64 = 1;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `CSP_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Adds a user account. Accounts are managed elsewhere on the platform; this exists for seeding and tests.
    pub async fn insert_user_account(
        &self,
        name: &str,
        role: Role,
        is_active: bool,
    ) -> Result<UserAccount, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::insert_user(name, role, is_active, &mut conn).await?)
    }

    /// Adds a costume to the catalogue. Like [`Self::insert_user_account`], this is for seeding and tests.
    pub async fn insert_costume(
        &self,
        owner_id: i64,
        name: &str,
        rental_price: Vnd,
        sale_price: Vnd,
    ) -> Result<Costume, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(accounts::insert_costume(owner_id, name, rental_price, sale_price, &mut conn).await?)
    }
}

/// Applies a payment confirmation on `conn`, which must be inside a transaction. The first statement is the
/// conditional payment update, so this can open a transaction.
async fn settle_within(
    confirmation: &PaymentConfirmation,
    conn: &mut SqliteConnection,
) -> Result<SettlementOutcome, SettlementError> {
    let reference = confirmation.transaction_reference.as_str();
    let now = Utc::now();
    let Some(payment) = payments::mark_paid_if_pending(reference, confirmation.amount, now, &mut *conn).await? else {
        // Nothing qualified. Work out why.
        let payment = payments::fetch_by_reference(reference, &mut *conn)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound(reference.to_string()))?;
        return match (payment.status, confirmation.amount) {
            (PaymentStatus::Paid, _) => {
                debug!("🗃️ Payment [{reference}] was already settled. Nothing to do.");
                Ok(SettlementOutcome::AlreadySettled(payment))
            },
            (PaymentStatus::Failed, _) => Err(SettlementError::PaymentAlreadyFailed(reference.to_string())),
            (PaymentStatus::Pending, Some(received)) => {
                Err(SettlementError::AmountMismatch { expected: payment.amount, received })
            },
            (PaymentStatus::Pending, None) => Err(SettlementError::DatabaseError(format!(
                "Payment [{reference}] is pending but could not be settled"
            ))),
        };
    };
    let paid_before = orders::fetch_order(payment.order_id, &mut *conn)
        .await?
        .ok_or(SettlementError::OrderNotFound(payment.order_id))?
        .is_paid;
    if paid_before {
        warn!(
            "🗃️ Payment [{reference}] of {} arrived for order {}, which was already paid. It is recorded but needs a \
             refund.",
            payment.amount, payment.order_id
        );
        return Ok(SettlementOutcome::Duplicate(payment));
    }
    let order = orders::mark_paid(payment.order_id, &mut *conn).await?;
    let deposit_paid = deposits::transition(order.id, DepositStatus::Pending, DepositStatus::Paid, &mut *conn).await?;
    status_history::append(order.id, order.status, &confirmation.note, &mut *conn).await?;
    let earnings_rebuilt = if order.is_rental() {
        Some(earnings::rebuild_for_order(&order, &mut *conn).await?.len())
    } else {
        None
    };
    debug!(
        "🗃️ Payment [{reference}] settled. Order {} is paid ({}), deposit updated: {}",
        order.id,
        order.status,
        deposit_paid > 0
    );
    Ok(SettlementOutcome::Settled(SettledPayment { payment, order, earnings_rebuilt }))
}

/// Takes the order's write lock and returns the order.
async fn lock_and_fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    if !orders::lock_order(order_id, &mut *conn).await? {
        return Err(SettlementError::OrderNotFound(order_id));
    }
    orders::fetch_order(order_id, conn).await?.ok_or(SettlementError::OrderNotFound(order_id))
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_payment_intent(&self, intent: NewPaymentIntent) -> Result<Payment, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_and_fetch_order(intent.order_id, &mut tx).await?;
        if order.total_price.is_none() {
            return Err(SettlementError::OrderHasNoTotal(order.id));
        }
        if order.is_paid {
            return Err(SettlementError::OrderNotPayable(order.id, "it has already been paid".into()));
        }
        if order.status == OrderStatusType::Cancelled {
            return Err(SettlementError::OrderNotPayable(order.id, "it has been cancelled".into()));
        }
        let payment = payments::insert_intent(&intent, &mut tx).await.map_err(|e| match e {
            sqlx::Error::Database(de) if de.is_unique_violation() => {
                SettlementError::DuplicateReference(intent.transaction_reference.clone())
            },
            e => SettlementError::from(e),
        })?;
        tx.commit().await?;
        debug!("🗃️ {} payment intent [{}] created for order {}", payment.method, payment.transaction_reference, order.id);
        Ok(payment)
    }

    async fn settle_payment(&self, confirmation: &PaymentConfirmation) -> Result<SettlementOutcome, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let outcome = settle_within(confirmation, &mut tx).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn fail_payment(&self, transaction_reference: &str) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::mark_failed_if_pending(transaction_reference, &mut conn).await?;
        match &payment {
            Some(_) => debug!("🗃️ Payment [{transaction_reference}] marked as failed"),
            None => debug!("🗃️ Payment [{transaction_reference}] is not pending. Failure notice ignored."),
        }
        Ok(payment)
    }

    async fn record_rejected_callback(&self, callback: NewRejectedCallback) -> Result<i64, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let id = callbacks::insert_rejected(&callback, &mut conn).await?;
        Ok(id)
    }

    async fn verify_bank_transfer(
        &self,
        submission: &TransferSubmission,
    ) -> Result<TransferVerification, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_and_fetch_order(submission.order_id, &mut tx).await?;
        let total = order.total_price.ok_or(SettlementError::OrderHasNoTotal(order.id))?;
        let reference = order.id.bank_transfer_reference();
        let bank_payment = payments::fetch_by_reference(&reference, &mut tx).await?;
        // Re-submitting the transfer that paid the order is fine. Anything else on a paid or cancelled order is not.
        let paid_by_transfer = bank_payment.as_ref().is_some_and(|p| p.status == PaymentStatus::Paid);
        if !paid_by_transfer {
            if order.is_paid {
                return Err(SettlementError::OrderNotPayable(order.id, "it has already been paid".into()));
            }
            if order.status == OrderStatusType::Cancelled {
                return Err(SettlementError::OrderNotPayable(order.id, "it has been cancelled".into()));
            }
        }
        if submission.amount.abs_diff(total) > Vnd::from_minor(TRANSFER_TOLERANCE_MINOR) {
            return Err(SettlementError::AmountMismatch { expected: total, received: submission.amount });
        }
        if let Some(existing) = transfers::fetch_by_transaction_id(&submission.transaction_id, &mut tx).await? {
            if existing.order_id != order.id {
                return Err(SettlementError::DuplicateTransaction {
                    transaction_id: submission.transaction_id.clone(),
                    order_id: existing.order_id,
                });
            }
        }
        let transfer = transfers::upsert_completed(submission, Utc::now(), &mut tx).await?;
        if bank_payment.is_none() {
            let intent = NewPaymentIntent::new(order.id, total, PaymentMethod::BankTransfer, reference.clone());
            payments::insert_intent(&intent, &mut tx).await?;
        }
        let note = format!("Bank transfer {} verified by {}", submission.transaction_id, submission.verified_by);
        let confirmation = PaymentConfirmation::new(reference, PaymentMethod::BankTransfer).with_note(note);
        let settlement = settle_within(&confirmation, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Bank transfer {} recorded for order {}. New settlement: {}",
            transfer.transaction_id,
            order.id,
            settlement.is_new_settlement()
        );
        Ok(TransferVerification { transfer, settlement })
    }

    async fn rebuild_earnings(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_and_fetch_order(order_id, &mut tx).await?;
        let rows = earnings::rebuild_for_order(&order, &mut tx).await?;
        tx.commit().await?;
        Ok(rows)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order(&self, order: NewOrder) -> Result<Order, SettlementError> {
        if order.items.is_empty() {
            return Err(SettlementError::InvalidOrder("An order needs at least one item".into()));
        }
        if let Some(item) = order.items.iter().find(|i| i.quantity <= 0 || i.price < Vnd::default()) {
            return Err(SettlementError::InvalidOrder(format!(
                "Costume {} has an invalid quantity or price",
                item.costume_id
            )));
        }
        if let (Some(start), Some(end)) = (order.rent_start, order.rent_end) {
            if end < start {
                return Err(SettlementError::InvalidOrder("The rental window ends before it starts".into()));
            }
        }
        let total = match order.total_price {
            Some(total) => total,
            None => order.items_total().map_err(|e| SettlementError::InvalidOrder(e.to_string()))?,
        };
        let mut tx = self.pool.begin().await?;
        let new_order = orders::insert_order(&order, Some(total), &mut tx).await?;
        let mut deposit_lines = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let costume = accounts::fetch_costume(item.costume_id, &mut tx)
                .await?
                .ok_or(SettlementError::CostumeNotFound(item.costume_id))?;
            orders::insert_order_item(new_order.id, item, &mut tx).await?;
            deposit_lines.push((costume.sale_price, item.quantity));
        }
        let deposit_amount =
            calculate_deposit(deposit_lines).map_err(|e| SettlementError::InvalidOrder(e.to_string()))?;
        let deposit = deposits::insert_deposit(new_order.id, deposit_amount, &mut tx).await?;
        let note = order.note.as_deref().unwrap_or("Order created");
        status_history::append(new_order.id, new_order.status, note, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} created. Total {total}, deposit {}", new_order.id, deposit.amount);
        Ok(new_order)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_deposit(&self, order_id: OrderId) -> Result<Option<Deposit>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(deposits::fetch_deposit(order_id, &mut conn).await?)
    }

    async fn fetch_payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_by_reference(reference, &mut conn).await?)
    }

    async fn fetch_bank_transfer(&self, order_id: OrderId) -> Result<Option<BankTransferRecord>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transfers::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_status_history(&self, order_id: OrderId) -> Result<Vec<StatusHistory>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(status_history::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_earnings_for_order(&self, order_id: OrderId) -> Result<Vec<CollaboratorEarning>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(earnings::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_rejected_callbacks(&self, limit: u32) -> Result<Vec<RejectedCallback>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(callbacks::fetch_recent(limit, &mut conn).await?)
    }

    async fn modify_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatusType,
        note: &str,
    ) -> Result<Order, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = lock_and_fetch_order(order_id, &mut tx).await?;
        if order.status == status {
            return Err(SettlementError::StatusUnchanged(status));
        }
        if !order.status.can_transition_to(status) {
            return Err(SettlementError::ForbiddenStatusChange { from: order.status, to: status });
        }
        let updated = orders::update_status(order_id, status, &mut tx).await?;
        status_history::append(order_id, status, note, &mut tx).await?;
        if status == OrderStatusType::Cancelled {
            let earnings = earnings::cancel_pending_for_order(order_id, &mut tx).await?;
            let deposit =
                deposits::transition(order_id, DepositStatus::Pending, DepositStatus::Cancelled, &mut tx).await?;
            debug!("🗃️ Order {order_id} cancelled. {earnings} earnings rows and {deposit} deposits cancelled");
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id} moved from {} to {status}", order.status);
        Ok(updated)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<DeletedOrder, SettlementError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(order_id, &mut tx).await? {
            return Err(SettlementError::OrderNotFound(order_id));
        }
        let mut deleted = DeletedOrder { order_id: Some(order_id), ..Default::default() };
        deleted.earnings = earnings::delete_for_order(order_id, &mut tx).await?;
        deleted.deposits = deposits::delete_for_order(order_id, &mut tx).await?;
        deleted.bank_transfers = transfers::delete_for_order(order_id, &mut tx).await?;
        deleted.payments = payments::delete_for_order(order_id, &mut tx).await?;
        deleted.history = status_history::delete_for_order(order_id, &mut tx).await?;
        deleted.items = orders::delete_items(order_id, &mut tx).await?;
        orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {order_id} and all its records have been deleted");
        Ok(deleted)
    }
}

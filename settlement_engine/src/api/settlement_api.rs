use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    api::errors::SettlementApiError,
    db_types::{NewPaymentIntent, NewRejectedCallback, OrderId, Payment, PaymentMethod, PaymentStatus, Vnd},
    events::{EarningsRebuiltEvent, EventProducers, OrderSettledEvent},
    gateways::{CheckoutIntent, GatewayConfig, GatewayRequest, InboundCallback, PaymentAdapter},
    helpers::new_transaction_reference,
    traits::{
        EarningsSummary,
        OrderManagement,
        PaymentConfirmation,
        SettlementDatabase,
        SettlementError,
        SettlementOutcome,
        TransferSubmission,
        TransferVerification,
    },
};

/// How many fresh references a checkout tries before giving up on a reference collision.
const REFERENCE_ATTEMPTS: usize = 3;

/// A stored payment intent and the signed request that starts it.
#[derive(Debug, Clone)]
pub struct CheckoutStart {
    pub payment: Payment,
    pub adapter: PaymentAdapter,
    pub request: GatewayRequest,
}

/// What became of an inbound gateway callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackOutcome {
    /// The callback was authentic and reported a successful payment.
    Settled(SettlementOutcome),
    /// The callback was authentic and reported that the payment did not go through.
    PaymentFailed { reference: String, payment: Option<Payment> },
    /// The callback could not be authenticated. It was recorded and otherwise ignored.
    Rejected { reference: Option<String>, reason: String },
}

/// `SettlementApi` is the entry point for everything that moves money state: starting checkouts, handling gateway
/// callbacks, verifying bank transfers and rebuilding earnings.
///
/// Subscribers to the event hooks are notified after the corresponding database transaction has committed.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    gateways: GatewayConfig,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers, gateways: GatewayConfig) -> Self {
        Self { db, producers, gateways }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateways(&self) -> &GatewayConfig {
        &self.gateways
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase + OrderManagement
{
    /// Creates a payment intent for the full order total.
    ///
    /// Bank transfers use the fixed reference `BANK-{order_id}`, so asking for a bank transfer intent twice returns
    /// the existing intent. Gateway payments get a fresh numeric reference every time.
    pub async fn create_payment_intent(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<Payment, SettlementApiError> {
        let total = self.order_total(order_id).await?;
        if method == PaymentMethod::BankTransfer {
            let reference = order_id.bank_transfer_reference();
            if let Some(existing) = self.db.fetch_payment_by_reference(&reference).await? {
                if existing.status == PaymentStatus::Pending {
                    return Ok(existing);
                }
            }
            let intent = NewPaymentIntent::new(order_id, total, method, reference);
            return Ok(self.db.insert_payment_intent(intent).await?);
        }
        let mut attempt = 1;
        loop {
            let intent = NewPaymentIntent::new(order_id, total, method, new_transaction_reference());
            match self.db.insert_payment_intent(intent).await {
                Err(SettlementError::DuplicateReference(reference)) if attempt < REFERENCE_ATTEMPTS => {
                    warn!("🔄️💳️ Reference [{reference}] is taken. Trying another one.");
                    attempt += 1;
                },
                result => return Ok(result?),
            }
        }
    }

    async fn order_total(&self, order_id: OrderId) -> Result<Vnd, SettlementError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(SettlementError::OrderNotFound(order_id))?;
        order.total_price.ok_or(SettlementError::OrderHasNoTotal(order_id))
    }

    /// Starts an online checkout through one of the payment gateways.
    ///
    /// The signed request is built, and therefore validated, before the payment intent is stored: a request the gateway
    /// would refuse never leaves a dangling intent behind. If the generated reference is already taken, a new one is
    /// generated and the request is signed again.
    pub async fn start_checkout(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
        client_ip: &str,
        bank_code: Option<String>,
    ) -> Result<CheckoutStart, SettlementApiError> {
        let adapter = PaymentAdapter::for_method(method, &self.gateways)?;
        let total = self.order_total(order_id).await?;
        let mut attempt = 1;
        loop {
            let checkout = CheckoutIntent {
                order_id,
                transaction_reference: new_transaction_reference(),
                amount: total,
                description: format!("Thanh toan don hang {}", order_id.value()),
                client_ip: client_ip.to_string(),
                bank_code: bank_code.clone(),
                created_at: Utc::now(),
            };
            let request = adapter.build_request(&checkout)?;
            let intent = NewPaymentIntent::new(order_id, total, method, checkout.transaction_reference);
            match self.db.insert_payment_intent(intent).await {
                Ok(payment) => {
                    info!(
                        "🔄️💳️ {method} checkout started for order {order_id} with reference [{}]",
                        payment.transaction_reference
                    );
                    return Ok(CheckoutStart { payment, adapter, request });
                },
                Err(SettlementError::DuplicateReference(reference)) if attempt < REFERENCE_ATTEMPTS => {
                    warn!("🔄️💳️ Reference [{reference}] is taken. Signing the checkout again with a new one.");
                    attempt += 1;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Marks a checkout that never reached the customer as failed, e.g. because the gateway refused to create the
    /// payment. Only pending payments are affected.
    pub async fn abandon_checkout(&self, transaction_reference: &str) -> Result<Option<Payment>, SettlementError> {
        let payment = self.db.fail_payment(transaction_reference).await?;
        if payment.is_some() {
            info!("🔄️💳️ Checkout [{transaction_reference}] was abandoned");
        }
        Ok(payment)
    }

    /// Authenticates a gateway callback and acts on it.
    ///
    /// * Callbacks that fail authentication are recorded as rejected and change nothing else.
    /// * Authentic failure notices move a pending payment to `Failed`.
    /// * Authentic success notices are forwarded to [`Self::confirm_payment`].
    pub async fn handle_callback(
        &self,
        method: PaymentMethod,
        callback: &InboundCallback,
    ) -> Result<CallbackOutcome, SettlementApiError> {
        let adapter = PaymentAdapter::for_method(method, &self.gateways)?;
        let verification = match adapter.verify_callback(callback) {
            Ok(v) => v,
            Err(e) => {
                warn!("🔄️📨️ Unreadable {method} callback: {e}");
                self.reject(method, None, None, e.to_string(), callback).await?;
                return Err(e.into());
            },
        };
        let reference = verification.transaction_reference.clone();
        if !verification.signature_valid {
            let reason = "Signature verification failed".to_string();
            self.reject(method, Some(reference.clone()), Some(verification.provider_status), reason.clone(), callback)
                .await?;
            return Ok(CallbackOutcome::Rejected { reference: Some(reference), reason });
        }
        if !verification.is_authentic {
            info!(
                "🔄️📨️ {method} reports that payment [{reference}] failed with status {}",
                verification.provider_status
            );
            let payment = self.db.fail_payment(&reference).await?;
            return Ok(CallbackOutcome::PaymentFailed { reference, payment });
        }
        let mut confirmation = PaymentConfirmation::new(reference, method);
        if let Some(amount) = verification.amount {
            confirmation = confirmation.with_amount(amount);
        }
        let outcome = self.confirm_payment(&confirmation).await?;
        Ok(CallbackOutcome::Settled(outcome))
    }

    async fn reject(
        &self,
        provider: PaymentMethod,
        transaction_reference: Option<String>,
        provider_status: Option<String>,
        reason: String,
        callback: &InboundCallback,
    ) -> Result<(), SettlementError> {
        let payload = callback.payload();
        let record = NewRejectedCallback { provider, transaction_reference, provider_status, reason, payload };
        let id = self.db.record_rejected_callback(record).await?;
        warn!("🔄️📨️ {provider} callback rejected and recorded as #{id}");
        Ok(())
    }

    /// Applies a payment confirmation. Settling an already settled payment is a successful no-op.
    pub async fn confirm_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<SettlementOutcome, SettlementError> {
        trace!("🔄️✅️ Payment [{}] is being settled", confirmation.transaction_reference);
        let outcome = self.db.settle_payment(confirmation).await?;
        self.notify(&outcome).await;
        Ok(outcome)
    }

    /// Verifies a manually reported bank transfer and settles the order's bank transfer intent.
    pub async fn verify_bank_transfer(
        &self,
        submission: &TransferSubmission,
    ) -> Result<TransferVerification, SettlementError> {
        let verification = self.db.verify_bank_transfer(submission).await?;
        info!(
            "🔄️🏦️ Transfer {} for order {} verified by {}",
            submission.transaction_id, submission.order_id, submission.verified_by
        );
        self.notify(&verification.settlement).await;
        Ok(verification)
    }

    /// Regenerates the collaborator earnings of a paid order.
    pub async fn rebuild_earnings(&self, order_id: OrderId) -> Result<EarningsSummary, SettlementError> {
        let rows = self.db.rebuild_earnings(order_id).await?;
        self.producers.publish_earnings_rebuilt(EarningsRebuiltEvent::new(order_id, rows.len())).await;
        Ok(EarningsSummary::new(order_id, rows))
    }

    async fn notify(&self, outcome: &SettlementOutcome) {
        let SettlementOutcome::Settled(settled) = outcome else {
            return;
        };
        debug!("🔄️✅️ Notifying order settled hook subscribers for order {}", settled.order.id);
        let event = OrderSettledEvent::new(settled.order.clone(), settled.payment.clone());
        self.producers.publish_order_settled(event).await;
        if let Some(rows) = settled.earnings_rebuilt {
            self.producers.publish_earnings_rebuilt(EarningsRebuiltEvent::new(settled.order.id, rows)).await;
        }
    }
}

use log::*;
use serde::{Deserialize, Serialize};

use super::{CallbackVerification, CheckoutIntent, GatewayError, GatewayRequest, InboundCallback, VnPayConfig};
use crate::{
    db_types::{PaymentMethod, Vnd},
    helpers::{canonical_query, sign, verify, vietnam_time, HashAlgorithm},
};

const VERSION: &str = "2.1.0";
const COMMAND_PAY: &str = "pay";
const ORDER_TYPE: &str = "other";
const SUCCESS: &str = "00";
const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// The smallest payment VNPay accepts, in dong.
pub const VNPAY_MIN_AMOUNT: i64 = 5_000;
/// The largest payment VNPay accepts, in dong.
pub const VNPAY_MAX_AMOUNT: i64 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct VnPayAdapter {
    config: VnPayConfig,
}

impl VnPayAdapter {
    pub fn new(config: VnPayConfig) -> Self {
        Self { config }
    }

    pub fn build_request(&self, intent: &CheckoutIntent) -> Result<GatewayRequest, GatewayError> {
        let min = Vnd::from_dong(VNPAY_MIN_AMOUNT);
        let max = Vnd::from_dong(VNPAY_MAX_AMOUNT);
        if intent.amount < min || intent.amount > max {
            return Err(GatewayError::Validation(format!(
                "VNPay payments must be between {min} and {max}. Order {} asks for {}",
                intent.order_id, intent.amount
            )));
        }
        // vnp_Amount is the amount multiplied by 100, which is exactly the minor-unit value
        let amount = intent.amount.minor().to_string();
        let create_date = vietnam_time(intent.created_at).format("%Y%m%d%H%M%S").to_string();
        let locale = if self.config.locale.is_empty() { "vn" } else { self.config.locale.as_str() };
        let mut fields = vec![
            ("vnp_Version", VERSION),
            ("vnp_Command", COMMAND_PAY),
            ("vnp_TmnCode", self.config.tmn_code.as_str()),
            ("vnp_Amount", amount.as_str()),
            ("vnp_CreateDate", create_date.as_str()),
            ("vnp_CurrCode", costume_common::VND_CURRENCY_CODE),
            ("vnp_IpAddr", intent.client_ip.as_str()),
            ("vnp_Locale", locale),
            ("vnp_OrderInfo", intent.description.as_str()),
            ("vnp_OrderType", ORDER_TYPE),
            ("vnp_ReturnUrl", self.config.return_url.as_str()),
            ("vnp_TxnRef", intent.transaction_reference.as_str()),
        ];
        if let Some(bank_code) = intent.bank_code.as_deref() {
            fields.push(("vnp_BankCode", bank_code));
        }
        let canonical = canonical_query(fields, &[]);
        let signature = sign(self.config.hash_secret.reveal(), &canonical, HashAlgorithm::HmacSha512)?;
        debug!("💳️ VNPay redirect built for payment [{}] on order {}", intent.transaction_reference, intent.order_id);
        let url = format!("{}?{canonical}&{SECURE_HASH}={signature}", self.config.pay_url);
        Ok(GatewayRequest::Redirect { url })
    }

    /// Authenticates an IPN or return-URL callback. Both carry the same signed query parameters.
    pub fn verify_callback(&self, callback: &InboundCallback) -> Result<CallbackVerification, GatewayError> {
        let params = &callback.params;
        let reference = params.get("vnp_TxnRef").cloned().ok_or_else(|| GatewayError::MissingField("vnp_TxnRef".into()))?;
        let candidate = params.get(SECURE_HASH).map(String::as_str).unwrap_or_default();
        let canonical =
            canonical_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())), &[SECURE_HASH, SECURE_HASH_TYPE]);
        let signature_valid = verify(candidate, self.config.hash_secret.reveal(), &canonical, HashAlgorithm::HmacSha512);
        let response_code = params.get("vnp_ResponseCode").cloned().unwrap_or_default();
        let transaction_status = params.get("vnp_TransactionStatus").cloned().unwrap_or_default();
        let is_authentic = signature_valid && response_code == SUCCESS && transaction_status == SUCCESS;
        let amount = params.get("vnp_Amount").and_then(|a| a.parse::<i64>().ok()).map(Vnd::from_minor);
        if !signature_valid {
            warn!("💳️ VNPay callback for [{reference}] has an invalid signature. Canonical string: {canonical}");
        }
        Ok(CallbackVerification {
            provider: PaymentMethod::VnPay,
            transaction_reference: reference,
            signature_valid,
            is_authentic,
            provider_status: response_code,
            amount,
            canonical,
        })
    }
}

/// The JSON body VNPay expects in reply to an IPN. VNPay retries until it receives one of these codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VnPayIpnReply {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl VnPayIpnReply {
    fn new(code: &str, message: &str) -> Self {
        Self { rsp_code: code.to_string(), message: message.to_string() }
    }

    pub fn confirmed() -> Self {
        Self::new("00", "Confirm Success")
    }

    pub fn order_not_found() -> Self {
        Self::new("01", "Order not found")
    }

    pub fn already_confirmed() -> Self {
        Self::new("02", "Order already confirmed")
    }

    pub fn invalid_amount() -> Self {
        Self::new("04", "Invalid amount")
    }

    pub fn invalid_signature() -> Self {
        Self::new("97", "Invalid signature")
    }

    pub fn unknown_error() -> Self {
        Self::new("99", "Unknown error")
    }
}

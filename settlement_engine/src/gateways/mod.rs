//! Gateway adapters.
//!
//! Each supported gateway knows how to turn a [`CheckoutIntent`] into a signed outbound request, how to read the
//! gateway's reply to that request, and how to authenticate the gateway's callbacks. The adapters are pure: they do not
//! perform any I/O. Sending requests is left to the caller, and acting on verified callbacks is the job of the
//! settlement API.
mod config;
mod momo;
mod payos;
mod vnpay;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
pub use config::{GatewayConfig, MomoConfig, PayOsConfig, VnPayConfig};
pub use momo::MomoAdapter;
pub use payos::PayOsAdapter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
pub use vnpay::{VnPayAdapter, VnPayIpnReply, VNPAY_MAX_AMOUNT, VNPAY_MIN_AMOUNT};

use crate::{
    db_types::{OrderId, PaymentMethod, Vnd},
    helpers::SignatureError,
};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Invalid payment request. {0}")]
    Validation(String),
    #[error("The field {0} is missing from the gateway message")]
    MissingField(String),
    #[error("The gateway sent a response we could not understand. {0}")]
    MalformedResponse(String),
    #[error("The callback could not be read. {0}")]
    MalformedCallback(String),
    #[error("The gateway declined the request. {0}")]
    Rejected(String),
    #[error("Could not sign the request. {0}")]
    Signing(#[from] SignatureError),
    #[error("{0} is not an online payment gateway, or it has not been configured")]
    Unavailable(PaymentMethod),
}

/// Everything an adapter needs to build the outbound payment request for one payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutIntent {
    pub order_id: OrderId,
    pub transaction_reference: String,
    pub amount: Vnd,
    /// Free text shown to the customer by the gateway
    pub description: String,
    pub client_ip: String,
    /// Preselects a bank or card type on the redirect gateway
    pub bank_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A signed request, ready to be handed to the customer (redirects) or sent to the gateway (JSON posts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayRequest {
    Redirect { url: String },
    JsonPost { endpoint: String, headers: Vec<(String, String)>, body: Value },
}

/// Where to send the customer to complete the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub qr_code: Option<String>,
}

/// An inbound callback or webhook, as received over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundCallback {
    /// Query string parameters
    pub params: BTreeMap<String, String>,
    /// The exact raw body, if there was one
    pub body: Option<String>,
    /// A signature delivered out-of-band, e.g. in a header
    pub signature: Option<String>,
}

impl InboundCallback {
    pub fn from_params(params: BTreeMap<String, String>) -> Self {
        Self { params, ..Default::default() }
    }

    pub fn from_body<S: Into<String>>(body: S, signature: Option<String>) -> Self {
        Self { params: BTreeMap::new(), body: Some(body.into()), signature }
    }

    /// A compact rendering of the callback, suitable for storing alongside a rejection.
    pub fn payload(&self) -> String {
        match &self.body {
            Some(body) => body.clone(),
            None => serde_json::to_string(&self.params).unwrap_or_default(),
        }
    }

    fn json_body(&self) -> Result<Value, GatewayError> {
        let body = self.body.as_deref().ok_or_else(|| GatewayError::MissingField("body".into()))?;
        serde_json::from_str(body).map_err(|e| GatewayError::MalformedCallback(format!("Callback body is not JSON. {e}")))
    }
}

/// The normalized result of checking a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackVerification {
    pub provider: PaymentMethod,
    pub transaction_reference: String,
    /// The signature matched.
    pub signature_valid: bool,
    /// The signature matched *and* the gateway reports a successful payment.
    pub is_authentic: bool,
    pub provider_status: String,
    pub amount: Option<Vnd>,
    /// The string the signature was computed over. Safe to log; it never contains the key.
    pub canonical: String,
}

impl CallbackVerification {
    /// The gateway authentically reports that the payment did not go through.
    pub fn is_authentic_failure(&self) -> bool {
        self.signature_valid && !self.is_authentic
    }
}

/// The gateway adapters, selected by payment method.
#[derive(Debug, Clone)]
pub enum PaymentAdapter {
    VnPay(VnPayAdapter),
    Momo(MomoAdapter),
    PayOs(PayOsAdapter),
}

impl PaymentAdapter {
    /// Selects the adapter for `method` from the configured gateways.
    pub fn for_method(method: PaymentMethod, config: &GatewayConfig) -> Result<Self, GatewayError> {
        match method {
            PaymentMethod::VnPay => config.vnpay.clone().map(|c| Self::VnPay(VnPayAdapter::new(c))),
            PaymentMethod::Momo => config.momo.clone().map(|c| Self::Momo(MomoAdapter::new(c))),
            PaymentMethod::PayOs => config.payos.clone().map(|c| Self::PayOs(PayOsAdapter::new(c))),
            PaymentMethod::BankTransfer => None,
        }
        .ok_or(GatewayError::Unavailable(method))
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::VnPay(_) => PaymentMethod::VnPay,
            Self::Momo(_) => PaymentMethod::Momo,
            Self::PayOs(_) => PaymentMethod::PayOs,
        }
    }

    pub fn build_request(&self, intent: &CheckoutIntent) -> Result<GatewayRequest, GatewayError> {
        match self {
            Self::VnPay(a) => a.build_request(intent),
            Self::Momo(a) => a.build_request(intent),
            Self::PayOs(a) => a.build_request(intent),
        }
    }

    /// Reads the gateway's reply to a [`GatewayRequest::JsonPost`]. Redirect gateways have no reply to parse; pass the
    /// request through [`CheckoutSession::from_redirect`] instead.
    pub fn parse_create_response(&self, response: &Value) -> Result<CheckoutSession, GatewayError> {
        match self {
            Self::VnPay(_) => Err(GatewayError::MalformedResponse("The redirect gateway has no create response".into())),
            Self::Momo(a) => a.parse_create_response(response),
            Self::PayOs(a) => a.parse_create_response(response),
        }
    }

    pub fn verify_callback(&self, callback: &InboundCallback) -> Result<CallbackVerification, GatewayError> {
        match self {
            Self::VnPay(a) => a.verify_callback(callback),
            Self::Momo(a) => a.verify_callback(callback),
            Self::PayOs(a) => a.verify_callback(callback),
        }
    }
}

impl CheckoutSession {
    pub fn from_redirect(request: &GatewayRequest) -> Option<Self> {
        match request {
            GatewayRequest::Redirect { url } => Some(Self { checkout_url: url.clone(), qr_code: None }),
            GatewayRequest::JsonPost { .. } => None,
        }
    }
}

/// Renders a JSON scalar the way gateways put it in their canonical strings. Missing and null fields are empty.
fn json_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Reads an amount of whole dong from a callback field. Amounts that do not fit are an error, not a panic.
fn callback_amount(value: &Value, key: &str) -> Result<Option<Vnd>, GatewayError> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .map(|dong| Vnd::checked_from_dong(dong).map_err(|e| GatewayError::MalformedCallback(format!("{key}: {e}"))))
        .transpose()
}

fn whole_dong(amount: Vnd, gateway: &str) -> Result<i64, GatewayError> {
    amount
        .whole_dong()
        .filter(|d| *d > 0)
        .ok_or_else(|| GatewayError::Validation(format!("{gateway} only accepts positive, whole-dong amounts. Got {amount}")))
}

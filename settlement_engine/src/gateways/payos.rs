use log::*;
use serde_json::{json, Value};

use super::{
    callback_amount,
    json_field,
    whole_dong,
    CallbackVerification,
    CheckoutIntent,
    CheckoutSession,
    GatewayError,
    GatewayRequest,
    InboundCallback,
    PayOsConfig,
};
use crate::{
    db_types::PaymentMethod,
    helpers::{raw_canonical, sign, verify, HashAlgorithm},
};

const SUCCESS: &str = "00";
/// PayOS truncates longer descriptions on bank statements, and rejects them outright on some banks.
const MAX_DESCRIPTION_CHARS: usize = 25;

#[derive(Debug, Clone)]
pub struct PayOsAdapter {
    config: PayOsConfig,
}

impl PayOsAdapter {
    pub fn new(config: PayOsConfig) -> Self {
        Self { config }
    }

    pub fn build_request(&self, intent: &CheckoutIntent) -> Result<GatewayRequest, GatewayError> {
        let amount = whole_dong(intent.amount, "PayOS")?;
        let order_code = intent.transaction_reference.parse::<i64>().map_err(|_| {
            GatewayError::Validation(format!(
                "PayOS order codes must be numeric. [{}] is not",
                intent.transaction_reference
            ))
        })?;
        let description: String = intent.description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        let c = &self.config;
        let amount_str = amount.to_string();
        let order_code_str = order_code.to_string();
        let canonical = raw_canonical(
            [
                ("amount", amount_str.as_str()),
                ("cancelUrl", c.cancel_url.as_str()),
                ("description", description.as_str()),
                ("orderCode", order_code_str.as_str()),
                ("returnUrl", c.return_url.as_str()),
            ],
            &[],
        );
        let signature = sign(c.checksum_key.reveal(), &canonical, HashAlgorithm::HmacSha256)?;
        let body = json!({
            "orderCode": order_code,
            "amount": amount,
            "description": description,
            "cancelUrl": c.cancel_url,
            "returnUrl": c.return_url,
            "signature": signature,
        });
        let headers = vec![
            ("x-client-id".to_string(), c.client_id.clone()),
            ("x-api-key".to_string(), c.api_key.reveal().clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        debug!("🔳️ PayOS payment request built for [{order_code}] on order {}", intent.order_id);
        Ok(GatewayRequest::JsonPost { endpoint: c.endpoint.clone(), headers, body })
    }

    pub fn parse_create_response(&self, response: &Value) -> Result<CheckoutSession, GatewayError> {
        let code = json_field(response, "code");
        if code != SUCCESS {
            let desc = json_field(response, "desc");
            return Err(GatewayError::Rejected(format!("PayOS code {code}: {desc}")));
        }
        let data = response
            .get("data")
            .filter(|d| d.is_object())
            .ok_or_else(|| GatewayError::MalformedResponse("PayOS response has no data".into()))?;
        let checkout_url = data
            .get("checkoutUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::MalformedResponse("PayOS did not return a checkoutUrl".into()))?
            .to_string();
        let qr_code = data.get("qrCode").and_then(Value::as_str).map(String::from);
        Ok(CheckoutSession { checkout_url, qr_code })
    }

    /// Authenticates a webhook. The signature covers the exact raw body bytes and arrives out-of-band, in a header.
    pub fn verify_callback(&self, callback: &InboundCallback) -> Result<CallbackVerification, GatewayError> {
        let raw = callback.body.clone().ok_or_else(|| GatewayError::MissingField("body".into()))?;
        let body = callback.json_body()?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let reference = json_field(&data, "orderCode");
        if reference.is_empty() {
            return Err(GatewayError::MissingField("data.orderCode".into()));
        }
        let candidate = callback.signature.as_deref().unwrap_or_default();
        let signature_valid = verify(candidate, self.config.checksum_key.reveal(), &raw, HashAlgorithm::HmacSha256);
        let data_code = json_field(&data, "code");
        let is_authentic = signature_valid && data_code == SUCCESS;
        let amount = if signature_valid {
            callback_amount(&data, "amount")?
        } else {
            warn!("🔳️ PayOS webhook for [{reference}] has an invalid signature");
            None
        };
        Ok(CallbackVerification {
            provider: PaymentMethod::PayOs,
            transaction_reference: reference,
            signature_valid,
            is_authentic,
            provider_status: data_code,
            amount,
            canonical: raw,
        })
    }
}

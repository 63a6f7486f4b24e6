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
    MomoConfig,
};
use crate::{
    db_types::PaymentMethod,
    helpers::{ordered_canonical, sign, verify, HashAlgorithm},
};

const REQUEST_TYPE: &str = "captureWallet";

/// Field order of the IPN signature. MoMo fixes this order instead of sorting.
const IPN_FIELDS: [&str; 12] = [
    "amount",
    "extraData",
    "message",
    "orderId",
    "orderInfo",
    "orderType",
    "partnerCode",
    "payType",
    "requestId",
    "responseTime",
    "resultCode",
    "transId",
];

#[derive(Debug, Clone)]
pub struct MomoAdapter {
    config: MomoConfig,
}

impl MomoAdapter {
    pub fn new(config: MomoConfig) -> Self {
        Self { config }
    }

    pub fn build_request(&self, intent: &CheckoutIntent) -> Result<GatewayRequest, GatewayError> {
        let dong = whole_dong(intent.amount, "MoMo")?;
        let amount = dong.to_string();
        let reference = intent.transaction_reference.as_str();
        let c = &self.config;
        let canonical = ordered_canonical([
            ("accessKey", c.access_key.as_str()),
            ("amount", amount.as_str()),
            ("extraData", ""),
            ("ipnUrl", c.ipn_url.as_str()),
            ("orderId", reference),
            ("orderInfo", intent.description.as_str()),
            ("partnerCode", c.partner_code.as_str()),
            ("redirectUrl", c.redirect_url.as_str()),
            ("requestId", reference),
            ("requestType", REQUEST_TYPE),
        ]);
        let signature = sign(c.secret_key.reveal(), &canonical, HashAlgorithm::HmacSha256)?;
        let body = json!({
            "partnerCode": c.partner_code,
            "accessKey": c.access_key,
            "requestId": reference,
            "amount": dong,
            "orderId": reference,
            "orderInfo": intent.description,
            "redirectUrl": c.redirect_url,
            "ipnUrl": c.ipn_url,
            "extraData": "",
            "requestType": REQUEST_TYPE,
            "signature": signature,
            "lang": "vi",
        });
        debug!("👛️ MoMo payment request built for [{reference}] on order {}", intent.order_id);
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        Ok(GatewayRequest::JsonPost { endpoint: c.endpoint.clone(), headers, body })
    }

    /// MoMo must hand back a `payUrl`. Anything else means the payment cannot proceed.
    pub fn parse_create_response(&self, response: &Value) -> Result<CheckoutSession, GatewayError> {
        let result_code = response.get("resultCode").and_then(Value::as_i64);
        if let Some(code) = result_code.filter(|c| *c != 0) {
            let message = json_field(response, "message");
            return Err(GatewayError::Rejected(format!("MoMo result code {code}: {message}")));
        }
        let checkout_url = response
            .get("payUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::MalformedResponse("MoMo did not return a payUrl".into()))?
            .to_string();
        let qr_code = response.get("qrCodeUrl").and_then(Value::as_str).map(String::from);
        Ok(CheckoutSession { checkout_url, qr_code })
    }

    /// Authenticates an IPN (instant payment notification). The body is JSON; the signature is one of its fields.
    pub fn verify_callback(&self, callback: &InboundCallback) -> Result<CallbackVerification, GatewayError> {
        let body = callback.json_body()?;
        let reference = json_field(&body, "orderId");
        if reference.is_empty() {
            return Err(GatewayError::MissingField("orderId".into()));
        }
        let values = IPN_FIELDS.map(|k| json_field(&body, k));
        let pairs = std::iter::once(("accessKey", self.config.access_key.as_str()))
            .chain(IPN_FIELDS.iter().copied().zip(values.iter().map(String::as_str)));
        let canonical = ordered_canonical(pairs);
        let candidate = callback.signature.clone().unwrap_or_else(|| json_field(&body, "signature"));
        let signature_valid = verify(&candidate, self.config.secret_key.reveal(), &canonical, HashAlgorithm::HmacSha256);
        let result_code = body.get("resultCode").and_then(Value::as_i64);
        let is_authentic = signature_valid && result_code == Some(0);
        let amount = if signature_valid {
            callback_amount(&body, "amount")?
        } else {
            warn!("👛️ MoMo IPN for [{reference}] has an invalid signature. Canonical string: {canonical}");
            None
        };
        Ok(CallbackVerification {
            provider: PaymentMethod::Momo,
            transaction_reference: reference,
            signature_valid,
            is_authentic,
            provider_status: result_code.map(|c| c.to_string()).unwrap_or_default(),
            amount,
            canonical,
        })
    }
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use settlement_engine::{
    db_types::{OrderId, OrderStatusType, PaymentMethod, Vnd},
    helpers::TransferQr,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    /// VNPay only: preselect a bank or card type
    #[serde(default)]
    pub bank_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub transaction_reference: String,
    pub amount: Vnd,
    pub checkout_url: String,
    pub qr_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetailsResponse {
    pub order_id: OrderId,
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
    pub amount: Option<Vnd>,
    pub transfer_content: String,
    pub qr: TransferQr,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RejectedCallbackQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

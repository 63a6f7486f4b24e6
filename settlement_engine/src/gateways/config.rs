use costume_common::Secret;

/// Merchant credentials and endpoints for the card/bank redirect gateway.
#[derive(Debug, Clone, Default)]
pub struct VnPayConfig {
    /// Terminal (merchant) code assigned by VNPay
    pub tmn_code: String,
    pub hash_secret: Secret<String>,
    pub pay_url: String,
    pub return_url: String,
    pub locale: String,
}

impl VnPayConfig {
    pub fn is_configured(&self) -> bool {
        !self.tmn_code.is_empty() && !self.hash_secret.is_empty() && !self.pay_url.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: Secret<String>,
    /// The payment creation endpoint, e.g. `https://test-payment.momo.vn/v2/gateway/api/create`
    pub endpoint: String,
    pub redirect_url: String,
    pub ipn_url: String,
}

impl MomoConfig {
    pub fn is_configured(&self) -> bool {
        !self.partner_code.is_empty() && !self.secret_key.is_empty() && !self.endpoint.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayOsConfig {
    pub client_id: String,
    pub api_key: Secret<String>,
    pub checksum_key: Secret<String>,
    /// The payment-request endpoint, e.g. `https://api-merchant.payos.vn/v2/payment-requests`
    pub endpoint: String,
    pub return_url: String,
    pub cancel_url: String,
}

impl PayOsConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.checksum_key.is_empty() && !self.endpoint.is_empty()
    }
}

/// The set of gateways this deployment can take payments through. Unconfigured gateways are `None`.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub vnpay: Option<VnPayConfig>,
    pub momo: Option<MomoConfig>,
    pub payos: Option<PayOsConfig>,
}

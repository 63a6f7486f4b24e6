use std::env;

use costume_common::{
    helpers::{parse_boolean_flag, parse_env},
    Secret,
};
use gateway_tools::GatewayClientConfig;
use log::*;
use settlement_engine::{
    db_types::{OrderId, Vnd},
    gateways::{GatewayConfig, MomoConfig, PayOsConfig, VnPayConfig},
    helpers::BankTransferDetails,
};

const DEFAULT_CSP_HOST: &str = "127.0.0.1";
const DEFAULT_CSP_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/costume_settlement.db";
const DEFAULT_VNPAY_PAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
const DEFAULT_MOMO_ENDPOINT: &str = "https://test-payment.momo.vn/v2/gateway/api/create";
const DEFAULT_PAYOS_ENDPOINT: &str = "https://api-merchant.payos.vn/v2/payment-requests";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Merchant credentials. Gateways without credentials are disabled.
    pub gateways: GatewayConfig,
    /// Outbound HTTP settings for the gateways' server-to-server APIs
    pub gateway_client: GatewayClientConfig,
    /// The account customers pay into for manual bank transfers
    pub bank_account: Option<BankAccountConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CSP_HOST.to_string(),
            port: DEFAULT_CSP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateways: GatewayConfig::default(),
            gateway_client: GatewayClientConfig::default(),
            bank_account: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CSP_HOST").ok().unwrap_or_else(|| DEFAULT_CSP_HOST.into());
        let port = match env::var("CSP_PORT") {
            Ok(s) => s.parse::<u16>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid port for CSP_PORT. {e} Using the default, {DEFAULT_CSP_PORT}, instead.");
                DEFAULT_CSP_PORT
            }),
            Err(_) => DEFAULT_CSP_PORT,
        };
        let database_url = env::var("CSP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CSP_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("CSP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CSP_USE_FORWARDED").ok(), false);
        let gateways = gateway_config_from_env();
        let gateway_client = GatewayClientConfig::new_from_env_or_default();
        let bank_account = BankAccountConfig::from_env();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, gateways, gateway_client, bank_account }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn secret_from_env(name: &str) -> Secret<String> {
    Secret::new(env::var(name).unwrap_or_default())
}

/// Reads the credentials of each gateway. A gateway is enabled only when its credentials are complete.
pub fn gateway_config_from_env() -> GatewayConfig {
    let vnpay = VnPayConfig {
        tmn_code: env_or_default("CSP_VNPAY_TMN_CODE", ""),
        hash_secret: secret_from_env("CSP_VNPAY_HASH_SECRET"),
        pay_url: env_or_default("CSP_VNPAY_PAY_URL", DEFAULT_VNPAY_PAY_URL),
        return_url: env_or_default("CSP_VNPAY_RETURN_URL", ""),
        locale: env_or_default("CSP_VNPAY_LOCALE", "vn"),
    };
    let momo = MomoConfig {
        partner_code: env_or_default("CSP_MOMO_PARTNER_CODE", ""),
        access_key: env_or_default("CSP_MOMO_ACCESS_KEY", ""),
        secret_key: secret_from_env("CSP_MOMO_SECRET_KEY"),
        endpoint: env_or_default("CSP_MOMO_ENDPOINT", DEFAULT_MOMO_ENDPOINT),
        redirect_url: env_or_default("CSP_MOMO_REDIRECT_URL", ""),
        ipn_url: env_or_default("CSP_MOMO_IPN_URL", ""),
    };
    let payos = PayOsConfig {
        client_id: env_or_default("CSP_PAYOS_CLIENT_ID", ""),
        api_key: secret_from_env("CSP_PAYOS_API_KEY"),
        checksum_key: secret_from_env("CSP_PAYOS_CHECKSUM_KEY"),
        endpoint: env_or_default("CSP_PAYOS_ENDPOINT", DEFAULT_PAYOS_ENDPOINT),
        return_url: env_or_default("CSP_PAYOS_RETURN_URL", ""),
        cancel_url: env_or_default("CSP_PAYOS_CANCEL_URL", ""),
    };
    let vnpay = enabled("VNPay", vnpay.is_configured(), vnpay);
    let momo = enabled("MoMo", momo.is_configured(), momo);
    let payos = enabled("PayOS", payos.is_configured(), payos);
    GatewayConfig { vnpay, momo, payos }
}

fn enabled<T>(name: &str, configured: bool, config: T) -> Option<T> {
    if configured {
        info!("🪛️ {name} payments are enabled");
        Some(config)
    } else {
        warn!("🪛️ {name} credentials are incomplete. {name} payments are disabled.");
        None
    }
}

//-------------------------------------------------  BankAccountConfig  ------------------------------------------------
/// The platform's receiving bank account, shown to customers who pay by manual transfer.
#[derive(Clone, Debug, Default)]
pub struct BankAccountConfig {
    pub bank_name: String,
    /// 6-digit NAPAS BIN. Without it, customers get a display string instead of a scannable VietQR code.
    pub bank_bin: Option<String>,
    pub account_number: String,
    pub account_name: String,
}

impl BankAccountConfig {
    pub fn from_env() -> Option<Self> {
        let account_number = env::var("CSP_BANK_ACCOUNT_NUMBER").ok().filter(|s| !s.is_empty());
        let Some(account_number) = account_number else {
            warn!("🪛️ CSP_BANK_ACCOUNT_NUMBER is not set. Manual bank transfer details will not be available.");
            return None;
        };
        let bank_bin = parse_env::<u32>("CSP_BANK_BIN").map(|bin| format!("{bin:06}"));
        if bank_bin.is_none() {
            warn!("🪛️ CSP_BANK_BIN is not set or is not numeric. Transfer QR codes will use the legacy format.");
        }
        Some(Self {
            bank_name: env_or_default("CSP_BANK_NAME", "BANK"),
            bank_bin,
            account_number,
            account_name: env_or_default("CSP_BANK_ACCOUNT_NAME", ""),
        })
    }

    /// The transfer instructions for one order. The transfer content carries the order's bank transfer reference so
    /// that staff can match the statement line to the order.
    pub fn transfer_details(&self, order_id: OrderId, amount: Option<Vnd>) -> BankTransferDetails {
        BankTransferDetails {
            bank_name: self.bank_name.clone(),
            bank_bin: self.bank_bin.clone(),
            account_number: self.account_number.clone(),
            account_name: self.account_name.clone(),
            amount,
            transfer_content: order_id.bank_transfer_reference(),
        }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

use std::time::Duration;

use log::*;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Upper bound on a single gateway call, connection included
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("costume-settlement/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GatewayClientConfig {
    pub fn new_from_env_or_default() -> Self {
        let mut config = Self::default();
        match std::env::var("CSP_GATEWAY_TIMEOUT_SECS").ok().map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => config.timeout = Duration::from_secs(secs),
            Some(_) => warn!(
                "CSP_GATEWAY_TIMEOUT_SECS is not a positive number of seconds. Using the default of \
                 {DEFAULT_TIMEOUT_SECS}s"
            ),
            None => debug!("CSP_GATEWAY_TIMEOUT_SECS not set, using {DEFAULT_TIMEOUT_SECS}s"),
        }
        if let Ok(agent) = std::env::var("CSP_GATEWAY_USER_AGENT") {
            config.user_agent = agent;
        }
        config
    }
}

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::GatewayClientConfig,
    helpers::{header_names, truncate_body},
    GatewayApiError,
};

const MAX_LOGGED_BODY: usize = 500;

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayClientConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayClientConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayClientConfig {
        &self.config
    }

    /// POSTs `body` as JSON to `endpoint` and deserializes the gateway's reply.
    ///
    /// Non-2xx replies are returned as [`GatewayApiError::QueryError`]. Use [`GatewayApiError::is_retryable`] to
    /// decide whether to try again.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<T, GatewayApiError> {
        let headers_map = to_header_map(headers)?;
        trace!("🌐️ POST {endpoint} with headers [{}]", header_names(headers));
        let response = self.client.post(endpoint).headers(headers_map).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("🌐️ {endpoint} replied {status}");
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let message = response.text().await.unwrap_or_default();
            warn!("🌐️ {endpoint} replied {status}: {}", truncate_body(&message, MAX_LOGGED_BODY));
            Err(GatewayApiError::QueryError { status: status.as_u16(), message })
        }
    }
}

fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap, GatewayApiError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayApiError::RequestError(format!("Invalid header name {name}. {e}")))?;
        // The value may be a credential, so it stays out of the error message
        let value =
            HeaderValue::from_str(value).map_err(|_| GatewayApiError::RequestError(format!("Invalid value for {name}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

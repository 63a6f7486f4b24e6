use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid request: {0}")]
    RequestError(String),
    #[error("The gateway did not answer in time: {0}")]
    Timeout(String),
    #[error("Could not reach the gateway: {0}")]
    ConnectionError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Gateway call failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl GatewayApiError {
    /// True if the same call may succeed when tried again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayApiError::Timeout(_) | GatewayApiError::ConnectionError(_) | GatewayApiError::JsonError(_) => true,
            GatewayApiError::QueryError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayApiError::Timeout(e.to_string())
        } else if e.is_connect() {
            GatewayApiError::ConnectionError(e.to_string())
        } else if e.is_decode() {
            GatewayApiError::JsonError(e.to_string())
        } else if e.is_builder() {
            GatewayApiError::RequestError(e.to_string())
        } else {
            GatewayApiError::ConnectionError(e.to_string())
        }
    }
}

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use gateway_tools::GatewayApiError;
use log::error;
use settlement_engine::{gateways::GatewayError, helpers::VietQrError, SettlementApiError, SettlementError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the order. {0}")]
    Conflict(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The callback could not be authenticated. {0}")]
    InvalidSignature(String),
    #[error("The payment gateway could not be reached. {0}")]
    GatewayUnavailable(String),
    #[error("The payment gateway returned an error. {0}")]
    GatewayFailure(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayFailure(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        if e.is_fatal() {
            error!("🚨️ {e}. This needs an operator's attention.");
        }
        match e {
            SettlementError::OrderNotFound(_) | SettlementError::PaymentNotFound(_) | SettlementError::CostumeNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SettlementError::InvalidOrder(_) | SettlementError::AmountMismatch { .. } => Self::ValidationError(e.to_string()),
            SettlementError::OrderNotPayable(..)
            | SettlementError::OrderNotPaid(_)
            | SettlementError::PaymentAlreadyFailed(_)
            | SettlementError::DuplicateTransaction { .. }
            | SettlementError::DuplicateReference(_)
            | SettlementError::StatusUnchanged(_)
            | SettlementError::ForbiddenStatusChange { .. } => Self::Conflict(e.to_string()),
            SettlementError::DatabaseError(_)
            | SettlementError::OrderHasNoTotal(_)
            | SettlementError::PlatformAccountMisconfigured(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Validation(_)
            | GatewayError::Unavailable(_)
            | GatewayError::MissingField(_)
            | GatewayError::MalformedCallback(_) => Self::ValidationError(e.to_string()),
            GatewayError::MalformedResponse(_) => Self::GatewayUnavailable(e.to_string()),
            GatewayError::Rejected(_) => Self::GatewayFailure(e.to_string()),
            GatewayError::Signing(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<SettlementApiError> for ServerError {
    fn from(e: SettlementApiError) -> Self {
        match e {
            SettlementApiError::Settlement(e) => e.into(),
            SettlementApiError::Gateway(e) => e.into(),
        }
    }
}

impl From<GatewayApiError> for ServerError {
    fn from(e: GatewayApiError) -> Self {
        if e.is_retryable() {
            Self::GatewayUnavailable(e.to_string())
        } else {
            Self::GatewayFailure(e.to_string())
        }
    }
}

impl From<VietQrError> for ServerError {
    fn from(e: VietQrError) -> Self {
        Self::ConfigurationError(format!("Could not build the transfer QR code. {e}"))
    }
}

use thiserror::Error;

use crate::{gateways::GatewayError, traits::SettlementError};

#[derive(Debug, Clone, Error)]
pub enum SettlementApiError {
    #[error("{0}")]
    Settlement(#[from] SettlementError),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
}

impl SettlementApiError {
    /// Errors that the client can fix by changing its request.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SettlementApiError::Gateway(GatewayError::Validation(_))
                | SettlementApiError::Gateway(GatewayError::MalformedCallback(_))
                | SettlementApiError::Settlement(SettlementError::InvalidOrder(_))
                | SettlementApiError::Settlement(SettlementError::AmountMismatch { .. })
        )
    }
}

//! A thin HTTP client for the server-to-server calls the payment gateways require.
//!
//! Signing and response interpretation live in the settlement engine. This crate only moves the signed JSON over the
//! wire and reports transport failures in a way the caller can act on.
mod api;
mod config;
mod error;
mod helpers;

pub use api::GatewayApi;
pub use config::GatewayClientConfig;
pub use error::GatewayApiError;

//! # Costume settlement server
//! This crate hosts the HTTP front end of the settlement engine. It is responsible for:
//! Starting checkouts with the payment gateways and handing the customer a checkout URL.
//! Receiving and authenticating gateway callbacks (VNPay IPN and return, MoMo IPN, PayOS webhook).
//! Bank transfer details, VietQR payloads and staff verification of transfers.
//! Order administration: creation, status changes, deletion and earnings.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Checkout, bank transfer and order administration routes.
//! * `/callbacks/...`: Payment gateway notifications.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

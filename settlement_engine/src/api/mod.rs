pub mod errors;
pub mod order_admin_api;
pub mod settlement_api;

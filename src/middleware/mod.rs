//! Middleware for the CreditVault API

mod tracing;

pub use tracing::request_tracing;

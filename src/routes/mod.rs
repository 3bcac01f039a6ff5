//! Route definitions for the CreditVault API

mod credit;
mod loan;
mod webhook;

pub use credit::credit_routes;
pub use loan::loan_routes;
pub use webhook::webhook_routes;

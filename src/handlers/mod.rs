//! API handlers for CreditVault

mod credit;
mod loan;
mod webhook;

pub use credit::{get_credit_profile, get_score_history};
pub use loan::{create_loan, get_loan, repay_loan};
pub use webhook::receive_event;

//! HTTP handlers

use serde::Deserialize;

pub mod auth;
pub mod capital;
pub mod cash_bank;
pub mod debt;
pub mod health;
pub mod inventory;
pub mod purchase;
pub mod sale;
pub mod stock_opname;

pub use auth::*;
pub use capital::*;
pub use cash_bank::*;
pub use debt::*;
pub use health::*;
pub use inventory::*;
pub use purchase::*;
pub use sale::*;
pub use stock_opname::*;

/// `?branch_id=` on writes; only an owner's choice is honoured.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BranchParam {
    pub branch_id: Option<i64>,
}

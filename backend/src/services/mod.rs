//! Business logic services for the bahan-kue back office
//!
//! Write engines are generic over [`crate::store::Store`]; the ledger helpers in
//! `inventory`, `cash_book` and `debt` run inside the caller's unit of work.

pub mod auth;
pub mod capital;
pub mod cash_book;
pub mod debt;
pub mod inventory;
pub mod purchase;
pub mod query;
pub mod sale;
pub mod stock_opname;

#[cfg(test)]
mod ledger_properties;

pub use auth::AuthService;
pub use capital::{CapitalService, ExpenseService};
pub use debt::DebtService;
pub use purchase::PurchaseService;
pub use query::QueryService;
pub use sale::SaleService;
pub use stock_opname::StockOpnameService;

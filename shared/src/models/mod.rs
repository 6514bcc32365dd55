//! Domain models for the bahan-kue back office

mod branch;
mod cash_bank;
mod debt;
mod inventory;
mod product;
mod purchase;
mod sale;
mod stock_opname;
mod trade;

pub use branch::*;
pub use cash_bank::*;
pub use debt::*;
pub use inventory::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
pub use stock_opname::*;
pub use trade::*;

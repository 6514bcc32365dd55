//! Domain types and rules for the bahan-kue back office
//!
//! Everything here is pure: no I/O, no clock reads except through the callers. The
//! backend feeds these rules with rows it has locked inside a transaction.

pub mod code;
pub mod error;
pub mod models;
pub mod money;
pub mod types;
pub mod validation;

pub use code::CodeClock;
pub use error::{DomainError, DomainResult};
pub use models::*;
pub use money::Money;
pub use types::*;

//! Products and their sellable sizes

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A sellable variant of a product with its current prices.
///
/// `buy_price` is the last observed purchase unit cost; purchases overwrite it and
/// purchase cancellations put the previous value back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub id: i64,
    pub product_sku: String,
    pub product_name: String,
    pub name: String,
    pub sell_price: Money,
    pub buy_price: Money,
}

//! Purchases: inbound stock from distributors, paid up front or on payable

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::inventory::qty_too_large;
use super::{Debt, DebtRequest, DebtStatus, PaymentMethod, PaymentRequest, PricedLine, Size, TradeStatus};
use crate::error::{DomainError, DomainResult};
use crate::money::Money;

pub const PURCHASE_CODE_PREFIX: &str = "PURCHASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub code: String,
    pub sales_name: String,
    pub branch_id: i64,
    pub distributor_id: i64,
    pub status: TradeStatus,
    pub total_price: Money,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDetail {
    pub purchase_code: String,
    pub size_id: i64,
    pub qty: i64,
    pub buy_price: Money,
    pub is_cancelled: bool,
    pub cancelled_at: Option<i64>,
}

impl PurchaseDetail {
    pub fn line_total(&self) -> Money {
        self.buy_price.times(self.qty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePayment {
    pub id: i64,
    pub purchase_code: String,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub note: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseRequest {
    pub distributor_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub sales_name: String,
    #[validate(length(min = 1))]
    pub details: Vec<PurchaseDetailRequest>,
    pub payments: Option<Vec<PaymentRequest>>,
    pub debt: Option<DebtRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseDetailRequest {
    pub size_id: i64,
    pub qty: i64,
    pub buy_price: Money,
}

impl CreatePurchaseRequest {
    /// Merge duplicate sizes into one line each, ordered by size id.
    ///
    /// Duplicates must agree on the unit cost; a size appears once per purchase.
    pub fn priced_lines(&self) -> DomainResult<Vec<PricedLine>> {
        let mut by_size: BTreeMap<i64, PricedLine> = BTreeMap::new();
        for detail in &self.details {
            if detail.qty <= 0 {
                return Err(DomainError::Validation(format!(
                    "qty for size_id {} must be greater than 0",
                    detail.size_id
                )));
            }
            if detail.buy_price.is_negative() {
                return Err(DomainError::Validation(format!(
                    "buy_price for size_id {} must not be negative",
                    detail.size_id
                )));
            }
            detail.buy_price.ensure_storable("buy_price")?;
            match by_size.get_mut(&detail.size_id) {
                Some(line) if line.price != detail.buy_price => {
                    return Err(DomainError::Validation(format!(
                        "size_id {} is listed twice with different buy prices",
                        detail.size_id
                    )));
                }
                Some(line) => {
                    line.qty = line
                        .qty
                        .checked_add(detail.qty)
                        .ok_or_else(|| qty_too_large(detail.size_id))?;
                }
                None => {
                    by_size.insert(
                        detail.size_id,
                        PricedLine {
                            size_id: detail.size_id,
                            qty: detail.qty,
                            price: detail.buy_price,
                        },
                    );
                }
            }
        }
        Ok(by_size.into_values().collect())
    }
}

/// Every purchased size must exist.
pub fn ensure_sizes_exist(lines: &[PricedLine], sizes: &[Size]) -> DomainResult<()> {
    for line in lines {
        if !sizes.iter().any(|s| s.id == line.size_id) {
            return Err(DomainError::ReferencedResourceMissing(format!(
                "size {} does not exist",
                line.size_id
            )));
        }
    }
    Ok(())
}

/// Buy prices to write back after a cancellation: the latest surviving purchase price
/// for each size, leaving sizes without history untouched.
pub fn restored_buy_prices(size_ids: &[i64], last_prices: &HashMap<i64, Money>) -> Vec<(i64, Money)> {
    size_ids
        .iter()
        .filter_map(|id| last_prices.get(id).map(|price| (*id, *price)))
        .collect()
}

/// A debt that a cancelled line just turned from partially paid into fully paid gets an
/// offsetting cash payment on the purchase.
pub fn needs_flatten_payment(status_before: DebtStatus, debt: &Debt) -> bool {
    status_before != DebtStatus::Paid
        && debt.status == DebtStatus::Paid
        && debt.total_amount.is_positive()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseDetailView {
    #[serde(flatten)]
    pub detail: PurchaseDetail,
    pub product_name: String,
    pub size_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub distributor_name: String,
    pub details: Vec<PurchaseDetailView>,
    pub payments: Vec<PurchasePayment>,
    pub debt: Option<Debt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResult {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub details: Vec<PurchaseDetail>,
    pub payments: Vec<PurchasePayment>,
    pub debt: Option<Debt>,
}

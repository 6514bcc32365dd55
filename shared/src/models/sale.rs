//! Sales: outbound stock paid up front or on credit

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    ensure_stock_available, BranchInventory, Debt, DebtRequest, PaymentMethod, PaymentRequest,
    PricedLine, QtyBySize, Size, TradeStatus,
};
use crate::error::{DomainError, DomainResult};
use crate::money::Money;

pub const SALE_CODE_PREFIX: &str = "SALE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub code: String,
    pub customer_name: String,
    pub branch_id: i64,
    pub status: TradeStatus,
    pub total_price: Money,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One line of a sale; `sell_price` is the size price at the moment of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale_code: String,
    pub size_id: i64,
    pub qty: i64,
    pub sell_price: Money,
    pub is_cancelled: bool,
    pub cancelled_at: Option<i64>,
}

impl SaleDetail {
    pub fn line_total(&self) -> Money {
        self.sell_price.times(self.qty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePayment {
    pub id: i64,
    pub sale_code: String,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub note: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSaleRequest {
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    #[validate(length(min = 1))]
    pub details: Vec<SaleDetailRequest>,
    pub payments: Option<Vec<PaymentRequest>>,
    pub debt: Option<DebtRequest>,
}

impl CreateSaleRequest {
    pub fn validate_lines(&self) -> DomainResult<()> {
        for detail in &self.details {
            if detail.qty <= 0 {
                return Err(DomainError::Validation(format!(
                    "qty for size_id {} must be greater than 0",
                    detail.size_id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetailRequest {
    pub size_id: i64,
    pub qty: i64,
}

/// Price the requested quantities at the current sell prices, checking that every size
/// exists and that the branch holds enough stock.
pub fn price_sale_lines(
    qty: &QtyBySize,
    sizes: &[Size],
    inventories: &[BranchInventory],
) -> DomainResult<Vec<PricedLine>> {
    let mut lines = Vec::with_capacity(qty.len());
    for (size_id, q) in qty {
        let size = sizes.iter().find(|s| s.id == *size_id).ok_or_else(|| {
            DomainError::ReferencedResourceMissing(format!("size {} does not exist", size_id))
        })?;
        lines.push(PricedLine {
            size_id: *size_id,
            qty: *q,
            price: size.sell_price,
        });
    }
    ensure_stock_available(inventories, qty)?;
    Ok(lines)
}

/// Sale line with product names, for read views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetailView {
    #[serde(flatten)]
    pub detail: SaleDetail,
    pub product_name: String,
    pub size_name: String,
}

/// A sale with everything attached to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub details: Vec<SaleDetailView>,
    pub payments: Vec<SalePayment>,
    pub debt: Option<Debt>,
}

/// What a sale write returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleResult {
    #[serde(flatten)]
    pub sale: Sale,
    pub details: Vec<SaleDetail>,
    pub payments: Vec<SalePayment>,
    pub debt: Option<Debt>,
}

//! Cash/bank journal plus the capital and expense rows it mirrors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::money::Money;
use crate::validation::validate_positive_amount;

/// Direction of money for a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashFlow {
    In,
    Out,
}

impl CashFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashFlow::In => "IN",
            CashFlow::Out => "OUT",
        }
    }

    pub fn reversed(&self) -> CashFlow {
        match self {
            CashFlow::In => CashFlow::Out,
            CashFlow::Out => CashFlow::In,
        }
    }
}

impl fmt::Display for CashFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(CashFlow::In),
            "OUT" => Ok(CashFlow::Out),
            other => Err(format!("unknown cash flow '{}'", other)),
        }
    }
}

/// Business event behind a cashbook row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashSource {
    Capital,
    Expense,
    Sale,
    Purchase,
    Debt,
    SaleCancelled,
    PurchaseCancelled,
    SaleDebtCancelled,
    PurchaseDebtCancelled,
    SaleDetailCancelled,
    PurchaseDetailCancelled,
    StockOpname,
}

impl CashSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashSource::Capital => "CAPITAL",
            CashSource::Expense => "EXPENSE",
            CashSource::Sale => "SALE",
            CashSource::Purchase => "PURCHASE",
            CashSource::Debt => "DEBT",
            CashSource::SaleCancelled => "SALE_CANCELLED",
            CashSource::PurchaseCancelled => "PURCHASE_CANCELLED",
            CashSource::SaleDebtCancelled => "SALE_DEBT_CANCELLED",
            CashSource::PurchaseDebtCancelled => "PURCHASE_DEBT_CANCELLED",
            CashSource::SaleDetailCancelled => "SALE_DETAIL_CANCELLED",
            CashSource::PurchaseDetailCancelled => "PURCHASE_DETAIL_CANCELLED",
            CashSource::StockOpname => "STOCK_OPNAME",
        }
    }
}

impl fmt::Display for CashSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAPITAL" => Ok(CashSource::Capital),
            "EXPENSE" => Ok(CashSource::Expense),
            "SALE" => Ok(CashSource::Sale),
            "PURCHASE" => Ok(CashSource::Purchase),
            "DEBT" => Ok(CashSource::Debt),
            "SALE_CANCELLED" => Ok(CashSource::SaleCancelled),
            "PURCHASE_CANCELLED" => Ok(CashSource::PurchaseCancelled),
            "SALE_DEBT_CANCELLED" => Ok(CashSource::SaleDebtCancelled),
            "PURCHASE_DEBT_CANCELLED" => Ok(CashSource::PurchaseDebtCancelled),
            "SALE_DETAIL_CANCELLED" => Ok(CashSource::SaleDetailCancelled),
            "PURCHASE_DETAIL_CANCELLED" => Ok(CashSource::PurchaseDetailCancelled),
            "STOCK_OPNAME" => Ok(CashSource::StockOpname),
            other => Err(format!("unknown cash source '{}'", other)),
        }
    }
}

/// One money movement for a branch. Append-only, except the capital and expense rows
/// which follow their business row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBankTransaction {
    pub id: i64,
    pub transaction_date: i64,
    #[serde(rename = "type")]
    pub flow: CashFlow,
    pub source: CashSource,
    pub amount: Money,
    pub description: Option<String>,
    pub reference_key: String,
    pub branch_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCashBankTransaction {
    pub transaction_date: i64,
    pub flow: CashFlow,
    pub source: CashSource,
    pub amount: Money,
    pub description: Option<String>,
    pub reference_key: String,
    pub branch_id: i64,
}

impl NewCashBankTransaction {
    pub fn new(
        flow: CashFlow,
        source: CashSource,
        amount: Money,
        reference_key: impl Into<String>,
        branch_id: i64,
        now: i64,
    ) -> Self {
        Self {
            transaction_date: now,
            flow,
            source,
            amount,
            description: None,
            reference_key: reference_key.into(),
            branch_id,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Signed effect on the branch balance.
    pub fn signed_amount(&self) -> Money {
        match self.flow {
            CashFlow::In => self.amount,
            CashFlow::Out => Money::ZERO - self.amount,
        }
    }
}

/// Σ IN − Σ OUT for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    pub branch_id: i64,
    pub total_in: Money,
    pub total_out: Money,
    pub balance: Money,
}

impl CashBalance {
    pub fn new(branch_id: i64, total_in: Money, total_out: Money) -> Self {
        Self {
            branch_id,
            total_in,
            total_out,
            balance: total_in - total_out,
        }
    }

    pub fn from_transactions<'a, I>(branch_id: i64, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a CashBankTransaction>,
    {
        let (total_in, total_out) = rows
            .into_iter()
            .filter(|row| row.branch_id == branch_id)
            .fold((Money::ZERO, Money::ZERO), |(i, o), row| match row.flow {
                CashFlow::In => (i + row.amount, o),
                CashFlow::Out => (i, o + row.amount),
            });
        Self::new(branch_id, total_in, total_out)
    }
}

/// Owner or branch capital injection (IN) or withdrawal (OUT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capital {
    pub id: i64,
    #[serde(rename = "type")]
    pub flow: CashFlow,
    pub amount: Money,
    pub note: Option<String>,
    pub branch_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCapital {
    pub flow: CashFlow,
    pub amount: Money,
    pub note: Option<String>,
    pub branch_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CapitalRequest {
    #[serde(rename = "type")]
    pub flow: CashFlow,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Money,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: Money,
    pub branch_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub branch_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseRequest {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(custom = "validate_positive_amount")]
    pub amount: Money,
}

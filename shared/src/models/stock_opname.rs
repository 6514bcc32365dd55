//! Stock opname: a physical count drafted first and reconciled on approval

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::BranchInventory;
use crate::error::{DomainError, DomainResult};
use crate::money::Money;
use crate::types::UnixDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpnameStatus {
    Draft,
    Completed,
    Cancelled,
}

impl OpnameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpnameStatus::Draft => "draft",
            OpnameStatus::Completed => "completed",
            OpnameStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OpnameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpnameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OpnameStatus::Draft),
            "completed" => Ok(OpnameStatus::Completed),
            "cancelled" => Ok(OpnameStatus::Cancelled),
            other => Err(format!("unknown stock opname status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpname {
    pub id: i64,
    pub branch_id: i64,
    pub date: i64,
    pub status: OpnameStatus,
    pub created_by: String,
    pub verified_by: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl StockOpname {
    pub fn ensure_draft(&self) -> DomainResult<()> {
        if self.status != OpnameStatus::Draft {
            return Err(DomainError::Conflict(format!(
                "stock opname {} is {}, not draft",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpnameDetail {
    pub id: i64,
    pub stock_opname_id: i64,
    pub branch_inventory_id: i64,
    pub system_qty: i64,
    pub physical_qty: i64,
    pub difference: i64,
    pub notes: Option<String>,
}

impl StockOpnameDetail {
    /// Compare the counted quantity against the stock as it stands now.
    pub fn recompute(&mut self, system_qty: i64) {
        self.system_qty = system_qty;
        self.difference = self.physical_qty - system_qty;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockOpname {
    pub branch_id: i64,
    pub date: i64,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockOpnameDetail {
    pub branch_inventory_id: i64,
    pub system_qty: i64,
    pub physical_qty: i64,
    pub difference: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStockOpnameRequest {
    pub branch_id: Option<i64>,
    pub date: Option<UnixDate>,
    #[validate(length(min = 1))]
    pub details: Vec<CreateStockOpnameDetailRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStockOpnameDetailRequest {
    pub branch_inventory_id: i64,
    pub physical_qty: i64,
    pub notes: Option<String>,
}

impl CreateStockOpnameRequest {
    /// Ascending, de-duplicated inventory ids; the lock order for the draft read.
    pub fn inventory_ids(&self) -> DomainResult<Vec<i64>> {
        let mut seen = HashSet::new();
        for detail in &self.details {
            if detail.physical_qty < 0 {
                return Err(DomainError::Validation(format!(
                    "physical_qty for branch_inventory_id {} must not be negative",
                    detail.branch_inventory_id
                )));
            }
            if !seen.insert(detail.branch_inventory_id) {
                return Err(DomainError::Validation(format!(
                    "branch_inventory_id {} is listed more than once",
                    detail.branch_inventory_id
                )));
            }
        }
        let mut ids: Vec<i64> = seen.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Draft lines snapshotting the current stock of each counted row.
    pub fn draft_details(
        &self,
        branch_id: i64,
        inventories: &[BranchInventory],
    ) -> DomainResult<Vec<NewStockOpnameDetail>> {
        self.details
            .iter()
            .map(|detail| {
                let inventory = inventories
                    .iter()
                    .find(|row| row.id == detail.branch_inventory_id)
                    .ok_or_else(|| {
                        DomainError::NotFound(format!(
                            "branch inventory {} not found",
                            detail.branch_inventory_id
                        ))
                    })?;
                if inventory.branch_id != branch_id {
                    return Err(DomainError::Validation(format!(
                        "branch inventory {} belongs to another branch",
                        inventory.id
                    )));
                }
                Ok(NewStockOpnameDetail {
                    branch_inventory_id: inventory.id,
                    system_qty: inventory.stock,
                    physical_qty: detail.physical_qty,
                    difference: detail.physical_qty - inventory.stock,
                    notes: detail.notes.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ApproveStockOpnameRequest {
    #[serde(default)]
    pub details: Vec<ApproveStockOpnameDetailRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveStockOpnameDetailRequest {
    pub id: i64,
    pub physical_qty: i64,
    pub notes: Option<String>,
}

impl ApproveStockOpnameRequest {
    /// Overlay the submitted counts on the stored lines by detail id.
    pub fn overlay(&self, details: &mut [StockOpnameDetail]) -> DomainResult<()> {
        for incoming in &self.details {
            if incoming.physical_qty < 0 {
                return Err(DomainError::Validation(format!(
                    "physical_qty for detail {} must not be negative",
                    incoming.id
                )));
            }
            let detail = details
                .iter_mut()
                .find(|d| d.id == incoming.id)
                .ok_or_else(|| {
                    DomainError::Validation(format!(
                        "detail {} is not part of this stock opname",
                        incoming.id
                    ))
                })?;
            detail.physical_qty = incoming.physical_qty;
            detail.notes = incoming.notes.clone();
        }
        Ok(())
    }
}

/// Money value of the reconciled differences at current buy prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpnameValuation {
    pub loss: Money,
    pub gain: Money,
}

impl OpnameValuation {
    /// `lines` yields `(difference, buy_price)` per detail.
    pub fn of<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (i64, Money)>,
    {
        let mut valuation = OpnameValuation::default();
        for (difference, buy_price) in lines {
            if difference < 0 {
                valuation.loss += buy_price.times(-difference);
            } else if difference > 0 {
                valuation.gain += buy_price.times(difference);
            }
        }
        valuation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockOpnameDetailView {
    #[serde(flatten)]
    pub detail: StockOpnameDetail,
    pub size_id: i64,
    pub product_name: String,
    pub size_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockOpnameView {
    #[serde(flatten)]
    pub opname: StockOpname,
    pub details: Vec<StockOpnameDetailView>,
}

/// What an opname write returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockOpnameResult {
    #[serde(flatten)]
    pub opname: StockOpname,
    pub details: Vec<StockOpnameDetail>,
}

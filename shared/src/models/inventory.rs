//! Branch stock and the inventory movement journal

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Stock count of one size at one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInventory {
    pub id: i64,
    pub branch_id: i64,
    pub size_id: i64,
    pub stock: i64,
}

/// What caused a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Sale,
    SaleCancelled,
    SaleDetailCancelled,
    Purchase,
    PurchaseCancelled,
    PurchaseDetailCancelled,
    StockOpname,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "SALE",
            MovementType::SaleCancelled => "SALE_CANCELLED",
            MovementType::SaleDetailCancelled => "SALE_DETAIL_CANCELLED",
            MovementType::Purchase => "PURCHASE",
            MovementType::PurchaseCancelled => "PURCHASE_CANCELLED",
            MovementType::PurchaseDetailCancelled => "PURCHASE_DETAIL_CANCELLED",
            MovementType::StockOpname => "STOCK_OPNAME",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SALE" => Ok(MovementType::Sale),
            "SALE_CANCELLED" => Ok(MovementType::SaleCancelled),
            "SALE_DETAIL_CANCELLED" => Ok(MovementType::SaleDetailCancelled),
            "PURCHASE" => Ok(MovementType::Purchase),
            "PURCHASE_CANCELLED" => Ok(MovementType::PurchaseCancelled),
            "PURCHASE_DETAIL_CANCELLED" => Ok(MovementType::PurchaseDetailCancelled),
            "STOCK_OPNAME" => Ok(MovementType::StockOpname),
            other => Err(format!("unknown movement type '{}'", other)),
        }
    }
}

/// One signed stock event. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: i64,
    pub branch_inventory_id: i64,
    pub change_qty: i64,
    pub reference_type: MovementType,
    pub reference_key: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventoryMovement {
    pub branch_inventory_id: i64,
    pub change_qty: i64,
    pub reference_type: MovementType,
    pub reference_key: String,
    pub created_at: i64,
}

/// Inventory row joined with product names, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryView {
    pub id: i64,
    pub branch_id: i64,
    pub size_id: i64,
    pub product_sku: String,
    pub product_name: String,
    pub size_name: String,
    pub stock: i64,
}

/// Quantities keyed by size id.
///
/// A `BTreeMap` so that iterating yields ascending size ids, which is the lock order
/// for multi-row inventory reads.
pub type QtyBySize = BTreeMap<i64, i64>;

/// Sum line quantities per size, merging duplicate lines.
pub fn quantities_by_size<I>(lines: I) -> DomainResult<QtyBySize>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    let mut by_size = QtyBySize::new();
    for (size_id, qty) in lines {
        let merged = by_size.entry(size_id).or_insert(0);
        *merged = merged
            .checked_add(qty)
            .ok_or_else(|| qty_too_large(size_id))?;
    }
    Ok(by_size)
}

pub(crate) fn qty_too_large(size_id: i64) -> DomainError {
    DomainError::Validation(format!("qty for size_id {} is too large", size_id))
}

/// Ascending size ids of a quantity map.
pub fn sorted_size_ids(qty: &QtyBySize) -> Vec<i64> {
    qty.keys().copied().collect()
}

/// Guard a bulk decrement: every size must have a row with enough stock.
pub fn ensure_stock_available(rows: &[BranchInventory], qty: &QtyBySize) -> DomainResult<()> {
    for (size_id, need) in qty {
        let have = rows
            .iter()
            .find(|row| row.size_id == *size_id)
            .map(|row| row.stock);

        match have {
            None => {
                return Err(DomainError::Validation(format!(
                    "insufficient stock for size_id {}: have 0 need {}",
                    size_id, need
                )))
            }
            Some(have) if have < *need => {
                return Err(DomainError::Validation(format!(
                    "insufficient stock for size_id {}: have {} need {}",
                    size_id, have, need
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Movements pairing each touched inventory row with its signed delta.
///
/// `sign` is `1` for inbound changes and `-1` for outbound ones.
pub fn movements_for(
    rows: &[BranchInventory],
    qty: &QtyBySize,
    sign: i64,
    reference_type: MovementType,
    reference_key: &str,
    created_at: i64,
) -> Vec<NewInventoryMovement> {
    qty.iter()
        .filter_map(|(size_id, q)| {
            rows.iter()
                .find(|row| row.size_id == *size_id)
                .map(|row| NewInventoryMovement {
                    branch_inventory_id: row.id,
                    change_qty: sign * q,
                    reference_type,
                    reference_key: reference_key.to_string(),
                    created_at,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, size_id: i64, stock: i64) -> BranchInventory {
        BranchInventory {
            id,
            branch_id: 1,
            size_id,
            stock,
        }
    }

    #[test]
    fn test_quantities_merge_duplicates_and_sort() {
        let qty = quantities_by_size(vec![(9, 1), (3, 2), (9, 4)]).unwrap();
        assert_eq!(sorted_size_ids(&qty), vec![3, 9]);
        assert_eq!(qty[&9], 5);
    }

    #[test]
    fn test_stock_guard_message() {
        let rows = vec![row(1, 7, 2)];
        let qty = quantities_by_size(vec![(7, 3)]).unwrap();
        let err = ensure_stock_available(&rows, &qty).unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("insufficient stock for size_id 7: have 2 need 3".to_string())
        );
    }

    #[test]
    fn test_stock_guard_missing_row() {
        let qty = quantities_by_size(vec![(4, 1)]).unwrap();
        assert!(ensure_stock_available(&[], &qty).is_err());
    }

    #[test]
    fn test_stock_guard_exact_amount_ok() {
        let rows = vec![row(1, 7, 3)];
        let qty = quantities_by_size(vec![(7, 3)]).unwrap();
        assert!(ensure_stock_available(&rows, &qty).is_ok());
    }

    #[test]
    fn test_movements_are_signed() {
        let rows = vec![row(10, 1, 5), row(11, 2, 5)];
        let qty = quantities_by_size(vec![(1, 2), (2, 1)]).unwrap();
        let out = movements_for(&rows, &qty, -1, MovementType::Sale, "SALE-1", 0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].branch_inventory_id, 10);
        assert_eq!(out[0].change_qty, -2);
        assert_eq!(out[1].change_qty, -1);
    }

    #[test]
    fn test_movement_type_round_trip_names() {
        for ty in [
            MovementType::Sale,
            MovementType::SaleDetailCancelled,
            MovementType::PurchaseCancelled,
            MovementType::StockOpname,
        ] {
            assert_eq!(ty.as_str().parse::<MovementType>().unwrap(), ty);
        }
    }
}

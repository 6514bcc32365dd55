//! Inventory ledger: branch stock plus its movement journal
//!
//! Every helper here changes `branch_inventory.stock` and appends the matching
//! movement rows through the same unit of work.

use shared::{
    ensure_stock_available, movements_for, sorted_size_ids, BranchInventory, MovementType,
    NewInventoryMovement, QtyBySize,
};

use crate::error::AppResult;
use crate::store::UnitOfWork;

/// Lock the branch rows for `qty`, in ascending size order.
pub async fn lock_stock<U: UnitOfWork>(
    uow: &mut U,
    branch_id: i64,
    qty: &QtyBySize,
) -> AppResult<Vec<BranchInventory>> {
    uow.lock_inventories(branch_id, &sorted_size_ids(qty)).await
}

/// Add stock, creating zero rows for sizes the branch has never held.
pub async fn increase_stock<U: UnitOfWork>(
    uow: &mut U,
    branch_id: i64,
    qty: &QtyBySize,
    reference_type: MovementType,
    reference_key: &str,
    now: i64,
) -> AppResult<Vec<BranchInventory>> {
    let size_ids = sorted_size_ids(qty);
    let mut rows = uow.lock_inventories(branch_id, &size_ids).await?;

    let absent: Vec<i64> = size_ids
        .iter()
        .copied()
        .filter(|id| !rows.iter().any(|row| row.size_id == *id))
        .collect();
    if !absent.is_empty() {
        uow.create_inventories(branch_id, &absent).await?;
        rows = uow.lock_inventories(branch_id, &size_ids).await?;
    }

    let movements = movements_for(&rows, qty, 1, reference_type, reference_key, now);
    apply(uow, &movements).await?;

    for row in rows.iter_mut() {
        row.stock += qty.get(&row.size_id).copied().unwrap_or(0);
    }
    Ok(rows)
}

/// Remove stock from rows locked by [`lock_stock`], refusing to go below zero.
pub async fn decrease_stock<U: UnitOfWork>(
    uow: &mut U,
    rows: &[BranchInventory],
    qty: &QtyBySize,
    reference_type: MovementType,
    reference_key: &str,
    now: i64,
) -> AppResult<()> {
    ensure_stock_available(rows, qty)?;
    let movements = movements_for(rows, qty, -1, reference_type, reference_key, now);
    apply(uow, &movements).await
}

/// Apply signed per-row differences (stock opname); zero entries are skipped.
pub async fn apply_differences<U: UnitOfWork>(
    uow: &mut U,
    differences: &[(i64, i64)],
    reference_type: MovementType,
    reference_key: &str,
    now: i64,
) -> AppResult<()> {
    let movements: Vec<NewInventoryMovement> = differences
        .iter()
        .filter(|(_, diff)| *diff != 0)
        .map(|(inventory_id, diff)| NewInventoryMovement {
            branch_inventory_id: *inventory_id,
            change_qty: *diff,
            reference_type,
            reference_key: reference_key.to_string(),
            created_at: now,
        })
        .collect();
    apply(uow, &movements).await
}

async fn apply<U: UnitOfWork>(uow: &mut U, movements: &[NewInventoryMovement]) -> AppResult<()> {
    if movements.is_empty() {
        return Ok(());
    }
    let deltas: Vec<(i64, i64)> = movements
        .iter()
        .map(|m| (m.branch_inventory_id, m.change_qty))
        .collect();
    uow.adjust_stock(&deltas).await?;
    uow.insert_movements(movements).await
}

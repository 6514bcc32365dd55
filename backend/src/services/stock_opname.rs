//! Stock opname engine: draft a physical count, then reconcile it on approval

use std::collections::HashMap;

use shared::{
    now_millis, ApproveStockOpnameRequest, CashFlow, CashSource, CreateStockOpnameRequest,
    Money, MovementType, NewCashBankTransaction, NewStockOpname, OpnameStatus, OpnameValuation,
    StockOpname, StockOpnameResult,
};
use validator::Validate;

use super::{cash_book, inventory};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct StockOpnameService<S: Store> {
    store: S,
}

impl<S: Store> StockOpnameService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a count as a draft. Stock and cash are untouched until approval.
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateStockOpnameRequest,
    ) -> AppResult<StockOpnameResult> {
        request.validate()?;
        let inventory_ids = request.inventory_ids()?;
        let branch_id = user.scope_branch(request.branch_id)?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let rows = uow.lock_inventories_by_ids(&inventory_ids).await?;
        let drafts = request.draft_details(branch_id, &rows)?;

        let opname = uow
            .insert_opname(&NewStockOpname {
                branch_id,
                date: request.date.map(|d| d.millis()).unwrap_or(now),
                created_by: user.username.clone(),
                created_at: now,
            })
            .await?;
        let details = uow.insert_opname_details(opname.id, &drafts).await?;
        uow.commit().await?;

        tracing::info!(
            opname_id = opname.id,
            branch_id,
            lines = details.len(),
            "stock opname drafted"
        );
        Ok(StockOpnameResult { opname, details })
    }

    /// Approve a draft: recount against the stock as it is now, post the differences to
    /// the inventory ledger and book their value in the cash book.
    pub async fn approve(
        &self,
        user: &AuthUser,
        id: i64,
        request: ApproveStockOpnameRequest,
    ) -> AppResult<StockOpnameResult> {
        request.validate()?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let mut opname = lock_draft(&mut uow, user, id).await?;

        let mut details = uow.opname_details(id).await?;
        request.overlay(&mut details)?;

        let mut inventory_ids: Vec<i64> = details.iter().map(|d| d.branch_inventory_id).collect();
        inventory_ids.sort_unstable();
        inventory_ids.dedup();
        let rows = uow.lock_inventories_by_ids(&inventory_ids).await?;
        let stock: HashMap<i64, (i64, i64)> = rows
            .iter()
            .map(|row| (row.id, (row.size_id, row.stock)))
            .collect();

        let mut size_ids: Vec<i64> = rows.iter().map(|row| row.size_id).collect();
        size_ids.sort_unstable();
        size_ids.dedup();
        let buy_prices: HashMap<i64, Money> = uow
            .find_sizes(&size_ids)
            .await?
            .into_iter()
            .map(|size| (size.id, size.buy_price))
            .collect();

        let mut valued = Vec::with_capacity(details.len());
        for detail in details.iter_mut() {
            let (size_id, system_qty) =
                stock.get(&detail.branch_inventory_id).copied().ok_or_else(|| {
                    AppError::NotFound(format!(
                        "branch inventory {} not found",
                        detail.branch_inventory_id
                    ))
                })?;
            detail.recompute(system_qty);
            let buy_price = buy_prices.get(&size_id).copied().unwrap_or_default();
            valued.push((detail.difference, buy_price));
        }

        let key = opname.id.to_string();
        let differences: Vec<(i64, i64)> = details
            .iter()
            .map(|d| (d.branch_inventory_id, d.difference))
            .collect();
        inventory::apply_differences(&mut uow, &differences, MovementType::StockOpname, &key, now)
            .await?;

        let valuation = OpnameValuation::of(valued);
        cash_book::record(
            &mut uow,
            NewCashBankTransaction::new(
                CashFlow::Out,
                CashSource::StockOpname,
                valuation.loss,
                key.clone(),
                opname.branch_id,
                now,
            )
            .with_description(format!("stock opname {} loss", opname.id)),
        )
        .await?;
        cash_book::record(
            &mut uow,
            NewCashBankTransaction::new(
                CashFlow::In,
                CashSource::StockOpname,
                valuation.gain,
                key,
                opname.branch_id,
                now,
            )
            .with_description(format!("stock opname {} gain", opname.id)),
        )
        .await?;

        opname.status = OpnameStatus::Completed;
        opname.verified_by = Some(user.username.clone());
        opname.completed_at = Some(now);
        uow.update_opname_details(&details).await?;
        uow.update_opname(&opname).await?;
        uow.commit().await?;

        tracing::info!(
            opname_id = opname.id,
            loss = %valuation.loss,
            gain = %valuation.gain,
            verified_by = %user.username,
            "stock opname approved"
        );
        Ok(StockOpnameResult { opname, details })
    }

    /// Drop a draft with its lines.
    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        lock_draft(&mut uow, user, id).await?;
        uow.delete_opname(id).await?;
        uow.commit().await?;

        tracing::info!(opname_id = id, deleted_by = %user.username, "stock opname deleted");
        Ok(())
    }
}

async fn lock_draft<U: UnitOfWork>(
    uow: &mut U,
    user: &AuthUser,
    id: i64,
) -> AppResult<StockOpname> {
    let opname = uow
        .lock_opname(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("stock opname {} not found", id)))?;
    user.ensure_branch(opname.branch_id)?;
    if let Err(err) = opname.ensure_draft() {
        tracing::warn!(opname_id = id, "stock opname change refused: {}", err);
        return Err(err.into());
    }
    Ok(opname)
}

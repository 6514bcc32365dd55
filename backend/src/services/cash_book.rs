//! Cash book: the append-only money journal of each branch

use shared::{CashBankTransaction, CashSource, NewCashBankTransaction};

use crate::error::AppResult;
use crate::store::UnitOfWork;

/// Append one entry; zero amounts are not journaled.
pub async fn record<U: UnitOfWork>(
    uow: &mut U,
    entry: NewCashBankTransaction,
) -> AppResult<Option<CashBankTransaction>> {
    if !entry.amount.is_positive() {
        return Ok(None);
    }
    let mut rows = uow.insert_cash_transactions(std::slice::from_ref(&entry)).await?;
    Ok(rows.pop())
}

/// Keep the single row mirroring a capital or expense in step with it.
///
/// `entry` describes the row as it should read now; an existing row keeps its id and
/// transaction date.
pub async fn sync_paired<U: UnitOfWork>(
    uow: &mut U,
    entry: NewCashBankTransaction,
) -> AppResult<()> {
    match uow
        .find_cash_transaction(entry.source, &entry.reference_key)
        .await?
    {
        Some(mut row) => {
            row.flow = entry.flow;
            row.amount = entry.amount;
            row.description = entry.description;
            uow.update_cash_transaction(&row).await
        }
        None => record(uow, entry).await.map(|_| ()),
    }
}

/// Drop the row mirroring a deleted capital or expense.
pub async fn delete_paired<U: UnitOfWork>(
    uow: &mut U,
    source: CashSource,
    reference_key: &str,
) -> AppResult<()> {
    if let Some(row) = uow.find_cash_transaction(source, reference_key).await? {
        uow.delete_cash_transaction(row.id).await?;
    }
    Ok(())
}

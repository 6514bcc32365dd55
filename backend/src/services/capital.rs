//! Capital injections and expenses, each mirrored by one cash book row

use shared::{
    now_millis, Capital, CapitalRequest, CashFlow, CashSource, Expense, ExpenseRequest,
    NewCapital, NewCashBankTransaction, NewExpense,
};
use validator::Validate;

use super::cash_book;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, UnitOfWork};

fn capital_entry(capital: &Capital, now: i64) -> NewCashBankTransaction {
    NewCashBankTransaction::new(
        capital.flow,
        CashSource::Capital,
        capital.amount,
        capital.id.to_string(),
        capital.branch_id,
        now,
    )
    .with_description(
        capital
            .note
            .clone()
            .unwrap_or_else(|| format!("capital {}", capital.id)),
    )
}

fn expense_entry(expense: &Expense, now: i64) -> NewCashBankTransaction {
    NewCashBankTransaction::new(
        CashFlow::Out,
        CashSource::Expense,
        expense.amount,
        expense.id.to_string(),
        expense.branch_id,
        now,
    )
    .with_description(expense.description.clone())
}

#[derive(Clone)]
pub struct CapitalService<S: Store> {
    store: S,
}

impl<S: Store> CapitalService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user: &AuthUser,
        branch_id: Option<i64>,
        request: CapitalRequest,
    ) -> AppResult<Capital> {
        request.validate()?;
        let branch_id = user.scope_branch(branch_id)?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let capital = uow
            .insert_capital(&NewCapital {
                flow: request.flow,
                amount: request.amount,
                note: request.note,
                branch_id,
                created_at: now,
            })
            .await?;
        cash_book::sync_paired(&mut uow, capital_entry(&capital, now)).await?;
        uow.commit().await?;

        tracing::info!(capital_id = capital.id, branch_id, amount = %capital.amount, "capital recorded");
        Ok(capital)
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        id: i64,
        request: CapitalRequest,
    ) -> AppResult<Capital> {
        request.validate()?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let mut capital = lock_capital(&mut uow, user, id).await?;
        capital.flow = request.flow;
        capital.amount = request.amount;
        capital.note = request.note;
        capital.updated_at = now;
        uow.update_capital(&capital).await?;
        cash_book::sync_paired(&mut uow, capital_entry(&capital, now)).await?;
        uow.commit().await?;

        tracing::info!(capital_id = id, amount = %capital.amount, "capital updated");
        Ok(capital)
    }

    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        lock_capital(&mut uow, user, id).await?;
        uow.delete_capital(id).await?;
        cash_book::delete_paired(&mut uow, CashSource::Capital, &id.to_string()).await?;
        uow.commit().await?;

        tracing::info!(capital_id = id, "capital deleted");
        Ok(())
    }
}

async fn lock_capital<U: UnitOfWork>(uow: &mut U, user: &AuthUser, id: i64) -> AppResult<Capital> {
    let capital = uow
        .lock_capital(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("capital {} not found", id)))?;
    user.ensure_branch(capital.branch_id)?;
    Ok(capital)
}

#[derive(Clone)]
pub struct ExpenseService<S: Store> {
    store: S,
}

impl<S: Store> ExpenseService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user: &AuthUser,
        branch_id: Option<i64>,
        request: ExpenseRequest,
    ) -> AppResult<Expense> {
        request.validate()?;
        let branch_id = user.scope_branch(branch_id)?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let expense = uow
            .insert_expense(&NewExpense {
                description: request.description,
                amount: request.amount,
                branch_id,
                created_at: now,
            })
            .await?;
        cash_book::sync_paired(&mut uow, expense_entry(&expense, now)).await?;
        uow.commit().await?;

        tracing::info!(expense_id = expense.id, branch_id, amount = %expense.amount, "expense recorded");
        Ok(expense)
    }

    pub async fn update(
        &self,
        user: &AuthUser,
        id: i64,
        request: ExpenseRequest,
    ) -> AppResult<Expense> {
        request.validate()?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let mut expense = lock_expense(&mut uow, user, id).await?;
        expense.description = request.description;
        expense.amount = request.amount;
        expense.updated_at = now;
        uow.update_expense(&expense).await?;
        cash_book::sync_paired(&mut uow, expense_entry(&expense, now)).await?;
        uow.commit().await?;

        tracing::info!(expense_id = id, amount = %expense.amount, "expense updated");
        Ok(expense)
    }

    pub async fn delete(&self, user: &AuthUser, id: i64) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        lock_expense(&mut uow, user, id).await?;
        uow.delete_expense(id).await?;
        cash_book::delete_paired(&mut uow, CashSource::Expense, &id.to_string()).await?;
        uow.commit().await?;

        tracing::info!(expense_id = id, "expense deleted");
        Ok(())
    }
}

async fn lock_expense<U: UnitOfWork>(uow: &mut U, user: &AuthUser, id: i64) -> AppResult<Expense> {
    let expense = uow
        .lock_expense(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("expense {} not found", id)))?;
    user.ensure_branch(expense.branch_id)?;
    Ok(expense)
}

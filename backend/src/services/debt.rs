//! Debt ledger: receivables of sales and payables of purchases
//!
//! `paid_amount` always equals the sum of the debt's payment rows. Cancellations that
//! take money back append a negative "refund" payment instead of rewriting history.

use shared::{
    now_millis, CashFlow, CashSource, CreateDebtPaymentRequest, Debt, DebtPayment,
    DebtReferenceType, DebtRequest, Money, NewCashBankTransaction, NewDebt, NewDebtPayment,
};
use validator::Validate;

use super::cash_book;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, UnitOfWork};

/// Direction of money when a debt of this kind is paid down.
pub fn payment_flow(reference_type: DebtReferenceType) -> CashFlow {
    match reference_type {
        DebtReferenceType::Sale => CashFlow::In,
        DebtReferenceType::Purchase => CashFlow::Out,
    }
}

/// Cash source for money handed back when the reference is cancelled.
fn refund_source(reference_type: DebtReferenceType) -> CashSource {
    match reference_type {
        DebtReferenceType::Sale => CashSource::SaleDebtCancelled,
        DebtReferenceType::Purchase => CashSource::PurchaseDebtCancelled,
    }
}

/// Open a debt with its down payments, journaling the money that came in or went out.
pub async fn open<U: UnitOfWork>(
    uow: &mut U,
    new_debt: NewDebt,
    request: &DebtRequest,
) -> AppResult<Debt> {
    let debt = uow.insert_debt(&new_debt).await?;
    let now = new_debt.created_at;

    let payments: Vec<NewDebtPayment> = request
        .payments()
        .iter()
        .map(|p| NewDebtPayment {
            debt_id: debt.id,
            amount: p.amount,
            payment_date: now,
            note: p.note.clone(),
            created_at: now,
        })
        .collect();
    uow.insert_debt_payments(&payments).await?;

    cash_book::record(
        uow,
        NewCashBankTransaction::new(
            payment_flow(debt.reference_type),
            CashSource::Debt,
            debt.paid_amount,
            debt.id.to_string(),
            debt.branch_id,
            now,
        )
        .with_description(format!("down payment {}", debt.reference_code)),
    )
    .await?;

    Ok(debt)
}

/// Shrink the debt after a cancelled line and hand back any overpayment.
pub async fn shrink<U: UnitOfWork>(
    uow: &mut U,
    debt: &mut Debt,
    cancel_amount: Money,
    now: i64,
) -> AppResult<()> {
    let refund = debt.shrink_total(cancel_amount);
    debt.updated_at = now;
    settle_refund(uow, debt, refund, "line cancelled", now).await?;
    uow.update_debt(debt).await
}

/// Void the debt of a cancelled reference and hand back everything paid on it.
pub async fn void<U: UnitOfWork>(uow: &mut U, debt: &mut Debt, now: i64) -> AppResult<()> {
    let refund = debt.void();
    debt.updated_at = now;
    settle_refund(uow, debt, refund, "reference cancelled", now).await?;
    uow.update_debt(debt).await
}

async fn settle_refund<U: UnitOfWork>(
    uow: &mut U,
    debt: &Debt,
    refund: Money,
    reason: &str,
    now: i64,
) -> AppResult<()> {
    if !refund.is_positive() {
        return Ok(());
    }
    uow.insert_debt_payments(&[NewDebtPayment::refund(debt.id, refund, reason, now)])
        .await?;
    cash_book::record(
        uow,
        NewCashBankTransaction::new(
            payment_flow(debt.reference_type).reversed(),
            refund_source(debt.reference_type),
            refund,
            debt.reference_code.clone(),
            debt.branch_id,
            now,
        )
        .with_description(format!("debt refund {}", debt.reference_code)),
    )
    .await?;
    Ok(())
}

/// Installments recorded against an open debt after creation.
#[derive(Clone)]
pub struct DebtService<S: Store> {
    store: S,
}

impl<S: Store> DebtService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record an installment.
    pub async fn create_payment(
        &self,
        user: &AuthUser,
        debt_id: i64,
        request: CreateDebtPaymentRequest,
    ) -> AppResult<DebtPayment> {
        request.validate()?;
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let mut debt = uow
            .lock_debt(debt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("debt {} not found", debt_id)))?;
        user.ensure_branch(debt.branch_id)?;

        debt.apply_payment(request.amount)?;
        debt.updated_at = now;

        let payment = NewDebtPayment {
            debt_id,
            amount: request.amount,
            payment_date: request.payment_date.map(|d| d.millis()).unwrap_or(now),
            note: request.note,
            created_at: now,
        };
        let mut rows = uow.insert_debt_payments(std::slice::from_ref(&payment)).await?;
        uow.update_debt(&debt).await?;

        cash_book::record(
            &mut uow,
            NewCashBankTransaction::new(
                payment_flow(debt.reference_type),
                CashSource::Debt,
                request.amount,
                debt.id.to_string(),
                debt.branch_id,
                now,
            )
            .with_description(format!("debt payment {}", debt.reference_code)),
        )
        .await?;

        uow.commit().await?;

        tracing::info!(
            debt_id,
            amount = %request.amount,
            status = %debt.status,
            "debt payment recorded"
        );

        rows.pop()
            .ok_or_else(|| AppError::Internal("debt payment was not stored".to_string()))
    }

    /// Delete an installment recorded less than an hour ago.
    pub async fn delete_payment(&self, user: &AuthUser, payment_id: i64) -> AppResult<Debt> {
        let now = now_millis();

        let mut uow = self.store.begin().await?;
        let payment = uow
            .find_debt_payment(payment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("debt payment {} not found", payment_id))
            })?;
        let mut debt = uow
            .lock_debt(payment.debt_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("debt {} not found", payment.debt_id)))?;
        user.ensure_branch(debt.branch_id)?;

        if let Err(err) = payment.ensure_deletable(now) {
            tracing::warn!(payment_id, "debt payment delete refused: {}", err);
            return Err(err.into());
        }
        debt.revert_payment(payment.amount)?;
        debt.updated_at = now;

        uow.delete_debt_payment(payment_id).await?;
        uow.update_debt(&debt).await?;

        cash_book::record(
            &mut uow,
            NewCashBankTransaction::new(
                payment_flow(debt.reference_type).reversed(),
                CashSource::Debt,
                payment.amount,
                debt.id.to_string(),
                debt.branch_id,
                now,
            )
            .with_description(format!("debt payment {} deleted", payment_id)),
        )
        .await?;

        uow.commit().await?;

        tracing::info!(payment_id, debt_id = debt.id, status = %debt.status, "debt payment deleted");
        Ok(debt)
    }
}

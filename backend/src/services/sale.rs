//! Sale engine: create, cancel, and cancel one line
//!
//! Each call runs in one unit of work. Stock, the movement journal, the cash book and
//! the sale's debt change together or not at all.

use std::sync::Arc;

use shared::{
    ensure_payments_cover, ensure_within_cancel_window, lines_total, now_millis,
    price_sale_lines, quantities_by_size, sorted_size_ids, CashFlow, CashSource, CodeClock,
    CreateSaleRequest, DebtReferenceType, DebtStatus, MovementType, NewCashBankTransaction, NewDebt,
    NewTradePayment, Sale, SaleDetail, SaleResult, Settlement, TradeStatus, SALE_CODE_PREFIX,
};
use validator::Validate;

use super::{cash_book, debt, inventory};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct SaleService<S: Store> {
    store: S,
    codes: Arc<CodeClock>,
}

impl<S: Store> SaleService<S> {
    pub fn new(store: S, codes: Arc<CodeClock>) -> Self {
        Self { store, codes }
    }

    /// Sell from the actor's branch, settled by payments or opened as a receivable.
    pub async fn create(
        &self,
        user: &AuthUser,
        branch_id: Option<i64>,
        request: CreateSaleRequest,
    ) -> AppResult<SaleResult> {
        request.validate()?;
        request.validate_lines()?;
        let settlement =
            Settlement::from_request(request.payments.as_deref(), request.debt.as_ref())?;
        let branch_id = user.scope_branch(branch_id)?;

        let qty = quantities_by_size(request.details.iter().map(|d| (d.size_id, d.qty)))?;
        let now = now_millis();
        let code = self.codes.next(SALE_CODE_PREFIX, now);

        let mut uow = self.store.begin().await?;
        let sizes = uow.find_sizes(&sorted_size_ids(&qty)).await?;
        let rows = inventory::lock_stock(&mut uow, branch_id, &qty).await?;
        let lines = price_sale_lines(&qty, &sizes, &rows)?;
        let total = lines_total(&lines)?;

        let new_debt = match settlement {
            Settlement::Payments(payments) => {
                ensure_payments_cover(payments, total)?;
                None
            }
            Settlement::Debt(debt_request) => Some((
                NewDebt::open(DebtReferenceType::Sale, &code, branch_id, total, debt_request, now)?,
                debt_request,
            )),
        };

        let sale = Sale {
            code: code.clone(),
            customer_name: request.customer_name.clone(),
            branch_id,
            status: TradeStatus::Completed,
            total_price: total,
            created_by: user.username.clone(),
            created_at: now,
            updated_at: now,
        };
        uow.insert_sale(&sale).await?;

        let details: Vec<SaleDetail> = lines
            .iter()
            .map(|line| SaleDetail {
                sale_code: code.clone(),
                size_id: line.size_id,
                qty: line.qty,
                sell_price: line.price,
                is_cancelled: false,
                cancelled_at: None,
            })
            .collect();
        uow.insert_sale_details(&details).await?;
        inventory::decrease_stock(&mut uow, &rows, &qty, MovementType::Sale, &code, now).await?;

        let payments = match settlement {
            Settlement::Payments(requests) => {
                let payments = uow
                    .insert_sale_payments(&code, &NewTradePayment::from_requests(requests, now))
                    .await?;
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::In,
                        CashSource::Sale,
                        total,
                        code.clone(),
                        branch_id,
                        now,
                    )
                    .with_description(format!("sale {}", code)),
                )
                .await?;
                payments
            }
            Settlement::Debt(_) => Vec::new(),
        };

        let debt = match new_debt {
            Some((new_debt, debt_request)) => {
                Some(debt::open(&mut uow, new_debt, debt_request).await?)
            }
            None => None,
        };

        uow.commit().await?;

        tracing::info!(
            code = %sale.code,
            branch_id,
            total = %sale.total_price,
            on_credit = debt.is_some(),
            "sale created"
        );

        Ok(SaleResult {
            sale,
            details,
            payments,
            debt,
        })
    }

    /// Cancel a whole sale within 24 hours of its creation.
    pub async fn cancel(&self, user: &AuthUser, code: &str) -> AppResult<SaleResult> {
        let now = now_millis();
        let mut uow = self.store.begin().await?;
        let mut sale = lock_open_sale(&mut uow, user, code, now).await?;

        let active: Vec<SaleDetail> = uow
            .sale_details(code)
            .await?
            .into_iter()
            .filter(|d| !d.is_cancelled)
            .collect();
        if active.is_empty() {
            return Err(AppError::Conflict(
                "all sale detail already cancelled".to_string(),
            ));
        }

        let qty = quantities_by_size(active.iter().map(|d| (d.size_id, d.qty)))?;
        inventory::increase_stock(
            &mut uow,
            sale.branch_id,
            &qty,
            MovementType::SaleCancelled,
            code,
            now,
        )
        .await?;
        uow.cancel_sale_details(code, &sorted_size_ids(&qty), now)
            .await?;

        match uow.lock_debt_by_reference(DebtReferenceType::Sale, code).await? {
            Some(mut receivable) => debt::void(&mut uow, &mut receivable, now).await?,
            None => {
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::Out,
                        CashSource::SaleCancelled,
                        sale.total_price,
                        code,
                        sale.branch_id,
                        now,
                    )
                    .with_description(format!("sale {} cancelled", code)),
                )
                .await?;
            }
        }

        sale.status = TradeStatus::Cancelled;
        sale.updated_at = now;
        uow.update_sale(&sale).await?;

        let result = load_result(&mut uow, sale).await?;
        uow.commit().await?;

        tracing::info!(code, cancelled_by = %user.username, "sale cancelled");
        Ok(result)
    }

    /// Cancel one line of a sale, refunding its value.
    pub async fn cancel_detail(
        &self,
        user: &AuthUser,
        code: &str,
        size_id: i64,
    ) -> AppResult<SaleResult> {
        let now = now_millis();
        let mut uow = self.store.begin().await?;
        let mut sale = lock_open_sale(&mut uow, user, code, now).await?;

        let details = uow.sale_details(code).await?;
        let detail = details
            .iter()
            .find(|d| d.size_id == size_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("sale detail for size_id {} not found", size_id))
            })?;
        if detail.is_cancelled {
            return Err(AppError::Conflict("sale detail already cancelled".to_string()));
        }

        let qty = quantities_by_size([(detail.size_id, detail.qty)])?;
        inventory::increase_stock(
            &mut uow,
            sale.branch_id,
            &qty,
            MovementType::SaleDetailCancelled,
            code,
            now,
        )
        .await?;
        uow.cancel_sale_details(code, &[size_id], now).await?;

        let cancel_amount = detail.line_total();
        let mut receivable = uow
            .lock_debt_by_reference(DebtReferenceType::Sale, code)
            .await?;
        match receivable.as_mut() {
            Some(open) => debt::shrink(&mut uow, open, cancel_amount, now).await?,
            None => {
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::Out,
                        CashSource::SaleCancelled,
                        cancel_amount,
                        code,
                        sale.branch_id,
                        now,
                    )
                    .with_description(format!("sale {} size {} cancelled", code, size_id)),
                )
                .await?;
            }
        }

        sale.total_price = sale.total_price.saturating_sub(cancel_amount);
        let any_active = details
            .iter()
            .any(|d| !d.is_cancelled && d.size_id != size_id);
        if !any_active {
            sale.status = TradeStatus::Cancelled;
            if let Some(open) = receivable.as_mut() {
                if open.status != DebtStatus::Void {
                    debt::void(&mut uow, open, now).await?;
                }
            }
        }
        sale.updated_at = now;
        uow.update_sale(&sale).await?;

        let result = load_result(&mut uow, sale).await?;
        uow.commit().await?;

        tracing::info!(
            code,
            size_id,
            amount = %cancel_amount,
            cancelled_by = %user.username,
            "sale detail cancelled"
        );
        Ok(result)
    }
}

/// Lock a sale that may still be cancelled by this actor.
async fn lock_open_sale<U: UnitOfWork>(
    uow: &mut U,
    user: &AuthUser,
    code: &str,
    now: i64,
) -> AppResult<Sale> {
    let sale = uow
        .lock_sale(code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sale {} not found", code)))?;
    user.ensure_branch(sale.branch_id)?;
    if let Err(err) = ensure_within_cancel_window("sale", sale.created_at, now) {
        tracing::warn!(code, "sale cancellation refused: {}", err);
        return Err(err.into());
    }
    if sale.status == TradeStatus::Cancelled {
        return Err(AppError::Conflict(format!("sale {} already cancelled", code)));
    }
    Ok(sale)
}

async fn load_result<U: UnitOfWork>(uow: &mut U, sale: Sale) -> AppResult<SaleResult> {
    let details = uow.sale_details(&sale.code).await?;
    let payments = uow.sale_payments(&sale.code).await?;
    let debt = uow
        .lock_debt_by_reference(DebtReferenceType::Sale, &sale.code)
        .await?;
    Ok(SaleResult {
        sale,
        details,
        payments,
        debt,
    })
}

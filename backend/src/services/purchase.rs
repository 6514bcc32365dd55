//! Purchase engine: inbound stock from distributors
//!
//! Mirrors the sale engine with the money flowing the other way. Purchases also keep
//! `sizes.buy_price` at the last observed unit cost and put the previous one back when
//! a purchase is cancelled.

use std::sync::Arc;

use shared::{
    ensure_payments_cover, ensure_sizes_exist, ensure_within_cancel_window, lines_total,
    needs_flatten_payment, now_millis, quantities_by_size, restored_buy_prices, sorted_size_ids,
    CashFlow, CashSource, CodeClock, CreatePurchaseRequest, DebtReferenceType, DebtStatus,
    Money, MovementType, NewCashBankTransaction, NewDebt, NewTradePayment, PaymentMethod, Purchase,
    PurchaseDetail, PurchaseResult, Settlement, TradeStatus, PURCHASE_CODE_PREFIX,
};
use validator::Validate;

use super::{cash_book, debt, inventory};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, UnitOfWork};

#[derive(Clone)]
pub struct PurchaseService<S: Store> {
    store: S,
    codes: Arc<CodeClock>,
}

impl<S: Store> PurchaseService<S> {
    pub fn new(store: S, codes: Arc<CodeClock>) -> Self {
        Self { store, codes }
    }

    /// Receive stock into the actor's branch, paid up front or opened as a payable.
    pub async fn create(
        &self,
        user: &AuthUser,
        branch_id: Option<i64>,
        request: CreatePurchaseRequest,
    ) -> AppResult<PurchaseResult> {
        request.validate()?;
        let lines = request.priced_lines()?;
        let settlement =
            Settlement::from_request(request.payments.as_deref(), request.debt.as_ref())?;
        let branch_id = user.scope_branch(branch_id)?;
        let total = lines_total(&lines)?;

        if let Settlement::Payments(payments) = settlement {
            ensure_payments_cover(payments, total)?;
        }

        let qty = quantities_by_size(lines.iter().map(|l| (l.size_id, l.qty)))?;
        let now = now_millis();
        let code = self.codes.next(PURCHASE_CODE_PREFIX, now);

        let mut uow = self.store.begin().await?;
        if !uow.distributor_exists(request.distributor_id).await? {
            return Err(AppError::ReferencedResourceMissing(format!(
                "distributor {} does not exist",
                request.distributor_id
            )));
        }
        let sizes = uow.find_sizes(&sorted_size_ids(&qty)).await?;
        ensure_sizes_exist(&lines, &sizes)?;

        let purchase = Purchase {
            code: code.clone(),
            sales_name: request.sales_name.clone(),
            branch_id,
            distributor_id: request.distributor_id,
            status: TradeStatus::Completed,
            total_price: total,
            created_by: user.username.clone(),
            created_at: now,
            updated_at: now,
        };
        uow.insert_purchase(&purchase).await?;

        let details: Vec<PurchaseDetail> = lines
            .iter()
            .map(|line| PurchaseDetail {
                purchase_code: code.clone(),
                size_id: line.size_id,
                qty: line.qty,
                buy_price: line.price,
                is_cancelled: false,
                cancelled_at: None,
            })
            .collect();
        uow.insert_purchase_details(&details).await?;
        inventory::increase_stock(&mut uow, branch_id, &qty, MovementType::Purchase, &code, now)
            .await?;

        let prices: Vec<(i64, Money)> =
            lines.iter().map(|l| (l.size_id, l.price)).collect();
        uow.update_buy_prices(&prices).await?;

        let (payments, payable) = match settlement {
            Settlement::Payments(requests) => {
                let payments = uow
                    .insert_purchase_payments(&code, &NewTradePayment::from_requests(requests, now))
                    .await?;
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::Out,
                        CashSource::Purchase,
                        total,
                        code.clone(),
                        branch_id,
                        now,
                    )
                    .with_description(format!("purchase {}", code)),
                )
                .await?;
                (payments, None)
            }
            Settlement::Debt(debt_request) => {
                let new_debt = NewDebt::open(
                    DebtReferenceType::Purchase,
                    &code,
                    branch_id,
                    total,
                    debt_request,
                    now,
                )?;
                let payable = debt::open(&mut uow, new_debt, debt_request).await?;
                (Vec::new(), Some(payable))
            }
        };

        uow.commit().await?;

        tracing::info!(
            code = %purchase.code,
            branch_id,
            distributor_id = purchase.distributor_id,
            total = %purchase.total_price,
            on_credit = payable.is_some(),
            "purchase created"
        );

        Ok(PurchaseResult {
            purchase,
            details,
            payments,
            debt: payable,
        })
    }

    /// Cancel a whole purchase within 24 hours, taking its stock back off the shelf.
    pub async fn cancel(&self, user: &AuthUser, code: &str) -> AppResult<PurchaseResult> {
        let now = now_millis();
        let mut uow = self.store.begin().await?;
        let mut purchase = lock_open_purchase(&mut uow, user, code, now).await?;

        let active: Vec<PurchaseDetail> = uow
            .purchase_details(code)
            .await?
            .into_iter()
            .filter(|d| !d.is_cancelled)
            .collect();
        if active.is_empty() {
            return Err(AppError::Conflict(
                "all purchase detail already cancelled".to_string(),
            ));
        }

        let qty = quantities_by_size(active.iter().map(|d| (d.size_id, d.qty)))?;
        let size_ids = sorted_size_ids(&qty);
        let rows = inventory::lock_stock(&mut uow, purchase.branch_id, &qty).await?;
        inventory::decrease_stock(
            &mut uow,
            &rows,
            &qty,
            MovementType::PurchaseCancelled,
            code,
            now,
        )
        .await?;
        uow.cancel_purchase_details(code, &size_ids, now).await?;
        restore_buy_prices(&mut uow, &size_ids, code).await?;

        match uow
            .lock_debt_by_reference(DebtReferenceType::Purchase, code)
            .await?
        {
            Some(mut payable) => debt::void(&mut uow, &mut payable, now).await?,
            None => {
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::In,
                        CashSource::PurchaseCancelled,
                        purchase.total_price,
                        code,
                        purchase.branch_id,
                        now,
                    )
                    .with_description(format!("purchase {} cancelled", code)),
                )
                .await?;
            }
        }

        purchase.status = TradeStatus::Cancelled;
        purchase.updated_at = now;
        uow.update_purchase(&purchase).await?;

        let result = load_result(&mut uow, purchase).await?;
        uow.commit().await?;

        tracing::info!(code, cancelled_by = %user.username, "purchase cancelled");
        Ok(result)
    }

    /// Cancel one line of a purchase.
    pub async fn cancel_detail(
        &self,
        user: &AuthUser,
        code: &str,
        size_id: i64,
    ) -> AppResult<PurchaseResult> {
        let now = now_millis();
        let mut uow = self.store.begin().await?;
        let mut purchase = lock_open_purchase(&mut uow, user, code, now).await?;

        let details = uow.purchase_details(code).await?;
        let detail = details
            .iter()
            .find(|d| d.size_id == size_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "purchase detail for size_id {} not found",
                    size_id
                ))
            })?;
        if detail.is_cancelled {
            return Err(AppError::Conflict(
                "purchase detail already cancelled".to_string(),
            ));
        }

        let qty = quantities_by_size([(detail.size_id, detail.qty)])?;
        let rows = inventory::lock_stock(&mut uow, purchase.branch_id, &qty).await?;
        inventory::decrease_stock(
            &mut uow,
            &rows,
            &qty,
            MovementType::PurchaseDetailCancelled,
            code,
            now,
        )
        .await?;
        uow.cancel_purchase_details(code, &[size_id], now).await?;
        restore_buy_prices(&mut uow, &[size_id], code).await?;

        let cancel_amount = detail.line_total();
        let mut payable = uow
            .lock_debt_by_reference(DebtReferenceType::Purchase, code)
            .await?;
        match payable.as_mut() {
            Some(open) => {
                let status_before = open.status;
                debt::shrink(&mut uow, open, cancel_amount, now).await?;
                if needs_flatten_payment(status_before, open) {
                    let settled = NewTradePayment {
                        payment_method: PaymentMethod::Cash,
                        amount: open.total_amount,
                        note: Some("settled by debt payments".to_string()),
                        created_at: now,
                    };
                    uow.insert_purchase_payments(code, std::slice::from_ref(&settled))
                        .await?;
                    tracing::debug!(code, amount = %settled.amount, "payable flattened into purchase payment");
                }
            }
            None => {
                cash_book::record(
                    &mut uow,
                    NewCashBankTransaction::new(
                        CashFlow::In,
                        CashSource::PurchaseCancelled,
                        cancel_amount,
                        code,
                        purchase.branch_id,
                        now,
                    )
                    .with_description(format!("purchase {} size {} cancelled", code, size_id)),
                )
                .await?;
            }
        }

        purchase.total_price = purchase.total_price.saturating_sub(cancel_amount);
        let any_active = details
            .iter()
            .any(|d| !d.is_cancelled && d.size_id != size_id);
        if !any_active {
            purchase.status = TradeStatus::Cancelled;
            if let Some(open) = payable.as_mut() {
                if open.status != DebtStatus::Void {
                    debt::void(&mut uow, open, now).await?;
                }
            }
        }
        purchase.updated_at = now;
        uow.update_purchase(&purchase).await?;

        let result = load_result(&mut uow, purchase).await?;
        uow.commit().await?;

        tracing::info!(
            code,
            size_id,
            amount = %cancel_amount,
            cancelled_by = %user.username,
            "purchase detail cancelled"
        );
        Ok(result)
    }
}

async fn lock_open_purchase<U: UnitOfWork>(
    uow: &mut U,
    user: &AuthUser,
    code: &str,
    now: i64,
) -> AppResult<Purchase> {
    let purchase = uow
        .lock_purchase(code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("purchase {} not found", code)))?;
    user.ensure_branch(purchase.branch_id)?;
    if let Err(err) = ensure_within_cancel_window("purchase", purchase.created_at, now) {
        tracing::warn!(code, "purchase cancellation refused: {}", err);
        return Err(err.into());
    }
    if purchase.status == TradeStatus::Cancelled {
        return Err(AppError::Conflict(format!(
            "purchase {} already cancelled",
            code
        )));
    }
    Ok(purchase)
}

/// Put back the latest surviving buy price of each size.
async fn restore_buy_prices<U: UnitOfWork>(
    uow: &mut U,
    size_ids: &[i64],
    code: &str,
) -> AppResult<()> {
    let last = uow.last_buy_prices(size_ids, code).await?;
    uow.update_buy_prices(&restored_buy_prices(size_ids, &last))
        .await
}

async fn load_result<U: UnitOfWork>(uow: &mut U, purchase: Purchase) -> AppResult<PurchaseResult> {
    let details = uow.purchase_details(&purchase.code).await?;
    let payments = uow.purchase_payments(&purchase.code).await?;
    let debt = uow
        .lock_debt_by_reference(DebtReferenceType::Purchase, &purchase.code)
        .await?;
    Ok(PurchaseResult {
        purchase,
        details,
        payments,
        debt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::debt::DebtService;
    use crate::store::memory::MemoryStore;
    use shared::{
        ActorRole, CreateDebtPaymentRequest, DebtPaymentRequest, DebtRequest,
        PaymentRequest, PurchaseDetailRequest, MILLIS_PER_DAY, MILLIS_PER_MINUTE,
    };

    const BRANCH: i64 = 1;
    const DISTRIBUTOR: i64 = 3;
    const SIZE: i64 = 7;

    fn admin() -> AuthUser {
        AuthUser {
            username: "admin".to_string(),
            role: ActorRole::Admin,
            branch_id: Some(BRANCH),
        }
    }

    async fn setup() -> (MemoryStore, PurchaseService<MemoryStore>) {
        let store = MemoryStore::new();
        store.seed_branch(BRANCH).await;
        store.seed_distributor(DISTRIBUTOR).await;
        store
            .seed_size(SIZE, Money::from(50), Money::from(18))
            .await;
        store
            .seed_size(8, Money::from(15), Money::from(9))
            .await;
        let service = PurchaseService::new(store.clone(), Arc::new(CodeClock::new()));
        (store, service)
    }

    fn line(size_id: i64, qty: i64, buy_price: i64) -> PurchaseDetailRequest {
        PurchaseDetailRequest {
            size_id,
            qty,
            buy_price: Money::from(buy_price),
        }
    }

    fn paid(details: Vec<PurchaseDetailRequest>, amount: i64) -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            distributor_id: DISTRIBUTOR,
            sales_name: "Pak Budi".to_string(),
            details,
            payments: Some(vec![PaymentRequest {
                payment_method: PaymentMethod::Transfer,
                amount: Money::from(amount),
                note: None,
            }]),
            debt: None,
        }
    }

    fn on_credit(details: Vec<PurchaseDetailRequest>, down_payment: i64) -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            distributor_id: DISTRIBUTOR,
            sales_name: "Pak Budi".to_string(),
            details,
            payments: None,
            debt: Some(DebtRequest {
                due_date: None,
                debt_payments: Some(vec![DebtPaymentRequest {
                    amount: Money::from(down_payment),
                    note: None,
                }]),
            }),
        }
    }

    #[tokio::test]
    async fn test_create_stocks_up_and_records_buy_price() {
        let (store, service) = setup().await;

        let result = service
            .create(&admin(), None, paid(vec![line(SIZE, 5, 20)], 100))
            .await
            .unwrap();

        assert!(result.purchase.code.starts_with("PURCHASE-"));
        assert_eq!(result.purchase.total_price, Money::from(100));
        let state = store.snapshot().await;
        assert_eq!(state.stock(BRANCH, SIZE), 5);
        assert_eq!(state.sizes[&SIZE].buy_price, Money::from(20));
        let cash = state.cash_for(&result.purchase.code);
        assert_eq!(cash.len(), 1);
        assert_eq!((cash[0].flow, cash[0].source), (CashFlow::Out, CashSource::Purchase));
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_detail_restores_previous_buy_price() {
        let (store, service) = setup().await;
        let first = service
            .create(&admin(), None, paid(vec![line(SIZE, 5, 20)], 100))
            .await
            .unwrap();
        store.backdate(&first.purchase.code, MILLIS_PER_MINUTE).await;
        let second = service
            .create(&admin(), None, paid(vec![line(SIZE, 3, 25)], 75))
            .await
            .unwrap();
        assert_eq!(
            store.snapshot().await.sizes[&SIZE].buy_price,
            Money::from(25)
        );

        service
            .cancel_detail(&admin(), &second.purchase.code, SIZE)
            .await
            .unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.stock(BRANCH, SIZE), 5);
        let reversal: Vec<i64> = state
            .movements_of(&second.purchase.code)
            .iter()
            .filter(|m| m.reference_type == MovementType::PurchaseDetailCancelled)
            .map(|m| m.change_qty)
            .collect();
        assert_eq!(reversal, vec![-3]);
        assert_eq!(state.sizes[&SIZE].buy_price, Money::from(20));
        assert_eq!(
            state.purchases[&second.purchase.code].status,
            TradeStatus::Cancelled
        );
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_without_history_keeps_buy_price() {
        let (store, service) = setup().await;
        let created = service
            .create(&admin(), None, paid(vec![line(SIZE, 2, 40)], 80))
            .await
            .unwrap();

        service.cancel(&admin(), &created.purchase.code).await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.sizes[&SIZE].buy_price, Money::from(40));
        assert_eq!(state.stock(BRANCH, SIZE), 0);
        let refund: Vec<_> = state
            .cash_for(&created.purchase.code)
            .into_iter()
            .filter(|row| row.source == CashSource::PurchaseCancelled)
            .collect();
        assert_eq!(refund.len(), 1);
        assert_eq!(refund[0].flow, CashFlow::In);
        assert_eq!(refund[0].amount, Money::from(80));
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_refused_when_stock_already_sold() {
        let (store, service) = setup().await;
        let created = service
            .create(&admin(), None, paid(vec![line(SIZE, 2, 40)], 80))
            .await
            .unwrap();
        let inventory_id = store.snapshot().await.inventory(BRANCH, SIZE).unwrap().id;
        {
            let mut uow = store.begin().await.unwrap();
            inventory::apply_differences(&mut uow, &[(inventory_id, -1)], MovementType::Sale, "X", 0)
                .await
                .unwrap();
            uow.commit().await.unwrap();
        }

        let err = service
            .cancel(&admin(), &created.purchase.code)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let state = store.snapshot().await;
        assert_eq!(
            state.purchases[&created.purchase.code].status,
            TradeStatus::Completed
        );
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_voids_payable_and_refunds_down_payment() {
        let (store, service) = setup().await;
        let created = service
            .create(&admin(), None, on_credit(vec![line(SIZE, 4, 25)], 30))
            .await
            .unwrap();
        let payable = created.debt.unwrap();
        assert_eq!(payable.status, DebtStatus::Pending);

        let result = service.cancel(&admin(), &created.purchase.code).await.unwrap();

        let debt = result.debt.unwrap();
        assert_eq!(debt.status, DebtStatus::Void);
        let state = store.snapshot().await;
        let refund: Vec<_> = state
            .cash_for(&created.purchase.code)
            .into_iter()
            .filter(|row| row.source == CashSource::PurchaseDebtCancelled)
            .collect();
        assert_eq!(refund.len(), 1);
        assert_eq!(refund[0].flow, CashFlow::In);
        assert_eq!(refund[0].amount, Money::from(30));
        assert!(state
            .cash_for(&created.purchase.code)
            .iter()
            .all(|row| row.source != CashSource::PurchaseCancelled));
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_detail_keeps_partly_paid_payable_open() {
        let (store, service) = setup().await;
        let created = service
            .create(
                &admin(),
                None,
                on_credit(vec![line(SIZE, 2, 50), line(8, 1, 40)], 60),
            )
            .await
            .unwrap();
        let payable = created.debt.unwrap();
        DebtService::new(store.clone())
            .create_payment(
                &admin(),
                payable.id,
                CreateDebtPaymentRequest {
                    amount: Money::from(30),
                    payment_date: None,
                    note: None,
                },
            )
            .await
            .unwrap();

        let result = service
            .cancel_detail(&admin(), &created.purchase.code, 8)
            .await
            .unwrap();

        assert_eq!(result.purchase.total_price, Money::from(100));
        let debt = result.debt.unwrap();
        assert_eq!(debt.total_amount, Money::from(100));
        assert_eq!(debt.paid_amount, Money::from(90));
        assert_eq!(debt.status, DebtStatus::Pending);
        assert!(result.payments.is_empty());

        let result = DebtService::new(store.clone())
            .create_payment(
                &admin(),
                payable.id,
                CreateDebtPaymentRequest {
                    amount: Money::from(10),
                    payment_date: None,
                    note: None,
                },
            )
            .await;
        assert!(result.is_ok());
        store.snapshot().await.assert_consistent();
    }

    #[tokio::test]
    async fn test_cancel_detail_records_flatten_payment() {
        let (store, service) = setup().await;
        let created = service
            .create(
                &admin(),
                None,
                on_credit(vec![line(SIZE, 2, 50), line(8, 1, 40)], 110),
            )
            .await
            .unwrap();
        assert_eq!(created.debt.as_ref().unwrap().status, DebtStatus::Pending);

        let result = service
            .cancel_detail(&admin(), &created.purchase.code, 8)
            .await
            .unwrap();

        let debt = result.debt.unwrap();
        assert_eq!(debt.status, DebtStatus::Paid);
        assert_eq!(debt.paid_amount, Money::from(100));
        assert_eq!(result.payments.len(), 1);
        assert_eq!(result.payments[0].payment_method, PaymentMethod::Cash);
        assert_eq!(result.payments[0].amount, Money::from(100));

        let state = store.snapshot().await;
        let refund: Vec<_> = state
            .cash_for(&created.purchase.code)
            .into_iter()
            .filter(|row| row.source == CashSource::PurchaseDebtCancelled)
            .collect();
        assert_eq!(refund.len(), 1);
        assert_eq!(refund[0].amount, Money::from(10));
        state.assert_consistent();
    }

    #[tokio::test]
    async fn test_unknown_distributor_is_referenced_resource_missing() {
        let (store, service) = setup().await;
        let mut request = paid(vec![line(SIZE, 1, 10)], 10);
        request.distributor_id = 99;
        let err = service.create(&admin(), None, request).await.unwrap_err();
        assert!(matches!(err, AppError::ReferencedResourceMissing(_)));
        assert!(store.snapshot().await.purchases.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_24_hours_is_forbidden() {
        let (store, service) = setup().await;
        let created = service
            .create(&admin(), None, paid(vec![line(SIZE, 1, 10)], 10))
            .await
            .unwrap();
        store.backdate(&created.purchase.code, MILLIS_PER_DAY).await;
        let err = service
            .cancel_detail(&admin(), &created.purchase.code, SIZE)
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Forbidden(ref msg) if msg == "purchase cannot be deleted after 24 hours")
        );
    }

    #[tokio::test]
    async fn test_oversized_lines_are_validation_errors() {
        let (store, service) = setup().await;

        let mut pricey = line(SIZE, 10_000_000_000, 1);
        pricey.buy_price = "100000000000000000000".parse().unwrap();
        let err = service
            .create(&admin(), None, paid(vec![pricey], 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Each input fits a column but the line total does not.
        let err = service
            .create(&admin(), None, paid(vec![line(SIZE, 10_000_000_000, 10_000)], 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create(
                &admin(),
                None,
                paid(vec![line(SIZE, i64::MAX, 0), line(SIZE, 1, 0)], 10),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref msg) if msg == "qty for size_id 7 is too large")
        );

        let state = store.snapshot().await;
        assert!(state.purchases.is_empty());
        assert_eq!(state.stock(BRANCH, SIZE), 0);
    }
}

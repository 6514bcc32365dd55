//! Transactional persistence for the write paths
//!
//! Engines open one [`UnitOfWork`] per call through [`Store::begin`], do all their
//! reads and writes through it and finish with [`UnitOfWork::commit`]. A unit of work
//! that is dropped without committing rolls back, so an early `?` return leaves no
//! trace.
//!
//! `lock_*` methods take row locks that are held until the unit of work ends.
//! Multi-row inventory locks are acquired in ascending `size_id` order (or ascending
//! `id` for the by-id variant).

use std::collections::HashMap;

use shared::{
    BranchInventory, CashBankTransaction, CashSource, Capital, Debt, DebtPayment,
    DebtReferenceType, Expense, Money, NewCapital, NewCashBankTransaction, NewDebt,
    NewDebtPayment, NewExpense, NewInventoryMovement, NewStockOpname, NewStockOpnameDetail,
    NewTradePayment, Purchase, PurchaseDetail, PurchasePayment, Sale, SaleDetail, SalePayment,
    Size, StockOpname, StockOpnameDetail,
};

use crate::error::AppResult;

#[cfg(test)]
pub mod memory;
pub mod pg;

pub use pg::{PgStore, PgUnitOfWork};

/// Source of units of work.
#[axum::async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: UnitOfWork;

    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// One open transaction.
#[axum::async_trait]
pub trait UnitOfWork: Send + Sized {
    // Catalogue
    async fn find_sizes(&mut self, ids: &[i64]) -> AppResult<Vec<Size>>;
    async fn update_buy_prices(&mut self, prices: &[(i64, Money)]) -> AppResult<()>;
    async fn distributor_exists(&mut self, id: i64) -> AppResult<bool>;

    // Inventory
    async fn lock_inventories(
        &mut self,
        branch_id: i64,
        size_ids: &[i64],
    ) -> AppResult<Vec<BranchInventory>>;
    async fn lock_inventories_by_ids(&mut self, ids: &[i64]) -> AppResult<Vec<BranchInventory>>;
    /// Insert zero-stock rows for sizes the branch has never held.
    async fn create_inventories(&mut self, branch_id: i64, size_ids: &[i64]) -> AppResult<()>;
    /// `stock = stock + delta` for each `(branch_inventory_id, delta)`.
    async fn adjust_stock(&mut self, deltas: &[(i64, i64)]) -> AppResult<()>;
    async fn insert_movements(&mut self, movements: &[NewInventoryMovement]) -> AppResult<()>;

    // Sales
    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()>;
    async fn insert_sale_details(&mut self, details: &[SaleDetail]) -> AppResult<()>;
    async fn insert_sale_payments(
        &mut self,
        sale_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<SalePayment>>;
    async fn lock_sale(&mut self, code: &str) -> AppResult<Option<Sale>>;
    async fn sale_details(&mut self, code: &str) -> AppResult<Vec<SaleDetail>>;
    async fn sale_payments(&mut self, code: &str) -> AppResult<Vec<SalePayment>>;
    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()>;
    async fn cancel_sale_details(&mut self, code: &str, size_ids: &[i64], now: i64)
        -> AppResult<()>;

    // Purchases
    async fn insert_purchase(&mut self, purchase: &Purchase) -> AppResult<()>;
    async fn insert_purchase_details(&mut self, details: &[PurchaseDetail]) -> AppResult<()>;
    async fn insert_purchase_payments(
        &mut self,
        purchase_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<PurchasePayment>>;
    async fn lock_purchase(&mut self, code: &str) -> AppResult<Option<Purchase>>;
    async fn purchase_details(&mut self, code: &str) -> AppResult<Vec<PurchaseDetail>>;
    async fn purchase_payments(&mut self, code: &str) -> AppResult<Vec<PurchasePayment>>;
    async fn update_purchase(&mut self, purchase: &Purchase) -> AppResult<()>;
    async fn cancel_purchase_details(
        &mut self,
        code: &str,
        size_ids: &[i64],
        now: i64,
    ) -> AppResult<()>;
    /// Latest buy price per size among active lines of completed purchases other than
    /// `exclude_code`.
    async fn last_buy_prices(
        &mut self,
        size_ids: &[i64],
        exclude_code: &str,
    ) -> AppResult<HashMap<i64, Money>>;

    // Debts
    async fn insert_debt(&mut self, debt: &NewDebt) -> AppResult<Debt>;
    async fn lock_debt(&mut self, id: i64) -> AppResult<Option<Debt>>;
    async fn lock_debt_by_reference(
        &mut self,
        reference_type: DebtReferenceType,
        reference_code: &str,
    ) -> AppResult<Option<Debt>>;
    async fn update_debt(&mut self, debt: &Debt) -> AppResult<()>;
    async fn insert_debt_payments(
        &mut self,
        payments: &[NewDebtPayment],
    ) -> AppResult<Vec<DebtPayment>>;
    async fn find_debt_payment(&mut self, id: i64) -> AppResult<Option<DebtPayment>>;
    async fn delete_debt_payment(&mut self, id: i64) -> AppResult<()>;

    // Cash book
    async fn insert_cash_transactions(
        &mut self,
        rows: &[NewCashBankTransaction],
    ) -> AppResult<Vec<CashBankTransaction>>;
    async fn find_cash_transaction(
        &mut self,
        source: CashSource,
        reference_key: &str,
    ) -> AppResult<Option<CashBankTransaction>>;
    async fn update_cash_transaction(&mut self, row: &CashBankTransaction) -> AppResult<()>;
    async fn delete_cash_transaction(&mut self, id: i64) -> AppResult<()>;

    // Capital and expenses
    async fn insert_capital(&mut self, capital: &NewCapital) -> AppResult<Capital>;
    async fn lock_capital(&mut self, id: i64) -> AppResult<Option<Capital>>;
    async fn update_capital(&mut self, capital: &Capital) -> AppResult<()>;
    async fn delete_capital(&mut self, id: i64) -> AppResult<()>;
    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense>;
    async fn lock_expense(&mut self, id: i64) -> AppResult<Option<Expense>>;
    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()>;
    async fn delete_expense(&mut self, id: i64) -> AppResult<()>;

    // Stock opname
    async fn insert_opname(&mut self, opname: &NewStockOpname) -> AppResult<StockOpname>;
    async fn insert_opname_details(
        &mut self,
        stock_opname_id: i64,
        details: &[NewStockOpnameDetail],
    ) -> AppResult<Vec<StockOpnameDetail>>;
    async fn lock_opname(&mut self, id: i64) -> AppResult<Option<StockOpname>>;
    async fn opname_details(&mut self, stock_opname_id: i64) -> AppResult<Vec<StockOpnameDetail>>;
    async fn update_opname(&mut self, opname: &StockOpname) -> AppResult<()>;
    async fn update_opname_details(&mut self, details: &[StockOpnameDetail]) -> AppResult<()>;
    async fn delete_opname(&mut self, id: i64) -> AppResult<()>;

    async fn commit(self) -> AppResult<()>;
}

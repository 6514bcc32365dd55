//! In-memory store for engine tests
//!
//! `begin` takes the single state lock and works on a copy; `commit` swaps the copy in.
//! Dropping a unit of work releases the lock and discards the copy.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use shared::{
    BranchInventory, CashBankTransaction, CashSource, Capital, Debt, DebtPayment,
    DebtReferenceType, DebtStatus, Expense, InventoryMovement, Money, MovementType, NewCapital,
    NewCashBankTransaction, NewDebt, NewDebtPayment, NewExpense, NewInventoryMovement,
    NewStockOpname, NewStockOpnameDetail, NewTradePayment, OpnameStatus, Purchase,
    PurchaseDetail, PurchasePayment, Sale, SaleDetail, SalePayment, Size, StockOpname,
    StockOpnameDetail, TradeStatus,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, UnitOfWork};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub branches: BTreeSet<i64>,
    pub distributors: BTreeSet<i64>,
    pub sizes: BTreeMap<i64, Size>,
    pub inventories: BTreeMap<i64, BranchInventory>,
    pub movements: Vec<InventoryMovement>,
    pub sales: BTreeMap<String, Sale>,
    pub sale_details: Vec<SaleDetail>,
    pub sale_payments: Vec<SalePayment>,
    pub purchases: BTreeMap<String, Purchase>,
    pub purchase_details: Vec<PurchaseDetail>,
    pub purchase_payments: Vec<PurchasePayment>,
    pub debts: BTreeMap<i64, Debt>,
    pub debt_payments: BTreeMap<i64, DebtPayment>,
    pub cash: BTreeMap<i64, CashBankTransaction>,
    pub capitals: BTreeMap<i64, Capital>,
    pub expenses: BTreeMap<i64, Expense>,
    pub opnames: BTreeMap<i64, StockOpname>,
    pub opname_details: BTreeMap<i64, StockOpnameDetail>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn inventory(&self, branch_id: i64, size_id: i64) -> Option<&BranchInventory> {
        self.inventories
            .values()
            .find(|row| row.branch_id == branch_id && row.size_id == size_id)
    }

    pub fn stock(&self, branch_id: i64, size_id: i64) -> i64 {
        self.inventory(branch_id, size_id).map(|row| row.stock).unwrap_or(0)
    }

    pub fn movements_of(&self, reference_key: &str) -> Vec<&InventoryMovement> {
        self.movements
            .iter()
            .filter(|m| m.reference_key == reference_key)
            .collect()
    }

    pub fn cash_for(&self, reference_key: &str) -> Vec<&CashBankTransaction> {
        self.cash
            .values()
            .filter(|row| row.reference_key == reference_key)
            .collect()
    }

    pub fn debt_for(&self, reference_type: DebtReferenceType, code: &str) -> Option<&Debt> {
        self.debts
            .values()
            .find(|d| d.reference_type == reference_type && d.reference_code == code)
    }

    pub fn payments_of(&self, debt_id: i64) -> Vec<&DebtPayment> {
        self.debt_payments
            .values()
            .filter(|p| p.debt_id == debt_id)
            .collect()
    }

    /// Panics when any ledger invariant is broken.
    pub fn assert_consistent(&self) {
        for row in self.inventories.values() {
            let journal: i64 = self
                .movements
                .iter()
                .filter(|m| m.branch_inventory_id == row.id)
                .map(|m| m.change_qty)
                .sum();
            assert_eq!(row.stock, journal, "stock of inventory {} drifted", row.id);
            assert!(row.stock >= 0, "inventory {} went negative", row.id);
        }
        for debt in self.debts.values() {
            let paid: Money = self.payments_of(debt.id).iter().map(|p| p.amount).sum();
            assert_eq!(debt.paid_amount, paid, "debt {} payments drifted", debt.id);
            assert!(!debt.paid_amount.is_negative());
            assert!(debt.paid_amount <= debt.total_amount, "debt {} overpaid", debt.id);
            assert_eq!(
                debt.status,
                DebtStatus::derive(debt.total_amount, debt.paid_amount),
                "debt {} status",
                debt.id
            );
        }
        for sale in self.sales.values() {
            if sale.status == TradeStatus::Cancelled {
                continue;
            }
            let total: Money = self
                .sale_details
                .iter()
                .filter(|d| d.sale_code == sale.code && !d.is_cancelled)
                .map(SaleDetail::line_total)
                .sum();
            assert_eq!(sale.total_price, total, "sale {} total", sale.code);
        }
        for purchase in self.purchases.values() {
            if purchase.status == TradeStatus::Cancelled {
                continue;
            }
            let total: Money = self
                .purchase_details
                .iter()
                .filter(|d| d.purchase_code == purchase.code && !d.is_cancelled)
                .map(PurchaseDetail::line_total)
                .sum();
            assert_eq!(purchase.total_price, total, "purchase {} total", purchase.code);
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn seed_branch(&self, id: i64) {
        self.state.lock().await.branches.insert(id);
    }

    pub async fn seed_distributor(&self, id: i64) {
        self.state.lock().await.distributors.insert(id);
    }

    pub async fn seed_size(&self, id: i64, sell_price: Money, buy_price: Money) {
        self.state.lock().await.sizes.insert(
            id,
            Size {
                id,
                product_sku: format!("SKU-{}", id),
                product_name: format!("Product {}", id),
                name: "1kg".to_string(),
                sell_price,
                buy_price,
            },
        );
    }

    /// Put `qty` on the shelf through an opening movement; returns the inventory id.
    pub async fn set_stock(&self, branch_id: i64, size_id: i64, qty: i64) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.inventories.insert(
            id,
            BranchInventory {
                id,
                branch_id,
                size_id,
                stock: qty,
            },
        );
        let movement_id = state.next_id();
        state.movements.push(InventoryMovement {
            id: movement_id,
            branch_inventory_id: id,
            change_qty: qty,
            reference_type: MovementType::Purchase,
            reference_key: "OPENING".to_string(),
            created_at: 0,
        });
        id
    }

    /// Shift a document's creation time into the past.
    pub async fn backdate(&self, code: &str, by_millis: i64) {
        let mut state = self.state.lock().await;
        if let Some(sale) = state.sales.get_mut(code) {
            sale.created_at -= by_millis;
        }
        if let Some(purchase) = state.purchases.get_mut(code) {
            purchase.created_at -= by_millis;
        }
    }

    pub async fn backdate_debt_payment(&self, id: i64, by_millis: i64) {
        if let Some(payment) = self.state.lock().await.debt_payments.get_mut(&id) {
            payment.created_at -= by_millis;
        }
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[axum::async_trait]
impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> AppResult<MemoryUnitOfWork> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryUnitOfWork { guard, work })
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> AppError {
    AppError::ReferencedResourceMissing(format!("{} {} does not exist", what, id))
}

#[axum::async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_sizes(&mut self, ids: &[i64]) -> AppResult<Vec<Size>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.work.sizes.get(id).cloned())
            .collect())
    }

    async fn update_buy_prices(&mut self, prices: &[(i64, Money)]) -> AppResult<()> {
        for (id, price) in prices {
            if let Some(size) = self.work.sizes.get_mut(id) {
                size.buy_price = *price;
            }
        }
        Ok(())
    }

    async fn distributor_exists(&mut self, id: i64) -> AppResult<bool> {
        Ok(self.work.distributors.contains(&id))
    }

    async fn lock_inventories(
        &mut self,
        branch_id: i64,
        size_ids: &[i64],
    ) -> AppResult<Vec<BranchInventory>> {
        let mut rows: Vec<BranchInventory> = self
            .work
            .inventories
            .values()
            .filter(|row| row.branch_id == branch_id && size_ids.contains(&row.size_id))
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.size_id);
        Ok(rows)
    }

    async fn lock_inventories_by_ids(&mut self, ids: &[i64]) -> AppResult<Vec<BranchInventory>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.work.inventories.get(id).cloned())
            .collect())
    }

    async fn create_inventories(&mut self, branch_id: i64, size_ids: &[i64]) -> AppResult<()> {
        for size_id in size_ids {
            if !self.work.sizes.contains_key(size_id) {
                return Err(missing("size", size_id));
            }
            if self.work.inventory(branch_id, *size_id).is_some() {
                continue;
            }
            let id = self.work.next_id();
            self.work.inventories.insert(
                id,
                BranchInventory {
                    id,
                    branch_id,
                    size_id: *size_id,
                    stock: 0,
                },
            );
        }
        Ok(())
    }

    async fn adjust_stock(&mut self, deltas: &[(i64, i64)]) -> AppResult<()> {
        for (id, delta) in deltas {
            let row = self
                .work
                .inventories
                .get_mut(id)
                .ok_or_else(|| AppError::Internal(format!("inventory {} vanished", id)))?;
            row.stock += delta;
            if row.stock < 0 {
                return Err(AppError::Internal(format!(
                    "stock check violated for inventory {}",
                    id
                )));
            }
        }
        Ok(())
    }

    async fn insert_movements(&mut self, movements: &[NewInventoryMovement]) -> AppResult<()> {
        for m in movements {
            let id = self.work.next_id();
            self.work.movements.push(InventoryMovement {
                id,
                branch_inventory_id: m.branch_inventory_id,
                change_qty: m.change_qty,
                reference_type: m.reference_type,
                reference_key: m.reference_key.clone(),
                created_at: m.created_at,
            });
        }
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()> {
        if !self.work.branches.contains(&sale.branch_id) {
            return Err(missing("branch", sale.branch_id));
        }
        if self.work.sales.contains_key(&sale.code) {
            return Err(AppError::Conflict(format!("sale {} already exists", sale.code)));
        }
        self.work.sales.insert(sale.code.clone(), sale.clone());
        Ok(())
    }

    async fn insert_sale_details(&mut self, details: &[SaleDetail]) -> AppResult<()> {
        for detail in details {
            if !self.work.sizes.contains_key(&detail.size_id) {
                return Err(missing("size", detail.size_id));
            }
            self.work.sale_details.push(detail.clone());
        }
        Ok(())
    }

    async fn insert_sale_payments(
        &mut self,
        sale_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<SalePayment>> {
        let mut out = Vec::with_capacity(payments.len());
        for p in payments {
            let payment = SalePayment {
                id: self.work.next_id(),
                sale_code: sale_code.to_string(),
                payment_method: p.payment_method,
                amount: p.amount,
                note: p.note.clone(),
                created_at: p.created_at,
            };
            self.work.sale_payments.push(payment.clone());
            out.push(payment);
        }
        Ok(out)
    }

    async fn lock_sale(&mut self, code: &str) -> AppResult<Option<Sale>> {
        Ok(self.work.sales.get(code).cloned())
    }

    async fn sale_details(&mut self, code: &str) -> AppResult<Vec<SaleDetail>> {
        let mut details: Vec<SaleDetail> = self
            .work
            .sale_details
            .iter()
            .filter(|d| d.sale_code == code)
            .cloned()
            .collect();
        details.sort_by_key(|d| d.size_id);
        Ok(details)
    }

    async fn sale_payments(&mut self, code: &str) -> AppResult<Vec<SalePayment>> {
        Ok(self
            .work
            .sale_payments
            .iter()
            .filter(|p| p.sale_code == code)
            .cloned()
            .collect())
    }

    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()> {
        if let Some(row) = self.work.sales.get_mut(&sale.code) {
            row.status = sale.status;
            row.total_price = sale.total_price;
            row.updated_at = sale.updated_at;
        }
        Ok(())
    }

    async fn cancel_sale_details(
        &mut self,
        code: &str,
        size_ids: &[i64],
        now: i64,
    ) -> AppResult<()> {
        for detail in self.work.sale_details.iter_mut() {
            if detail.sale_code == code && size_ids.contains(&detail.size_id) && !detail.is_cancelled
            {
                detail.is_cancelled = true;
                detail.cancelled_at = Some(now);
            }
        }
        Ok(())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> AppResult<()> {
        if !self.work.branches.contains(&purchase.branch_id) {
            return Err(missing("branch", purchase.branch_id));
        }
        if !self.work.distributors.contains(&purchase.distributor_id) {
            return Err(missing("distributor", purchase.distributor_id));
        }
        if self.work.purchases.contains_key(&purchase.code) {
            return Err(AppError::Conflict(format!(
                "purchase {} already exists",
                purchase.code
            )));
        }
        self.work
            .purchases
            .insert(purchase.code.clone(), purchase.clone());
        Ok(())
    }

    async fn insert_purchase_details(&mut self, details: &[PurchaseDetail]) -> AppResult<()> {
        for detail in details {
            if !self.work.sizes.contains_key(&detail.size_id) {
                return Err(missing("size", detail.size_id));
            }
            self.work.purchase_details.push(detail.clone());
        }
        Ok(())
    }

    async fn insert_purchase_payments(
        &mut self,
        purchase_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<PurchasePayment>> {
        let mut out = Vec::with_capacity(payments.len());
        for p in payments {
            let payment = PurchasePayment {
                id: self.work.next_id(),
                purchase_code: purchase_code.to_string(),
                payment_method: p.payment_method,
                amount: p.amount,
                note: p.note.clone(),
                created_at: p.created_at,
            };
            self.work.purchase_payments.push(payment.clone());
            out.push(payment);
        }
        Ok(out)
    }

    async fn lock_purchase(&mut self, code: &str) -> AppResult<Option<Purchase>> {
        Ok(self.work.purchases.get(code).cloned())
    }

    async fn purchase_details(&mut self, code: &str) -> AppResult<Vec<PurchaseDetail>> {
        let mut details: Vec<PurchaseDetail> = self
            .work
            .purchase_details
            .iter()
            .filter(|d| d.purchase_code == code)
            .cloned()
            .collect();
        details.sort_by_key(|d| d.size_id);
        Ok(details)
    }

    async fn purchase_payments(&mut self, code: &str) -> AppResult<Vec<PurchasePayment>> {
        Ok(self
            .work
            .purchase_payments
            .iter()
            .filter(|p| p.purchase_code == code)
            .cloned()
            .collect())
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> AppResult<()> {
        if let Some(row) = self.work.purchases.get_mut(&purchase.code) {
            row.status = purchase.status;
            row.total_price = purchase.total_price;
            row.updated_at = purchase.updated_at;
        }
        Ok(())
    }

    async fn cancel_purchase_details(
        &mut self,
        code: &str,
        size_ids: &[i64],
        now: i64,
    ) -> AppResult<()> {
        for detail in self.work.purchase_details.iter_mut() {
            if detail.purchase_code == code
                && size_ids.contains(&detail.size_id)
                && !detail.is_cancelled
            {
                detail.is_cancelled = true;
                detail.cancelled_at = Some(now);
            }
        }
        Ok(())
    }

    async fn last_buy_prices(
        &mut self,
        size_ids: &[i64],
        exclude_code: &str,
    ) -> AppResult<HashMap<i64, Money>> {
        let mut latest: HashMap<i64, (i64, &str, Money)> = HashMap::new();
        for detail in &self.work.purchase_details {
            if detail.is_cancelled
                || detail.purchase_code == exclude_code
                || !size_ids.contains(&detail.size_id)
            {
                continue;
            }
            let Some(purchase) = self.work.purchases.get(&detail.purchase_code) else {
                continue;
            };
            if purchase.status == TradeStatus::Cancelled {
                continue;
            }
            let candidate = (purchase.created_at, purchase.code.as_str(), detail.buy_price);
            match latest.get(&detail.size_id) {
                Some((at, code, _)) if (*at, *code) >= (candidate.0, candidate.1) => {}
                _ => {
                    latest.insert(detail.size_id, candidate);
                }
            }
        }
        Ok(latest
            .into_iter()
            .map(|(size_id, (_, _, price))| (size_id, price))
            .collect())
    }

    async fn insert_debt(&mut self, debt: &NewDebt) -> AppResult<Debt> {
        if self
            .work
            .debt_for(debt.reference_type, &debt.reference_code)
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "debt for {} already exists",
                debt.reference_code
            )));
        }
        let row = Debt {
            id: self.work.next_id(),
            reference_type: debt.reference_type,
            reference_code: debt.reference_code.clone(),
            branch_id: debt.branch_id,
            total_amount: debt.total_amount,
            paid_amount: debt.paid_amount,
            due_date: debt.due_date,
            status: debt.status,
            created_at: debt.created_at,
            updated_at: debt.created_at,
        };
        self.work.debts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_debt(&mut self, id: i64) -> AppResult<Option<Debt>> {
        Ok(self.work.debts.get(&id).cloned())
    }

    async fn lock_debt_by_reference(
        &mut self,
        reference_type: DebtReferenceType,
        reference_code: &str,
    ) -> AppResult<Option<Debt>> {
        Ok(self.work.debt_for(reference_type, reference_code).cloned())
    }

    async fn update_debt(&mut self, debt: &Debt) -> AppResult<()> {
        if let Some(row) = self.work.debts.get_mut(&debt.id) {
            row.total_amount = debt.total_amount;
            row.paid_amount = debt.paid_amount;
            row.status = debt.status;
            row.updated_at = debt.updated_at;
        }
        Ok(())
    }

    async fn insert_debt_payments(
        &mut self,
        payments: &[NewDebtPayment],
    ) -> AppResult<Vec<DebtPayment>> {
        let mut out = Vec::with_capacity(payments.len());
        for p in payments {
            if !self.work.debts.contains_key(&p.debt_id) {
                return Err(missing("debt", p.debt_id));
            }
            let row = DebtPayment {
                id: self.work.next_id(),
                debt_id: p.debt_id,
                amount: p.amount,
                payment_date: p.payment_date,
                note: p.note.clone(),
                created_at: p.created_at,
            };
            self.work.debt_payments.insert(row.id, row.clone());
            out.push(row);
        }
        Ok(out)
    }

    async fn find_debt_payment(&mut self, id: i64) -> AppResult<Option<DebtPayment>> {
        Ok(self.work.debt_payments.get(&id).cloned())
    }

    async fn delete_debt_payment(&mut self, id: i64) -> AppResult<()> {
        self.work.debt_payments.remove(&id);
        Ok(())
    }

    async fn insert_cash_transactions(
        &mut self,
        rows: &[NewCashBankTransaction],
    ) -> AppResult<Vec<CashBankTransaction>> {
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let row = CashBankTransaction {
                id: self.work.next_id(),
                transaction_date: r.transaction_date,
                flow: r.flow,
                source: r.source,
                amount: r.amount,
                description: r.description.clone(),
                reference_key: r.reference_key.clone(),
                branch_id: r.branch_id,
                created_at: r.transaction_date,
            };
            self.work.cash.insert(row.id, row.clone());
            out.push(row);
        }
        Ok(out)
    }

    async fn find_cash_transaction(
        &mut self,
        source: CashSource,
        reference_key: &str,
    ) -> AppResult<Option<CashBankTransaction>> {
        Ok(self
            .work
            .cash
            .values()
            .find(|row| row.source == source && row.reference_key == reference_key)
            .cloned())
    }

    async fn update_cash_transaction(&mut self, row: &CashBankTransaction) -> AppResult<()> {
        if let Some(stored) = self.work.cash.get_mut(&row.id) {
            stored.flow = row.flow;
            stored.amount = row.amount;
            stored.description = row.description.clone();
        }
        Ok(())
    }

    async fn delete_cash_transaction(&mut self, id: i64) -> AppResult<()> {
        self.work.cash.remove(&id);
        Ok(())
    }

    async fn insert_capital(&mut self, capital: &NewCapital) -> AppResult<Capital> {
        if !self.work.branches.contains(&capital.branch_id) {
            return Err(missing("branch", capital.branch_id));
        }
        let row = Capital {
            id: self.work.next_id(),
            flow: capital.flow,
            amount: capital.amount,
            note: capital.note.clone(),
            branch_id: capital.branch_id,
            created_at: capital.created_at,
            updated_at: capital.created_at,
        };
        self.work.capitals.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_capital(&mut self, id: i64) -> AppResult<Option<Capital>> {
        Ok(self.work.capitals.get(&id).cloned())
    }

    async fn update_capital(&mut self, capital: &Capital) -> AppResult<()> {
        self.work.capitals.insert(capital.id, capital.clone());
        Ok(())
    }

    async fn delete_capital(&mut self, id: i64) -> AppResult<()> {
        self.work.capitals.remove(&id);
        Ok(())
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense> {
        if !self.work.branches.contains(&expense.branch_id) {
            return Err(missing("branch", expense.branch_id));
        }
        let row = Expense {
            id: self.work.next_id(),
            description: expense.description.clone(),
            amount: expense.amount,
            branch_id: expense.branch_id,
            created_at: expense.created_at,
            updated_at: expense.created_at,
        };
        self.work.expenses.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_expense(&mut self, id: i64) -> AppResult<Option<Expense>> {
        Ok(self.work.expenses.get(&id).cloned())
    }

    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()> {
        self.work.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn delete_expense(&mut self, id: i64) -> AppResult<()> {
        self.work.expenses.remove(&id);
        Ok(())
    }

    async fn insert_opname(&mut self, opname: &NewStockOpname) -> AppResult<StockOpname> {
        if !self.work.branches.contains(&opname.branch_id) {
            return Err(missing("branch", opname.branch_id));
        }
        let row = StockOpname {
            id: self.work.next_id(),
            branch_id: opname.branch_id,
            date: opname.date,
            status: OpnameStatus::Draft,
            created_by: opname.created_by.clone(),
            verified_by: None,
            created_at: opname.created_at,
            completed_at: None,
        };
        self.work.opnames.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_opname_details(
        &mut self,
        stock_opname_id: i64,
        details: &[NewStockOpnameDetail],
    ) -> AppResult<Vec<StockOpnameDetail>> {
        let mut out = Vec::with_capacity(details.len());
        for d in details {
            let row = StockOpnameDetail {
                id: self.work.next_id(),
                stock_opname_id,
                branch_inventory_id: d.branch_inventory_id,
                system_qty: d.system_qty,
                physical_qty: d.physical_qty,
                difference: d.difference,
                notes: d.notes.clone(),
            };
            self.work.opname_details.insert(row.id, row.clone());
            out.push(row);
        }
        Ok(out)
    }

    async fn lock_opname(&mut self, id: i64) -> AppResult<Option<StockOpname>> {
        Ok(self.work.opnames.get(&id).cloned())
    }

    async fn opname_details(&mut self, stock_opname_id: i64) -> AppResult<Vec<StockOpnameDetail>> {
        Ok(self
            .work
            .opname_details
            .values()
            .filter(|d| d.stock_opname_id == stock_opname_id)
            .cloned()
            .collect())
    }

    async fn update_opname(&mut self, opname: &StockOpname) -> AppResult<()> {
        self.work.opnames.insert(opname.id, opname.clone());
        Ok(())
    }

    async fn update_opname_details(&mut self, details: &[StockOpnameDetail]) -> AppResult<()> {
        for detail in details {
            self.work.opname_details.insert(detail.id, detail.clone());
        }
        Ok(())
    }

    async fn delete_opname(&mut self, id: i64) -> AppResult<()> {
        self.work.opnames.remove(&id);
        self.work.opname_details.retain(|_, d| d.stock_opname_id != id);
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryUnitOfWork { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}

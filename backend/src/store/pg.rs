//! PostgreSQL implementation of the store
//!
//! Enums are stored as TEXT and parsed on the way out; money is NUMERIC(15,2); times
//! are BIGINT epoch milliseconds. Bulk writes go through `UNNEST` arrays.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use shared::{
    BranchInventory, CashBankTransaction, CashSource, Capital, Debt, DebtPayment,
    DebtReferenceType, Expense, Money, NewCapital, NewCashBankTransaction, NewDebt,
    NewDebtPayment, NewExpense, NewInventoryMovement, NewStockOpname, NewStockOpnameDetail,
    NewTradePayment, Purchase, PurchaseDetail, PurchasePayment, Sale, SaleDetail, SalePayment,
    Size, StockOpname, StockOpnameDetail,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{Store, UnitOfWork};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[axum::async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> AppResult<PgUnitOfWork> {
        Ok(PgUnitOfWork {
            tx: self.db.begin().await?,
        })
    }
}

pub(crate) fn parse_column<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(AppError::Internal)
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
pub(crate) struct SizeRow {
    id: i64,
    product_sku: String,
    product_name: String,
    name: String,
    sell_price: Decimal,
    buy_price: Decimal,
}

impl From<SizeRow> for Size {
    fn from(row: SizeRow) -> Self {
        Size {
            id: row.id,
            product_sku: row.product_sku,
            product_name: row.product_name,
            name: row.name,
            sell_price: row.sell_price.into(),
            buy_price: row.buy_price.into(),
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct InventoryRow {
    id: i64,
    branch_id: i64,
    size_id: i64,
    stock: i64,
}

impl From<InventoryRow> for BranchInventory {
    fn from(row: InventoryRow) -> Self {
        BranchInventory {
            id: row.id,
            branch_id: row.branch_id,
            size_id: row.size_id,
            stock: row.stock,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SaleRow {
    code: String,
    customer_name: String,
    branch_id: i64,
    status: String,
    total_price: Decimal,
    created_by: String,
    created_at: i64,
    updated_at: i64,
}

impl SaleRow {
    pub(crate) fn into_model(self) -> AppResult<Sale> {
        Ok(Sale {
            code: self.code,
            customer_name: self.customer_name,
            branch_id: self.branch_id,
            status: parse_column(&self.status)?,
            total_price: self.total_price.into(),
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SaleDetailRow {
    sale_code: String,
    size_id: i64,
    qty: i64,
    sell_price: Decimal,
    is_cancelled: bool,
    cancelled_at: Option<i64>,
}

impl From<SaleDetailRow> for SaleDetail {
    fn from(row: SaleDetailRow) -> Self {
        SaleDetail {
            sale_code: row.sale_code,
            size_id: row.size_id,
            qty: row.qty,
            sell_price: row.sell_price.into(),
            is_cancelled: row.is_cancelled,
            cancelled_at: row.cancelled_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TradePaymentRow {
    id: i64,
    code: String,
    payment_method: String,
    amount: Decimal,
    note: Option<String>,
    created_at: i64,
}

impl TradePaymentRow {
    pub(crate) fn into_sale_payment(self) -> AppResult<SalePayment> {
        Ok(SalePayment {
            id: self.id,
            sale_code: self.code,
            payment_method: parse_column(&self.payment_method)?,
            amount: self.amount.into(),
            note: self.note,
            created_at: self.created_at,
        })
    }

    pub(crate) fn into_purchase_payment(self) -> AppResult<PurchasePayment> {
        Ok(PurchasePayment {
            id: self.id,
            purchase_code: self.code,
            payment_method: parse_column(&self.payment_method)?,
            amount: self.amount.into(),
            note: self.note,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PurchaseRow {
    code: String,
    sales_name: String,
    branch_id: i64,
    distributor_id: i64,
    status: String,
    total_price: Decimal,
    created_by: String,
    created_at: i64,
    updated_at: i64,
}

impl PurchaseRow {
    pub(crate) fn into_model(self) -> AppResult<Purchase> {
        Ok(Purchase {
            code: self.code,
            sales_name: self.sales_name,
            branch_id: self.branch_id,
            distributor_id: self.distributor_id,
            status: parse_column(&self.status)?,
            total_price: self.total_price.into(),
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PurchaseDetailRow {
    purchase_code: String,
    size_id: i64,
    qty: i64,
    buy_price: Decimal,
    is_cancelled: bool,
    cancelled_at: Option<i64>,
}

impl From<PurchaseDetailRow> for PurchaseDetail {
    fn from(row: PurchaseDetailRow) -> Self {
        PurchaseDetail {
            purchase_code: row.purchase_code,
            size_id: row.size_id,
            qty: row.qty,
            buy_price: row.buy_price.into(),
            is_cancelled: row.is_cancelled,
            cancelled_at: row.cancelled_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DebtRow {
    id: i64,
    reference_type: String,
    reference_code: String,
    branch_id: i64,
    total_amount: Decimal,
    paid_amount: Decimal,
    due_date: i64,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl DebtRow {
    pub(crate) fn into_model(self) -> AppResult<Debt> {
        Ok(Debt {
            id: self.id,
            reference_type: parse_column(&self.reference_type)?,
            reference_code: self.reference_code,
            branch_id: self.branch_id,
            total_amount: self.total_amount.into(),
            paid_amount: self.paid_amount.into(),
            due_date: self.due_date,
            status: parse_column(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DebtPaymentRow {
    id: i64,
    debt_id: i64,
    amount: Decimal,
    payment_date: i64,
    note: Option<String>,
    created_at: i64,
}

impl From<DebtPaymentRow> for DebtPayment {
    fn from(row: DebtPaymentRow) -> Self {
        DebtPayment {
            id: row.id,
            debt_id: row.debt_id,
            amount: row.amount.into(),
            payment_date: row.payment_date,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CashRow {
    id: i64,
    transaction_date: i64,
    #[sqlx(rename = "type")]
    flow: String,
    source: String,
    amount: Decimal,
    description: Option<String>,
    reference_key: String,
    branch_id: i64,
    created_at: i64,
}

impl CashRow {
    pub(crate) fn into_model(self) -> AppResult<CashBankTransaction> {
        Ok(CashBankTransaction {
            id: self.id,
            transaction_date: self.transaction_date,
            flow: parse_column(&self.flow)?,
            source: parse_column(&self.source)?,
            amount: self.amount.into(),
            description: self.description,
            reference_key: self.reference_key,
            branch_id: self.branch_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CapitalRow {
    id: i64,
    #[sqlx(rename = "type")]
    flow: String,
    amount: Decimal,
    note: Option<String>,
    branch_id: i64,
    created_at: i64,
    updated_at: i64,
}

impl CapitalRow {
    pub(crate) fn into_model(self) -> AppResult<Capital> {
        Ok(Capital {
            id: self.id,
            flow: parse_column(&self.flow)?,
            amount: self.amount.into(),
            note: self.note,
            branch_id: self.branch_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ExpenseRow {
    id: i64,
    description: String,
    amount: Decimal,
    branch_id: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            description: row.description,
            amount: row.amount.into(),
            branch_id: row.branch_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OpnameRow {
    id: i64,
    branch_id: i64,
    date: i64,
    status: String,
    created_by: String,
    verified_by: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
}

impl OpnameRow {
    pub(crate) fn into_model(self) -> AppResult<StockOpname> {
        Ok(StockOpname {
            id: self.id,
            branch_id: self.branch_id,
            date: self.date,
            status: parse_column(&self.status)?,
            created_by: self.created_by,
            verified_by: self.verified_by,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OpnameDetailRow {
    id: i64,
    stock_opname_id: i64,
    branch_inventory_id: i64,
    system_qty: i64,
    physical_qty: i64,
    difference: i64,
    notes: Option<String>,
}

impl From<OpnameDetailRow> for StockOpnameDetail {
    fn from(row: OpnameDetailRow) -> Self {
        StockOpnameDetail {
            id: row.id,
            stock_opname_id: row.stock_opname_id,
            branch_inventory_id: row.branch_inventory_id,
            system_qty: row.system_qty,
            physical_qty: row.physical_qty,
            difference: row.difference,
            notes: row.notes,
        }
    }
}

fn amounts<'a, I: IntoIterator<Item = &'a Money>>(values: I) -> Vec<Decimal> {
    values.into_iter().map(Money::amount).collect()
}

pub(crate) const SALE_COLUMNS: &str =
    "code, customer_name, branch_id, status, total_price, created_by, created_at, updated_at";
pub(crate) const PURCHASE_COLUMNS: &str = "code, sales_name, branch_id, distributor_id, status, total_price, created_by, created_at, updated_at";
pub(crate) const DEBT_COLUMNS: &str = "id, reference_type, reference_code, branch_id, total_amount, paid_amount, due_date, status, created_at, updated_at";
pub(crate) const CASH_COLUMNS: &str = "id, transaction_date, type, source, amount, description, reference_key, branch_id, created_at";
pub(crate) const OPNAME_COLUMNS: &str =
    "id, branch_id, date, status, created_by, verified_by, created_at, completed_at";

// ============================================================================
// Unit of work
// ============================================================================

#[axum::async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_sizes(&mut self, ids: &[i64]) -> AppResult<Vec<Size>> {
        let rows = sqlx::query_as::<_, SizeRow>(
            r#"
            SELECT s.id, s.product_sku, p.name AS product_name, s.name, s.sell_price, s.buy_price
            FROM sizes s
            JOIN products p ON p.sku = s.product_sku
            WHERE s.id = ANY($1)
            ORDER BY s.id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Size::from).collect())
    }

    async fn update_buy_prices(&mut self, prices: &[(i64, Money)]) -> AppResult<()> {
        if prices.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = prices.iter().map(|(id, _)| *id).collect();
        let values = amounts(prices.iter().map(|(_, price)| price));

        sqlx::query(
            r#"
            UPDATE sizes s
            SET buy_price = u.buy_price
            FROM UNNEST($1::BIGINT[], $2::NUMERIC[]) AS u(id, buy_price)
            WHERE s.id = u.id
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn distributor_exists(&mut self, id: i64) -> AppResult<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM distributors WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(found)
    }

    async fn lock_inventories(
        &mut self,
        branch_id: i64,
        size_ids: &[i64],
    ) -> AppResult<Vec<BranchInventory>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT id, branch_id, size_id, stock
            FROM branch_inventory
            WHERE branch_id = $1 AND size_id = ANY($2)
            ORDER BY size_id
            FOR UPDATE
            "#,
        )
        .bind(branch_id)
        .bind(size_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(BranchInventory::from).collect())
    }

    async fn lock_inventories_by_ids(&mut self, ids: &[i64]) -> AppResult<Vec<BranchInventory>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            r#"
            SELECT id, branch_id, size_id, stock
            FROM branch_inventory
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(BranchInventory::from).collect())
    }

    async fn create_inventories(&mut self, branch_id: i64, size_ids: &[i64]) -> AppResult<()> {
        if size_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO branch_inventory (branch_id, size_id, stock)
            SELECT $1, u.size_id, 0
            FROM UNNEST($2::BIGINT[]) AS u(size_id)
            ORDER BY u.size_id
            ON CONFLICT (branch_id, size_id) DO NOTHING
            "#,
        )
        .bind(branch_id)
        .bind(size_ids)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn adjust_stock(&mut self, deltas: &[(i64, i64)]) -> AppResult<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = deltas.iter().map(|(id, _)| *id).collect();
        let changes: Vec<i64> = deltas.iter().map(|(_, delta)| *delta).collect();

        sqlx::query(
            r#"
            UPDATE branch_inventory bi
            SET stock = bi.stock + d.delta
            FROM UNNEST($1::BIGINT[], $2::BIGINT[]) AS d(id, delta)
            WHERE bi.id = d.id
            "#,
        )
        .bind(&ids)
        .bind(&changes)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_movements(&mut self, movements: &[NewInventoryMovement]) -> AppResult<()> {
        if movements.is_empty() {
            return Ok(());
        }
        let inventory_ids: Vec<i64> = movements.iter().map(|m| m.branch_inventory_id).collect();
        let changes: Vec<i64> = movements.iter().map(|m| m.change_qty).collect();
        let types: Vec<String> = movements
            .iter()
            .map(|m| m.reference_type.as_str().to_string())
            .collect();
        let keys: Vec<String> = movements.iter().map(|m| m.reference_key.clone()).collect();
        let times: Vec<i64> = movements.iter().map(|m| m.created_at).collect();

        sqlx::query(
            r#"
            INSERT INTO inventory_movement
                (branch_inventory_id, change_qty, reference_type, reference_key, created_at)
            SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TEXT[], $4::TEXT[], $5::BIGINT[])
            "#,
        )
        .bind(&inventory_ids)
        .bind(&changes)
        .bind(&types)
        .bind(&keys)
        .bind(&times)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales
                (code, customer_name, branch_id, status, total_price, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&sale.code)
        .bind(&sale.customer_name)
        .bind(sale.branch_id)
        .bind(sale.status.as_str())
        .bind(sale.total_price.amount())
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_sale_details(&mut self, details: &[SaleDetail]) -> AppResult<()> {
        if details.is_empty() {
            return Ok(());
        }
        let codes: Vec<String> = details.iter().map(|d| d.sale_code.clone()).collect();
        let size_ids: Vec<i64> = details.iter().map(|d| d.size_id).collect();
        let qty: Vec<i64> = details.iter().map(|d| d.qty).collect();
        let prices = amounts(details.iter().map(|d| &d.sell_price));

        sqlx::query(
            r#"
            INSERT INTO sale_details (sale_code, size_id, qty, sell_price, is_cancelled)
            SELECT u.code, u.size_id, u.qty, u.price, FALSE
            FROM UNNEST($1::TEXT[], $2::BIGINT[], $3::BIGINT[], $4::NUMERIC[])
                AS u(code, size_id, qty, price)
            "#,
        )
        .bind(&codes)
        .bind(&size_ids)
        .bind(&qty)
        .bind(&prices)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_sale_payments(
        &mut self,
        sale_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<SalePayment>> {
        if payments.is_empty() {
            return Ok(Vec::new());
        }
        let (methods, values, notes, times) = payment_columns(payments);

        let rows = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            INSERT INTO sale_payments (sale_code, payment_method, amount, note, created_at)
            SELECT $1, u.method, u.amount, u.note, u.created_at
            FROM UNNEST($2::TEXT[], $3::NUMERIC[], $4::TEXT[], $5::BIGINT[])
                AS u(method, amount, note, created_at)
            RETURNING id, sale_code AS code, payment_method, amount, note, created_at
            "#,
        )
        .bind(sale_code)
        .bind(&methods)
        .bind(&values)
        .bind(&notes)
        .bind(&times)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(TradePaymentRow::into_sale_payment).collect()
    }

    async fn lock_sale(&mut self, code: &str) -> AppResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE code = $1 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(SaleRow::into_model).transpose()
    }

    async fn sale_details(&mut self, code: &str) -> AppResult<Vec<SaleDetail>> {
        let rows = sqlx::query_as::<_, SaleDetailRow>(
            r#"
            SELECT sale_code, size_id, qty, sell_price, is_cancelled, cancelled_at
            FROM sale_details
            WHERE sale_code = $1
            ORDER BY size_id
            "#,
        )
        .bind(code)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(SaleDetail::from).collect())
    }

    async fn sale_payments(&mut self, code: &str) -> AppResult<Vec<SalePayment>> {
        let rows = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            SELECT id, sale_code AS code, payment_method, amount, note, created_at
            FROM sale_payments
            WHERE sale_code = $1
            ORDER BY id
            "#,
        )
        .bind(code)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(TradePaymentRow::into_sale_payment).collect()
    }

    async fn update_sale(&mut self, sale: &Sale) -> AppResult<()> {
        sqlx::query(
            "UPDATE sales SET status = $2, total_price = $3, updated_at = $4 WHERE code = $1",
        )
        .bind(&sale.code)
        .bind(sale.status.as_str())
        .bind(sale.total_price.amount())
        .bind(sale.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn cancel_sale_details(
        &mut self,
        code: &str,
        size_ids: &[i64],
        now: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE sale_details
            SET is_cancelled = TRUE, cancelled_at = $3
            WHERE sale_code = $1 AND size_id = ANY($2) AND NOT is_cancelled
            "#,
        )
        .bind(code)
        .bind(size_ids)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases
                (code, sales_name, branch_id, distributor_id, status, total_price, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&purchase.code)
        .bind(&purchase.sales_name)
        .bind(purchase.branch_id)
        .bind(purchase.distributor_id)
        .bind(purchase.status.as_str())
        .bind(purchase.total_price.amount())
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_purchase_details(&mut self, details: &[PurchaseDetail]) -> AppResult<()> {
        if details.is_empty() {
            return Ok(());
        }
        let codes: Vec<String> = details.iter().map(|d| d.purchase_code.clone()).collect();
        let size_ids: Vec<i64> = details.iter().map(|d| d.size_id).collect();
        let qty: Vec<i64> = details.iter().map(|d| d.qty).collect();
        let prices = amounts(details.iter().map(|d| &d.buy_price));

        sqlx::query(
            r#"
            INSERT INTO purchase_details (purchase_code, size_id, qty, buy_price, is_cancelled)
            SELECT u.code, u.size_id, u.qty, u.price, FALSE
            FROM UNNEST($1::TEXT[], $2::BIGINT[], $3::BIGINT[], $4::NUMERIC[])
                AS u(code, size_id, qty, price)
            "#,
        )
        .bind(&codes)
        .bind(&size_ids)
        .bind(&qty)
        .bind(&prices)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_purchase_payments(
        &mut self,
        purchase_code: &str,
        payments: &[NewTradePayment],
    ) -> AppResult<Vec<PurchasePayment>> {
        if payments.is_empty() {
            return Ok(Vec::new());
        }
        let (methods, values, notes, times) = payment_columns(payments);

        let rows = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            INSERT INTO purchase_payments (purchase_code, payment_method, amount, note, created_at)
            SELECT $1, u.method, u.amount, u.note, u.created_at
            FROM UNNEST($2::TEXT[], $3::NUMERIC[], $4::TEXT[], $5::BIGINT[])
                AS u(method, amount, note, created_at)
            RETURNING id, purchase_code AS code, payment_method, amount, note, created_at
            "#,
        )
        .bind(purchase_code)
        .bind(&methods)
        .bind(&values)
        .bind(&notes)
        .bind(&times)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(TradePaymentRow::into_purchase_payment)
            .collect()
    }

    async fn lock_purchase(&mut self, code: &str) -> AppResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE code = $1 FOR UPDATE",
            PURCHASE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PurchaseRow::into_model).transpose()
    }

    async fn purchase_details(&mut self, code: &str) -> AppResult<Vec<PurchaseDetail>> {
        let rows = sqlx::query_as::<_, PurchaseDetailRow>(
            r#"
            SELECT purchase_code, size_id, qty, buy_price, is_cancelled, cancelled_at
            FROM purchase_details
            WHERE purchase_code = $1
            ORDER BY size_id
            "#,
        )
        .bind(code)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(PurchaseDetail::from).collect())
    }

    async fn purchase_payments(&mut self, code: &str) -> AppResult<Vec<PurchasePayment>> {
        let rows = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            SELECT id, purchase_code AS code, payment_method, amount, note, created_at
            FROM purchase_payments
            WHERE purchase_code = $1
            ORDER BY id
            "#,
        )
        .bind(code)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(TradePaymentRow::into_purchase_payment)
            .collect()
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> AppResult<()> {
        sqlx::query(
            "UPDATE purchases SET status = $2, total_price = $3, updated_at = $4 WHERE code = $1",
        )
        .bind(&purchase.code)
        .bind(purchase.status.as_str())
        .bind(purchase.total_price.amount())
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn cancel_purchase_details(
        &mut self,
        code: &str,
        size_ids: &[i64],
        now: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE purchase_details
            SET is_cancelled = TRUE, cancelled_at = $3
            WHERE purchase_code = $1 AND size_id = ANY($2) AND NOT is_cancelled
            "#,
        )
        .bind(code)
        .bind(size_ids)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn last_buy_prices(
        &mut self,
        size_ids: &[i64],
        exclude_code: &str,
    ) -> AppResult<HashMap<i64, Money>> {
        let rows = sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT DISTINCT ON (pd.size_id) pd.size_id, pd.buy_price
            FROM purchase_details pd
            JOIN purchases p ON p.code = pd.purchase_code
            WHERE pd.size_id = ANY($1)
              AND pd.purchase_code <> $2
              AND NOT pd.is_cancelled
              AND p.status <> 'CANCELLED'
            ORDER BY pd.size_id, p.created_at DESC, p.code DESC
            "#,
        )
        .bind(size_ids)
        .bind(exclude_code)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(size_id, price)| (size_id, Money::from(price)))
            .collect())
    }

    async fn insert_debt(&mut self, debt: &NewDebt) -> AppResult<Debt> {
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            r#"
            INSERT INTO debts
                (reference_type, reference_code, branch_id, total_amount, paid_amount, due_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            DEBT_COLUMNS
        ))
        .bind(debt.reference_type.as_str())
        .bind(&debt.reference_code)
        .bind(debt.branch_id)
        .bind(debt.total_amount.amount())
        .bind(debt.paid_amount.amount())
        .bind(debt.due_date)
        .bind(debt.status.as_str())
        .bind(debt.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.into_model()
    }

    async fn lock_debt(&mut self, id: i64) -> AppResult<Option<Debt>> {
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            "SELECT {} FROM debts WHERE id = $1 FOR UPDATE",
            DEBT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(DebtRow::into_model).transpose()
    }

    async fn lock_debt_by_reference(
        &mut self,
        reference_type: DebtReferenceType,
        reference_code: &str,
    ) -> AppResult<Option<Debt>> {
        let row = sqlx::query_as::<_, DebtRow>(&format!(
            "SELECT {} FROM debts WHERE reference_type = $1 AND reference_code = $2 FOR UPDATE",
            DEBT_COLUMNS
        ))
        .bind(reference_type.as_str())
        .bind(reference_code)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(DebtRow::into_model).transpose()
    }

    async fn update_debt(&mut self, debt: &Debt) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE debts
            SET total_amount = $2, paid_amount = $3, status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(debt.id)
        .bind(debt.total_amount.amount())
        .bind(debt.paid_amount.amount())
        .bind(debt.status.as_str())
        .bind(debt.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_debt_payments(
        &mut self,
        payments: &[NewDebtPayment],
    ) -> AppResult<Vec<DebtPayment>> {
        if payments.is_empty() {
            return Ok(Vec::new());
        }
        let debt_ids: Vec<i64> = payments.iter().map(|p| p.debt_id).collect();
        let values = amounts(payments.iter().map(|p| &p.amount));
        let dates: Vec<i64> = payments.iter().map(|p| p.payment_date).collect();
        let notes: Vec<Option<String>> = payments.iter().map(|p| p.note.clone()).collect();
        let times: Vec<i64> = payments.iter().map(|p| p.created_at).collect();

        let rows = sqlx::query_as::<_, DebtPaymentRow>(
            r#"
            INSERT INTO debt_payments (debt_id, amount, payment_date, note, created_at)
            SELECT * FROM UNNEST($1::BIGINT[], $2::NUMERIC[], $3::BIGINT[], $4::TEXT[], $5::BIGINT[])
            RETURNING id, debt_id, amount, payment_date, note, created_at
            "#,
        )
        .bind(&debt_ids)
        .bind(&values)
        .bind(&dates)
        .bind(&notes)
        .bind(&times)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(DebtPayment::from).collect())
    }

    async fn find_debt_payment(&mut self, id: i64) -> AppResult<Option<DebtPayment>> {
        let row = sqlx::query_as::<_, DebtPaymentRow>(
            r#"
            SELECT id, debt_id, amount, payment_date, note, created_at
            FROM debt_payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(DebtPayment::from))
    }

    async fn delete_debt_payment(&mut self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM debt_payments WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_cash_transactions(
        &mut self,
        rows: &[NewCashBankTransaction],
    ) -> AppResult<Vec<CashBankTransaction>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let dates: Vec<i64> = rows.iter().map(|r| r.transaction_date).collect();
        let flows: Vec<String> = rows.iter().map(|r| r.flow.as_str().to_string()).collect();
        let sources: Vec<String> = rows.iter().map(|r| r.source.as_str().to_string()).collect();
        let values = amounts(rows.iter().map(|r| &r.amount));
        let descriptions: Vec<Option<String>> = rows.iter().map(|r| r.description.clone()).collect();
        let keys: Vec<String> = rows.iter().map(|r| r.reference_key.clone()).collect();
        let branches: Vec<i64> = rows.iter().map(|r| r.branch_id).collect();

        let inserted = sqlx::query_as::<_, CashRow>(&format!(
            r#"
            INSERT INTO cash_bank_transactions
                (transaction_date, type, source, amount, description, reference_key, branch_id, created_at)
            SELECT u.*, u.transaction_date
            FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::NUMERIC[], $5::TEXT[], $6::TEXT[], $7::BIGINT[])
                AS u(transaction_date, type, source, amount, description, reference_key, branch_id)
            RETURNING {}
            "#,
            CASH_COLUMNS
        ))
        .bind(&dates)
        .bind(&flows)
        .bind(&sources)
        .bind(&values)
        .bind(&descriptions)
        .bind(&keys)
        .bind(&branches)
        .fetch_all(&mut *self.tx)
        .await?;

        inserted.into_iter().map(CashRow::into_model).collect()
    }

    async fn find_cash_transaction(
        &mut self,
        source: CashSource,
        reference_key: &str,
    ) -> AppResult<Option<CashBankTransaction>> {
        let row = sqlx::query_as::<_, CashRow>(&format!(
            r#"
            SELECT {}
            FROM cash_bank_transactions
            WHERE source = $1 AND reference_key = $2
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
            CASH_COLUMNS
        ))
        .bind(source.as_str())
        .bind(reference_key)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(CashRow::into_model).transpose()
    }

    async fn update_cash_transaction(&mut self, row: &CashBankTransaction) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE cash_bank_transactions
            SET type = $2, amount = $3, description = $4
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.flow.as_str())
        .bind(row.amount.amount())
        .bind(&row.description)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_cash_transaction(&mut self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM cash_bank_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_capital(&mut self, capital: &NewCapital) -> AppResult<Capital> {
        let row = sqlx::query_as::<_, CapitalRow>(
            r#"
            INSERT INTO capitals (type, amount, note, branch_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, type, amount, note, branch_id, created_at, updated_at
            "#,
        )
        .bind(capital.flow.as_str())
        .bind(capital.amount.amount())
        .bind(&capital.note)
        .bind(capital.branch_id)
        .bind(capital.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.into_model()
    }

    async fn lock_capital(&mut self, id: i64) -> AppResult<Option<Capital>> {
        let row = sqlx::query_as::<_, CapitalRow>(
            r#"
            SELECT id, type, amount, note, branch_id, created_at, updated_at
            FROM capitals
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(CapitalRow::into_model).transpose()
    }

    async fn update_capital(&mut self, capital: &Capital) -> AppResult<()> {
        sqlx::query(
            "UPDATE capitals SET type = $2, amount = $3, note = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(capital.id)
        .bind(capital.flow.as_str())
        .bind(capital.amount.amount())
        .bind(&capital.note)
        .bind(capital.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_capital(&mut self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM capitals WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            INSERT INTO expenses (description, amount, branch_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, description, amount, branch_id, created_at, updated_at
            "#,
        )
        .bind(&expense.description)
        .bind(expense.amount.amount())
        .bind(expense.branch_id)
        .bind(expense.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn lock_expense(&mut self, id: i64) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, description, amount, branch_id, created_at, updated_at
            FROM expenses
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Expense::from))
    }

    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()> {
        sqlx::query(
            "UPDATE expenses SET description = $2, amount = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(expense.id)
        .bind(&expense.description)
        .bind(expense.amount.amount())
        .bind(expense.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_expense(&mut self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_opname(&mut self, opname: &NewStockOpname) -> AppResult<StockOpname> {
        let row = sqlx::query_as::<_, OpnameRow>(&format!(
            r#"
            INSERT INTO stock_opname (branch_id, date, status, created_by, created_at)
            VALUES ($1, $2, 'draft', $3, $4)
            RETURNING {}
            "#,
            OPNAME_COLUMNS
        ))
        .bind(opname.branch_id)
        .bind(opname.date)
        .bind(&opname.created_by)
        .bind(opname.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        row.into_model()
    }

    async fn insert_opname_details(
        &mut self,
        stock_opname_id: i64,
        details: &[NewStockOpnameDetail],
    ) -> AppResult<Vec<StockOpnameDetail>> {
        if details.is_empty() {
            return Ok(Vec::new());
        }
        let inventory_ids: Vec<i64> = details.iter().map(|d| d.branch_inventory_id).collect();
        let system: Vec<i64> = details.iter().map(|d| d.system_qty).collect();
        let physical: Vec<i64> = details.iter().map(|d| d.physical_qty).collect();
        let difference: Vec<i64> = details.iter().map(|d| d.difference).collect();
        let notes: Vec<Option<String>> = details.iter().map(|d| d.notes.clone()).collect();

        let rows = sqlx::query_as::<_, OpnameDetailRow>(
            r#"
            INSERT INTO stock_opname_detail
                (stock_opname_id, branch_inventory_id, system_qty, physical_qty, difference, notes)
            SELECT $1, u.*
            FROM UNNEST($2::BIGINT[], $3::BIGINT[], $4::BIGINT[], $5::BIGINT[], $6::TEXT[])
                AS u(branch_inventory_id, system_qty, physical_qty, difference, notes)
            RETURNING id, stock_opname_id, branch_inventory_id, system_qty, physical_qty, difference, notes
            "#,
        )
        .bind(stock_opname_id)
        .bind(&inventory_ids)
        .bind(&system)
        .bind(&physical)
        .bind(&difference)
        .bind(&notes)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(StockOpnameDetail::from).collect())
    }

    async fn lock_opname(&mut self, id: i64) -> AppResult<Option<StockOpname>> {
        let row = sqlx::query_as::<_, OpnameRow>(&format!(
            "SELECT {} FROM stock_opname WHERE id = $1 FOR UPDATE",
            OPNAME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(OpnameRow::into_model).transpose()
    }

    async fn opname_details(&mut self, stock_opname_id: i64) -> AppResult<Vec<StockOpnameDetail>> {
        let rows = sqlx::query_as::<_, OpnameDetailRow>(
            r#"
            SELECT id, stock_opname_id, branch_inventory_id, system_qty, physical_qty, difference, notes
            FROM stock_opname_detail
            WHERE stock_opname_id = $1
            ORDER BY id
            "#,
        )
        .bind(stock_opname_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(StockOpnameDetail::from).collect())
    }

    async fn update_opname(&mut self, opname: &StockOpname) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE stock_opname
            SET status = $2, verified_by = $3, completed_at = $4
            WHERE id = $1
            "#,
        )
        .bind(opname.id)
        .bind(opname.status.as_str())
        .bind(&opname.verified_by)
        .bind(opname.completed_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_opname_details(&mut self, details: &[StockOpnameDetail]) -> AppResult<()> {
        if details.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = details.iter().map(|d| d.id).collect();
        let system: Vec<i64> = details.iter().map(|d| d.system_qty).collect();
        let physical: Vec<i64> = details.iter().map(|d| d.physical_qty).collect();
        let difference: Vec<i64> = details.iter().map(|d| d.difference).collect();
        let notes: Vec<Option<String>> = details.iter().map(|d| d.notes.clone()).collect();

        sqlx::query(
            r#"
            UPDATE stock_opname_detail d
            SET system_qty = u.system_qty,
                physical_qty = u.physical_qty,
                difference = u.difference,
                notes = u.notes
            FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::BIGINT[], $4::BIGINT[], $5::TEXT[])
                AS u(id, system_qty, physical_qty, difference, notes)
            WHERE d.id = u.id
            "#,
        )
        .bind(&ids)
        .bind(&system)
        .bind(&physical)
        .bind(&difference)
        .bind(&notes)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_opname(&mut self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM stock_opname WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

type PaymentColumns = (Vec<String>, Vec<Decimal>, Vec<Option<String>>, Vec<i64>);

fn payment_columns(payments: &[NewTradePayment]) -> PaymentColumns {
    (
        payments
            .iter()
            .map(|p| p.payment_method.as_str().to_string())
            .collect(),
        amounts(payments.iter().map(|p| &p.amount)),
        payments.iter().map(|p| p.note.clone()).collect(),
        payments.iter().map(|p| p.created_at).collect(),
    )
}

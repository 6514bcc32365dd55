//! Read side: paginated lists and single-document views
//!
//! Reads go straight to the pool; none of them take locks. Non-owners only ever see
//! their own branch.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    CashBalance, CashBankTransaction, CashSource, DateRangeQuery, Debt, DebtDetail,
    DebtLineItem, DebtPayment, DebtReferenceType, DebtStatus, InventoryMovement, InventoryView,
    PageMetadata, PageRequest, Purchase, PurchaseDetail, PurchaseDetailView, PurchaseView, Sale,
    SaleDetail, SaleDetailView, SaleView, StockOpname, StockOpnameDetail, StockOpnameDetailView,
    StockOpnameView, WebResponse,
};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::pg::{
    parse_column, CashRow, DebtPaymentRow, DebtRow, OpnameDetailRow, OpnameRow,
    PurchaseDetailRow, PurchaseRow, SaleDetailRow, SaleRow, TradePaymentRow, CASH_COLUMNS,
    DEBT_COLUMNS, OPNAME_COLUMNS, PURCHASE_COLUMNS, SALE_COLUMNS,
};

/// `?start_at&end_at&branch_id&page&size` for sales and purchases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeListQuery {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub branch_id: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebtListQuery {
    pub status: Option<String>,
    pub reference_type: Option<String>,
    pub branch_id: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CashListQuery {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub branch_id: Option<i64>,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// `?branch_id&page&size` for inventories and stock opnames.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchListQuery {
    pub branch_id: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

fn page_of(page: Option<u32>, size: Option<u32>) -> PageRequest {
    PageRequest { page, size }
}

fn range_of(
    start_at: Option<String>,
    end_at: Option<String>,
) -> AppResult<(Option<i64>, Option<i64>)> {
    Ok(DateRangeQuery { start_at, end_at }.bounds()?)
}

/// Parse an optional enum filter, rejecting unknown values as a bad request.
fn filter_of<T>(
    value: Option<&str>,
    name: fn(&T) -> &'static str,
) -> AppResult<Option<&'static str>>
where
    T: FromStr<Err = String>,
{
    value
        .map(|raw| {
            raw.to_ascii_uppercase()
                .parse::<T>()
                .map(|parsed| name(&parsed))
                .map_err(AppError::BadRequest)
        })
        .transpose()
}

fn paged<T>(data: Vec<T>, page: &PageRequest, total: i64) -> WebResponse<Vec<T>> {
    WebResponse::paged(data, PageMetadata::new(page, total.max(0) as u64))
}

#[derive(Debug, FromRow)]
struct SaleDetailViewRow {
    #[sqlx(flatten)]
    detail: SaleDetailRow,
    product_name: String,
    size_name: String,
}

#[derive(Debug, FromRow)]
struct PurchaseDetailViewRow {
    #[sqlx(flatten)]
    detail: PurchaseDetailRow,
    product_name: String,
    size_name: String,
}

#[derive(Debug, FromRow)]
struct OpnameDetailViewRow {
    #[sqlx(flatten)]
    detail: OpnameDetailRow,
    size_id: i64,
    product_name: String,
    size_name: String,
}

#[derive(Debug, FromRow)]
struct DebtLineRow {
    size_id: i64,
    product_name: String,
    size_name: String,
    qty: i64,
    price: Decimal,
    is_cancelled: bool,
}

#[derive(Debug, FromRow)]
struct InventoryViewRow {
    id: i64,
    branch_id: i64,
    size_id: i64,
    product_sku: String,
    product_name: String,
    size_name: String,
    stock: i64,
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    branch_inventory_id: i64,
    change_qty: i64,
    reference_type: String,
    reference_key: String,
    created_at: i64,
}

#[derive(Clone)]
pub struct QueryService {
    db: PgPool,
}

impl QueryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Sales
    // ------------------------------------------------------------------------

    pub async fn list_sales(
        &self,
        user: &AuthUser,
        query: TradeListQuery,
    ) -> AppResult<WebResponse<Vec<Sale>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let (start, end) = range_of(query.start_at, query.end_at)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM sales
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR created_at >= $2)
              AND ($3::BIGINT IS NULL OR created_at <= $3)
            "#,
        )
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {} FROM sales
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR created_at >= $2)
              AND ($3::BIGINT IS NULL OR created_at <= $3)
            ORDER BY created_at DESC, code DESC
            LIMIT $4 OFFSET $5
            "#,
            SALE_COLUMNS
        ))
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let sales = rows
            .into_iter()
            .map(SaleRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(sales, &page, total))
    }

    pub async fn get_sale(&self, user: &AuthUser, code: &str) -> AppResult<SaleView> {
        let sale = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE code = $1",
            SALE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sale {} not found", code)))?
        .into_model()?;
        user.ensure_branch(sale.branch_id)?;

        let details = sqlx::query_as::<_, SaleDetailViewRow>(
            r#"
            SELECT d.sale_code, d.size_id, d.qty, d.sell_price, d.is_cancelled, d.cancelled_at,
                   p.name AS product_name, s.name AS size_name
            FROM sale_details d
            JOIN sizes s ON s.id = d.size_id
            JOIN products p ON p.sku = s.product_sku
            WHERE d.sale_code = $1
            ORDER BY d.size_id
            "#,
        )
        .bind(code)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| SaleDetailView {
            detail: SaleDetail::from(row.detail),
            product_name: row.product_name,
            size_name: row.size_name,
        })
        .collect();

        let payments = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            SELECT id, sale_code AS code, payment_method, amount, note, created_at
            FROM sale_payments
            WHERE sale_code = $1
            ORDER BY id
            "#,
        )
        .bind(code)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(TradePaymentRow::into_sale_payment)
        .collect::<AppResult<Vec<_>>>()?;

        let debt = self.debt_by_reference(DebtReferenceType::Sale, code).await?;
        Ok(SaleView {
            sale,
            details,
            payments,
            debt,
        })
    }

    // ------------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------------

    pub async fn list_purchases(
        &self,
        user: &AuthUser,
        query: TradeListQuery,
    ) -> AppResult<WebResponse<Vec<Purchase>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let (start, end) = range_of(query.start_at, query.end_at)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM purchases
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR created_at >= $2)
              AND ($3::BIGINT IS NULL OR created_at <= $3)
            "#,
        )
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            SELECT {} FROM purchases
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR created_at >= $2)
              AND ($3::BIGINT IS NULL OR created_at <= $3)
            ORDER BY created_at DESC, code DESC
            LIMIT $4 OFFSET $5
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let purchases = rows
            .into_iter()
            .map(PurchaseRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(purchases, &page, total))
    }

    pub async fn get_purchase(&self, user: &AuthUser, code: &str) -> AppResult<PurchaseView> {
        let purchase = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE code = $1",
            PURCHASE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("purchase {} not found", code)))?
        .into_model()?;
        user.ensure_branch(purchase.branch_id)?;

        let distributor_name =
            sqlx::query_scalar::<_, String>("SELECT name FROM distributors WHERE id = $1")
                .bind(purchase.distributor_id)
                .fetch_optional(&self.db)
                .await?
                .unwrap_or_default();

        let details = sqlx::query_as::<_, PurchaseDetailViewRow>(
            r#"
            SELECT d.purchase_code, d.size_id, d.qty, d.buy_price, d.is_cancelled, d.cancelled_at,
                   p.name AS product_name, s.name AS size_name
            FROM purchase_details d
            JOIN sizes s ON s.id = d.size_id
            JOIN products p ON p.sku = s.product_sku
            WHERE d.purchase_code = $1
            ORDER BY d.size_id
            "#,
        )
        .bind(code)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| PurchaseDetailView {
            detail: PurchaseDetail::from(row.detail),
            product_name: row.product_name,
            size_name: row.size_name,
        })
        .collect();

        let payments = sqlx::query_as::<_, TradePaymentRow>(
            r#"
            SELECT id, purchase_code AS code, payment_method, amount, note, created_at
            FROM purchase_payments
            WHERE purchase_code = $1
            ORDER BY id
            "#,
        )
        .bind(code)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(TradePaymentRow::into_purchase_payment)
        .collect::<AppResult<Vec<_>>>()?;

        let debt = self
            .debt_by_reference(DebtReferenceType::Purchase, code)
            .await?;
        Ok(PurchaseView {
            purchase,
            distributor_name,
            details,
            payments,
            debt,
        })
    }

    // ------------------------------------------------------------------------
    // Debts
    // ------------------------------------------------------------------------

    pub async fn list_debts(
        &self,
        user: &AuthUser,
        query: DebtListQuery,
    ) -> AppResult<WebResponse<Vec<Debt>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let status = filter_of(query.status.as_deref(), DebtStatus::as_str)?;
        let reference_type =
            filter_of(query.reference_type.as_deref(), DebtReferenceType::as_str)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM debts
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR reference_type = $3)
            "#,
        )
        .bind(branch_id)
        .bind(status)
        .bind(reference_type)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, DebtRow>(&format!(
            r#"
            SELECT {} FROM debts
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR reference_type = $3)
            ORDER BY due_date ASC, id ASC
            LIMIT $4 OFFSET $5
            "#,
            DEBT_COLUMNS
        ))
        .bind(branch_id)
        .bind(status)
        .bind(reference_type)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let debts = rows
            .into_iter()
            .map(DebtRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(debts, &page, total))
    }

    /// A debt with its payment history and the lines of the sale or purchase behind it.
    pub async fn get_debt(&self, user: &AuthUser, id: i64) -> AppResult<DebtDetail> {
        let debt = sqlx::query_as::<_, DebtRow>(&format!(
            "SELECT {} FROM debts WHERE id = $1",
            DEBT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("debt {} not found", id)))?
        .into_model()?;
        user.ensure_branch(debt.branch_id)?;

        let payments = sqlx::query_as::<_, DebtPaymentRow>(
            r#"
            SELECT id, debt_id, amount, payment_date, note, created_at
            FROM debt_payments
            WHERE debt_id = $1
            ORDER BY payment_date, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(DebtPayment::from)
        .collect();

        let items_sql = match debt.reference_type {
            DebtReferenceType::Sale => {
                r#"
                SELECT d.size_id, p.name AS product_name, s.name AS size_name, d.qty,
                       d.sell_price AS price, d.is_cancelled
                FROM sale_details d
                JOIN sizes s ON s.id = d.size_id
                JOIN products p ON p.sku = s.product_sku
                WHERE d.sale_code = $1
                ORDER BY d.size_id
                "#
            }
            DebtReferenceType::Purchase => {
                r#"
                SELECT d.size_id, p.name AS product_name, s.name AS size_name, d.qty,
                       d.buy_price AS price, d.is_cancelled
                FROM purchase_details d
                JOIN sizes s ON s.id = d.size_id
                JOIN products p ON p.sku = s.product_sku
                WHERE d.purchase_code = $1
                ORDER BY d.size_id
                "#
            }
        };
        let items = sqlx::query_as::<_, DebtLineRow>(items_sql)
            .bind(&debt.reference_code)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(|row| DebtLineItem {
                size_id: row.size_id,
                product_name: row.product_name,
                size_name: row.size_name,
                qty: row.qty,
                price: row.price.into(),
                is_cancelled: row.is_cancelled,
            })
            .collect();

        Ok(DebtDetail {
            debt,
            payments,
            items,
        })
    }

    async fn debt_by_reference(
        &self,
        reference_type: DebtReferenceType,
        code: &str,
    ) -> AppResult<Option<Debt>> {
        sqlx::query_as::<_, DebtRow>(&format!(
            "SELECT {} FROM debts WHERE reference_type = $1 AND reference_code = $2",
            DEBT_COLUMNS
        ))
        .bind(reference_type.as_str())
        .bind(code)
        .fetch_optional(&self.db)
        .await?
        .map(DebtRow::into_model)
        .transpose()
    }

    // ------------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------------

    pub async fn list_inventories(
        &self,
        user: &AuthUser,
        query: BranchListQuery,
    ) -> AppResult<WebResponse<Vec<InventoryView>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM branch_inventory WHERE ($1::BIGINT IS NULL OR branch_id = $1)",
        )
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, InventoryViewRow>(
            r#"
            SELECT bi.id, bi.branch_id, bi.size_id, s.product_sku, p.name AS product_name,
                   s.name AS size_name, bi.stock
            FROM branch_inventory bi
            JOIN sizes s ON s.id = bi.size_id
            JOIN products p ON p.sku = s.product_sku
            WHERE ($1::BIGINT IS NULL OR bi.branch_id = $1)
            ORDER BY bi.branch_id, p.name, s.name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(branch_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let inventories = rows
            .into_iter()
            .map(|row| InventoryView {
                id: row.id,
                branch_id: row.branch_id,
                size_id: row.size_id,
                product_sku: row.product_sku,
                product_name: row.product_name,
                size_name: row.size_name,
                stock: row.stock,
            })
            .collect();
        Ok(paged(inventories, &page, total))
    }

    /// Movement journal of one inventory row, newest first.
    pub async fn inventory_movements(
        &self,
        user: &AuthUser,
        inventory_id: i64,
        page: PageRequest,
    ) -> AppResult<WebResponse<Vec<InventoryMovement>>> {
        let branch_id =
            sqlx::query_scalar::<_, i64>("SELECT branch_id FROM branch_inventory WHERE id = $1")
                .bind(inventory_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("branch inventory {} not found", inventory_id))
                })?;
        user.ensure_branch(branch_id)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_movement WHERE branch_inventory_id = $1",
        )
        .bind(inventory_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, branch_inventory_id, change_qty, reference_type, reference_key, created_at
            FROM inventory_movement
            WHERE branch_inventory_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(inventory_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let movements = rows
            .into_iter()
            .map(|row| {
                Ok(InventoryMovement {
                    id: row.id,
                    branch_inventory_id: row.branch_inventory_id,
                    change_qty: row.change_qty,
                    reference_type: parse_column(&row.reference_type)?,
                    reference_key: row.reference_key,
                    created_at: row.created_at,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(movements, &page, total))
    }

    // ------------------------------------------------------------------------
    // Cash book
    // ------------------------------------------------------------------------

    pub async fn list_cash_transactions(
        &self,
        user: &AuthUser,
        query: CashListQuery,
    ) -> AppResult<WebResponse<Vec<CashBankTransaction>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let (start, end) = range_of(query.start_at, query.end_at)?;
        let source = filter_of(query.source.as_deref(), CashSource::as_str)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM cash_bank_transactions
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR transaction_date >= $2)
              AND ($3::BIGINT IS NULL OR transaction_date <= $3)
              AND ($4::TEXT IS NULL OR source = $4)
            "#,
        )
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .bind(source)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, CashRow>(&format!(
            r#"
            SELECT {} FROM cash_bank_transactions
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
              AND ($2::BIGINT IS NULL OR transaction_date >= $2)
              AND ($3::BIGINT IS NULL OR transaction_date <= $3)
              AND ($4::TEXT IS NULL OR source = $4)
            ORDER BY transaction_date DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
            CASH_COLUMNS
        ))
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .bind(source)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let transactions = rows
            .into_iter()
            .map(CashRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(transactions, &page, total))
    }

    /// Σ IN − Σ OUT over one branch's cash book.
    pub async fn cash_balance(
        &self,
        user: &AuthUser,
        branch_id: Option<i64>,
    ) -> AppResult<CashBalance> {
        let branch_id = user.scope_branch(branch_id)?;
        let (total_in, total_out) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE type = 'IN'), 0),
                   COALESCE(SUM(amount) FILTER (WHERE type = 'OUT'), 0)
            FROM cash_bank_transactions
            WHERE branch_id = $1
            "#,
        )
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        Ok(CashBalance::new(branch_id, total_in.into(), total_out.into()))
    }

    // ------------------------------------------------------------------------
    // Stock opname
    // ------------------------------------------------------------------------

    pub async fn list_stock_opnames(
        &self,
        user: &AuthUser,
        query: BranchListQuery,
    ) -> AppResult<WebResponse<Vec<StockOpname>>> {
        let branch_id = user.list_scope(query.branch_id)?;
        let page = page_of(query.page, query.size);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_opname WHERE ($1::BIGINT IS NULL OR branch_id = $1)",
        )
        .bind(branch_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, OpnameRow>(&format!(
            r#"
            SELECT {} FROM stock_opname
            WHERE ($1::BIGINT IS NULL OR branch_id = $1)
            ORDER BY date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            OPNAME_COLUMNS
        ))
        .bind(branch_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let opnames = rows
            .into_iter()
            .map(OpnameRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(paged(opnames, &page, total))
    }

    pub async fn get_stock_opname(&self, user: &AuthUser, id: i64) -> AppResult<StockOpnameView> {
        let opname = sqlx::query_as::<_, OpnameRow>(&format!(
            "SELECT {} FROM stock_opname WHERE id = $1",
            OPNAME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("stock opname {} not found", id)))?
        .into_model()?;
        user.ensure_branch(opname.branch_id)?;

        let details = sqlx::query_as::<_, OpnameDetailViewRow>(
            r#"
            SELECT d.id, d.stock_opname_id, d.branch_inventory_id, d.system_qty, d.physical_qty,
                   d.difference, d.notes, bi.size_id, p.name AS product_name, s.name AS size_name
            FROM stock_opname_detail d
            JOIN branch_inventory bi ON bi.id = d.branch_inventory_id
            JOIN sizes s ON s.id = bi.size_id
            JOIN products p ON p.sku = s.product_sku
            WHERE d.stock_opname_id = $1
            ORDER BY d.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|row| StockOpnameDetailView {
            detail: StockOpnameDetail::from(row.detail),
            size_id: row.size_id,
            product_name: row.product_name,
            size_name: row.size_name,
        })
        .collect();

        Ok(StockOpnameView { opname, details })
    }
}

//! Cash book handlers

use axum::{
    extract::{Query, State},
    Json,
};
use shared::{CashBalance, CashBankTransaction, WebResponse};

use super::BranchParam;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::CashListQuery;
use crate::services::QueryService;
use crate::AppState;

pub async fn list_cash_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CashListQuery>,
) -> AppResult<Json<WebResponse<Vec<CashBankTransaction>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_cash_transactions(&user, query).await?))
}

pub async fn cash_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(param): Query<BranchParam>,
) -> AppResult<Json<WebResponse<CashBalance>>> {
    let service = QueryService::new(state.db.clone());
    let balance = service.cash_balance(&user, param.branch_id).await?;
    Ok(Json(WebResponse::new(balance)))
}

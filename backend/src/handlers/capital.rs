//! Capital and expense handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Capital, CapitalRequest, Expense, ExpenseRequest, WebResponse};

use super::BranchParam;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{CapitalService, ExpenseService};
use crate::AppState;

pub async fn create_capital(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(param): Query<BranchParam>,
    Json(body): Json<CapitalRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<Capital>>)> {
    let service = CapitalService::new(state.store.clone());
    let capital = service.create(&user, param.branch_id, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(capital))))
}

pub async fn update_capital(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<CapitalRequest>,
) -> AppResult<Json<WebResponse<Capital>>> {
    let service = CapitalService::new(state.store.clone());
    let capital = service.update(&user, id, body).await?;
    Ok(Json(WebResponse::new(capital)))
}

pub async fn delete_capital(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    CapitalService::new(state.store.clone())
        .delete(&user, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(param): Query<BranchParam>,
    Json(body): Json<ExpenseRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<Expense>>)> {
    let service = ExpenseService::new(state.store.clone());
    let expense = service.create(&user, param.branch_id, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(expense))))
}

pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseRequest>,
) -> AppResult<Json<WebResponse<Expense>>> {
    let service = ExpenseService::new(state.store.clone());
    let expense = service.update(&user, id, body).await?;
    Ok(Json(WebResponse::new(expense)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ExpenseService::new(state.store.clone())
        .delete(&user, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

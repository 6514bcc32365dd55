//! Debt and debt payment handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{CreateDebtPaymentRequest, Debt, DebtDetail, DebtPayment, WebResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::DebtListQuery;
use crate::services::{DebtService, QueryService};
use crate::AppState;

pub async fn list_debts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DebtListQuery>,
) -> AppResult<Json<WebResponse<Vec<Debt>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_debts(&user, query).await?))
}

pub async fn get_debt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(debt_id): Path<i64>,
) -> AppResult<Json<WebResponse<DebtDetail>>> {
    let service = QueryService::new(state.db.clone());
    let debt = service.get_debt(&user, debt_id).await?;
    Ok(Json(WebResponse::new(debt)))
}

pub async fn create_debt_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(debt_id): Path<i64>,
    Json(body): Json<CreateDebtPaymentRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<DebtPayment>>)> {
    let service = DebtService::new(state.store.clone());
    let payment = service.create_payment(&user, debt_id, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(payment))))
}

pub async fn delete_debt_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(payment_id): Path<i64>,
) -> AppResult<Json<WebResponse<Debt>>> {
    let service = DebtService::new(state.store.clone());
    let debt = service.delete_payment(&user, payment_id).await?;
    Ok(Json(WebResponse::new(debt)))
}

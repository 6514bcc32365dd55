//! Purchase handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{CreatePurchaseRequest, Purchase, PurchaseResult, PurchaseView, WebResponse};

use super::BranchParam;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::TradeListQuery;
use crate::services::{PurchaseService, QueryService};
use crate::AppState;

pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(param): Query<BranchParam>,
    Json(body): Json<CreatePurchaseRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<PurchaseResult>>)> {
    let service = PurchaseService::new(state.store.clone(), state.codes.clone());
    let result = service.create(&user, param.branch_id, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(result))))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TradeListQuery>,
) -> AppResult<Json<WebResponse<Vec<Purchase>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_purchases(&user, query).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<WebResponse<PurchaseView>>> {
    let service = QueryService::new(state.db.clone());
    let purchase = service.get_purchase(&user, &code).await?;
    Ok(Json(WebResponse::new(purchase)))
}

pub async fn cancel_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<WebResponse<PurchaseResult>>> {
    let service = PurchaseService::new(state.store.clone(), state.codes.clone());
    let result = service.cancel(&user, &code).await?;
    Ok(Json(WebResponse::new(result)))
}

pub async fn cancel_purchase_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((code, size_id)): Path<(String, i64)>,
) -> AppResult<Json<WebResponse<PurchaseResult>>> {
    let service = PurchaseService::new(state.store.clone(), state.codes.clone());
    let result = service.cancel_detail(&user, &code, size_id).await?;
    Ok(Json(WebResponse::new(result)))
}

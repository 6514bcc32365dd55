//! Stock opname handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{
    ApproveStockOpnameRequest, CreateStockOpnameRequest, StockOpname, StockOpnameResult,
    StockOpnameView, WebResponse,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::BranchListQuery;
use crate::services::{QueryService, StockOpnameService};
use crate::AppState;

pub async fn create_stock_opname(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateStockOpnameRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<StockOpnameResult>>)> {
    let service = StockOpnameService::new(state.store.clone());
    let result = service.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(result))))
}

/// Approve a draft; an empty body approves the counts as drafted.
pub async fn approve_stock_opname(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    body: Option<Json<ApproveStockOpnameRequest>>,
) -> AppResult<Json<WebResponse<StockOpnameResult>>> {
    let Json(request) = body.unwrap_or_default();
    let service = StockOpnameService::new(state.store.clone());
    let result = service.approve(&user, id, request).await?;
    Ok(Json(WebResponse::new(result)))
}

pub async fn delete_stock_opname(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = StockOpnameService::new(state.store.clone());
    service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_stock_opnames(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BranchListQuery>,
) -> AppResult<Json<WebResponse<Vec<StockOpname>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_stock_opnames(&user, query).await?))
}

pub async fn get_stock_opname(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<WebResponse<StockOpnameView>>> {
    let service = QueryService::new(state.db.clone());
    let opname = service.get_stock_opname(&user, id).await?;
    Ok(Json(WebResponse::new(opname)))
}

//! Sale handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{CreateSaleRequest, Sale, SaleResult, SaleView, WebResponse};

use super::BranchParam;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::TradeListQuery;
use crate::services::{QueryService, SaleService};
use crate::AppState;

pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(param): Query<BranchParam>,
    Json(body): Json<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<WebResponse<SaleResult>>)> {
    let service = SaleService::new(state.store.clone(), state.codes.clone());
    let result = service.create(&user, param.branch_id, body).await?;
    Ok((StatusCode::CREATED, Json(WebResponse::new(result))))
}

pub async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TradeListQuery>,
) -> AppResult<Json<WebResponse<Vec<Sale>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_sales(&user, query).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<WebResponse<SaleView>>> {
    let service = QueryService::new(state.db.clone());
    let sale = service.get_sale(&user, &code).await?;
    Ok(Json(WebResponse::new(sale)))
}

pub async fn cancel_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(code): Path<String>,
) -> AppResult<Json<WebResponse<SaleResult>>> {
    let service = SaleService::new(state.store.clone(), state.codes.clone());
    let result = service.cancel(&user, &code).await?;
    Ok(Json(WebResponse::new(result)))
}

/// Cancel one line; the path id is the line's size id.
pub async fn cancel_sale_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((code, size_id)): Path<(String, i64)>,
) -> AppResult<Json<WebResponse<SaleResult>>> {
    let service = SaleService::new(state.store.clone(), state.codes.clone());
    let result = service.cancel_detail(&user, &code, size_id).await?;
    Ok(Json(WebResponse::new(result)))
}

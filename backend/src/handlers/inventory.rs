//! Branch inventory handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{InventoryMovement, InventoryView, PageRequest, WebResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::query::BranchListQuery;
use crate::services::QueryService;
use crate::AppState;

pub async fn list_inventories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BranchListQuery>,
) -> AppResult<Json<WebResponse<Vec<InventoryView>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(service.list_inventories(&user, query).await?))
}

pub async fn list_inventory_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(inventory_id): Path<i64>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<WebResponse<Vec<InventoryMovement>>>> {
    let service = QueryService::new(state.db.clone());
    Ok(Json(
        service
            .inventory_movements(&user, inventory_id, page)
            .await?,
    ))
}

//! Authentication handlers

use axum::{extract::State, Json};
use shared::WebResponse;

use crate::error::AppResult;
use crate::services::auth::{LoginRequest, LoginResponse};
use crate::services::AuthService;
use crate::AppState;

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<WebResponse<LoginResponse>>> {
    let service = AuthService::new(state.db.clone(), &state.config);
    let response = service.login(body).await?;
    Ok(Json(WebResponse::new(response)))
}

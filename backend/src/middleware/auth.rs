//! Authentication middleware
//!
//! Decodes the bearer token into an [`AuthUser`] and applies branch scoping rules.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::ActorRole;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated actor extracted from the JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
    pub role: ActorRole,
    pub branch_id: Option<i64>,
}

impl AuthUser {
    /// Branch a write acts on: owners may choose one, everyone else uses their own.
    pub fn scope_branch(&self, requested: Option<i64>) -> AppResult<i64> {
        if self.role.spans_branches() {
            return requested.or(self.branch_id).ok_or_else(|| {
                AppError::BadRequest("branch_id is required".to_string())
            });
        }
        self.own_branch()
    }

    /// Branch filter for reads; `None` lets an owner see every branch.
    pub fn list_scope(&self, requested: Option<i64>) -> AppResult<Option<i64>> {
        if self.role.spans_branches() {
            return Ok(requested);
        }
        self.own_branch().map(Some)
    }

    /// Refuse access to another branch's records unless the actor is an owner.
    pub fn ensure_branch(&self, branch_id: i64) -> AppResult<()> {
        if self.role.spans_branches() || self.branch_id == Some(branch_id) {
            return Ok(());
        }
        tracing::warn!(
            username = %self.username,
            branch_id,
            "cross-branch access denied"
        );
        Err(AppError::Forbidden(
            "access to another branch is not allowed".to_string(),
        ))
    }

    fn own_branch(&self) -> AppResult<i64> {
        self.branch_id.ok_or_else(|| {
            AppError::Forbidden("user is not assigned to a branch".to_string())
        })
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("missing or invalid Authorization header".to_string())
                .into_response()
        }
    };

    let user = match decode_token(&token, &state.config.jwt.secret) {
        Ok(claims) => claims.into_auth_user(),
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extractor for authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))
    }
}

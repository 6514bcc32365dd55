//! Authentication service: password login and access token handling

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::pg::parse_column;
use shared::ActorRole;

#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: ActorRole,
    pub branch_id: Option<i64>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn into_auth_user(self) -> AuthUser {
        AuthUser {
            username: self.sub,
            role: self.role,
            branch_id: self.branch_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub username: String,
    pub name: String,
    pub role: ActorRole,
    pub branch_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: LoginUser,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    username: String,
    name: String,
    password: String,
    role: String,
    branch_id: Option<i64>,
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            token_expiry: config.jwt.expiry,
        }
    }

    /// Authenticate with username and password.
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.username, u.name, u.password, r.name AS role, u.branch_id
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(&request.username)
        .fetch_optional(&self.db)
        .await?;

        let Some(user) = user else {
            tracing::warn!(username = %request.username, "login refused: unknown user");
            return Err(invalid_credentials());
        };

        let valid = verify(&request.password, &user.password)
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;
        if !valid {
            tracing::warn!(username = %user.username, "login refused: wrong password");
            return Err(invalid_credentials());
        }

        let role: ActorRole = parse_column(&user.role)?;
        let access_token = issue_token(
            &user.username,
            role,
            user.branch_id,
            &self.jwt_secret,
            self.token_expiry,
        )?;

        tracing::info!(username = %user.username, role = %role, "user logged in");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_expiry,
            user: LoginUser {
                username: user.username,
                name: user.name,
                role,
                branch_id: user.branch_id,
            },
        })
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid username or password".to_string())
}

/// Sign an HS256 access token valid for `expiry` seconds.
pub fn issue_token(
    username: &str,
    role: ActorRole,
    branch_id: Option<i64>,
    secret: &str,
    expiry: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        role,
        branch_id,
        exp: (now + Duration::seconds(expiry)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token generation failed: {}", e)))
}

/// Validate an access token and return its claims.
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))
}

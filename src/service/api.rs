use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use quickboard_common::Board;
use quickboard_common::protocol::{
    AuthRequest, BOARD_PATH, ErrorResponse, LOGIN_PATH, LoginResponse, REGISTER_PATH,
    SuccessResponse,
};

use super::auth::{self, TokenSigner};
use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use crate::errors::ServiceError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub signer: TokenSigner,
    pub password_iterations: u32,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    /// No credential presented.
    Unauthorized,
    /// Credential presented but invalid or expired.
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Missing token".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MissingFields
            | ServiceError::UserExists
            | ServiceError::InvalidCredentials => ApiError::BadRequest(err.to_string()),
            ServiceError::Token(_) => ApiError::Forbidden(err.to_string()),
            ServiceError::Database(_) | ServiceError::LockPoisoned => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "request failed");
    ServiceError::Database(err).into()
}

// ── Authenticated identity ────────────────────────────────────────────

/// The caller's identity, taken from `Authorization: Bearer <token>`.
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_whitespace().nth(1))
            .ok_or(ApiError::Unauthorized)?;
        let claims = state.signer.verify(token)?;
        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route(REGISTER_PATH, post(register))
        .route(LOGIN_PATH, post(login))
        .route(BOARD_PATH, get(load_board).post(save_board))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn register(
    State(state): State<SharedState>,
    Json(req): Json<AuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ServiceError::MissingFields.into());
    }
    let iterations = state.password_iterations;
    let AuthRequest { username, password } = req;
    // Existence check and insert share one lock acquisition.
    let created = state
        .db
        .call(move |db| {
            if db.find_user(&username)?.is_some() {
                return Ok(None);
            }
            let hashed = auth::hash_password(&password, iterations);
            db.create_user(&username, &hashed).map(Some)
        })
        .await
        .map_err(internal)?;
    match created {
        Some(user) => {
            tracing::info!(username = %user.username, "registered user");
            Ok(Json(SuccessResponse { success: true }))
        }
        None => Err(ServiceError::UserExists.into()),
    }
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<AuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let record = state
        .db
        .call(move |db| db.find_user(&username))
        .await
        .map_err(internal)?;
    let Some(record) = record else {
        return Err(ServiceError::InvalidCredentials.into());
    };
    // PBKDF2 runs on the blocking pool.
    let password = req.password;
    let stored = record.password.clone();
    let valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("Password check panicked: {}", e)))?;
    if !valid {
        return Err(ServiceError::InvalidCredentials.into());
    }
    let token = state.signer.issue(&record.user.id, &record.user.username)?;
    Ok(Json(LoginResponse {
        token,
        username: record.user.username,
    }))
}

async fn load_board(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id;
    let board = state
        .db
        .call(move |db| db.load_or_seed_board(&user_id))
        .await
        .map_err(internal)?;
    Ok(Json(board))
}

async fn save_board(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(board): Json<Board>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id;
    state
        .db
        .call(move |db| db.save_board(&user_id, &board))
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save: {}", e)))?;
    tracing::debug!(username = %user.username, "board saved");
    Ok(Json(SuccessResponse { success: true }))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) fn test_state() -> SharedState {
    Arc::new(AppState {
        db: DbHandle::new(BoardDb::new_in_memory().unwrap()),
        signer: TokenSigner::new("test-secret", 24),
        password_iterations: 1_000,
    })
}

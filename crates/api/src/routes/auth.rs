//! Registration and session routes.
//!
//! Sessions are opaque bearer tokens; the plaintext token appears once in
//! the register/login response and only its hash is stored.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally_db::repositories::user::CreateUserInput;
use tally_db::{SessionRepository, UserRepository};
use tally_shared::types::{CurrencyCode, UserId};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Creates the auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Unique email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Reference currency all balances are normalized into.
    pub reference_currency: CurrencyCode,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Registered email address.
    pub email: String,
}

/// Response carrying a freshly issued session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The user the session belongs to.
    pub user_id: UserId,
    /// Bearer token for subsequent requests. Shown only here.
    pub token: String,
    /// Token expiry.
    pub expires_at: chrono::DateTime<chrono::FixedOffset>,
}

/// POST `/auth/register` - Create a user and issue a session.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let users = UserRepository::new(state.conn());
    let user = users
        .create(CreateUserInput {
            email: request.email,
            display_name: request.display_name,
            reference_currency: request.reference_currency,
        })
        .await?;

    let sessions = SessionRepository::new(state.conn());
    let issued = sessions
        .create(
            UserId::from_uuid(user.id),
            state.ledger.session_ttl_hours,
        )
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id: UserId::from_uuid(user.id),
            token: issued.token,
            expires_at: issued.session.expires_at,
        }),
    ))
}

/// POST `/auth/login` - Issue a session for an existing user.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let users = UserRepository::new(state.conn());
    let Some(user) = users.find_by_email(&request.email).await? else {
        // Same shape as an unknown user ID; don't reveal which emails exist.
        return Err(tally_core::ledger::LedgerError::UserNotFound(Uuid::nil()).into());
    };

    let sessions = SessionRepository::new(state.conn());
    let issued = sessions
        .create(
            UserId::from_uuid(user.id),
            state.ledger.session_ttl_hours,
        )
        .await?;

    Ok(Json(SessionResponse {
        user_id: UserId::from_uuid(user.id),
        token: issued.token,
        expires_at: issued.session.expires_at,
    }))
}

/// POST `/auth/logout` - Revoke the presented session token.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")));

    if let Some(token) = token {
        let sessions = SessionRepository::new(state.conn());
        sessions.revoke(token).await?;
    }
    Ok(Json(json!({ "status": "logged_out" })))
}

//! services/api/src/web/auth.rs
//!
//! Authentication endpoints. Credential checking is the hosted identity
//! provider's job; these handlers translate its verdicts into session
//! cookies and user-facing error text. An auth failure only reports the
//! formatted message and has no side effects on the account.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::sessions::SESSION_TTL_DAYS;
use crate::web::middleware::session_id_from_cookie;
use crate::web::state::AppState;
use samvaad_core::directory;
use samvaad_core::error_text::user_message;
use samvaad_core::ports::{AuthUser, PortError};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub id: String,
    pub email: String,
    pub username: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_cookie(session_id: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        chrono::Duration::days(SESSION_TTL_DAYS).num_seconds()
    )
}

const CLEARED_COOKIE: &str = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

/// Turns a port failure into a status and the user-facing message. The
/// identity provider's identifiers go through the error formatter; all
/// other failures collapse to the generic text.
fn auth_failure(e: PortError, rejected: StatusCode) -> (StatusCode, String) {
    match e {
        PortError::Auth(code) => (rejected, user_message(&code).to_string()),
        other => {
            error!("Auth flow failed: {other:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                user_message("auth/internal-error").to_string(),
            )
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new account with the identity provider and
/// write its first-login documents.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Rejected by the identity provider"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Create the account with the identity provider
    let user = state
        .identity
        .sign_up(&req.email, &req.password)
        .await
        .map_err(|e| auth_failure(e, StatusCode::BAD_REQUEST))?;

    // 2. Write the first-login documents
    let profile = directory::setup_user(state.store.as_ref(), &user)
        .await
        .map_err(|e| auth_failure(e, StatusCode::INTERNAL_SERVER_ERROR))?;

    // 3. Issue the session cookie
    let session_id = state.sessions.create(user).await;
    let response = AuthResponse {
        id: profile.id,
        email: profile.email,
        username: profile.username,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Json(response),
    ))
}

/// POST /auth/login - Sign in with an existing account.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| auth_failure(e, StatusCode::UNAUTHORIZED))?;

    // Profiles can lag behind the identity provider (federated first
    // login), so the read is get-or-create.
    let profile = directory::get_user_data(state.store.as_ref(), &user)
        .await
        .map_err(|e| auth_failure(e, StatusCode::INTERNAL_SERVER_ERROR))?;

    let session_id = state.sessions.create(user).await;
    let response = AuthResponse {
        id: profile.id,
        email: profile.email,
        username: profile.username,
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&session_id))],
        Json(response),
    ))
}

/// POST /auth/reset - Ask the identity provider to send a password reset.
#[utoipa::path(
    post,
    path = "/auth/reset",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Reset email sent"),
        (status = 400, description = "Rejected by the identity provider")
    )
)]
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .identity
        .send_password_reset(&req.email)
        .await
        .map_err(|e| auth_failure(e, StatusCode::BAD_REQUEST))?;
    Ok(StatusCode::OK)
}

/// POST /auth/logout - Logout and invalidate the session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_id = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookie)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state.sessions.remove(session_id).await;

    Ok((StatusCode::OK, [(header::SET_COOKIE, CLEARED_COOKIE.to_string())]))
}

/// DELETE /auth/account - Delete the authenticated account with the
/// identity provider and drop its sessions. The profile and chat documents
/// are left in place, so counterparts keep seeing the stored profile; the
/// deleted-user placeholder only appears if the profile document itself
/// goes away.
#[utoipa::path(
    delete,
    path = "/auth/account",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .identity
        .delete_account(&user.uid)
        .await
        .map_err(|e| auth_failure(e, StatusCode::INTERNAL_SERVER_ERROR))?;
    state.sessions.remove_user(&user.uid).await;

    Ok((StatusCode::OK, [(header::SET_COOKIE, CLEARED_COOKIE.to_string())]))
}

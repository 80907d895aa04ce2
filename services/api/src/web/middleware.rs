//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::web::state::AppState;

/// Extracts the session id from a `Cookie` header value.
pub fn session_id_from_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix("session=")
    })
}

/// Middleware that validates the auth session cookie and resolves the
/// authenticated account.
///
/// If valid, inserts the `AuthUser` into request extensions for handlers
/// to use. If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract cookie header
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Parse session ID from cookie
    let session_id =
        session_id_from_cookie(cookie_header).ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Resolve the session to an authenticated account
    let user = state
        .sessions
        .validate(session_id)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 4. Insert the account into request extensions
    req.extensions_mut().insert(user);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::session_id_from_cookie;

    #[test]
    fn parses_the_session_cookie_among_others() {
        let header = "theme=dark; session=abc-123; lang=en";
        assert_eq!(session_id_from_cookie(header), Some("abc-123"));
        assert_eq!(session_id_from_cookie("theme=dark"), None);
    }
}

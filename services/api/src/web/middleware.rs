//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use library_core::LibraryError;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Extracts the login session id from the `Cookie` header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and resolves the actor.
///
/// If valid, inserts the `Actor` into request extensions for handlers to use.
/// If invalid or missing, responds with `unauthenticated`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Parse session ID from cookie
    let auth_session_id =
        session_id_from_headers(req.headers()).ok_or(LibraryError::Unauthenticated)?;

    // 2. Validate auth session, get user_id
    let user_id = state
        .db
        .validate_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            debug!("Rejected auth session: {}", e);
            LibraryError::Unauthenticated
        })?;

    // 3. Resolve the user behind the session
    let actor = state.users.resolve_actor(user_id).await.map_err(|e| match e {
        LibraryError::NotFound(_) => {
            warn!(%user_id, "Auth session refers to a missing user");
            LibraryError::Unauthenticated
        }
        other => other,
    })?;

    // 4. Insert the actor into request extensions and continue to the handler
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

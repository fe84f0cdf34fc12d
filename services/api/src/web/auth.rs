//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: local signup and login, the development login
//! bypass, logout, and the current-user lookup.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use library_core::{validation, Actor, LibraryError, PortError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, ErrorBody};
use crate::web::extract::AppJson;
use crate::web::middleware::{session_id_from_headers, SESSION_COOKIE};
use crate::web::protocol::AuthResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DevLoginRequest {
    pub email: String,
}

//=========================================================================================
// Session Helpers
//=========================================================================================

fn session_cookie(value: &str, max_age_secs: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        value,
        if secure { " Secure;" } else { "" },
        max_age_secs
    )
}

/// Creates a login session for the user and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await?;

    Ok(session_cookie(
        &auth_session_id,
        ttl.num_seconds(),
        state.config.cookie_secure,
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new member account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_password(&req.password)?;

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();

    // 2. Create the user; self-registration is always MEMBER
    let user = state
        .users
        .register(&req.email, req.name, Some(password_hash))
        .await?;

    // 3. Start a login session
    let cookie = start_session(&state, user.id).await?;

    let actor = Actor::from(&user);
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(&actor)),
    ))
}

/// POST /auth/login - Login with an existing local account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = validation::normalize_email(&req.email)?;

    // 1. Get credentials by email
    let user_creds = state
        .db
        .get_credentials_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::from(LibraryError::Unauthenticated),
            other => ApiError::from(other),
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Stored password hash is malformed".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(LibraryError::Unauthenticated.into());
    }

    // 3. Resolve the actor and start a session
    let actor = state.users.resolve_actor(user_creds.user_id).await?;
    let cookie = start_session(&state, actor.id).await?;
    info!(user_id = %actor.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(&actor)),
    ))
}

/// POST /auth/dev-login - Passwordless login for development setups
#[utoipa::path(
    post,
    path = "/auth/dev-login",
    request_body = DevLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 404, description = "Disabled, or no such user", body = ErrorBody)
    )
)]
pub async fn dev_login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DevLoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.config.dev_login_enabled {
        return Err(LibraryError::NotFound("Not found".to_string()).into());
    }

    let user = state.users.find_by_email(&req.email).await?;
    let actor = Actor::from(&user);
    let cookie = start_session(&state, actor.id).await?;
    info!(user_id = %actor.id, "Development login");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(&actor)),
    ))
}

/// POST /auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logout successful")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    if let Some(auth_session_id) = session_id_from_headers(&headers) {
        state.db.delete_auth_session(auth_session_id).await?;
    }

    let cookie = session_cookie("", 0, state.config.cookie_secure);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The authenticated caller
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn me_handler(Extension(actor): Extension<Actor>) -> Json<AuthResponse> {
    Json(AuthResponse::from(&actor))
}

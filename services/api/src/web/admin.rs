//! services/api/src/web/admin.rs
//!
//! User administration. Restricted to admins by the core policy.

use axum::{
    extract::State,
    Extension, Json,
};
use library_core::{Actor, Role};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::extract::{AppJson, AppPath};
use crate::web::protocol::{RoleRequest, UserListResponse, UserResponse};
use crate::web::state::AppState;

/// GET /admin/users - List every user
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<UserListResponse>> {
    let users = state.users.list(&actor).await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// PATCH /admin/users/{id}/role - Change a user's role
#[utoipa::path(
    patch,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 400, description = "Unknown role", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    )
)]
pub async fn set_user_role_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(user_id): AppPath<Uuid>,
    AppJson(req): AppJson<RoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let role: Role = req.role.parse()?;
    let user = state.users.set_role(&actor, user_id, role).await?;
    Ok(Json(user.into()))
}

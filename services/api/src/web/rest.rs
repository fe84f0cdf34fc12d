//! services/api/src/web/rest.rs
//!
//! The liveness endpoint and the master definition for the OpenAPI
//! specification.

use axum::Json;
use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::web::{admin, ai, auth, books, protocol::*};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::dev_login_handler,
        auth::logout_handler,
        auth::me_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::create_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        books::book_loans_handler,
        books::checkout_handler,
        books::checkin_handler,
        books::archive_handler,
        books::unarchive_handler,
        books::my_loans_handler,
        admin::list_users_handler,
        admin::set_user_role_handler,
        ai::book_metadata_handler,
        ai::assistant_handler,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::DevLoginRequest,
            AuthResponse,
            BookRequest,
            BookResponse,
            BookListResponse,
            CheckoutRequest,
            LoanResponse,
            LoanListResponse,
            RoleRequest,
            UserResponse,
            UserListResponse,
            MetadataRequestBody,
            MetadataResponse,
            AssistantRequest,
            AssistantResponse,
        )
    ),
    tags(
        (name = "Library API", description = "Catalog, lending and user administration for a small library.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub mod admin;
pub mod ai;
pub mod auth;
pub mod books;
pub mod extract;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use state::AppState;

/// Builds the application router. CORS and the Swagger UI are layered on by
/// the binary.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/dev-login", post(auth::dev_login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{id}",
            get(books::get_book_handler)
                .put(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        .route("/books/{id}/loans", get(books::book_loans_handler))
        .route("/books/{id}/checkout", post(books::checkout_handler))
        .route("/books/{id}/checkin", post(books::checkin_handler))
        .route("/books/{id}/archive", post(books::archive_handler))
        .route("/books/{id}/unarchive", post(books::unarchive_handler))
        .route("/me/loans", get(books::my_loans_handler))
        .route("/admin/users", get(admin::list_users_handler))
        .route("/admin/users/{id}/role", patch(admin::set_user_role_handler))
        .route("/ai/book-metadata", post(ai::book_metadata_handler))
        .route("/ai/assistant", post(ai::assistant_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

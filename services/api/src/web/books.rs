//! services/api/src/web/books.rs
//!
//! Catalog and lending endpoints. Every handler runs behind `require_auth`
//! and hands the resolved `Actor` to the core services, which make the
//! authorization decision.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use library_core::{Actor, BookFilter, BookStatus, LibraryError};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, ErrorBody};
use crate::web::extract::{AppJson, AppPath, AppQuery};
use crate::web::protocol::{
    BookListResponse, BookQuery, BookRequest, BookResponse, CheckoutRequest, LoanListResponse,
    LoanResponse,
};
use crate::web::state::AppState;

/// GET /books - Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books, newest first", body = BookListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppQuery(query): AppQuery<BookQuery>,
) -> ApiResult<Json<BookListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<BookStatus>)
        .transpose()?;

    let books = state
        .catalog
        .list(&actor, BookFilter { text: query.q, status })
        .await?;

    Ok(Json(BookListResponse {
        books: books.into_iter().map(BookResponse::from).collect(),
    }))
}

/// GET /books/{id} - Fetch one book
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<Json<BookResponse>> {
    let book = state.catalog.get(&actor, book_id).await?;
    Ok(Json(book.into()))
}

/// POST /books - Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    request_body = BookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid book fields", body = ErrorBody),
        (status = 403, description = "Caller may not manage the catalog", body = ErrorBody)
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<BookRequest>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PUT /books/{id} - Replace the editable fields of a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Invalid book fields", body = ErrorBody),
        (status = 403, description = "Caller may not manage the catalog", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
    AppJson(req): AppJson<BookRequest>,
) -> ApiResult<Json<BookResponse>> {
    let book = state.catalog.update(&actor, book_id, req.into()).await?;
    Ok(Json(book.into()))
}

/// DELETE /books/{id} - Remove a book that has never been lent
#[utoipa::path(
    delete,
    path = "/books/{id}",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "Caller may not manage the catalog", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
        (status = 409, description = "Book has loan history", body = ErrorBody)
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.catalog.delete(&actor, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /books/{id}/loans - Loan history of a book, newest first
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Loan history", body = LoanListResponse),
        (status = 404, description = "No such book", body = ErrorBody)
    )
)]
pub async fn book_loans_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<Json<LoanListResponse>> {
    let loans = state.catalog.history(&actor, book_id).await?;
    Ok(Json(LoanListResponse {
        loans: loans.into_iter().map(LoanResponse::from).collect(),
    }))
}

/// POST /books/{id}/checkout - Borrow a book
///
/// The body is optional; staff and admins may name another borrower.
#[utoipa::path(
    post,
    path = "/books/{id}/checkout",
    params(("id" = Uuid, Path, description = "Book id")),
    request_body(content = CheckoutRequest, description = "Optional borrower override"),
    responses(
        (status = 201, description = "Loan opened", body = LoanResponse),
        (status = 403, description = "Caller may not borrow for someone else", body = ErrorBody),
        (status = 404, description = "No such book or borrower", body = ErrorBody),
        (status = 409, description = "Book is not available", body = ErrorBody)
    )
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice::<CheckoutRequest>(&body)
            .map_err(|e| LibraryError::InvalidInput(format!("Invalid checkout body: {}", e)))?
    };

    let loan = state
        .lending
        .checkout(&actor, book_id, req.borrower_id)
        .await?;
    Ok((StatusCode::CREATED, Json(LoanResponse::from(loan))))
}

/// POST /books/{id}/checkin - Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/checkin",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Loan closed", body = LoanResponse),
        (status = 403, description = "Caller may not return someone else's loan", body = ErrorBody),
        (status = 404, description = "No such book", body = ErrorBody),
        (status = 409, description = "Book is not currently borrowed", body = ErrorBody)
    )
)]
pub async fn checkin_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<Json<LoanResponse>> {
    let loan = state.lending.checkin(&actor, book_id).await?;
    Ok(Json(loan.into()))
}

/// POST /books/{id}/archive - Hide a book from the default catalog
#[utoipa::path(
    post,
    path = "/books/{id}/archive",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book archived", body = BookResponse),
        (status = 403, description = "Only admins may archive", body = ErrorBody),
        (status = 409, description = "Book is not available", body = ErrorBody)
    )
)]
pub async fn archive_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<Json<BookResponse>> {
    let book = state.catalog.archive(&actor, book_id).await?;
    Ok(Json(book.into()))
}

/// POST /books/{id}/unarchive - Return an archived book to circulation
#[utoipa::path(
    post,
    path = "/books/{id}/unarchive",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book available again", body = BookResponse),
        (status = 403, description = "Only admins may unarchive", body = ErrorBody),
        (status = 409, description = "Book is currently borrowed", body = ErrorBody)
    )
)]
pub async fn unarchive_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppPath(book_id): AppPath<Uuid>,
) -> ApiResult<Json<BookResponse>> {
    let book = state.catalog.unarchive(&actor, book_id).await?;
    Ok(Json(book.into()))
}

/// GET /me/loans - The caller's own loans, newest first
#[utoipa::path(
    get,
    path = "/me/loans",
    responses(
        (status = 200, description = "Loans of the caller", body = LoanListResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn my_loans_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<LoanListResponse>> {
    let loans = state.lending.loans_for_actor(&actor).await?;
    Ok(Json(LoanListResponse {
        loans: loans.into_iter().map(LoanResponse::from).collect(),
    }))
}

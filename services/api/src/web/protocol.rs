//! services/api/src/web/protocol.rs
//!
//! Defines the JSON message structures exchanged with HTTP clients, and the
//! conversions from the core domain types.

use chrono::{DateTime, Utc};
use library_core::{Actor, AssistantReply, Book, BookInput, Loan, MetadataSuggestion, User};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

/// Search parameters for the catalog listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive text matched against title, author, isbn, publisher, description and tags.
    pub q: Option<String>,
    /// One of `AVAILABLE`, `BORROWED`, `ARCHIVED`. Archived books are hidden when omitted.
    pub status: Option<String>,
}

/// The editable fields of a book, used for both create and update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<BookRequest> for BookInput {
    fn from(req: BookRequest) -> Self {
        BookInput {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            publisher: req.publisher,
            published_year: req.published_year,
            language: req.language,
            description: req.description,
            tags: req.tags,
        }
    }
}

/// Optional body of a checkout. Omit `borrower_id` to borrow for yourself.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub borrower_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleRequest {
    /// `ADMIN`, `STAFF` (or `LIBRARIAN`) or `MEMBER`, case-insensitive.
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MetadataRequestBody {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssistantRequest {
    /// A free-text question, e.g. "anything by Tolkien?".
    pub message: String,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publisher: book.publisher,
            published_year: book.published_year,
            language: book.language,
            description: book.description,
            tags: book.tags,
            status: book.status.as_str().to_string(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub borrower_id: Uuid,
    pub checked_out_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub is_open: bool,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            is_open: loan.is_open(),
            id: loan.id,
            book_id: loan.book_id,
            borrower_id: loan.borrower_id,
            checked_out_at: loan.checked_out_at,
            due_at: loan.due_at,
            checked_in_at: loan.checked_in_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoanListResponse {
    pub loans: Vec<LoanResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

/// The authenticated caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

impl From<&Actor> for AuthResponse {
    fn from(actor: &Actor) -> Self {
        Self {
            user_id: actor.id,
            email: actor.email.clone(),
            name: actor.name.clone(),
            role: actor.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetadataResponse {
    /// `openai` or `fallback`.
    pub source: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
}

impl From<MetadataSuggestion> for MetadataResponse {
    fn from(s: MetadataSuggestion) -> Self {
        Self {
            source: s.source.as_str().to_string(),
            description: s.description,
            tags: s.tags,
            language: s.language,
            publisher: s.publisher,
            published_year: s.published_year,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssistantResponse {
    /// `openai` or `fallback`.
    pub source: String,
    pub reply: String,
    /// The catalog entries the reply was based on, newest first.
    pub books: Vec<BookResponse>,
}

impl From<AssistantReply> for AssistantResponse {
    fn from(r: AssistantReply) -> Self {
        Self {
            source: r.source.as_str().to_string(),
            reply: r.reply,
            books: r.books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

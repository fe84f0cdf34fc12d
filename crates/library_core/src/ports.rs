//! crates/library_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the library's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to run unchanged over an in-memory store, a relational database, or a remote
//! metadata service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Book, BookFilter, BookInput, BookStatus, Loan, MetadataRequest, MetadataSuggestion, NewUser,
    Role, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A conditional write found the record in an unexpected state.
    #[error("{0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage for users, login sessions, books and loans.
///
/// `open_loan`, `close_loan`, `transition_book_status` and `delete_book` are
/// atomic: the status read, the check and the write happen as one unit with no
/// other transition for the same book interleaving.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    /// Creates the user if missing and sets the role either way.
    async fn upsert_user_with_role(
        &self,
        email: &str,
        name: Option<&str>,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<User>;

    /// Fails with `NotFound` for unknown emails and for users without a local password.
    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Newest first.
    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user, or `Unauthorized` if unknown or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Book Management ---
    /// Newest-updated first. A filter without a status excludes archived books.
    async fn list_books(&self, filter: &BookFilter) -> PortResult<Vec<Book>>;

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    /// Stores a new `AVAILABLE` book.
    async fn insert_book(&self, input: &BookInput, now: DateTime<Utc>) -> PortResult<Book>;

    /// Replaces the descriptive fields and bumps `updated_at`. Never touches status.
    async fn update_book(
        &self,
        book_id: Uuid,
        input: &BookInput,
        now: DateTime<Utc>,
    ) -> PortResult<Book>;

    /// Hard delete. Fails with `Conflict` while any loan references the book.
    async fn delete_book(&self, book_id: Uuid) -> PortResult<()>;

    /// Compare-and-swap on status: `Conflict` unless the book is currently `from`.
    async fn transition_book_status(
        &self,
        book_id: Uuid,
        from: BookStatus,
        to: BookStatus,
        now: DateTime<Utc>,
    ) -> PortResult<Book>;

    // --- Loan Management ---
    /// Flips the book `AVAILABLE -> BORROWED` and records the new open loan.
    async fn open_loan(
        &self,
        book_id: Uuid,
        borrower_id: Uuid,
        checked_out_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    ) -> PortResult<Loan>;

    /// Closes exactly `loan_id` and flips the book `BORROWED -> AVAILABLE`.
    async fn close_loan(
        &self,
        book_id: Uuid,
        loan_id: Uuid,
        checked_in_at: DateTime<Utc>,
    ) -> PortResult<Loan>;

    /// The most recently opened loan for the book that has not been checked in.
    async fn find_open_loan(&self, book_id: Uuid) -> PortResult<Option<Loan>>;

    /// Newest first.
    async fn loans_for_book(&self, book_id: Uuid) -> PortResult<Vec<Loan>>;

    /// Newest first.
    async fn loans_for_borrower(&self, borrower_id: Uuid) -> PortResult<Vec<Loan>>;
}

#[async_trait]
pub trait MetadataEnrichmentService: Send + Sync {
    /// Suggests descriptive metadata for a book. Advisory only.
    async fn suggest_metadata(&self, request: &MetadataRequest) -> PortResult<MetadataSuggestion>;
}

#[async_trait]
pub trait CatalogChatService: Send + Sync {
    /// Answers a reader's question using the given catalog entries as context.
    async fn answer(&self, question: &str, books: &[Book]) -> PortResult<String>;
}

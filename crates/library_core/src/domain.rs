//! crates/library_core/src/domain.rs
//!
//! Defines the pure, core data structures for the library.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LibraryError;

//=========================================================================================
// Roles and Actors
//=========================================================================================

/// The closed set of access tiers. External labels are mapped onto it at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    /// Also known as "librarian".
    Staff,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Member => "MEMBER",
        }
    }

    /// `ADMIN` and `STAFF` form the management tier.
    pub fn is_management(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" | "librarian" => Ok(Role::Staff),
            "member" => Ok(Role::Member),
            other => Err(LibraryError::invalid(format!("unknown role '{}'", other))),
        }
    }
}

/// An already-authenticated caller. The core trusts it and never authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Data required to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub hashed_password: String,
}

//=========================================================================================
// Books
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookStatus {
    Available,
    Borrowed,
    /// Soft-deleted; hidden from default listings.
    Archived,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "AVAILABLE",
            BookStatus::Borrowed => "BORROWED",
            BookStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(BookStatus::Available),
            "borrowed" | "checked_out" => Ok(BookStatus::Borrowed),
            "archived" => Ok(BookStatus::Archived),
            other => Err(LibraryError::invalid(format!("unknown book status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The descriptive fields of a book, as supplied on create and update.
/// Status is deliberately absent: it only changes through lifecycle operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Listing filter. `status: None` means every status except `ARCHIVED`.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub text: Option<String>,
    pub status: Option<BookStatus>,
}

impl Book {
    /// Case-insensitive substring match across the searchable fields.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let contains = |field: &str| field.to_lowercase().contains(&needle);
        contains(&self.title)
            || contains(&self.author)
            || self.isbn.as_deref().is_some_and(contains)
            || self.publisher.as_deref().is_some_and(contains)
            || self.description.as_deref().is_some_and(contains)
            || self.tags.iter().any(|tag| contains(tag.as_str()))
    }

    pub fn matches(&self, filter: &BookFilter) -> bool {
        let status_ok = match filter.status {
            Some(status) => self.status == status,
            None => self.status != BookStatus::Archived,
        };
        status_ok && filter.text.as_deref().map_or(true, |t| self.matches_text(t))
    }
}

//=========================================================================================
// Loans
//=========================================================================================

/// One borrowing of one book. Append-only: closed exactly once, never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub book_id: Uuid,
    pub borrower_id: Uuid,
    pub checked_out_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.checked_in_at.is_none()
    }
}

//=========================================================================================
// Metadata enrichment
//=========================================================================================

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    OpenAi,
    Fallback,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionSource::OpenAi => "openai",
            SuggestionSource::Fallback => "fallback",
        }
    }
}

/// Advisory metadata for a book form. Never written to the store directly.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSuggestion {
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub source: SuggestionSource,
}

/// A catalog assistant answer and the books it was grounded on.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub reply: String,
    pub books: Vec<Book>,
    pub source: SuggestionSource,
}

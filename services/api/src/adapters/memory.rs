//! services/api/src/adapters/memory.rs
//!
//! A process-local implementation of the `LibraryStore` port. All state lives
//! behind one async mutex, which is held for the whole of every read-check-write
//! transition, so lifecycle operations are atomic exactly as in the database
//! adapter. Used for local runs (`STORAGE=memory`) and in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use library_core::domain::{
    Book, BookFilter, BookInput, BookStatus, Loan, NewUser, Role, User, UserCredentials,
};
use library_core::ports::{LibraryStore, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

struct StoredUser {
    user: User,
    password_hash: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    books: HashMap<Uuid, Book>,
    // Append-only, in creation order.
    loans: Vec<Loan>,
}

impl Inner {
    fn user_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.values().find(|u| u.user.email == email)
    }

    fn book_mut(&mut self, book_id: Uuid) -> PortResult<&mut Book> {
        self.books
            .get_mut(&book_id)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    fn expect_status(book: &Book, expected: BookStatus) -> PortResult<()> {
        if book.status == expected {
            Ok(())
        } else {
            Err(PortError::Conflict(format!(
                "Book {} is {}, expected {}",
                book.id, book.status, expected
            )))
        }
    }
}

fn newest_first(mut loans: Vec<Loan>) -> Vec<Loan> {
    loans.sort_by(|a, b| b.checked_out_at.cmp(&a.checked_out_at));
    loans
}

/// An in-memory adapter that implements the `LibraryStore` port.
#[derive(Default)]
pub struct MemoryAdapter {
    inner: Mutex<Inner>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.user_by_email(&user.email).is_some() {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(
            created.id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn upsert_user_with_role(
        &self,
        email: &str,
        name: Option<&str>,
        role: Role,
    ) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        let existing = inner.user_by_email(email).map(|u| u.user.id);
        if let Some(stored) = existing.and_then(|id| inner.users.get_mut(&id)) {
            stored.user.role = role;
            if let Some(name) = name {
                stored.user.name = Some(name.to_string());
            }
            return Ok(stored.user.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            role,
            created_at: Utc::now(),
        };
        inner.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: None,
            },
        );
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let inner = self.inner.lock().await;
        inner
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let inner = self.inner.lock().await;
        inner
            .user_by_email(email)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.lock().await;
        let stored = inner
            .user_by_email(email)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        let hashed_password = stored.password_hash.clone().ok_or_else(|| {
            PortError::NotFound(format!("User {} has no local password", email))
        })?;
        Ok(UserCredentials {
            user_id: stored.user.id,
            hashed_password,
        })
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().await;
        let mut users: Vec<User> = inner.users.values().map(|u| u.user.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        stored.user.role = role;
        Ok(stored.user.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        inner
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let inner = self.inner.lock().await;
        match inner.sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.lock().await.sessions.remove(session_id);
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> PortResult<Vec<Book>> {
        let inner = self.inner.lock().await;
        let mut books: Vec<Book> = inner
            .books
            .values()
            .filter(|b| b.matches(filter))
            .cloned()
            .collect();
        books.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(books)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        let inner = self.inner.lock().await;
        inner
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn insert_book(&self, input: &BookInput, now: DateTime<Utc>) -> PortResult<Book> {
        let book = Book {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            author: input.author.clone(),
            isbn: input.isbn.clone(),
            publisher: input.publisher.clone(),
            published_year: input.published_year,
            language: input.language.clone(),
            description: input.description.clone(),
            tags: input.tags.clone(),
            status: BookStatus::Available,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        book_id: Uuid,
        input: &BookInput,
        now: DateTime<Utc>,
    ) -> PortResult<Book> {
        let mut inner = self.inner.lock().await;
        let book = inner.book_mut(book_id)?;
        book.title = input.title.clone();
        book.author = input.author.clone();
        book.isbn = input.isbn.clone();
        book.publisher = input.publisher.clone();
        book.published_year = input.published_year;
        book.language = input.language.clone();
        book.description = input.description.clone();
        book.tags = input.tags.clone();
        book.updated_at = now;
        Ok(book.clone())
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.books.contains_key(&book_id) {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        if inner.loans.iter().any(|l| l.book_id == book_id) {
            return Err(PortError::Conflict(format!(
                "Book {} has loan history and cannot be deleted; archive it instead",
                book_id
            )));
        }
        inner.books.remove(&book_id);
        Ok(())
    }

    async fn transition_book_status(
        &self,
        book_id: Uuid,
        from: BookStatus,
        to: BookStatus,
        now: DateTime<Utc>,
    ) -> PortResult<Book> {
        let mut inner = self.inner.lock().await;
        let book = inner.book_mut(book_id)?;
        Inner::expect_status(book, from)?;
        book.status = to;
        book.updated_at = now;
        Ok(book.clone())
    }

    async fn open_loan(
        &self,
        book_id: Uuid,
        borrower_id: Uuid,
        checked_out_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    ) -> PortResult<Loan> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&borrower_id) {
            return Err(PortError::NotFound(format!("Borrower {} not found", borrower_id)));
        }
        let book = inner.book_mut(book_id)?;
        Inner::expect_status(book, BookStatus::Available)?;
        book.status = BookStatus::Borrowed;
        book.updated_at = checked_out_at;

        let loan = Loan {
            id: Uuid::new_v4(),
            book_id,
            borrower_id,
            checked_out_at,
            due_at,
            checked_in_at: None,
        };
        inner.loans.push(loan.clone());
        Ok(loan)
    }

    async fn close_loan(
        &self,
        book_id: Uuid,
        loan_id: Uuid,
        checked_in_at: DateTime<Utc>,
    ) -> PortResult<Loan> {
        let mut inner = self.inner.lock().await;
        Inner::expect_status(inner.book_mut(book_id)?, BookStatus::Borrowed)?;

        let loan = inner
            .loans
            .iter_mut()
            .find(|l| l.id == loan_id && l.book_id == book_id && l.is_open())
            .ok_or_else(|| PortError::Conflict(format!("Loan {} is not open", loan_id)))?;
        loan.checked_in_at = Some(checked_in_at);
        let closed = loan.clone();

        let book = inner.book_mut(book_id)?;
        book.status = BookStatus::Available;
        book.updated_at = checked_in_at;
        Ok(closed)
    }

    async fn find_open_loan(&self, book_id: Uuid) -> PortResult<Option<Loan>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .loans
            .iter()
            .filter(|l| l.book_id == book_id && l.is_open())
            .max_by_key(|l| l.checked_out_at)
            .cloned())
    }

    async fn loans_for_book(&self, book_id: Uuid) -> PortResult<Vec<Loan>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(
            inner.loans.iter().filter(|l| l.book_id == book_id).cloned().collect(),
        ))
    }

    async fn loans_for_borrower(&self, borrower_id: Uuid) -> PortResult<Vec<Loan>> {
        let inner = self.inner.lock().await;
        Ok(newest_first(
            inner
                .loans
                .iter()
                .filter(|l| l.borrower_id == borrower_id)
                .cloned()
                .collect(),
        ))
    }
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `LibraryStore` port from the `library_core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Lifecycle transitions run inside a transaction and use conditional updates
//! (`... WHERE status = 'AVAILABLE'`) whose affected-row count decides the
//! winner when two requests race for the same book.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use library_core::domain::{
    Book, BookFilter, BookInput, BookStatus, Loan, NewUser, Role, User, UserCredentials,
};
use library_core::ports::{LibraryStore, PortError, PortResult};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, name, role, created_at";
const BOOK_COLUMNS: &str = "id, title, author, isbn, publisher, published_year, language, \
                            description, tags, status, created_at, updated_at";
const LOAN_COLUMNS: &str = "id, book_id, borrower_id, checked_out_at, due_at, checked_in_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `LibraryStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Escapes `ILIKE` wildcards and wraps the needle for a substring match.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Explains why a conditional status update touched no rows.
async fn status_mismatch<'e, E>(executor: E, book_id: Uuid, expected: BookStatus) -> PortError
where
    E: PgExecutor<'e>,
{
    let current = sqlx::query_scalar::<_, String>("SELECT status FROM books WHERE id = $1")
        .bind(book_id)
        .fetch_optional(executor)
        .await;
    match current {
        Ok(Some(status)) => PortError::Conflict(format!(
            "Book {} is {}, expected {}",
            book_id,
            status,
            expected.as_str()
        )),
        Ok(None) => PortError::NotFound(format!("Book {} not found", book_id)),
        Err(e) => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    password_hash: Option<String>,
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    isbn: Option<String>,
    publisher: Option<String>,
    published_year: Option<i32>,
    language: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        let status = self
            .status
            .parse::<BookStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Book {
            id: self.id,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publisher: self.publisher,
            published_year: self.published_year,
            language: self.language,
            description: self.description,
            tags: self.tags,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LoanRecord {
    id: Uuid,
    book_id: Uuid,
    borrower_id: Uuid,
    checked_out_at: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
    checked_in_at: Option<DateTime<Utc>>,
}
impl LoanRecord {
    fn to_domain(self) -> Loan {
        Loan {
            id: self.id,
            book_id: self.book_id,
            borrower_id: self.borrower_id,
            checked_out_at: self.checked_out_at,
            due_at: self.due_at,
            checked_in_at: self.checked_in_at,
        }
    }
}

fn users_to_domain(records: Vec<UserRecord>) -> PortResult<Vec<User>> {
    records.into_iter().map(UserRecord::to_domain).collect()
}

fn books_to_domain(records: Vec<BookRecord>) -> PortResult<Vec<Book>> {
    records.into_iter().map(BookRecord::to_domain).collect()
}

//=========================================================================================
// `LibraryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LibraryStore for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, name, role, password_hash) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("Email {} is already registered", user.email))
                }
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn upsert_user_with_role(
        &self,
        email: &str,
        name: Option<&str>,
        role: Role,
    ) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO UPDATE \
             SET role = EXCLUDED.role, name = COALESCE(EXCLUDED.name, users.name) \
             RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(name)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
            .to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?
            .to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        let hashed_password = record.password_hash.ok_or_else(|| {
            PortError::NotFound(format!("User {} has no local password", email))
        })?;
        Ok(UserCredentials {
            user_id: record.id,
            hashed_password,
        })
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        users_to_domain(records)
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?
            .to_domain()
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> PortResult<Vec<Book>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             WHERE (($1::text IS NULL AND status <> 'ARCHIVED') OR status = $1) \
               AND ($2::text IS NULL \
                    OR title ILIKE $2 OR author ILIKE $2 OR isbn ILIKE $2 \
                    OR publisher ILIKE $2 OR description ILIKE $2 \
                    OR array_to_string(tags, ' ') ILIKE $2) \
             ORDER BY updated_at DESC"
        );
        let records = sqlx::query_as::<_, BookRecord>(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.text.as_deref().map(like_pattern))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        books_to_domain(records)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
            .to_domain()
    }

    async fn insert_book(&self, input: &BookInput, now: DateTime<Utc>) -> PortResult<Book> {
        let sql = format!(
            "INSERT INTO books (id, title, author, isbn, publisher, published_year, language, \
             description, tags, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'AVAILABLE', $10, $10) \
             RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&input.title)
            .bind(&input.author)
            .bind(&input.isbn)
            .bind(&input.publisher)
            .bind(input.published_year)
            .bind(&input.language)
            .bind(&input.description)
            .bind(&input.tags)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn update_book(
        &self,
        book_id: Uuid,
        input: &BookInput,
        now: DateTime<Utc>,
    ) -> PortResult<Book> {
        let sql = format!(
            "UPDATE books SET title = $2, author = $3, isbn = $4, publisher = $5, \
             published_year = $6, language = $7, description = $8, tags = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book_id)
            .bind(&input.title)
            .bind(&input.author)
            .bind(&input.isbn)
            .bind(&input.publisher)
            .bind(input.published_year)
            .bind(&input.language)
            .bind(&input.description)
            .bind(&input.tags)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
            .to_domain()
    }

    async fn delete_book(&self, book_id: Uuid) -> PortResult<()> {
        let has_history = || {
            PortError::Conflict(format!(
                "Book {} has loan history and cannot be deleted; archive it instead",
                book_id
            ))
        };
        let result = sqlx::query(
            "DELETE FROM books WHERE id = $1 \
             AND NOT EXISTS (SELECT 1 FROM loans WHERE book_id = $1)",
        )
        .bind(book_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => has_history(),
            _ => unexpected(e),
        })?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
                .bind(book_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
            return Err(if exists {
                has_history()
            } else {
                PortError::NotFound(format!("Book {} not found", book_id))
            });
        }
        Ok(())
    }

    async fn transition_book_status(
        &self,
        book_id: Uuid,
        from: BookStatus,
        to: BookStatus,
        now: DateTime<Utc>,
    ) -> PortResult<Book> {
        let sql = format!(
            "UPDATE books SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 \
             RETURNING {BOOK_COLUMNS}"
        );
        let record = sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        match record {
            Some(record) => record.to_domain(),
            None => Err(status_mismatch(&self.pool, book_id, from).await),
        }
    }

    async fn open_loan(
        &self,
        book_id: Uuid,
        borrower_id: Uuid,
        checked_out_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    ) -> PortResult<Loan> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Row lock on the book; a concurrent checkout blocks here and then sees BORROWED.
        let flipped = sqlx::query(
            "UPDATE books SET status = 'BORROWED', updated_at = $2 \
             WHERE id = $1 AND status = 'AVAILABLE'",
        )
        .bind(book_id)
        .bind(checked_out_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if flipped.rows_affected() == 0 {
            return Err(status_mismatch(&mut *tx, book_id, BookStatus::Available).await);
        }

        let sql = format!(
            "INSERT INTO loans (id, book_id, borrower_id, checked_out_at, due_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {LOAN_COLUMNS}"
        );
        let record = sqlx::query_as::<_, LoanRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(book_id)
            .bind(borrower_id)
            .bind(checked_out_at)
            .bind(due_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("Book {} already has an open loan", book_id))
                }
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    PortError::NotFound(format!("Borrower {} not found", borrower_id))
                }
                _ => unexpected(e),
            })?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn close_loan(
        &self,
        book_id: Uuid,
        loan_id: Uuid,
        checked_in_at: DateTime<Utc>,
    ) -> PortResult<Loan> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE loans SET checked_in_at = $3 \
             WHERE id = $2 AND book_id = $1 AND checked_in_at IS NULL \
             RETURNING {LOAN_COLUMNS}"
        );
        let record = sqlx::query_as::<_, LoanRecord>(&sql)
            .bind(book_id)
            .bind(loan_id)
            .bind(checked_in_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::Conflict(format!("Loan {} is not open", loan_id)))?;

        let flipped = sqlx::query(
            "UPDATE books SET status = 'AVAILABLE', updated_at = $2 \
             WHERE id = $1 AND status = 'BORROWED'",
        )
        .bind(book_id)
        .bind(checked_in_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if flipped.rows_affected() == 0 {
            // Dropping the transaction rolls back the loan update.
            return Err(status_mismatch(&mut *tx, book_id, BookStatus::Borrowed).await);
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_open_loan(&self, book_id: Uuid) -> PortResult<Option<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE book_id = $1 AND checked_in_at IS NULL \
             ORDER BY checked_out_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, LoanRecord>(&sql)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(LoanRecord::to_domain))
    }

    async fn loans_for_book(&self, book_id: Uuid) -> PortResult<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE book_id = $1 ORDER BY checked_out_at DESC"
        );
        let records = sqlx::query_as::<_, LoanRecord>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LoanRecord::to_domain).collect())
    }

    async fn loans_for_borrower(&self, borrower_id: Uuid) -> PortResult<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE borrower_id = $1 ORDER BY checked_out_at DESC"
        );
        let records = sqlx::query_as::<_, LoanRecord>(&sql)
            .bind(borrower_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LoanRecord::to_domain).collect())
    }
}

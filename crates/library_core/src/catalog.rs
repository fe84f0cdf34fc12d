//! crates/library_core/src/catalog.rs
//!
//! The catalog service: role-gated listing, lookup and editing of books, plus
//! the archive/unarchive soft-delete transitions.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Actor, Book, BookFilter, BookInput, BookStatus, Loan};
use crate::error::{LibraryError, LibraryResult};
use crate::policy::{authorize, Operation};
use crate::ports::LibraryStore;
use crate::validation::validate_book;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LibraryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Lists books, newest-updated first. Blank search text is ignored.
    pub async fn list(&self, actor: &Actor, filter: BookFilter) -> LibraryResult<Vec<Book>> {
        authorize(Some(actor), Operation::ViewCatalog)?;
        let filter = BookFilter {
            text: filter
                .text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            status: filter.status,
        };
        Ok(self.store.list_books(&filter).await?)
    }

    pub async fn get(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<Book> {
        authorize(Some(actor), Operation::ViewCatalog)?;
        Ok(self.store.get_book(book_id).await?)
    }

    /// The book's loan history, newest first.
    pub async fn history(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<Vec<Loan>> {
        authorize(Some(actor), Operation::ViewCatalog)?;
        self.store.get_book(book_id).await?;
        Ok(self.store.loans_for_book(book_id).await?)
    }

    pub async fn create(&self, actor: &Actor, input: BookInput) -> LibraryResult<Book> {
        authorize(Some(actor), Operation::ManageCatalog)?;
        let input = validate_book(&input)?;
        let book = self.store.insert_book(&input, Utc::now()).await?;
        info!(book_id = %book.id, actor = %actor.id, "Book created");
        Ok(book)
    }

    pub async fn update(&self, actor: &Actor, book_id: Uuid, input: BookInput) -> LibraryResult<Book> {
        authorize(Some(actor), Operation::ManageCatalog)?;
        let input = validate_book(&input)?;
        let book = self.store.update_book(book_id, &input, Utc::now()).await?;
        info!(book_id = %book.id, actor = %actor.id, "Book updated");
        Ok(book)
    }

    /// Hard delete. Books that have ever been lent keep their history and must be archived instead.
    pub async fn delete(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<()> {
        authorize(Some(actor), Operation::ManageCatalog)?;
        self.store.delete_book(book_id).await?;
        info!(%book_id, actor = %actor.id, "Book deleted");
        Ok(())
    }

    /// `AVAILABLE -> ARCHIVED`. A borrowed book cannot be archived.
    pub async fn archive(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<Book> {
        authorize(Some(actor), Operation::Archive)?;
        let book = self
            .store
            .transition_book_status(book_id, BookStatus::Available, BookStatus::Archived, Utc::now())
            .await
            .map_err(LibraryError::from)
            .map_err(|e| match e {
                LibraryError::Conflict(_) => LibraryError::Conflict(format!(
                    "Book {} can only be archived while it is available",
                    book_id
                )),
                other => other,
            })?;
        info!(%book_id, actor = %actor.id, "Book archived");
        Ok(book)
    }

    /// `ARCHIVED -> AVAILABLE`. Unarchiving an available book is a no-op.
    pub async fn unarchive(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<Book> {
        authorize(Some(actor), Operation::Archive)?;
        let current = self.store.get_book(book_id).await?;
        match current.status {
            BookStatus::Available => Ok(current),
            BookStatus::Borrowed => Err(LibraryError::Conflict(format!(
                "Book {} is borrowed, not archived",
                book_id
            ))),
            BookStatus::Archived => {
                let book = self
                    .store
                    .transition_book_status(
                        book_id,
                        BookStatus::Archived,
                        BookStatus::Available,
                        Utc::now(),
                    )
                    .await?;
                info!(%book_id, actor = %actor.id, "Book unarchived");
                Ok(book)
            }
        }
    }
}

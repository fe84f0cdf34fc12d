//! crates/library_core/src/lending.rs
//!
//! The loan lifecycle manager. Owns the per-book state machine
//!
//! ```text
//!   AVAILABLE --checkout--> BORROWED --checkin--> AVAILABLE
//! ```
//!
//! and the append-only loan history. Authorization is always decided before the
//! transition is attempted; the transition itself is delegated to the store's
//! atomic primitives so concurrent callers cannot both win.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Actor, Loan};
use crate::error::{LibraryError, LibraryResult};
use crate::policy::{authorize, Operation};
use crate::ports::{LibraryStore, PortError};

/// Loan period used when none is configured.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn LibraryStore>,
    loan_period: Option<Duration>,
}

impl LoanService {
    /// `None` records loans without a due date.
    pub fn new(store: Arc<dyn LibraryStore>, loan_period: Option<Duration>) -> Self {
        Self { store, loan_period }
    }

    /// Checks a book out to `borrower_id`, or to the actor when `None`.
    ///
    /// Only the management tier may name a borrower other than themselves.
    pub async fn checkout(
        &self,
        actor: &Actor,
        book_id: Uuid,
        borrower_id: Option<Uuid>,
    ) -> LibraryResult<Loan> {
        authorize(Some(actor), Operation::CheckoutSelf)?;
        let borrower_id = borrower_id.unwrap_or(actor.id);
        if borrower_id != actor.id {
            authorize(Some(actor), Operation::CheckoutOnBehalf)?;
        }

        self.store
            .get_user_by_id(borrower_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => {
                    LibraryError::NotFound(format!("Borrower {} not found", borrower_id))
                }
                other => other.into(),
            })?;

        let now = Utc::now();
        let due_at = self.loan_period.map(|period| now + period);
        let loan = self
            .store
            .open_loan(book_id, borrower_id, now, due_at)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => {
                    LibraryError::Conflict(format!("Book {} is not available for checkout", book_id))
                }
                other => other.into(),
            })?;

        info!(
            loan_id = %loan.id,
            %book_id,
            %borrower_id,
            actor = %actor.id,
            "Book checked out"
        );
        Ok(loan)
    }

    /// Closes the book's open loan.
    ///
    /// Members may only check in their own loans; the management tier may check
    /// in anyone's.
    pub async fn checkin(&self, actor: &Actor, book_id: Uuid) -> LibraryResult<Loan> {
        authorize(Some(actor), Operation::CheckinOwn)?;
        self.store.get_book(book_id).await?;

        let open = self
            .store
            .find_open_loan(book_id)
            .await?
            .ok_or_else(|| LibraryError::Conflict(format!("Book {} is not currently borrowed", book_id)))?;

        if open.borrower_id != actor.id {
            authorize(Some(actor), Operation::CheckinOthers)?;
        }

        let loan = self
            .store
            .close_loan(book_id, open.id, Utc::now())
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => LibraryError::Conflict(format!(
                    "Loan {} was already checked in",
                    open.id
                )),
                other => other.into(),
            })?;

        info!(
            loan_id = %loan.id,
            %book_id,
            borrower_id = %loan.borrower_id,
            actor = %actor.id,
            "Book checked in"
        );
        Ok(loan)
    }

    /// The actor's own loans, open and closed, newest first.
    pub async fn loans_for_actor(&self, actor: &Actor) -> LibraryResult<Vec<Loan>> {
        authorize(Some(actor), Operation::CheckoutSelf)?;
        Ok(self.store.loans_for_borrower(actor.id).await?)
    }
}

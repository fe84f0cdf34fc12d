//! Integration tests for the loan lifecycle over the in-memory store.

use std::sync::Arc;

use api_lib::adapters::MemoryAdapter;
use chrono::Duration;
use library_core::{
    lending::DEFAULT_LOAN_DAYS, Actor, BookInput, BookStatus, CatalogService, LibraryError,
    LibraryStore, LoanService, Role, UserService,
};
use uuid::Uuid;

struct Library {
    store: Arc<dyn LibraryStore>,
    catalog: CatalogService,
    lending: LoanService,
    admin: Actor,
    staff: Actor,
    member_a: Actor,
    member_b: Actor,
}

/// In-memory store with one user per role and a second member.
async fn setup() -> Library {
    let store: Arc<dyn LibraryStore> = Arc::new(MemoryAdapter::new());
    let users = UserService::new(store.clone());

    let actor = |email: &'static str, role: Role| {
        let users = users.clone();
        async move {
            let user = users.seed_user(email, None, role).await.unwrap();
            Actor::from(&user)
        }
    };
    let admin = actor("admin@test.local", Role::Admin).await;
    let staff = actor("staff@test.local", Role::Staff).await;
    let member_a = actor("a@test.local", Role::Member).await;
    let member_b = actor("b@test.local", Role::Member).await;

    Library {
        catalog: CatalogService::new(store.clone()),
        lending: LoanService::new(store.clone(), Some(Duration::days(DEFAULT_LOAN_DAYS))),
        store,
        admin,
        staff,
        member_a,
        member_b,
    }
}

fn dune() -> BookInput {
    BookInput {
        title: "Dune".into(),
        author: "Herbert".into(),
        ..BookInput::default()
    }
}

/// Every book is BORROWED exactly when it has an open loan.
async fn assert_status_matches_loans(lib: &Library) {
    let all = [BookStatus::Available, BookStatus::Borrowed, BookStatus::Archived];
    for status in all {
        let filter = library_core::BookFilter {
            text: None,
            status: Some(status),
        };
        for book in lib.store.list_books(&filter).await.unwrap() {
            let open = lib.store.find_open_loan(book.id).await.unwrap();
            let open_count = lib
                .store
                .loans_for_book(book.id)
                .await
                .unwrap()
                .iter()
                .filter(|l| l.is_open())
                .count();
            assert!(open_count <= 1, "book {} has {} open loans", book.id, open_count);
            assert_eq!(
                book.status == BookStatus::Borrowed,
                open.is_some(),
                "book {} is {} but open loan = {:?}",
                book.id,
                book.status,
                open
            );
        }
    }
}

#[tokio::test]
async fn checkout_then_second_checkout_conflicts() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    assert_eq!(book.status, BookStatus::Available);

    let loan = lib
        .lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();
    assert_eq!(loan.borrower_id, lib.member_a.id);
    assert!(loan.is_open());

    let book = lib.catalog.get(&lib.member_a, book.id).await.unwrap();
    assert_eq!(book.status, BookStatus::Borrowed);

    let err = lib
        .lending
        .checkout(&lib.member_b, book.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);

    let history = lib.catalog.history(&lib.admin, book.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_status_matches_loans(&lib).await;
}

#[tokio::test]
async fn member_cannot_check_in_someone_elses_loan() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    let loan = lib
        .lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();

    let err = lib
        .lending
        .checkin(&lib.member_b, book.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Forbidden(_)), "got {:?}", err);
    assert_eq!(
        lib.store.get_book(book.id).await.unwrap().status,
        BookStatus::Borrowed
    );

    let closed = lib.lending.checkin(&lib.member_a, book.id).await.unwrap();
    assert_eq!(closed.id, loan.id);
    assert!(closed.checked_in_at.is_some());
    assert_eq!(
        lib.store.get_book(book.id).await.unwrap().status,
        BookStatus::Available
    );
    assert_status_matches_loans(&lib).await;
}

#[tokio::test]
async fn admin_can_check_in_any_loan() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    lib.lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();

    let closed = lib.lending.checkin(&lib.admin, book.id).await.unwrap();
    assert_eq!(closed.borrower_id, lib.member_a.id);
    assert!(closed.checked_in_at.is_some());
    assert_status_matches_loans(&lib).await;
}

#[tokio::test]
async fn blank_title_is_invalid_input() {
    let lib = setup().await;
    let input = BookInput {
        title: "".into(),
        author: "X".into(),
        ..BookInput::default()
    };
    let err = lib.catalog.create(&lib.staff, input).await.unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput(_)), "got {:?}", err);
}

#[tokio::test]
async fn checkout_of_unknown_book_is_not_found() {
    let lib = setup().await;
    let err = lib
        .lending
        .checkout(&lib.member_a, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn member_cannot_delete_a_book() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();

    let err = lib.catalog.delete(&lib.member_a, book.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::Forbidden(_)), "got {:?}", err);
    assert_eq!(lib.store.get_book(book.id).await.unwrap(), book);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_have_exactly_one_winner() {
    let lib = setup().await;
    let book_id = lib.catalog.create(&lib.staff, dune()).await.unwrap().id;

    let attempts = (0..16).map(|i| {
        let lending = lib.lending.clone();
        let actor = if i % 2 == 0 {
            lib.member_a.clone()
        } else {
            lib.member_b.clone()
        };
        tokio::spawn(async move { lending.checkout(&actor, book_id, None).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut wins = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => wins += 1,
            Err(LibraryError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(wins, 1);

    let history = lib.store.loans_for_book(book_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_status_matches_loans(&lib).await;
}

#[tokio::test]
async fn failed_checkin_is_repeatable_and_changes_nothing() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    lib.lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();
    lib.lending.checkin(&lib.member_a, book.id).await.unwrap();
    let before = lib.store.loans_for_book(book.id).await.unwrap();

    for _ in 0..3 {
        let err = lib
            .lending
            .checkin(&lib.member_a, book.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);
    }

    assert_eq!(lib.store.loans_for_book(book.id).await.unwrap(), before);
    assert_eq!(
        lib.store.get_book(book.id).await.unwrap().status,
        BookStatus::Available
    );
}

#[tokio::test]
async fn loans_are_due_after_the_loan_period() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    let loan = lib
        .lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();
    assert_eq!(loan.due_at, Some(loan.checked_out_at + Duration::days(14)));

    let undated = LoanService::new(lib.store.clone(), None);
    let other = lib
        .catalog
        .create(
            &lib.staff,
            BookInput {
                title: "Emma".into(),
                author: "Austen".into(),
                ..BookInput::default()
            },
        )
        .await
        .unwrap();
    let loan = undated.checkout(&lib.member_a, other.id, None).await.unwrap();
    assert_eq!(loan.due_at, None);
}

#[tokio::test]
async fn only_management_may_check_out_for_someone_else() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();

    let err = lib
        .lending
        .checkout(&lib.member_a, book.id, Some(lib.member_b.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Forbidden(_)), "got {:?}", err);

    let loan = lib
        .lending
        .checkout(&lib.staff, book.id, Some(lib.member_b.id))
        .await
        .unwrap();
    assert_eq!(loan.borrower_id, lib.member_b.id);

    let mine = lib.lending.loans_for_actor(&lib.member_b).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(lib
        .lending
        .loans_for_actor(&lib.member_a)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn checkout_for_unknown_borrower_is_not_found() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    let err = lib
        .lending
        .checkout(&lib.staff, book.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)), "got {:?}", err);
    assert_eq!(
        lib.store.get_book(book.id).await.unwrap().status,
        BookStatus::Available
    );
}

#[tokio::test]
async fn archive_rules() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();

    // Staff manage the catalog but may not archive.
    let err = lib.catalog.archive(&lib.staff, book.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::Forbidden(_)), "got {:?}", err);

    // A borrowed book cannot be archived, nor unarchived.
    lib.lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();
    let err = lib.catalog.archive(&lib.admin, book.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);
    let err = lib.catalog.unarchive(&lib.admin, book.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);
    lib.lending.checkin(&lib.member_a, book.id).await.unwrap();

    let archived = lib.catalog.archive(&lib.admin, book.id).await.unwrap();
    assert_eq!(archived.status, BookStatus::Archived);

    let err = lib
        .lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);

    let restored = lib.catalog.unarchive(&lib.admin, book.id).await.unwrap();
    assert_eq!(restored.status, BookStatus::Available);
    let again = lib.catalog.unarchive(&lib.admin, book.id).await.unwrap();
    assert_eq!(again.status, BookStatus::Available);
    assert_status_matches_loans(&lib).await;
}

#[tokio::test]
async fn delete_is_refused_once_a_book_has_history() {
    let lib = setup().await;
    let lent = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    lib.lending
        .checkout(&lib.member_a, lent.id, None)
        .await
        .unwrap();
    lib.lending.checkin(&lib.member_a, lent.id).await.unwrap();

    let err = lib.catalog.delete(&lib.staff, lent.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::Conflict(_)), "got {:?}", err);
    assert_eq!(lib.store.loans_for_book(lent.id).await.unwrap().len(), 1);

    let fresh = lib
        .catalog
        .create(
            &lib.staff,
            BookInput {
                title: "Emma".into(),
                author: "Austen".into(),
                ..BookInput::default()
            },
        )
        .await
        .unwrap();
    lib.catalog.delete(&lib.staff, fresh.id).await.unwrap();
    let err = lib.catalog.get(&lib.staff, fresh.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn editing_a_borrowed_book_keeps_it_borrowed() {
    let lib = setup().await;
    let book = lib.catalog.create(&lib.staff, dune()).await.unwrap();
    let loan = lib
        .lending
        .checkout(&lib.member_a, book.id, None)
        .await
        .unwrap();
    let borrowed = lib.catalog.get(&lib.staff, book.id).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let edited = lib
        .catalog
        .update(
            &lib.staff,
            book.id,
            BookInput {
                title: "Dune (Deluxe Edition)".into(),
                ..dune()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "Dune (Deluxe Edition)");
    assert_eq!(edited.status, BookStatus::Borrowed);
    assert!(edited.updated_at > borrowed.updated_at);
    assert_eq!(edited.created_at, book.created_at);

    let open = lib.store.find_open_loan(book.id).await.unwrap();
    assert_eq!(open, Some(loan));
    assert_status_matches_loans(&lib).await;
}

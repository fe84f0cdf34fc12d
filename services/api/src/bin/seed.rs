//! services/api/src/bin/seed.rs
//!
//! Populates a PostgreSQL database with demo accounts and, when the catalog
//! is empty, a few demo books. Safe to run repeatedly.
//!
//! The demo accounts have no local password, so `/auth/login` refuses them.
//! Sign in with `POST /auth/dev-login {"email": "admin@demo.local"}` on a
//! server started with `DEV_LOGIN_ENABLED=true`.

use api_lib::{
    adapters::DbAdapter,
    config::{Config, StorageBackend},
    error::ApiError,
    web::state::AppState,
};
use library_core::{Actor, BookFilter, BookInput, LibraryStore, Role};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_USERS: [(&str, &str, Role); 3] = [
    ("admin@demo.local", "Demo Admin", Role::Admin),
    ("staff@demo.local", "Demo Librarian", Role::Staff),
    ("member@demo.local", "Demo Member", Role::Member),
];

fn demo_books() -> Vec<BookInput> {
    let book = |title: &str, author: &str, year: i32, tags: &[&str]| BookInput {
        title: title.to_string(),
        author: author.to_string(),
        published_year: Some(year),
        language: Some("English".to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..BookInput::default()
    };
    vec![
        book("The Hobbit", "J.R.R. Tolkien", 1937, &["fantasy", "classic"]),
        book(
            "Clean Code",
            "Robert C. Martin",
            2008,
            &["software", "engineering", "best-practices"],
        ),
        book("Pride and Prejudice", "Jane Austen", 1813, &["classic", "romance"]),
    ]
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let StorageBackend::Postgres { database_url } = &config.storage else {
        return Err(ApiError::Internal(
            "Seeding requires STORAGE=postgres".to_string(),
        ));
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);
    db_adapter.run_migrations().await?;
    let db: Arc<dyn LibraryStore> = Arc::new(db_adapter);
    let state = AppState::new(db.clone(), config.clone(), None, None);

    // --- Accounts ---
    let mut admin = None;
    for (email, name, role) in DEMO_USERS {
        let user = state.users.seed_user(email, Some(name), role).await?;
        if role == Role::Admin {
            admin = Some(Actor::from(&user));
        }
    }
    let admin = admin.ok_or_else(|| ApiError::Internal("No demo admin was seeded".to_string()))?;

    // --- Books ---
    let existing = db.list_books(&BookFilter::default()).await?;
    if existing.is_empty() {
        for input in demo_books() {
            let book = state.catalog.create(&admin, input).await?;
            info!(book_id = %book.id, title = %book.title, "Seeded book");
        }
    } else {
        info!(count = existing.len(), "Catalog already populated; skipping demo books");
    }

    info!("Seed complete; demo accounts sign in through /auth/dev-login (DEV_LOGIN_ENABLED=true)");
    Ok(())
}

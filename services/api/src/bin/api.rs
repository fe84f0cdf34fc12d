//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, MemoryAdapter, OpenAiAssistantAdapter, OpenAiMetadataAdapter},
    config::{Config, StorageBackend},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use library_core::{CatalogChatService, LibraryStore, MetadataEnrichmentService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Store ---
    let db: Arc<dyn LibraryStore> = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on restart");
            Arc::new(MemoryAdapter::new())
        }
    };

    // --- 3. Initialize the AI Adapters ---
    let openai_client = config
        .openai_api_key
        .as_ref()
        .map(|api_key| Client::with_config(OpenAIConfig::new().with_api_key(api_key)));
    if openai_client.is_none() {
        info!("OPENAI_API_KEY not set; AI endpoints use their fallbacks");
    }
    let enrichment: Option<Arc<dyn MetadataEnrichmentService>> = match &openai_client {
        Some(client) => Some(Arc::new(OpenAiMetadataAdapter::new(
            client.clone(),
            config.openai_model.clone(),
        ))),
        None => None,
    };
    let chat: Option<Arc<dyn CatalogChatService>> = match &openai_client {
        Some(client) => Some(Arc::new(OpenAiAssistantAdapter::new(
            client.clone(),
            config.openai_model.clone(),
        ))),
        None => None,
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(db, config.clone(), enrichment, chat));

    // --- 5. Bootstrap the First Admin ---
    if let Some(email) = &config.bootstrap_admin_email {
        app_state.users.bootstrap_admin(email).await?;
    }

    // --- 6. Create the Web Router ---
    let origin = config.client_url.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CLIENT_URL '{}': {}", config.client_url, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = web::router(app_state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chrono::Duration;
use library_core::{
    CatalogAssistant, CatalogChatService, CatalogService, LibraryStore, LoanService,
    MetadataAdvisor, MetadataEnrichmentService, UserService,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn LibraryStore>,
    pub config: Arc<Config>,
    pub catalog: CatalogService,
    pub lending: LoanService,
    pub users: UserService,
    pub metadata: MetadataAdvisor,
    pub assistant: CatalogAssistant,
}

impl AppState {
    /// Wires the core services over one store. The AI ports are optional;
    /// without them both AI endpoints answer from their fallbacks.
    pub fn new(
        db: Arc<dyn LibraryStore>,
        config: Arc<Config>,
        enrichment: Option<Arc<dyn MetadataEnrichmentService>>,
        chat: Option<Arc<dyn CatalogChatService>>,
    ) -> Self {
        let loan_period = config.loan_period_days.map(Duration::days);
        Self {
            catalog: CatalogService::new(db.clone()),
            lending: LoanService::new(db.clone(), loan_period),
            users: UserService::new(db.clone()),
            metadata: MetadataAdvisor::new(enrichment),
            assistant: CatalogAssistant::new(db.clone(), chat),
            db,
            config,
        }
    }
}

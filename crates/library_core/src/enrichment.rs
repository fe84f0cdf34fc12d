//! crates/library_core/src/enrichment.rs
//!
//! Metadata suggestions for book forms. A remote service is consulted when one
//! is configured; otherwise, or when it fails, a deterministic keyword fallback
//! answers instead.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Actor, MetadataRequest, MetadataSuggestion, SuggestionSource};
use crate::error::{LibraryError, LibraryResult};
use crate::policy::{authorize, Operation};
use crate::ports::MetadataEnrichmentService;

/// Keyword -> tags used by the fallback. Matched against "title author", lower-cased.
const KEYWORD_TAGS: &[(&[&str], &[&str])] = &[
    (&["clean", "code"], &["software", "engineering"]),
    (&["hobbit", "ring"], &["fantasy"]),
    (&["history"], &["history"]),
];

#[derive(Clone)]
pub struct MetadataAdvisor {
    service: Option<Arc<dyn MetadataEnrichmentService>>,
}

impl MetadataAdvisor {
    pub fn new(service: Option<Arc<dyn MetadataEnrichmentService>>) -> Self {
        Self { service }
    }

    pub async fn suggest(
        &self,
        actor: &Actor,
        request: MetadataRequest,
    ) -> LibraryResult<MetadataSuggestion> {
        authorize(Some(actor), Operation::EnrichMetadata)?;
        let request = MetadataRequest {
            title: request.title.trim().to_string(),
            author: request.author.trim().to_string(),
            isbn: request
                .isbn
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty()),
        };
        if request.title.is_empty() || request.author.is_empty() {
            return Err(LibraryError::InvalidInput(
                "title and author are required".to_string(),
            ));
        }

        let Some(service) = &self.service else {
            return Ok(fallback_metadata(&request));
        };
        match service.suggest_metadata(&request).await {
            Ok(suggestion) => {
                info!(title = %request.title, "Metadata suggested by enrichment service");
                Ok(suggestion)
            }
            Err(e) => {
                warn!("Enrichment service failed, using fallback: {}", e);
                Ok(fallback_metadata(&request))
            }
        }
    }
}

/// Keyword-based guesses used when no enrichment service is available.
pub fn fallback_metadata(request: &MetadataRequest) -> MetadataSuggestion {
    let haystack = format!("{} {}", request.title, request.author).to_lowercase();
    let mut tags: Vec<String> = Vec::new();
    for (keywords, implied) in KEYWORD_TAGS {
        if keywords.iter().any(|k| haystack.contains(k)) {
            for tag in implied.iter() {
                if !tags.iter().any(|t| t == tag) {
                    tags.push((*tag).to_string());
                }
            }
        }
    }
    if tags.is_empty() {
        tags.push("general".to_string());
    }

    MetadataSuggestion {
        description: Some(format!(
            "A book titled \"{}\" by {}.",
            request.title, request.author
        )),
        tags,
        language: Some("English".to_string()),
        publisher: None,
        published_year: None,
        source: SuggestionSource::Fallback,
    }
}

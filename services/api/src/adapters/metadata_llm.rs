//! services/api/src/adapters/metadata_llm.rs
//!
//! This module contains the adapter for the cataloguing LLM.
//! It implements the `MetadataEnrichmentService` port from the `library_core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use library_core::{
    domain::{MetadataRequest, MetadataSuggestion, SuggestionSource},
    ports::{MetadataEnrichmentService, PortError, PortResult},
    validation::{normalize_tags, split_tags},
};
use serde_json::Value;

const SYSTEM_INSTRUCTIONS: &str = "You help librarians catalog books. Return a single JSON object with: \
description (string), tags (comma-separated string), language (string), \
publisher (string, optional), publishedYear (number, optional). Return JSON only.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `MetadataEnrichmentService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiMetadataAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiMetadataAdapter {
    /// Creates a new `OpenAiMetadataAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Reads the model's JSON reply leniently: unknown or mistyped fields are dropped.
pub(crate) fn parse_suggestion(content: &str) -> PortResult<MetadataSuggestion> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let json: Value = serde_json::from_str(trimmed)
        .map_err(|e| PortError::Unexpected(format!("Metadata reply was not JSON: {}", e)))?;

    let text = |key: &str| {
        json.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let tags = match json.get("tags") {
        Some(Value::String(s)) => split_tags(s),
        Some(Value::Array(items)) => normalize_tags(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    };
    let published_year = json
        .get("publishedYear")
        .and_then(Value::as_i64)
        .and_then(|y| i32::try_from(y).ok())
        .filter(|y| (0..=3000).contains(y));

    Ok(MetadataSuggestion {
        description: text("description"),
        tags,
        language: text("language"),
        publisher: text("publisher"),
        published_year,
        source: SuggestionSource::OpenAi,
    })
}

//=========================================================================================
// `MetadataEnrichmentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MetadataEnrichmentService for OpenAiMetadataAdapter {
    async fn suggest_metadata(&self, request: &MetadataRequest) -> PortResult<MetadataSuggestion> {
        let prompt = serde_json::json!({
            "title": request.title,
            "author": request.author,
            "isbn": request.isbn,
        });

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.4)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Metadata LLM response contained no text content.".to_string())
            })?;

        parse_suggestion(&content)
    }
}

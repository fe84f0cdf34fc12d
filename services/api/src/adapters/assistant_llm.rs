//! services/api/src/adapters/assistant_llm.rs
//!
//! This module contains the adapter for the catalog assistant LLM.
//! It implements the `CatalogChatService` port from the `library_core` crate.

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
    domain::Book,
    ports::{CatalogChatService, PortError, PortResult},
};

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful library assistant. Use the provided catalog \
snippets to answer. If you are unsure, ask a clarifying question.";

/// An adapter that implements `CatalogChatService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAssistantAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAssistantAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// One line per book: `- Title by Author (STATUS)`.
pub(crate) fn catalog_snippets(books: &[Book]) -> String {
    books
        .iter()
        .map(|b| format!("- {} by {} ({})", b.title, b.author, b.status))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl CatalogChatService for OpenAiAssistantAdapter {
    async fn answer(&self, question: &str, books: &[Book]) -> PortResult<String> {
        let prompt = format!(
            "User: {}\n\nCatalog snippets:\n{}",
            question,
            catalog_snippets(books)
        );

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.6)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Assistant LLM response contained no text content.".to_string())
            })
    }
}

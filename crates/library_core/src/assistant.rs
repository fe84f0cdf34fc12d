//! crates/library_core/src/assistant.rs
//!
//! The catalog assistant: a free-text question answered from the most
//! recently updated matching books, through a chat service when one is
//! configured and with a plain listing otherwise.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Actor, AssistantReply, Book, BookFilter, SuggestionSource};
use crate::error::{LibraryError, LibraryResult};
use crate::policy::{authorize, Operation};
use crate::ports::{CatalogChatService, LibraryStore};

/// Most books handed to the chat service or listed in a fallback reply.
pub const ASSISTANT_CONTEXT_BOOKS: usize = 5;

#[derive(Clone)]
pub struct CatalogAssistant {
    store: Arc<dyn LibraryStore>,
    chat: Option<Arc<dyn CatalogChatService>>,
}

impl CatalogAssistant {
    pub fn new(store: Arc<dyn LibraryStore>, chat: Option<Arc<dyn CatalogChatService>>) -> Self {
        Self { store, chat }
    }

    pub async fn ask(&self, actor: &Actor, message: &str) -> LibraryResult<AssistantReply> {
        authorize(Some(actor), Operation::ViewCatalog)?;
        let query = message.trim();
        if query.is_empty() {
            return Err(LibraryError::InvalidInput("message is required".to_string()));
        }

        let books = self.matching_books(query).await?;

        let Some(chat) = &self.chat else {
            return Ok(fallback_reply(books));
        };
        match chat.answer(query, &books).await {
            Ok(reply) => {
                info!(matches = books.len(), "Catalog assistant answered");
                Ok(AssistantReply {
                    reply,
                    books,
                    source: SuggestionSource::OpenAi,
                })
            }
            Err(e) => {
                warn!("Chat service failed, using fallback: {}", e);
                Ok(fallback_reply(books))
            }
        }
    }

    /// Newest-updated books whose title, author or a tag contains the query.
    async fn matching_books(&self, query: &str) -> LibraryResult<Vec<Book>> {
        let needle = query.to_lowercase();
        let books = self
            .store
            .list_books(&BookFilter {
                text: Some(query.to_string()),
                status: None,
            })
            .await?;
        Ok(books
            .into_iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
                    || b.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .take(ASSISTANT_CONTEXT_BOOKS)
            .collect())
    }
}

/// Lists the matches by title when no chat service can answer.
pub fn fallback_reply(books: Vec<Book>) -> AssistantReply {
    let reply = if books.is_empty() {
        "I couldn't find any matching books. Try searching by title, author or tags.".to_string()
    } else {
        let titles: Vec<String> = books.iter().map(|b| format!("\"{}\"", b.title)).collect();
        format!(
            "I found {} matching book(s): {}.",
            books.len(),
            titles.join(", ")
        )
    };
    AssistantReply {
        reply,
        books,
        source: SuggestionSource::Fallback,
    }
}

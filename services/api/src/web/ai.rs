//! services/api/src/web/ai.rs

use axum::{extract::State, Extension, Json};
use library_core::{Actor, MetadataRequest};
use std::sync::Arc;

use crate::error::{ApiResult, ErrorBody};
use crate::web::extract::AppJson;
use crate::web::protocol::{
    AssistantRequest, AssistantResponse, MetadataRequestBody, MetadataResponse,
};
use crate::web::state::AppState;

/// POST /ai/book-metadata - Suggest catalog metadata for a title and author
///
/// Falls back to keyword heuristics when no language model is configured or
/// the model call fails; `source` reports which path produced the answer.
#[utoipa::path(
    post,
    path = "/ai/book-metadata",
    request_body = MetadataRequestBody,
    responses(
        (status = 200, description = "Suggested metadata", body = MetadataResponse),
        (status = 400, description = "Title and author are required", body = ErrorBody),
        (status = 403, description = "Caller may not manage the catalog", body = ErrorBody)
    )
)]
pub async fn book_metadata_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<MetadataRequestBody>,
) -> ApiResult<Json<MetadataResponse>> {
    let suggestion = state
        .metadata
        .suggest(
            &actor,
            MetadataRequest {
                title: req.title,
                author: req.author,
                isbn: req.isbn,
            },
        )
        .await?;
    Ok(Json(suggestion.into()))
}

/// POST /ai/assistant - Ask the catalog assistant a question
///
/// Answers from at most five recently updated books whose title, author or
/// tags match the message. Without a language model the reply lists them.
#[utoipa::path(
    post,
    path = "/ai/assistant",
    request_body = AssistantRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AssistantResponse),
        (status = 400, description = "Message is required", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn assistant_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    AppJson(req): AppJson<AssistantRequest>,
) -> ApiResult<Json<AssistantResponse>> {
    let reply = state.assistant.ask(&actor, &req.message).await?;
    Ok(Json(reply.into()))
}

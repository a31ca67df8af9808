//! Question answering endpoint

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::AnswerResult;

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Student's question
    pub question: String,
}

/// POST /api/chat - Answer from uploaded documents
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AnswerResult>> {
    tracing::info!("Question received ({} chars)", request.question.chars().count());
    tracing::debug!("Question: \"{}\"", request.question);
    let result = state.assistant().answer(&request.question).await?;
    Ok(Json(result))
}

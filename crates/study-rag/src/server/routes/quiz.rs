//! Quiz generation endpoint

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::QuizOutcome;

/// Message shown when a quiz is requested before any upload
pub const NO_CONTENT_MESSAGE: &str = "No documents uploaded yet. Please upload a PDF first.";

/// Query parameters for quiz generation
#[derive(Debug, Deserialize)]
pub struct QuizParams {
    /// Questions to generate (default from configuration)
    pub num_questions: Option<usize>,
}

/// GET /api/quiz/generate - Generate multiple-choice questions
pub async fn generate_quiz(
    State(state): State<AppState>,
    Query(params): Query<QuizParams>,
) -> Result<Response> {
    let assistant = state.assistant();
    let num_questions = params
        .num_questions
        .unwrap_or_else(|| assistant.default_quiz_size());

    match assistant.generate_quiz(num_questions).await? {
        QuizOutcome::Generated(quiz) => Ok(Json(quiz).into_response()),
        QuizOutcome::NoContent => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "type": "no_content",
                    "message": NO_CONTENT_MESSAGE,
                }
            })),
        )
            .into_response()),
    }
}

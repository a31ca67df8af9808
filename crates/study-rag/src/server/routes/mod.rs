//! API routes for the study assistant

pub mod admin;
pub mod chat;
pub mod quiz;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload - with larger body limit for documents
        .route(
            "/upload",
            post(upload::upload_document)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_upload_size)),
        )
        .route("/chat", post(chat::chat))
        .route("/quiz/generate", get(quiz::generate_quiz))
        .route("/status", get(admin::status))
        .route("/index", delete(admin::reset_index))
        .route("/uploads", delete(admin::reset_uploads))
        .route("/reset", post(admin::reset_all))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "study-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Study assistant: upload documents, ask grounded questions, generate quizzes",
        "endpoints": {
            "POST /api/upload": "Upload a PDF, TXT or MD document (multipart field 'file')",
            "POST /api/chat": "Ask a question answered from uploaded documents",
            "GET /api/quiz/generate?num_questions=N": "Generate N multiple-choice questions",
            "GET /api/status": "Index status",
            "DELETE /api/index": "Clear the searchable index",
            "DELETE /api/uploads": "Delete uploaded files",
            "POST /api/reset": "Clear index and uploaded files"
        }
    }))
}

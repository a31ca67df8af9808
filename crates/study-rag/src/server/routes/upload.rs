//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestReport;

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Stored file name
    pub filename: String,
    /// Chunks indexed
    pub chunks: usize,
    /// Human-readable status
    pub message: String,
    /// Full ingestion report
    pub report: IngestReport,
}

/// POST /api/upload - Save and index one document
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?;

        tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

        let report = state.assistant().ingest_upload(&filename, &data).await?;
        let message = if report.chunk_count == 0 {
            "Document saved, but no text could be extracted".to_string()
        } else {
            "Document ingested successfully".to_string()
        };

        return Ok(Json(UploadResponse {
            filename: report.source.clone(),
            chunks: report.chunk_count,
            message,
            report,
        }));
    }

    Err(Error::InvalidInput("No file in upload".to_string()))
}

//! Document loading: PDF, plain text and Markdown

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{FileType, LoadedDocument};

/// Reads documents from disk and extracts their text
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load a document, dispatching on its extension
    ///
    /// PDF extraction is CPU bound and runs on the blocking pool. A panic
    /// inside the extractor surfaces as [`Error::FileParse`].
    pub async fn load(path: &Path) -> Result<LoadedDocument> {
        let source = document_id(path)?;
        Self::load_as(path, source).await
    }

    /// Load the file at `path` under the document identifier `source`,
    /// which also selects the parser
    pub async fn load_as(path: &Path, source: String) -> Result<LoadedDocument> {
        let file_type = FileType::from_filename(&source);

        if !file_type.is_supported() {
            let ext = source.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            return Err(Error::UnsupportedFormat(format!(
                "'{}' (.{}) - supported types are PDF, TXT and MD",
                source, ext
            )));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::file_parse(&source, format!("Failed to read file: {}", e)))?;

        let name = source.clone();
        let parsed = tokio::task::spawn_blocking(move || Self::parse(&name, file_type, &data))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    Error::file_parse(&source, "text extraction panicked")
                } else {
                    Error::internal(format!("Task join error: {}", e))
                }
            })??;

        Ok(parsed)
    }

    /// Parse in-memory bytes of a known type
    pub fn parse(source: &str, file_type: FileType, data: &[u8]) -> Result<LoadedDocument> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(source, data),
            FileType::Txt | FileType::Markdown => Ok(LoadedDocument {
                source: source.to_string(),
                file_type,
                text: String::from_utf8_lossy(data).into_owned(),
                page_count: None,
            }),
            FileType::Unknown => Err(Error::UnsupportedFormat(source.to_string())),
        }
    }

    /// Parse PDF document
    fn parse_pdf(source: &str, data: &[u8]) -> Result<LoadedDocument> {
        if !data.starts_with(b"%PDF") {
            return Err(Error::file_parse(source, "missing %PDF header"));
        }

        let content = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(source, e.to_string()))?;

        let page_count = match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(e) => {
                tracing::debug!("lopdf could not count pages of {}: {}", source, e);
                None
            }
        };

        let text = cleanup_pdf_text(&content);
        if text.trim().is_empty() {
            tracing::warn!("No extractable text in {} (scanned PDF?)", source);
        }

        Ok(LoadedDocument {
            source: source.to_string(),
            file_type: FileType::Pdf,
            text,
            page_count,
        })
    }
}

/// Document identifier for a path: its file name
pub fn document_id(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::UnsupportedFormat(format!("'{}' is not a file", path.display())))
}

/// Normalize characters pdf-extract commonly leaves behind
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ") // Non-breaking space
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2022}', "* ")
}

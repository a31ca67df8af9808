//! Document and chunk types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported document types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Anything the loader does not handle
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Check if the loader can read this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// A contiguous span of document text, the unit of embedding and retrieval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Originating document identifier (file name)
    pub source: String,
    /// Position of this chunk within its document (0-based)
    pub sequence: u32,
    /// Chunk text, including the overlap prefix
    pub content: String,
    /// Byte offset of `content` in the extracted document text
    pub offset: usize,
    /// Byte length of the prefix repeated from the previous chunk
    pub overlap: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        source: impl Into<String>,
        sequence: u32,
        content: String,
        offset: usize,
        overlap: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            sequence,
            content,
            offset,
            overlap,
        }
    }

    /// Text not already covered by the previous chunk
    pub fn fresh_text(&self) -> &str {
        &self.content[self.overlap..]
    }

    /// Character count of the chunk
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Text extracted from a document on disk
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Document identifier (file name)
    pub source: String,
    /// Detected type
    pub file_type: FileType,
    /// Extracted text
    pub text: String,
    /// Page count, when the format has pages
    pub page_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("notes.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("readme.md"), FileType::Markdown);
        assert_eq!(FileType::from_filename("plain.txt"), FileType::Txt);
        assert_eq!(FileType::from_filename("slides.pptx"), FileType::Unknown);
        assert_eq!(FileType::from_filename("Makefile"), FileType::Unknown);
        assert!(!FileType::Unknown.is_supported());
    }

    #[test]
    fn test_fresh_text_skips_overlap() {
        let chunk = Chunk::new("a.pdf", 1, "shared tail. New text.".to_string(), 40, 13);
        assert_eq!(chunk.fresh_text(), "New text.");
    }
}

//! Core data models used throughout docchat.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Supported source document formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    /// Resolve a file type from a path's extension (case-insensitive).
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "txt" => Some(FileType::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry per processed source file, persisted in the metadata store.
///
/// Created on first successful processing, overwritten when the content
/// hash changes, never automatically deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Hex SHA-256 of the raw file bytes.
    pub hash: String,
    /// RFC 3339 timestamp of the last successful processing run.
    pub processed_date: String,
    pub total_chunks: usize,
    pub file_type: String,
    pub file_size: u64,
}

/// Per-chunk metadata stored alongside the vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub file_type: String,
    pub processed_date: String,
}

/// A chunk ready for the vector store: deterministic id, text, vector,
/// and metadata. The id is `{file_name}_{chunk_index}`.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl IndexedChunk {
    /// Deterministic chunk identity, stable across re-processing of the
    /// same document instance.
    pub fn chunk_id(file_name: &str, index: usize) -> String {
        format!("{}_{}", file_name, index)
    }
}

/// A ranked retrieval hit: chunk text, its metadata, and the cosine
/// distance from the query vector (smaller is closer).
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn file_type_from_extension() {
        assert_eq!(FileType::from_path(Path::new("a.pdf")), Some(FileType::Pdf));
        assert_eq!(
            FileType::from_path(Path::new("b.DOCX")),
            Some(FileType::Docx)
        );
        assert_eq!(FileType::from_path(Path::new("c.txt")), Some(FileType::Txt));
        assert_eq!(FileType::from_path(Path::new("d.md")), None);
        assert_eq!(FileType::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn chunk_id_is_name_underscore_index() {
        assert_eq!(IndexedChunk::chunk_id("report.pdf", 3), "report.pdf_3");
    }
}

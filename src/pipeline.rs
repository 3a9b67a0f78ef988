//! Document processing pipeline: extraction → change detection → chunking
//! → embedding → vector store, with the metadata record written last.
//!
//! Every per-document failure is caught and reported as a typed
//! [`PipelineError`], never propagated past the document boundary, so a
//! batch of N documents always yields N results.

use chrono::Utc;
use std::path::Path;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::extract::extract_text;
use crate::metadata::{content_hash, MetadataStore};
use crate::models::{ChunkMetadata, DocumentRecord, FileType, IndexedChunk};
use crate::store::VectorStore;

/// Why a single document failed to process. Callers can tell "no text
/// extracted" apart from "store unavailable".
#[derive(Debug)]
pub enum PipelineError {
    /// Extension is not one of pdf/docx/txt.
    UnsupportedType(String),
    /// The file could not be read from disk.
    Unreadable(String),
    /// The format parser rejected the content.
    Extraction(String),
    /// Extraction succeeded but yielded no usable text.
    EmptyContent,
    /// The embedding collaborator call failed.
    Embedding(String),
    /// The vector store write failed.
    Store(String),
    /// The metadata file could not be persisted.
    Metadata(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UnsupportedType(ext) => write!(f, "unsupported file type: {}", ext),
            PipelineError::Unreadable(e) => write!(f, "file unreadable: {}", e),
            PipelineError::Extraction(e) => write!(f, "extraction failed: {}", e),
            PipelineError::EmptyContent => write!(f, "no text extracted"),
            PipelineError::Embedding(e) => write!(f, "embedding failed: {}", e),
            PipelineError::Store(e) => write!(f, "vector store write failed: {}", e),
            PipelineError::Metadata(e) => write!(f, "metadata write failed: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

/// What a successful `process_file` run did.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The document was (re-)chunked, embedded, and indexed.
    Indexed { chunks: usize },
    /// Content hash matched the stored record; nothing to do.
    Unchanged,
}

/// Process one document end to end.
///
/// Skips embedding and indexing entirely when the content hash matches the
/// stored record (re-processing an unchanged file is a no-op that still
/// reports success).
pub async fn process_file(
    config: &Config,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    meta: &mut MetadataStore,
    path: &Path,
) -> Result<ProcessOutcome, PipelineError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_type = FileType::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "(none)".to_string());
        PipelineError::UnsupportedType(ext)
    })?;

    let bytes = std::fs::read(path).map_err(|e| PipelineError::Unreadable(e.to_string()))?;
    let hash = content_hash(&bytes);

    if !meta.needs_processing(&file_name, &hash) {
        return Ok(ProcessOutcome::Unchanged);
    }

    let text = extract_text(&bytes, file_type)
        .map_err(|e| PipelineError::Extraction(e.to_string()))?;
    if text.is_empty() {
        return Err(PipelineError::EmptyContent);
    }

    let chunks = chunk_text(&text, config.chunking.chunk_size, config.chunking.overlap);

    index_document(
        embedder,
        store,
        meta,
        &file_name,
        file_type,
        bytes.len() as u64,
        &hash,
        &chunks,
    )
    .await?;

    Ok(ProcessOutcome::Indexed {
        chunks: chunks.len(),
    })
}

/// Embed a document's chunks and replace its entry in the vector store,
/// then persist the metadata record.
///
/// The embedding call is batched over the whole chunk sequence with
/// positional correspondence. The store replace deletes every prior chunk
/// id for the file before inserting, so shrinking documents cannot leave
/// orphaned chunks.
#[allow(clippy::too_many_arguments)]
pub async fn index_document(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    meta: &mut MetadataStore,
    file_name: &str,
    file_type: FileType,
    file_size: u64,
    hash: &str,
    chunks: &[String],
) -> Result<(), PipelineError> {
    if chunks.is_empty() {
        return Err(PipelineError::EmptyContent);
    }

    let vectors = embedder
        .embed(chunks)
        .await
        .map_err(|e| PipelineError::Embedding(e.to_string()))?;
    if vectors.len() != chunks.len() {
        return Err(PipelineError::Embedding(format!(
            "{} vectors returned for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let processed_date = Utc::now().to_rfc3339();
    let total = chunks.len();

    let indexed: Vec<IndexedChunk> = chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (text, vector))| IndexedChunk {
            id: IndexedChunk::chunk_id(file_name, i),
            text: text.clone(),
            vector,
            metadata: ChunkMetadata {
                file_name: file_name.to_string(),
                chunk_index: i as i64,
                total_chunks: total as i64,
                file_type: file_type.as_str().to_string(),
                processed_date: processed_date.clone(),
            },
        })
        .collect();

    store
        .replace_document(file_name, &indexed)
        .await
        .map_err(|e| PipelineError::Store(e.to_string()))?;

    meta.put(
        file_name,
        DocumentRecord {
            hash: hash.to_string(),
            processed_date,
            total_chunks: total,
            file_type: file_type.as_str().to_string(),
            file_size,
        },
    )
    .map_err(|e| PipelineError::Metadata(e.to_string()))?;

    Ok(())
}

/// Process every regular file in the documents directory, sequentially,
/// in file-name order. One document's failure never blocks the others;
/// the returned list has one entry per file.
pub async fn process_all(
    config: &Config,
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    meta: &mut MetadataStore,
) -> Vec<(String, Result<ProcessOutcome, PipelineError>)> {
    let mut files: Vec<_> = WalkDir::new(&config.storage.documents_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = process_file(config, embedder, store, meta, &path).await;
        results.push((name, result));
    }
    results
}

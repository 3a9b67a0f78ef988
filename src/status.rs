//! Summary of the processed-document corpus.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::metadata::MetadataStore;
use crate::models::DocumentRecord;
use crate::store::{SqliteVectorStore, VectorStore};

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub total_documents: usize,
    pub indexed_vectors: i64,
    pub documents: BTreeMap<String, DocumentRecord>,
}

/// Build the summary from the metadata file and the vector index.
pub async fn document_summary(config: &Config) -> Result<SummaryReport> {
    let meta = MetadataStore::load(&config.storage.metadata_path);
    let store = SqliteVectorStore::open(&config.storage.index_path).await?;
    let indexed_vectors = store.count().await?;
    store.close().await;

    Ok(SummaryReport {
        total_documents: meta.len(),
        indexed_vectors,
        documents: meta.records().clone(),
    })
}

pub fn print_summary(summary: &SummaryReport) {
    println!("status");
    println!("  documents: {}", summary.total_documents);
    println!("  indexed vectors: {}", summary.indexed_vectors);

    if summary.documents.is_empty() {
        return;
    }

    println!();
    println!("{:<32} {:<6} {:>10} {:>8}  PROCESSED", "FILE", "TYPE", "SIZE", "CHUNKS");
    for (name, record) in &summary.documents {
        println!(
            "{:<32} {:<6} {:>10} {:>8}  {}",
            name, record.file_type, record.file_size, record.total_chunks, record.processed_date
        );
    }
}

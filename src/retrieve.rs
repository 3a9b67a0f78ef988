//! Query-time retrieval.
//!
//! Embeds the query with the same collaborator used at index time and asks
//! the vector store for its nearest chunks. Failures degrade to an empty
//! result set — the caller proceeds to the language model with or without
//! context, so retrieval is never a hard error.

use crate::embedding::{embed_query, Embedder};
use crate::models::RetrievalResult;
use crate::store::VectorStore;

/// Top-K nearest chunks for `query`, nearest first.
///
/// Returns an empty vector for a blank query, an empty index, or any
/// embedding/store failure (logged as a warning on stderr).
pub async fn search_chunks(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    query: &str,
    top_k: usize,
) -> Vec<RetrievalResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let query_vec = match embed_query(embedder, query).await {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Warning: query embedding failed: {}", e);
            return Vec::new();
        }
    };

    match store.query(&query_vec, top_k).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Warning: vector store query failed: {}", e);
            Vec::new()
        }
    }
}

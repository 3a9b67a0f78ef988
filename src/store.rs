//! Persistent vector index over SQLite.
//!
//! The [`VectorStore`] trait is the collaborator interface the index writer
//! and retriever consume; [`SqliteVectorStore`] is the shipped backend.
//! Each row holds a chunk's deterministic id, text, metadata columns, and
//! its embedding as a little-endian f32 BLOB. Nearest-neighbor queries
//! fetch the rows and rank by cosine distance in Rust.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::{ChunkMetadata, IndexedChunk, RetrievalResult};

/// Persistent nearest-neighbor index keyed by chunk id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Atomically replace every chunk belonging to `file_name` with the
    /// given set. Deleting first guarantees a shrinking document leaves no
    /// stale ids behind.
    async fn replace_document(&self, file_name: &str, chunks: &[IndexedChunk]) -> Result<()>;

    /// Remove all chunks for a file. Returns the number of rows deleted.
    async fn delete_document(&self, file_name: &str) -> Result<u64>;

    /// Top-K nearest chunks by cosine distance, nearest first. Asking for
    /// more results than the index holds returns everything available.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>>;

    async fn count(&self) -> Result<i64>;

    async fn list_ids(&self) -> Result<Vec<String>>;
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (creating if missing) the index at `path` and ensure the
    /// schema exists. Idempotent.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                file_type TEXT NOT NULL,
                processed_date TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                UNIQUE(file_name, chunk_index)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_file_name ON chunks(file_name)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn replace_document(&self, file_name: &str, chunks: &[IndexedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE file_name = ?")
            .bind(file_name)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks
                    (id, file_name, chunk_index, total_chunks, file_type, processed_date, text, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.metadata.file_name)
            .bind(chunk.metadata.chunk_index)
            .bind(chunk.metadata.total_chunks)
            .bind(&chunk.metadata.file_type)
            .bind(&chunk.metadata.processed_date)
            .bind(&chunk.text)
            .bind(vec_to_blob(&chunk.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_document(&self, file_name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE file_name = ?")
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, chunk_index, total_chunks, file_type, processed_date, text, embedding
            FROM chunks
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut results: Vec<(String, RetrievalResult)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let stored = blob_to_vec(&blob);
                let distance = cosine_distance(vector, &stored);

                let result = RetrievalResult {
                    text: row.get("text"),
                    metadata: ChunkMetadata {
                        file_name: row.get("file_name"),
                        chunk_index: row.get("chunk_index"),
                        total_chunks: row.get("total_chunks"),
                        file_type: row.get("file_type"),
                        processed_date: row.get("processed_date"),
                    },
                    distance,
                };
                (row.get::<String, _>("id"), result)
            })
            .collect();

        // Nearest first; tie-break on id for deterministic ordering.
        results.sort_by(|a, b| {
            a.1.distance
                .partial_cmp(&b.1.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(top_k);

        Ok(results.into_iter().map(|(_, r)| r).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM chunks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

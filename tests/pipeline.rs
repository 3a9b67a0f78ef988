//! End-to-end pipeline tests over a temp index with a deterministic
//! in-process embedder: change detection, replace-on-change, batch
//! isolation, and retrieval degradation.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use docchat::config::{
    ChatConfig, ChunkingConfig, Config, EmbeddingConfig, RetrievalConfig, ServerConfig,
    StorageConfig,
};
use docchat::embedding::{DisabledEmbedder, Embedder};
use docchat::metadata::MetadataStore;
use docchat::pipeline::{process_all, process_file, PipelineError, ProcessOutcome};
use docchat::retrieve::search_chunks;
use docchat::store::{SqliteVectorStore, VectorStore};

/// Deterministic letter-frequency embedder (26 dims), so similar texts
/// land close together without any network calls. Counts invocations to
/// assert no-op re-processing.
struct MockEmbedder {
    calls: AtomicUsize,
}

impl MockEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-letter-freq"
    }

    fn dims(&self) -> usize {
        26
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
                    let i = (c.to_ascii_lowercase() as u8 - b'a') as usize;
                    v[i] += 1.0;
                }
                v
            })
            .collect())
    }
}

fn test_config(root: &Path, chunk_size: usize, overlap: usize) -> Config {
    Config {
        storage: StorageConfig {
            documents_dir: root.join("documents"),
            metadata_path: root.join("processed/document_metadata.json"),
            index_path: root.join("processed/vector_db.sqlite"),
        },
        chunking: ChunkingConfig {
            chunk_size,
            overlap,
        },
        retrieval: RetrievalConfig::default(),
        embedding: EmbeddingConfig::default(),
        chat: ChatConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

async fn setup(chunk_size: usize, overlap: usize) -> (TempDir, Config, SqliteVectorStore) {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path(), chunk_size, overlap);
    std::fs::create_dir_all(&config.storage.documents_dir).unwrap();
    let store = SqliteVectorStore::open(&config.storage.index_path)
        .await
        .unwrap();
    (tmp, config, store)
}

#[tokio::test]
async fn processing_a_text_file_indexes_and_records_it() {
    let (_tmp, config, store) = setup(40, 10).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let path = config.storage.documents_dir.join("notes.txt");
    std::fs::write(&path, "the quick brown fox jumps over the lazy dog, twice over").unwrap();

    let outcome = process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap();

    let chunks = match outcome {
        ProcessOutcome::Indexed { chunks } => chunks,
        other => panic!("expected Indexed, got {:?}", other),
    };
    assert!(chunks >= 2);
    assert_eq!(store.count().await.unwrap(), chunks as i64);

    let record = meta.get("notes.txt").unwrap();
    assert_eq!(record.total_chunks, chunks);
    assert_eq!(record.file_type, "txt");
    assert_eq!(record.hash.len(), 64);

    // Record survives a reload of the metadata file.
    let reloaded = MetadataStore::load(&config.storage.metadata_path);
    assert_eq!(reloaded.get("notes.txt"), meta.get("notes.txt"));
}

#[tokio::test]
async fn unchanged_file_is_a_no_op_without_re_embedding() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let path = config.storage.documents_dir.join("stable.txt");
    std::fs::write(&path, "some perfectly stable document content").unwrap();

    process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap();
    let calls_after_first = embedder.call_count();
    let record_after_first = meta.get("stable.txt").unwrap().clone();

    let outcome = process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Unchanged);
    assert_eq!(embedder.call_count(), calls_after_first);
    assert_eq!(meta.get("stable.txt").unwrap(), &record_after_first);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn changed_file_replaces_all_prior_chunks() {
    let (_tmp, config, store) = setup(40, 10).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let path = config.storage.documents_dir.join("grow.txt");
    std::fs::write(&path, "x".repeat(200)).unwrap();
    process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap();
    let count_before = store.count().await.unwrap();
    assert!(count_before > 1);

    // Shrink to a single chunk; stale ids must not linger.
    std::fs::write(&path, "tiny now").unwrap();
    let outcome = process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap();

    assert_eq!(outcome, ProcessOutcome::Indexed { chunks: 1 });
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(
        store.list_ids().await.unwrap(),
        vec!["grow.txt_0".to_string()]
    );
    assert_eq!(meta.get("grow.txt").unwrap().total_chunks, 1);
}

#[tokio::test]
async fn empty_file_reports_empty_content() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let path = config.storage.documents_dir.join("blank.txt");
    std::fs::write(&path, "   \n\n  ").unwrap();

    let err = process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::EmptyContent));
    assert!(meta.get("blank.txt").is_none());
}

#[tokio::test]
async fn one_bad_document_does_not_block_the_batch() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let docs = &config.storage.documents_dir;
    std::fs::write(docs.join("alpha.txt"), "alpha document about rust and cargo").unwrap();
    std::fs::write(docs.join("broken.pdf"), "definitely not a pdf").unwrap();
    std::fs::write(docs.join("gamma.txt"), "gamma notes on deployment").unwrap();

    let results = process_all(&config, &embedder, &store, &mut meta).await;
    assert_eq!(results.len(), 3);

    let ok = results.iter().filter(|(_, r)| r.is_ok()).count();
    assert_eq!(ok, 2);

    let (name, failed) = results.iter().find(|(_, r)| r.is_err()).unwrap();
    assert_eq!(name, "broken.pdf");
    assert!(matches!(
        failed.as_ref().unwrap_err(),
        PipelineError::Extraction(_)
    ));

    assert_eq!(meta.len(), 2);
}

#[tokio::test]
async fn unsupported_extension_is_a_typed_failure() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let path = config.storage.documents_dir.join("readme.md");
    std::fs::write(&path, "# markdown").unwrap();

    let err = process_file(&config, &embedder, &store, &mut meta, &path)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedType(_)));
}

#[tokio::test]
async fn search_ranks_the_matching_document_first() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let docs = &config.storage.documents_dir;
    std::fs::write(docs.join("zoo.txt"), "zebra zebra zoo zzz").unwrap();
    std::fs::write(docs.join("fruit.txt"), "apple apple banana").unwrap();
    process_all(&config, &embedder, &store, &mut meta).await;

    let results = search_chunks(&embedder, &store, "zebra zoo", 5).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.file_name, "zoo.txt");
    assert!(results[0].distance <= results[1].distance);
}

#[tokio::test]
async fn search_returns_at_most_the_indexed_count() {
    let (_tmp, config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();
    let mut meta = MetadataStore::load(&config.storage.metadata_path);

    let docs = &config.storage.documents_dir;
    std::fs::write(docs.join("a.txt"), "first short chunk").unwrap();
    std::fs::write(docs.join("b.txt"), "second short chunk").unwrap();
    process_all(&config, &embedder, &store, &mut meta).await;

    // topK=5 against an index of 2 chunks.
    let results = search_chunks(&embedder, &store, "short chunk", 5).await;
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn search_on_empty_index_is_empty_not_an_error() {
    let (_tmp, _config, store) = setup(1000, 200).await;
    let embedder = MockEmbedder::new();

    let results = search_chunks(&embedder, &store, "anything", 5).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn embedding_failure_degrades_search_to_empty() {
    let (_tmp, _config, store) = setup(1000, 200).await;

    let results = search_chunks(&DisabledEmbedder, &store, "anything", 5).await;
    assert!(results.is_empty());
}

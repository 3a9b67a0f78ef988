//! Flat-file metadata store and content-hash change detection.
//!
//! One JSON document maps file name -> [`DocumentRecord`]. The whole file
//! is rewritten on every mutation (read-modify-write, single-process
//! assumption — there is no cross-process locking).

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::DocumentRecord;

/// Hex SHA-256 over the full file content. Used purely for change
/// detection, not for security.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Mapping from source file name to its processing record.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    records: BTreeMap<String, DocumentRecord>,
}

impl MetadataStore {
    /// Load the store from disk. A missing or unparseable file yields an
    /// empty mapping rather than an error, so a fresh or corrupted
    /// installation simply re-processes everything.
    pub fn load(path: &Path) -> Self {
        let records = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Whole-file overwrite of the backing JSON document.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write metadata file: {}", self.path.display()))?;
        Ok(())
    }

    /// Pure change-detection decision: skip only when a record exists for
    /// this file name and its stored hash matches.
    pub fn needs_processing(&self, file_name: &str, hash: &str) -> bool {
        match self.records.get(file_name) {
            Some(record) => record.hash != hash,
            None => true,
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&DocumentRecord> {
        self.records.get(file_name)
    }

    /// Insert or overwrite a record and persist the whole file.
    pub fn put(&mut self, file_name: &str, record: DocumentRecord) -> Result<()> {
        self.records.insert(file_name.to_string(), record);
        self.save()
    }

    pub fn records(&self) -> &BTreeMap<String, DocumentRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str) -> DocumentRecord {
        DocumentRecord {
            hash: hash.to_string(),
            processed_date: "2024-01-01T00:00:00+00:00".to_string(),
            total_chunks: 3,
            file_type: "txt".to_string(),
            file_size: 42,
        }
    }

    #[test]
    fn content_hash_detects_any_byte_change() {
        let a = content_hash(b"hello world");
        let b = content_hash(b"hello world!");
        assert_ne!(a, b);
        assert_eq!(a, content_hash(b"hello world"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::load(&dir.path().join("nope.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document_metadata.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = MetadataStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn put_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed/document_metadata.json");

        let mut store = MetadataStore::load(&path);
        store.put("report.pdf", record("abc")).unwrap();

        let reloaded = MetadataStore::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("report.pdf").unwrap().hash, "abc");
    }

    #[test]
    fn needs_processing_only_skips_matching_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let mut store = MetadataStore::load(&path);

        assert!(store.needs_processing("notes.txt", "h1"));
        store.put("notes.txt", record("h1")).unwrap();
        assert!(!store.needs_processing("notes.txt", "h1"));
        assert!(store.needs_processing("notes.txt", "h2"));
        assert!(store.needs_processing("other.txt", "h1"));
    }

    #[test]
    fn put_overwrites_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let mut store = MetadataStore::load(&path);

        store.put("a.txt", record("h1")).unwrap();
        store.put("a.txt", record("h2")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.txt").unwrap().hash, "h2");
    }
}

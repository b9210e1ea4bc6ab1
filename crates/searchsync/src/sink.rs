//! Search sink contract
//!
//! One batched indexing call with upsert semantics. Partial failures are not
//! surfaced per document; a failed batch is a failed call and the sync loop
//! treats it as fatal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::document::Document;
use crate::error::{Result, SyncError};

/// Options applied to every batched index call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingOptions {
    /// Stemming language; empty selects the index default
    #[serde(default)]
    pub language: String,
    /// Index without storing document payloads
    #[serde(default)]
    pub no_save: bool,
    /// Replace existing documents with the same identifier (upsert)
    #[serde(default = "default_replace")]
    pub replace: bool,
}

fn default_replace() -> bool {
    true
}

impl Default for IndexingOptions {
    fn default() -> Self {
        Self {
            language: String::new(),
            no_save: false,
            replace: true,
        }
    }
}

/// A search backend accepting batched document mutations.
#[async_trait]
pub trait SearchSink: Send + Sync {
    /// Index a batch of documents. Identifier collisions replace the
    /// existing document when `options.replace` is set.
    async fn index(&self, options: &IndexingOptions, documents: &[Document]) -> Result<()>;
}

/// Recording sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<Document>>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `index` call fail.
    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All batches indexed so far, oldest first.
    pub async fn batches(&self) -> Vec<Vec<Document>> {
        self.batches.lock().await.clone()
    }

    /// Every indexed document flattened in arrival order.
    pub async fn documents(&self) -> Vec<Document> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl SearchSink for MemorySink {
    async fn index(&self, _options: &IndexingOptions, documents: &[Document]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::sink("index unavailable"));
        }
        self.batches.lock().await.push(documents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_upsert() {
        let options = IndexingOptions::default();
        assert!(options.replace);
        assert!(!options.no_save);
        assert!(options.language.is_empty());
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: IndexingOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, IndexingOptions::default());
    }

    #[tokio::test]
    async fn test_memory_sink_records_batches() {
        let sink = MemorySink::new();
        let options = IndexingOptions::default();

        sink.index(&options, &[Document::new("1"), Document::new("2")])
            .await
            .unwrap();
        sink.index(&options, &[Document::new("3")]).await.unwrap();

        assert_eq!(sink.batches().await.len(), 2);
        assert_eq!(sink.documents().await.len(), 3);
    }

    #[tokio::test]
    async fn test_memory_sink_failure() {
        let sink = MemorySink::new();
        sink.fail_next_calls(true);

        let err = sink
            .index(&IndexingOptions::default(), &[Document::new("1")])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Sink(_)));
        assert!(sink.batches().await.is_empty());
    }
}

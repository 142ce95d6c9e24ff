//! Document processing pipeline.
//!
//! Architecture:
//!
//! ```text
//! SYNCHRONOUS (direct)                     QUEUED (worker)
//! ────────────────────                     ───────────────
//! Pipeline::process()                      PipelineWorkerHandle::queue()
//!         │                                        │
//!         ▼                                        ▼
//!     extract chunks                        mpsc channel
//!         │                                        │
//!         ▼                                        ▼
//!     render highlight   ◄── shared ──►    Pipeline::process()
//!         │                               (on a blocking thread)
//!         ▼                                        │
//!     save metadata                                ▼
//!         │                                 PipelineEvent
//!         ▼
//!     Return record
//! ```
//!
//! Callers needing the result immediately use `process()`. Callers that
//! must not block a request thread queue through the worker and await the
//! document's event; the metadata record becomes visible to `get` and
//! `search` when that event fires.

mod worker;

pub use worker::{
    spawn_pipeline_worker, DocumentStatus, PdfToProcess, PipelineEvent, PipelineTracker,
    PipelineWorkerHandle,
};

use std::path::Path;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::models::MetadataRecord;
use crate::pdf::{extractor, highlight};
use crate::search::SearchIndex;
use crate::store::MetadataStore;

/// One document's end-to-end run: extract, highlight, persist
///
/// Independent documents may be processed concurrently; the only shared
/// state is the store, which is atomic per key. No step is retried.
pub struct Pipeline {
    config: StorageConfig,
    store: MetadataStore,
}

impl Pipeline {
    /// Create a pipeline over the given storage layout, ensuring its
    /// directories exist
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.ensure_dirs()?;
        let store = MetadataStore::open(&config.metadata_dir)?;
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// A search index over this pipeline's persisted records
    pub fn search_index(&self) -> SearchIndex {
        SearchIndex::new(self.store.clone())
    }

    /// Process one document to completion
    ///
    /// On success a metadata record and a highlighted artifact both exist.
    /// Extraction failure persists nothing; highlight failure leaves the
    /// extraction result to the caller but persists nothing; a persist
    /// failure removes the freshly written artifact so a highlighted copy
    /// never outlives a missing record.
    pub fn process(&self, pdf_path: &Path, doc_id: &str) -> Result<MetadataRecord> {
        let bytes = std::fs::read(pdf_path).map_err(|e| {
            Error::MalformedDocument(format!("failed to read {}: {e}", pdf_path.display()))
        })?;
        let pdf_hash = blake3::hash(&bytes).to_hex().to_string();

        let result = extractor::extract_from_bytes(&bytes, doc_id)?;

        let highlight_path = self.config.highlight_path(doc_id);
        highlight::highlight(pdf_path, &result.chunks, &highlight_path)?;

        let record = MetadataRecord::from_extraction(&result, pdf_path, pdf_hash);
        if let Err(e) = self.store.save(&record) {
            if let Err(cleanup) = std::fs::remove_file(&highlight_path) {
                tracing::warn!(
                    doc_id = %doc_id,
                    error = %cleanup,
                    "Failed to remove highlighted artifact after save failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            doc_id = %doc_id,
            page_count = record.page_count,
            chunk_count = record.chunk_count,
            "Document processed"
        );

        Ok(record)
    }
}

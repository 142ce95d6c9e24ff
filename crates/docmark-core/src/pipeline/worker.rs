//! Queued execution of pipeline runs off the caller's thread.
//!
//! Documents are queued through a handle, processed one at a time on a
//! blocking thread, and reported back as events. A tracker exposes
//! per-document status while work is in flight. Queued work runs to
//! completion or failure; there is no cancellation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

/// Status of a document in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DocumentStatus {
    /// Queued, not yet started
    Pending,
    /// Currently extracting, highlighting, or persisting
    InProgress,
    /// Record saved and artifact written
    Completed,
    /// Pipeline run failed
    Failed { error: String },
}

/// A document queued for processing
#[derive(Debug, Clone)]
pub struct PdfToProcess {
    pub doc_id: String,
    pub pdf_path: PathBuf,
}

/// Event emitted when a queued run finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PipelineEvent {
    /// Record saved; the document is now searchable.
    Processed { doc_id: String, chunk_count: usize },
    /// Run failed; nothing was persisted for this document.
    Failed { doc_id: String, error: String },
}

/// Tracks the status of queued documents
#[derive(Clone, Default)]
pub struct PipelineTracker {
    docs: Arc<RwLock<HashMap<String, DocumentStatus>>>,
}

impl PipelineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queue(&self, doc_id: &str) {
        let mut docs = self.docs.write().await;
        docs.insert(doc_id.to_string(), DocumentStatus::Pending);
    }

    pub async fn status(&self, doc_id: &str) -> Option<DocumentStatus> {
        let docs = self.docs.read().await;
        docs.get(doc_id).cloned()
    }

    /// Whether any document is pending or in progress
    pub async fn has_active_work(&self) -> bool {
        let docs = self.docs.read().await;
        docs.values().any(|s| {
            matches!(
                s,
                DocumentStatus::Pending | DocumentStatus::InProgress
            )
        })
    }

    /// Drop finished documents from tracking
    pub async fn cleanup_finished(&self) {
        let mut docs = self.docs.write().await;
        docs.retain(|_, s| {
            matches!(
                s,
                DocumentStatus::Pending | DocumentStatus::InProgress
            )
        });
    }

    async fn set(&self, doc_id: &str, status: DocumentStatus) {
        let mut docs = self.docs.write().await;
        if let Some(entry) = docs.get_mut(doc_id) {
            *entry = status;
        }
    }
}

/// Handle to queue documents for processing.
///
/// The worker stops when all handles are dropped (channel closes).
#[derive(Clone)]
pub struct PipelineWorkerHandle {
    tx: mpsc::Sender<PdfToProcess>,
    tracker: PipelineTracker,
}

impl PipelineWorkerHandle {
    /// Queue a document. Returns immediately; processing happens
    /// asynchronously and completion is reported as a [`PipelineEvent`].
    pub async fn queue(&self, job: PdfToProcess) -> Result<()> {
        self.tracker.queue(&job.doc_id).await;
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::StorageFailure("pipeline worker channel closed".to_string()))
    }

    pub async fn status(&self, doc_id: &str) -> Option<DocumentStatus> {
        self.tracker.status(doc_id).await
    }

    pub async fn has_active_work(&self) -> bool {
        self.tracker.has_active_work().await
    }

    pub async fn cleanup_finished(&self) {
        self.tracker.cleanup_finished().await;
    }
}

/// Spawn the pipeline worker.
///
/// Runs as a tokio task, executing each queued document's pipeline run on
/// a blocking thread so extraction never stalls the async runtime.
/// Returns a handle to queue documents and a receiver for completion
/// events.
pub fn spawn_pipeline_worker(
    pipeline: Arc<Pipeline>,
) -> (PipelineWorkerHandle, mpsc::Receiver<PipelineEvent>) {
    let (doc_tx, mut doc_rx) = mpsc::channel::<PdfToProcess>(64);
    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(64);
    let tracker = PipelineTracker::new();

    let handle = PipelineWorkerHandle {
        tx: doc_tx,
        tracker: tracker.clone(),
    };

    tokio::spawn(async move {
        tracing::info!("Pipeline worker started");

        while let Some(job) = doc_rx.recv().await {
            let doc_id = job.doc_id.clone();
            tracing::debug!(doc_id = %doc_id, "Processing queued document");

            tracker.set(&doc_id, DocumentStatus::InProgress).await;

            let pipeline = pipeline.clone();
            let result = tokio::task::spawn_blocking(move || {
                pipeline.process(&job.pdf_path, &job.doc_id)
            })
            .await
            .unwrap_or_else(|e| {
                Err(Error::StorageFailure(format!(
                    "pipeline task aborted: {e}"
                )))
            });

            match result {
                Ok(record) => {
                    tracker.set(&doc_id, DocumentStatus::Completed).await;
                    let _ = event_tx
                        .send(PipelineEvent::Processed {
                            doc_id,
                            chunk_count: record.chunk_count,
                        })
                        .await;
                }
                Err(e) => {
                    let error = e.to_string();
                    tracker
                        .set(
                            &doc_id,
                            DocumentStatus::Failed {
                                error: error.clone(),
                            },
                        )
                        .await;
                    tracing::error!(doc_id = %doc_id, error = %error, "Pipeline run failed");
                    let _ = event_tx
                        .send(PipelineEvent::Failed { doc_id, error })
                        .await;
                }
            }
        }

        tracing::info!("Pipeline worker stopped");
    });

    (handle, event_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::pdf::testpdf;

    fn pipeline_in(temp_dir: &tempfile::TempDir) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(StorageConfig::new(temp_dir.path().join("data"))).unwrap())
    }

    #[tokio::test]
    async fn test_queued_document_becomes_searchable_on_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(&temp_dir);
        let (handle, mut events) = spawn_pipeline_worker(pipeline.clone());

        let pdf_path = pipeline.config().upload_path("invoice-1");
        std::fs::write(&pdf_path, testpdf::single_line_pdf("Invoice #1023")).unwrap();

        handle
            .queue(PdfToProcess {
                doc_id: "invoice-1".to_string(),
                pdf_path,
            })
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        match event {
            PipelineEvent::Processed {
                doc_id,
                chunk_count,
            } => {
                assert_eq!(doc_id, "invoice-1");
                assert_eq!(chunk_count, 1);
            }
            other => panic!("expected Processed event, got {other:?}"),
        }

        // Visible after the event, per the consistency window
        assert!(pipeline.store().exists("invoice-1"));
        let hits = pipeline.search_index().search("1023").unwrap();
        assert_eq!(hits.len(), 1);

        assert_eq!(
            handle.status("invoice-1").await,
            Some(DocumentStatus::Completed)
        );
        assert!(!handle.has_active_work().await);
    }

    #[tokio::test]
    async fn test_failed_document_reports_and_persists_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(&temp_dir);
        let (handle, mut events) = spawn_pipeline_worker(pipeline.clone());

        let pdf_path = pipeline.config().upload_path("broken-1");
        std::fs::write(&pdf_path, b"not a pdf at all").unwrap();

        handle
            .queue(PdfToProcess {
                doc_id: "broken-1".to_string(),
                pdf_path,
            })
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            PipelineEvent::Failed { doc_id, error } => {
                assert_eq!(doc_id, "broken-1");
                assert!(error.contains("malformed document"));
            }
            other => panic!("expected Failed event, got {other:?}"),
        }

        assert!(!pipeline.store().exists("broken-1"));
        assert!(!pipeline.config().highlight_path("broken-1").exists());
        assert!(matches!(
            handle.status("broken-1").await,
            Some(DocumentStatus::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_queue_processes_documents_in_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(&temp_dir);
        let (handle, mut events) = spawn_pipeline_worker(pipeline.clone());

        for (doc_id, text) in [("doc-a", "first document"), ("doc-b", "second document")] {
            let pdf_path = pipeline.config().upload_path(doc_id);
            std::fs::write(&pdf_path, testpdf::single_line_pdf(text)).unwrap();
            handle
                .queue(PdfToProcess {
                    doc_id: doc_id.to_string(),
                    pdf_path,
                })
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        for _ in 0..2 {
            if let PipelineEvent::Processed { doc_id, .. } = events.recv().await.unwrap() {
                seen.push(doc_id);
            }
        }
        assert_eq!(seen, vec!["doc-a", "doc-b"]);

        handle.cleanup_finished().await;
        assert_eq!(handle.status("doc-a").await, None);
    }
}

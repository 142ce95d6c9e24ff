//! Docmark Core - Document extraction, chunking, and highlighting
//!
//! This crate contains the core pipeline for Docmark, including:
//! - PDF text extraction into positioned chunks (lopdf)
//! - Highlight rendering of chunk regions onto a copy of the source
//! - Durable metadata records keyed by document id
//! - Keyword search across persisted chunk text
//! - A queued worker for running the pipeline off request threads
//!
//! The transport layer (upload handling, routing) lives outside this
//! crate and drives it through [`Pipeline`], [`MetadataStore`], and
//! [`SearchIndex`].

pub mod config;
pub mod error;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod search;
pub mod store;

pub use config::StorageConfig;
pub use error::{Error, Result};
pub use models::{generate_doc_id, BoundingBox, Chunk, ExtractionResult, MetadataRecord};
pub use pdf::extractor::{extract, extract_from_bytes};
pub use pdf::highlight::highlight;
pub use pipeline::{
    spawn_pipeline_worker, PdfToProcess, Pipeline, PipelineEvent, PipelineWorkerHandle,
};
pub use search::{SearchIndex, SearchMatch};
pub use store::MetadataStore;

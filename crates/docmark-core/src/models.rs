//! Value types shared across the pipeline
//!
//! Documents and their chunks are created together by one extractor
//! invocation and are immutable thereafter. Invariants (dense chunk ids,
//! page numbers within range) are checked when an [`ExtractionResult`] is
//! assembled, not re-validated downstream.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned rectangle in a page's coordinate space
///
/// Stored as min/max corners; `new` normalizes swapped coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// A box that covers no area
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Intersection with `bounds`; may be empty if the boxes are disjoint
    pub fn clamp_to(&self, bounds: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.max(bounds.x0).min(bounds.x1),
            y0: self.y0.max(bounds.y0).min(bounds.y1),
            x1: self.x1.min(bounds.x1).max(bounds.x0),
            y1: self.y1.min(bounds.y1).max(bounds.y0),
        }
    }

    /// Whether this box lies entirely within `bounds`
    pub fn within(&self, bounds: &BoundingBox) -> bool {
        self.x0 >= bounds.x0 && self.y0 >= bounds.y0 && self.x1 <= bounds.x1 && self.y1 <= bounds.y1
    }
}

/// An addressable region of extracted text
///
/// Owned exclusively by one document; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Dense sequential index, unique within the document
    pub chunk_id: usize,
    /// Owning document
    pub doc_id: String,
    /// 1-based page index in the source PDF
    pub page_number: u32,
    /// Region enclosing the chunk's glyphs, within page bounds
    pub bounding_box: BoundingBox,
    /// Extracted text; may be empty for non-text regions
    pub text: String,
    /// Reading order within the document
    pub order: usize,
}

/// Output of one extractor invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub doc_id: String,
    pub page_count: usize,
    /// Document title from the PDF Info dictionary, when present
    pub title: Option<String>,
    /// Chunks in reading order
    pub chunks: Vec<Chunk>,
}

impl ExtractionResult {
    /// Assemble a result, validating chunk invariants
    ///
    /// Chunk ids must be dense (0..n-1, in order) and every page number
    /// must fall within `[1, page_count]`.
    pub fn new(
        doc_id: impl Into<String>,
        page_count: usize,
        title: Option<String>,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let doc_id = doc_id.into();
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.chunk_id != i {
                return Err(Error::MalformedDocument(format!(
                    "chunk ids are not dense: expected {i}, found {}",
                    chunk.chunk_id
                )));
            }
            if chunk.page_number == 0 || chunk.page_number as usize > page_count {
                return Err(Error::MalformedDocument(format!(
                    "chunk {} references page {} of a {page_count}-page document",
                    chunk.chunk_id, chunk.page_number
                )));
            }
        }
        Ok(Self {
            doc_id,
            page_count,
            title,
            chunks,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Durable projection of an extraction result, keyed by `doc_id`
///
/// Exists if and only if extraction completed successfully. Written
/// all-or-nothing by the metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub doc_id: String,
    /// Location of the original uploaded PDF
    pub source_path: String,
    /// blake3 hash of the source bytes
    pub pdf_hash: String,
    pub page_count: usize,
    pub title: Option<String>,
    pub chunk_count: usize,
    pub chunks: Vec<Chunk>,
    pub created_at: String,
}

impl MetadataRecord {
    /// Project an extraction result into its persisted form
    pub fn from_extraction(result: &ExtractionResult, source_path: &Path, pdf_hash: String) -> Self {
        Self {
            doc_id: result.doc_id.clone(),
            source_path: source_path.to_string_lossy().to_string(),
            pdf_hash,
            page_count: result.page_count,
            title: result.title.clone(),
            chunk_count: result.chunks.len(),
            chunks: result.chunks.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Derive a document identifier from a source filename
///
/// Format: `{file stem}-{8 hex chars of a v4 uuid}`, e.g.
/// `invoice-3f9a1c2e`. Stable for the document's lifetime once assigned.
pub fn generate_doc_id(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{stem}-{}", &suffix[..8])
}

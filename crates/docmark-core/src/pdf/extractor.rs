//! PDF text extraction into addressable chunks
//!
//! Positioned text runs from the content interpreter are grouped into
//! lines by baseline proximity, and lines into blocks by inter-line gap;
//! one block becomes one chunk. The grouping is purely geometric and
//! deterministic: the same input bytes always yield the same chunk
//! boundaries, text, and boxes.

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::models::{BoundingBox, Chunk, ExtractionResult};
use crate::pdf::content::{self, TextRun};
use crate::pdf::{page_media_box, resolve};

/// Maximum baseline distance for two runs to share a line, in points
const LINE_JOIN_THRESHOLD: f32 = 5.0;
/// Maximum vertical gap between line boxes within one block, in points
const BLOCK_JOIN_THRESHOLD: f32 = 12.0;
/// Horizontal gap, as a fraction of the font size, treated as a word break
const WORD_GAP_FACTOR: f32 = 0.25;

/// Extract a PDF file into an ordered chunk list
pub fn extract(path: &Path, doc_id: &str) -> Result<ExtractionResult> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::MalformedDocument(format!("failed to read {}: {e}", path.display()))
    })?;
    extract_from_bytes(&bytes, doc_id)
}

/// Extract from PDF bytes already in memory
pub fn extract_from_bytes(bytes: &[u8], doc_id: &str) -> Result<ExtractionResult> {
    let doc =
        Document::load_mem(bytes).map_err(|e| Error::MalformedDocument(e.to_string()))?;

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut chunks: Vec<Chunk> = Vec::new();

    for (&page_number, &page_id) in &pages {
        let page_bounds = page_media_box(&doc, page_id);
        let runs = match content::text_runs(&doc, page_id) {
            Ok(runs) => runs,
            Err(e) => {
                // A single undecodable page contributes no chunks; the rest
                // of the document still extracts
                tracing::warn!(
                    page = page_number,
                    error = %e,
                    "skipping page with undecodable content"
                );
                continue;
            }
        };
        if runs.is_empty() {
            continue;
        }

        for block in group_into_blocks(runs) {
            let bounding_box = block.bbox.clamp_to(&page_bounds);
            if bounding_box.is_empty() {
                continue;
            }
            let order = chunks.len();
            chunks.push(Chunk {
                chunk_id: order,
                doc_id: doc_id.to_string(),
                page_number,
                bounding_box,
                text: block.text,
                order,
            });
        }
    }

    tracing::debug!(
        doc_id = %doc_id,
        page_count,
        chunk_count = chunks.len(),
        "Extracted document"
    );

    ExtractionResult::new(doc_id, page_count, document_title(&doc), chunks)
}

/// Title from the trailer's Info dictionary, if one is set
fn document_title(doc: &Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = resolve(doc, info).as_dict().ok()?;
    let title = info.get(b"Title").ok()?;
    if let Object::String(bytes, _) = resolve(doc, title) {
        let decoded = content::decode_text_bytes(bytes);
        let trimmed = decoded.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    } else {
        None
    }
}

/// A visual block of text: contiguous lines and their enclosing box
struct Block {
    text: String,
    bbox: BoundingBox,
}

struct Line {
    text: String,
    bbox: BoundingBox,
}

/// Group a page's runs into reading-ordered blocks
fn group_into_blocks(mut runs: Vec<TextRun>) -> Vec<Block> {
    runs.sort_by(|a, b| {
        b.baseline
            .total_cmp(&a.baseline)
            .then(a.x0.total_cmp(&b.x0))
    });

    let mut grouped: Vec<(f32, Vec<TextRun>)> = Vec::new();
    for run in runs {
        match grouped.last_mut() {
            Some((baseline, line)) if (*baseline - run.baseline).abs() <= LINE_JOIN_THRESHOLD => {
                line.push(run);
            }
            _ => grouped.push((run.baseline, vec![run])),
        }
    }

    let lines: Vec<Line> = grouped
        .into_iter()
        .map(|(_, runs)| assemble_line(runs))
        .collect();

    let mut blocks: Vec<Block> = Vec::new();
    let mut current: Option<Block> = None;
    for line in lines {
        match current.as_mut() {
            Some(block) if block.bbox.y0 - line.bbox.y1 <= BLOCK_JOIN_THRESHOLD => {
                block.text.push('\n');
                block.text.push_str(&line.text);
                block.bbox = block.bbox.union(&line.bbox);
            }
            _ => {
                if let Some(done) = current.take() {
                    blocks.push(done);
                }
                current = Some(Block {
                    text: line.text,
                    bbox: line.bbox,
                });
            }
        }
    }
    if let Some(done) = current.take() {
        blocks.push(done);
    }

    // Reading order: top-to-bottom, then left-to-right
    blocks.sort_by(|a, b| {
        b.bbox
            .y1
            .total_cmp(&a.bbox.y1)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    blocks
}

/// Join a line's runs left-to-right, inserting spaces at word-sized gaps
fn assemble_line(mut runs: Vec<TextRun>) -> Line {
    runs.sort_by(|a, b| a.x0.total_cmp(&b.x0));

    let mut text = String::new();
    let mut bbox: Option<BoundingBox> = None;
    let mut prev_end: Option<f32> = None;

    for run in &runs {
        if let Some(end) = prev_end {
            let gap = run.x0 - end;
            if gap > WORD_GAP_FACTOR * run.size
                && !text.ends_with(' ')
                && !run.text.starts_with(' ')
            {
                text.push(' ');
            }
        }
        text.push_str(&run.text);

        let run_box = BoundingBox::new(run.x0, run.y0, run.x1, run.y1);
        bbox = Some(match bbox {
            Some(b) => b.union(&run_box),
            None => run_box,
        });
        prev_end = Some(run.x1);
    }

    Line {
        text,
        bbox: bbox.unwrap_or(BoundingBox {
            x0: 0.0,
            y0: 0.0,
            x1: 0.0,
            y1: 0.0,
        }),
    }
}

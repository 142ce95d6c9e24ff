//! Highlight rendering: overlay chunk regions onto a copy of the source PDF
//!
//! Markers are additive: each annotated page gains one extra content
//! stream drawing a translucent fill plus border per chunk box, and an
//! ExtGState entry for the fill alpha. Existing page objects, content
//! streams, and MediaBoxes are never modified, so page count and
//! dimensions are preserved exactly.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::models::{BoundingBox, Chunk};
use crate::pdf::{page_media_box, resolve};

/// Fill opacity for highlight rectangles
const FILL_ALPHA: f32 = 0.35;
/// Fill color (warm yellow)
const FILL_RGB: [f32; 3] = [1.0, 0.83, 0.2];
/// Border color
const STROKE_RGB: [f32; 3] = [0.85, 0.6, 0.0];
/// Border width in points
const STROKE_WIDTH: f32 = 0.8;
/// Resource name of the highlight graphics state
const HIGHLIGHT_GS_NAME: &str = "GShl";

/// Write a highlighted copy of `source` to `output`
///
/// Every chunk's bounding box is marked on its page. Boxes falling outside
/// the page are clipped to page bounds rather than failing; chunks whose
/// page number does not exist in the document are skipped with a warning.
pub fn highlight(source: &Path, chunks: &[Chunk], output: &Path) -> Result<()> {
    let mut doc = Document::load(source).map_err(|e| {
        Error::RenderingFailure(format!("failed to reopen {}: {e}", source.display()))
    })?;

    let pages = doc.get_pages();

    let mut by_page: BTreeMap<u32, Vec<&Chunk>> = BTreeMap::new();
    for chunk in chunks {
        by_page.entry(chunk.page_number).or_default().push(chunk);
    }

    for page_number in by_page.keys() {
        if !pages.contains_key(page_number) {
            tracing::warn!(
                page = page_number,
                "chunk references a page not present in the document"
            );
        }
    }

    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => real(FILL_ALPHA),
        "CA" => real(1.0),
    });

    let mut marked = 0usize;
    for (&page_number, &page_id) in &pages {
        let Some(page_chunks) = by_page.get(&page_number) else {
            continue;
        };
        let page_bounds = page_media_box(&doc, page_id);

        let rects: Vec<BoundingBox> = page_chunks
            .iter()
            .map(|chunk| chunk.bounding_box.clamp_to(&page_bounds))
            .filter(|rect| !rect.is_empty())
            .collect();
        if rects.is_empty() {
            continue;
        }
        marked += rects.len();

        let encoded = Content {
            operations: overlay_ops(&rects),
        }
        .encode()
        .map_err(|e| Error::RenderingFailure(e.to_string()))?;

        let stream_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        append_page_content(&mut doc, page_id, stream_id)?;
        attach_graphics_state(&mut doc, page_id, gs_id)?;
    }

    doc.save(output).map_err(|e| {
        Error::RenderingFailure(format!("failed to write {}: {e}", output.display()))
    })?;

    tracing::debug!(
        output = %output.display(),
        chunk_count = chunks.len(),
        marked,
        "Rendered highlighted copy"
    );

    Ok(())
}

fn real(value: f32) -> Object {
    value.into()
}

/// Overlay drawing: one filled pass under the highlight alpha, then an
/// opaque border pass, isolated in q/Q
fn overlay_ops(rects: &[BoundingBox]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(HIGHLIGHT_GS_NAME.into())]),
        Operation::new(
            "rg",
            FILL_RGB.iter().map(|&v| real(v)).collect(),
        ),
    ];
    for rect in rects {
        ops.push(rect_op(rect));
    }
    ops.push(Operation::new("f", vec![]));

    ops.push(Operation::new(
        "RG",
        STROKE_RGB.iter().map(|&v| real(v)).collect(),
    ));
    ops.push(Operation::new("w", vec![real(STROKE_WIDTH)]));
    for rect in rects {
        ops.push(rect_op(rect));
    }
    ops.push(Operation::new("S", vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops
}

fn rect_op(rect: &BoundingBox) -> Operation {
    Operation::new(
        "re",
        vec![
            real(rect.x0),
            real(rect.y0),
            real(rect.width()),
            real(rect.height()),
        ],
    )
}

/// Append an overlay stream after the page's existing content
fn append_page_content(doc: &mut Document, page_id: ObjectId, stream_id: ObjectId) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::RenderingFailure(format!("page dictionary: {e}")))?;

    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(existing)) => {
            Object::Array(vec![Object::Reference(*existing), stream_id.into()])
        }
        Ok(Object::Array(existing)) => {
            let mut streams = existing.clone();
            streams.push(stream_id.into());
            Object::Array(streams)
        }
        _ => stream_id.into(),
    };
    page.set("Contents", contents);
    Ok(())
}

/// Register the highlight ExtGState in the page's resources
///
/// The effective resources (own or inherited) are resolved, cloned, and
/// written back as a page-level dictionary so inherited entries stay
/// visible to the original content.
fn attach_graphics_state(doc: &mut Document, page_id: ObjectId, gs_id: ObjectId) -> Result<()> {
    let mut resources = effective_resources(doc, page_id).unwrap_or_else(Dictionary::new);

    let mut ext_g_state = match resources.get(b"ExtGState") {
        Ok(obj) => match resolve(doc, obj) {
            Object::Dictionary(existing) => existing.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    ext_g_state.set(HIGHLIGHT_GS_NAME, gs_id);
    resources.set("ExtGState", Object::Dictionary(ext_g_state));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::RenderingFailure(format!("page dictionary: {e}")))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// The resources dictionary in effect for a page, resolving inheritance
fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(obj) = dict.get(b"Resources") {
            if let Object::Dictionary(resources) = resolve(doc, obj) {
                return Some(resources.clone());
            }
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|o| o.as_reference().ok());
    }
    None
}

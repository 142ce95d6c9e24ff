//! PDF parsing, text extraction, and highlight rendering (lopdf)

pub mod content;
pub mod extractor;
pub mod highlight;

#[cfg(test)]
pub(crate) mod testpdf;

use lopdf::{Document, Object, ObjectId};

use crate::models::BoundingBox;

/// Follow reference chains until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    // Reference cycles are malformed; bail out after a fixed depth
    for _ in 0..32 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Page bounds from the MediaBox, resolving inheritance through the Pages
/// tree; falls back to US Letter when absent
pub(crate) fn page_media_box(doc: &Document, page_id: ObjectId) -> BoundingBox {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Ok(obj) = dict.get(b"MediaBox") {
            if let Ok(values) = resolve(doc, obj).as_array() {
                let coords: Vec<f32> = values
                    .iter()
                    .filter_map(|v| number(resolve(doc, v)))
                    .collect();
                if coords.len() == 4 {
                    return BoundingBox::new(coords[0], coords[1], coords[2], coords[3]);
                }
            }
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|o| o.as_reference().ok());
    }
    BoundingBox::new(0.0, 0.0, 612.0, 792.0)
}

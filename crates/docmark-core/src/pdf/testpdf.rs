//! Synthetic PDFs for tests, built with lopdf
//!
//! Each page is described as a list of `(x, y, text)` lines placed with an
//! absolute text matrix, so tests can assert exact baselines.

use lopdf::{dictionary, Document, Object, Stream, StringFormat};

/// Build a PDF with one page per entry; each line is positioned at its
/// `(x, y)` baseline on a US Letter page
pub(crate) fn pdf_with_pages(pages: &[Vec<(f32, f32, &str)>]) -> Vec<u8> {
    pdf_with_pages_titled(None, pages)
}

/// Same as [`pdf_with_pages`], with an optional Info dictionary title
pub(crate) fn pdf_with_pages_titled(title: Option<&str>, pages: &[Vec<(f32, f32, &str)>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();

    for lines in pages {
        // A state push/pop keeps pages without text valid and non-empty
        let mut content = String::from("q Q\n");
        for (x, y, text) in lines {
            let escaped = text
                .replace('\\', "\\\\")
                .replace('(', "\\(")
                .replace(')', "\\)");
            content.push_str(&format!(
                "BT /F1 12 Tf 1 0 0 1 {x} {y} Tm ({escaped}) Tj ET\n"
            ));
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(pages.len() as i64),
    });

    for page_id in &page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(*page_id) {
            dict.set("Parent", pages_id);
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Single page containing one line of text at a fixed position
pub(crate) fn single_line_pdf(text: &str) -> Vec<u8> {
    pdf_with_pages(&[vec![(100.0, 700.0, text)]])
}

//! Exhibit label overlay.
//!
//! Every page gets `Exhibit <label>` centred half an inch below the top
//! edge (Helvetica-Bold 10 pt) and `Page n of m` centred half an inch above
//! the bottom edge (Helvetica 9 pt).
//!
//! The page's existing content streams are bracketed by a shared `q` stream
//! and an overlay stream that starts with `Q`, so whatever graphics state the
//! original content leaves behind cannot move, scale or recolour the label.

use super::font::{literal, Font};
use super::{inherited_attribute, media_box, resolve};
use crate::error::ExhibitError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Resource name of the regular face inside stamped pages.
const REGULAR_RESOURCE: &str = "ExhF1";
/// Resource name of the bold face inside stamped pages.
const BOLD_RESOURCE: &str = "ExhF2";

const HEADER_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 9.0;
/// Half an inch.
const EDGE_OFFSET: f32 = 36.0;

/// Stamp every page of `bytes` with the exhibit label and page numbers.
pub fn stamp_exhibit(bytes: &[u8], label: &str) -> Result<Vec<u8>, ExhibitError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| ExhibitError::CorruptPdf {
        name: format!("Exhibit {label}"),
        detail: e.to_string(),
    })?;

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(ExhibitError::PdfOperation(format!(
            "Exhibit {label} has no pages to stamp"
        )));
    }
    let total = pages.len();

    let regular_id = doc.add_object(Font::Helvetica.dictionary());
    let bold_id = doc.add_object(Font::HelveticaBold.dictionary());
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let header = format!("Exhibit {label}");

    for (i, &page_id) in pages.iter().enumerate() {
        let footer = format!("Page {} of {}", i + 1, total);
        let overlay = overlay_content(media_box(&doc, page_id), &header, &footer);
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay.into_bytes()));

        let resources = stamped_resources(&doc, page_id, regular_id, bold_id);
        let mut contents = vec![Object::Reference(save_id)];
        contents.extend(existing_contents(&doc, page_id));
        contents.push(Object::Reference(overlay_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| ExhibitError::PdfOperation(format!("Page {} of Exhibit {label}: {e}", i + 1)))?;
        page.set("Resources", resources);
        page.set("Contents", Object::Array(contents));
    }

    super::save(doc)
}

/// Content stream that closes the wrapped original and draws both labels.
fn overlay_content(bbox: [f32; 4], header: &str, footer: &str) -> String {
    let [x0, y0, x1, y1] = bbox;
    let width = x1 - x0;
    let header_x = x0 + (width - Font::HelveticaBold.text_width(header, HEADER_SIZE)) / 2.0;
    let footer_x = x0 + (width - Font::Helvetica.text_width(footer, FOOTER_SIZE)) / 2.0;

    // Leading newline: the previous stream may end mid-line.
    let mut out = String::from("\nQ\n0 g\n");
    out.push_str(&format!(
        "BT /{BOLD_RESOURCE} {HEADER_SIZE} Tf {header_x:.2} {:.2} Td {} Tj ET\n",
        y1 - EDGE_OFFSET,
        literal(header)
    ));
    out.push_str(&format!(
        "BT /{REGULAR_RESOURCE} {FOOTER_SIZE} Tf {footer_x:.2} {:.2} Td {} Tj ET\n",
        y0 + EDGE_OFFSET,
        literal(footer)
    ));
    out
}

/// Copy of the page's effective resources with the two label fonts added.
fn stamped_resources(doc: &Document, page_id: ObjectId, regular_id: ObjectId, bold_id: ObjectId) -> Object {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(obj) => match resolve(doc, &obj) {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut fonts = match resources.get(b"Font").map(|f| resolve(doc, f)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(REGULAR_RESOURCE, Object::Reference(regular_id));
    fonts.set(BOLD_RESOURCE, Object::Reference(bold_id));
    resources.set("Font", Object::Dictionary(fonts));
    Object::Dictionary(resources)
}

/// The page's content stream references, in drawing order.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

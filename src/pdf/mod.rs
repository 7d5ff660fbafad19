//! PDF handling stages for exhibit packaging.
//!
//! Each submodule implements exactly one transformation on PDF bytes, all
//! through lopdf so nothing needs a native library at runtime.
//!
//! ## Data Flow
//!
//! ```text
//! source bytes ──▶ image ──▶ compress ──▶ stamp ──▶ merge ◀── toc
//!                 (jpeg/png)  (optional)  (labels)   (final package)
//! ```
//!
//! 1. [`image`]    — wrap a JPEG/PNG into a single-page PDF
//! 2. [`compress`] — optional size reduction (Ghostscript, then lopdf)
//! 3. [`stamp`]    — `Exhibit X` header and `Page n of m` footer
//! 4. [`toc`]      — table-of-contents page(s)
//! 5. [`merge`]    — concatenate TOC and stamped exhibits in order

pub mod compress;
pub mod font;
pub mod image;
pub mod merge;
pub mod stamp;
pub mod toc;

use crate::error::ExhibitError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// US Letter width in points.
pub const LETTER_WIDTH: f32 = 612.0;
/// US Letter height in points.
pub const LETTER_HEIGHT: f32 = 792.0;

/// Check the `%PDF` magic bytes.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == b"%PDF"
}

/// Validate magic bytes and parse, returning the loaded document.
pub fn load(name: &str, bytes: &[u8]) -> Result<Document, ExhibitError> {
    if !is_pdf(bytes) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ExhibitError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Document::load_mem(bytes).map_err(|e| ExhibitError::CorruptPdf {
        name: name.to_string(),
        detail: e.to_string(),
    })
}

/// Number of pages in a PDF buffer.
pub fn page_count(name: &str, bytes: &[u8]) -> Result<usize, ExhibitError> {
    let doc = load(name, bytes)?;
    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(ExhibitError::CorruptPdf {
            name: name.to_string(),
            detail: "document has no pages".into(),
        });
    }
    Ok(pages)
}

/// Serialise a document, compressing streams first.
pub(crate) fn save(mut doc: Document) -> Result<Vec<u8>, ExhibitError> {
    doc.compress();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExhibitError::PdfOperation(format!("Failed to save PDF: {e}")))?;
    Ok(buffer)
}

/// Install a flat Pages node over `page_ids` plus a Catalog, and point the
/// trailer at it. Each page must already carry `/Parent pages_id`.
pub(crate) fn install_page_tree(doc: &mut Document, pages_id: ObjectId, page_ids: &[ObjectId]) {
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_ids.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
}

/// Look up `key` on a page, walking up the Pages tree for inherited
/// attributes. The depth limit guards against cyclic Parent links.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
    None
}

/// Resolve one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Effective MediaBox of a page as `[x0, y0, x1, y1]`, defaulting to Letter.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let fallback = [0.0, 0.0, LETTER_WIDTH, LETTER_HEIGHT];
    let Some(obj) = inherited_attribute(doc, page_id, b"MediaBox") else {
        return fallback;
    };
    let Ok(arr) = resolve(doc, &obj).as_array() else {
        return fallback;
    };
    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| match resolve(doc, o) {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        })
        .collect();
    if values.len() == 4 {
        [values[0], values[1], values[2], values[3]]
    } else {
        fallback
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::make_pdf;
    use super::*;

    #[test]
    fn page_count_of_generated_pdf() {
        let pdf = make_pdf(3, "T");
        assert_eq!(page_count("t.pdf", &pdf).unwrap(), 3);
    }

    #[test]
    fn non_pdf_bytes_are_rejected_with_magic() {
        let err = page_count("notes.txt", b"hello world").unwrap_err();
        match err {
            ExhibitError::NotAPdf { name, magic } => {
                assert_eq!(name, "notes.txt");
                assert_eq!(&magic, b"hell");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_pdf_is_corrupt() {
        let err = page_count("broken.pdf", b"%PDF-1.5\n garbage").unwrap_err();
        assert!(matches!(err, ExhibitError::CorruptPdf { .. }), "got {err}");
    }

    #[test]
    fn media_box_reads_page_value() {
        let pdf = make_pdf(1, "M");
        let doc = Document::load_mem(&pdf).unwrap();
        let page = doc.get_pages()[&1];
        assert_eq!(media_box(&doc, page), [0.0, 0.0, 612.0, 792.0]);
    }
}

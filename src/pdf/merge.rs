//! PDF concatenation.
//!
//! Every source document's objects are copied into the first one with their
//! ids shifted past the current maximum, so no two documents collide. The
//! result gets a single flat page tree in input order.

use super::inherited_attribute;
use crate::error::ExhibitError;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

/// Page attributes that may be inherited from an ancestor Pages node and
/// must be copied onto the page once it is re-parented.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Concatenate PDFs in order.
///
/// The algorithm:
/// 1. Reject an empty input and parse every document up front, so a bad
///    input is reported by its position before any work happens
/// 2. A single document is returned untouched
/// 3. Otherwise shift each later document's object ids past the running
///    maximum and copy its objects into the first document
/// 4. Copy inherited attributes onto every page, point all pages at one
///    Pages node, and drop what is no longer referenced
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, ExhibitError> {
    if documents.is_empty() {
        return Err(ExhibitError::PdfOperation("No documents to merge".into()));
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| ExhibitError::CorruptPdf {
            name: format!("merge input {i}"),
            detail: e.to_string(),
        })?;
        loaded.push(doc);
    }

    if loaded.len() == 1 {
        return documents
            .into_iter()
            .next()
            .ok_or_else(|| ExhibitError::Internal("document vanished during merge".into()));
    }

    let mut sources = loaded.into_iter();
    let mut dest = sources
        .next()
        .ok_or_else(|| ExhibitError::Internal("document vanished during merge".into()))?;
    let pages_id = pages_root(&dest)?;
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();
    let mut max_id = dest.max_id;

    for source in sources {
        let offset = max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();

        for (old_id, object) in source.objects {
            dest.objects
                .insert((old_id.0 + offset, old_id.1), remap_object_refs(object, offset));
        }
        page_refs.extend(source_pages.iter().map(|id| (id.0 + offset, id.1)));
        max_id = (source.max_id + offset).max(max_id);
    }
    dest.max_id = max_id;

    for &page_id in &page_refs {
        reparent_page(&mut dest, page_id, pages_id)?;
    }
    update_page_tree(&mut dest, pages_id, &page_refs)?;

    let pruned = dest.prune_objects();
    debug!(
        "Merged {} documents into {} pages ({} orphaned objects dropped)",
        documents.len(),
        page_refs.len(),
        pruned.len()
    );

    super::save(dest)
}

/// Object id of the catalog's Pages node.
fn pages_root(doc: &Document) -> Result<ObjectId, ExhibitError> {
    let catalog = doc
        .catalog()
        .map_err(|e| ExhibitError::PdfOperation(format!("Invalid catalog: {e}")))?;
    catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| ExhibitError::PdfOperation("Catalog has no Pages reference".into()))
}

/// Recursively shift every reference inside `obj` by `offset`.
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Materialise inherited attributes on the page and hang it off `pages_id`.
fn reparent_page(doc: &mut Document, page_id: ObjectId, pages_id: ObjectId) -> Result<(), ExhibitError> {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter_map(|key| inherited_attribute(doc, page_id, key).map(|v| (*key, v)))
        .collect();

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| ExhibitError::PdfOperation(format!("Page {page_id:?} is not a dictionary: {e}")))?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    page.set("Parent", Object::Reference(pages_id));
    Ok(())
}

/// Replace the Pages node's Kids and Count with the flattened page list.
fn update_page_tree(doc: &mut Document, pages_id: ObjectId, page_refs: &[ObjectId]) -> Result<(), ExhibitError> {
    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
            // Inherited attributes now live on each page.
            for key in INHERITABLE {
                pages_dict.remove(key);
            }
            Ok(())
        }
        _ => Err(ExhibitError::PdfOperation("Invalid pages dictionary".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testutil::{make_pdf, page_text};

    #[test]
    fn merge_empty_fails() {
        let err = merge_documents(vec![]).unwrap_err();
        assert!(err.to_string().contains("No documents"), "got: {err}");
    }

    #[test]
    fn merge_single_returns_input() {
        let pdf = make_pdf(2, "Only");
        let merged = merge_documents(vec![pdf.clone()]).unwrap();
        assert_eq!(merged, pdf);
    }

    #[test]
    fn merge_keeps_order_and_count() {
        let a = make_pdf(2, "A");
        let b = make_pdf(3, "B");
        let c = make_pdf(1, "C");
        let merged = merge_documents(vec![a, b, c]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 6);
        assert!(page_text(&merged, 1).contains("A-Page-1"));
        assert!(page_text(&merged, 2).contains("A-Page-2"));
        assert!(page_text(&merged, 3).contains("B-Page-1"));
        assert!(page_text(&merged, 5).contains("B-Page-3"));
        assert!(page_text(&merged, 6).contains("C-Page-1"));
    }

    #[test]
    fn merged_pages_share_one_parent() {
        let merged = merge_documents(vec![make_pdf(1, "X"), make_pdf(1, "Y")]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();
        let root = pages_root(&doc).unwrap();
        for page_id in doc.get_pages().values() {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            assert_eq!(page.get(b"Parent").unwrap().as_reference().unwrap(), root);
            assert!(page.get(b"MediaBox").is_ok());
        }
    }

    #[test]
    fn merge_reports_failing_index() {
        let err = merge_documents(vec![make_pdf(1, "ok"), b"%PDF-1.4 broken".to_vec()]).unwrap_err();
        match err {
            ExhibitError::CorruptPdf { name, .. } => assert_eq!(name, "merge input 1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

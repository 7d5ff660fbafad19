//! The ordered, in-memory exhibit list.
//!
//! Position in the list is exhibit order. Labels are derived, never stored
//! independently: after every mutation each record's label is recomputed
//! as `label(style, position)`, so reordering can never leave two exhibits
//! with the same label or a gap in the sequence.

use crate::error::ExhibitError;
use crate::numbering::{label, NumberingStyle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an exhibit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Upload,
    Zip,
    Drive,
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Upload => "upload",
            SourceKind::Zip => "zip",
            SourceKind::Drive => "drive",
            SourceKind::Url => "url",
        })
    }
}

/// Everything needed to add an exhibit, before it has an id or label.
#[derive(Debug, Clone)]
pub struct ExhibitDraft {
    pub source: SourceKind,
    pub display_name: String,
    pub content: Vec<u8>,
    pub original_url: Option<String>,
    /// Drive path or ZIP entry path, for display.
    pub origin: Option<String>,
}

impl ExhibitDraft {
    pub fn new(source: SourceKind, display_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            source,
            display_name: display_name.into(),
            content,
            original_url: None,
            origin: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = Some(url.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// One exhibit in the list.
#[derive(Clone, Serialize)]
pub struct ExhibitRecord {
    /// Stable handle, unique within the list.
    pub id: u64,
    pub source: SourceKind,
    pub display_name: String,
    #[serde(skip)]
    pub content: Vec<u8>,
    pub label: String,
    pub original_url: Option<String>,
    pub archived_url: Option<String>,
    pub page_count: usize,
    pub origin: Option<String>,
}

impl fmt::Debug for ExhibitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExhibitRecord")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("source", &self.source)
            .field("display_name", &self.display_name)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("page_count", &self.page_count)
            .field("original_url", &self.original_url)
            .field("archived_url", &self.archived_url)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Ordered exhibit records plus the numbering style that labels them.
#[derive(Debug, Clone, Default)]
pub struct ExhibitList {
    records: Vec<ExhibitRecord>,
    style: NumberingStyle,
    next_id: u64,
}

impl ExhibitList {
    pub fn new(style: NumberingStyle) -> Self {
        Self {
            records: Vec::new(),
            style,
            next_id: 1,
        }
    }

    pub fn style(&self) -> NumberingStyle {
        self.style
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExhibitRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExhibitRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: u64) -> Option<&ExhibitRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Position of the record with `id`.
    pub fn position(&self, id: u64) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// Total pages across all exhibits.
    pub fn total_pages(&self) -> usize {
        self.records.iter().map(|r| r.page_count).sum()
    }

    /// Append a draft, validating that its content is a readable PDF.
    /// Returns the new record's id.
    pub fn push(&mut self, draft: ExhibitDraft) -> Result<u64, ExhibitError> {
        let page_count = crate::pdf::page_count(&draft.display_name, &draft.content)?;
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.records.push(ExhibitRecord {
            id,
            source: draft.source,
            display_name: draft.display_name,
            content: draft.content,
            label: String::new(),
            original_url: draft.original_url,
            archived_url: None,
            page_count,
            origin: draft.origin,
        });
        self.relabel();
        Ok(id)
    }

    /// Remove the record with `id` and return it.
    pub fn remove(&mut self, id: u64) -> Option<ExhibitRecord> {
        let pos = self.position(id)?;
        let removed = self.records.remove(pos);
        self.relabel();
        Some(removed)
    }

    /// Move the item at position `from` to position `to` (both 0-indexed);
    /// items in between shift by one.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), ExhibitError> {
        let len = self.records.len();
        for index in [from, to] {
            if index >= len {
                return Err(ExhibitError::IndexOutOfRange { index, len });
            }
        }
        let record = self.records.remove(from);
        self.records.insert(to, record);
        self.relabel();
        Ok(())
    }

    /// Move the record with `id` to position `to`.
    pub fn move_to(&mut self, id: u64, to: usize) -> Result<(), ExhibitError> {
        let from = self.require(id)?;
        self.move_item(from, to)
    }

    /// Exchange two positions.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ExhibitError> {
        let len = self.records.len();
        for index in [a, b] {
            if index >= len {
                return Err(ExhibitError::IndexOutOfRange { index, len });
            }
        }
        self.records.swap(a, b);
        self.relabel();
        Ok(())
    }

    /// Move one place towards the front. A no-op for the first record.
    pub fn move_up(&mut self, id: u64) -> Result<(), ExhibitError> {
        let pos = self.require(id)?;
        if pos > 0 {
            self.swap(pos, pos - 1)?;
        }
        Ok(())
    }

    /// Move one place towards the back. A no-op for the last record.
    pub fn move_down(&mut self, id: u64) -> Result<(), ExhibitError> {
        let pos = self.require(id)?;
        if pos + 1 < self.records.len() {
            self.swap(pos, pos + 1)?;
        }
        Ok(())
    }

    pub fn set_style(&mut self, style: NumberingStyle) {
        self.style = style;
        self.relabel();
    }

    pub fn set_archived_url(&mut self, id: u64, archived: impl Into<String>) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.archived_url = Some(archived.into());
                true
            }
            None => false,
        }
    }

    /// Drop every record. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Current labels in list order.
    pub fn labels(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.label.as_str()).collect()
    }

    fn require(&self, id: u64) -> Result<usize, ExhibitError> {
        self.position(id).ok_or(ExhibitError::ExhibitNotFound { id })
    }

    fn relabel(&mut self) {
        let style = self.style;
        for (i, record) in self.records.iter_mut().enumerate() {
            record.label = label(style, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testutil::make_pdf;

    fn list_of(names: &[&str]) -> (ExhibitList, Vec<u64>) {
        let mut list = ExhibitList::new(NumberingStyle::Letters);
        let ids = names
            .iter()
            .map(|n| {
                list.push(ExhibitDraft::new(SourceKind::Upload, *n, make_pdf(1, n)))
                    .unwrap()
            })
            .collect();
        (list, ids)
    }

    fn names(list: &ExhibitList) -> Vec<&str> {
        list.iter().map(|r| r.display_name.as_str()).collect()
    }

    fn assert_labels_consistent(list: &ExhibitList) {
        for (i, r) in list.iter().enumerate() {
            assert_eq!(r.label, label(list.style(), i));
        }
    }

    #[test]
    fn push_assigns_sequential_labels_and_page_counts() {
        let mut list = ExhibitList::new(NumberingStyle::Letters);
        list.push(ExhibitDraft::new(SourceKind::Upload, "a", make_pdf(2, "a"))).unwrap();
        list.push(ExhibitDraft::new(SourceKind::Zip, "b", make_pdf(3, "b"))).unwrap();
        assert_eq!(list.labels(), vec!["A", "B"]);
        assert_eq!(list.total_pages(), 5);
        assert_eq!(list.records()[1].source, SourceKind::Zip);
    }

    #[test]
    fn push_rejects_non_pdf_and_leaves_list_untouched() {
        let (mut list, _) = list_of(&["a"]);
        let err = list
            .push(ExhibitDraft::new(SourceKind::Upload, "bad.txt", b"hello".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ExhibitError::NotAPdf { .. }));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_relabels() {
        let (mut list, ids) = list_of(&["a", "b", "c"]);
        let removed = list.remove(ids[0]).unwrap();
        assert_eq!(removed.display_name, "a");
        assert_eq!(names(&list), vec!["b", "c"]);
        assert_eq!(list.labels(), vec!["A", "B"]);
        assert!(list.remove(ids[0]).is_none());
    }

    #[test]
    fn move_item_shifts_between() {
        let (mut list, _) = list_of(&["a", "b", "c", "d"]);
        list.move_item(3, 0).unwrap();
        assert_eq!(names(&list), vec!["d", "a", "b", "c"]);
        list.move_item(0, 2).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "d", "c"]);
        assert_labels_consistent(&list);
        assert!(matches!(
            list.move_item(0, 9),
            Err(ExhibitError::IndexOutOfRange { index: 9, len: 4 })
        ));
    }

    #[test]
    fn move_up_and_down_with_edges() {
        let (mut list, ids) = list_of(&["a", "b", "c"]);
        list.move_up(ids[0]).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "c"]);
        list.move_down(ids[2]).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "c"]);
        list.move_down(ids[0]).unwrap();
        assert_eq!(names(&list), vec!["b", "a", "c"]);
        list.move_up(ids[2]).unwrap();
        assert_eq!(names(&list), vec!["b", "c", "a"]);
        assert_eq!(list.get(ids[2]).unwrap().label, "B");
        assert!(matches!(
            list.move_up(999),
            Err(ExhibitError::ExhibitNotFound { id: 999 })
        ));
    }

    #[test]
    fn restyle_relabels_everything() {
        let (mut list, _) = list_of(&["a", "b", "c", "d"]);
        list.set_style(NumberingStyle::Roman);
        assert_eq!(list.labels(), vec!["I", "II", "III", "IV"]);
        list.set_style(NumberingStyle::Numbers);
        assert_eq!(list.labels(), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn ids_stay_unique_after_clear() {
        let (mut list, ids) = list_of(&["a", "b"]);
        list.clear();
        assert!(list.is_empty());
        let id = list
            .push(ExhibitDraft::new(SourceKind::Url, "c", make_pdf(1, "c")))
            .unwrap();
        assert!(!ids.contains(&id));
        assert_eq!(list.labels(), vec!["A"]);
    }

    #[test]
    fn archived_url_is_set_by_id() {
        let (mut list, ids) = list_of(&["a"]);
        assert!(list.set_archived_url(ids[0], "https://web.archive.org/web/1/x"));
        assert!(!list.set_archived_url(42, "nope"));
        assert_eq!(
            list.get(ids[0]).unwrap().archived_url.as_deref(),
            Some("https://web.archive.org/web/1/x")
        );
    }
}

//! Shared fixtures and fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use exhibit_packager::{
    ArchiveOutcome, Archiver, DriveApi, DriveFile, ExhibitError, PdfConverter,
};
use lopdf::{Dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;

// ── PDFs ─────────────────────────────────────────────────────────────────────

/// A valid PDF with `pages` Letter pages carrying `"{tag}-Page-{n}"`.
pub fn make_pdf(pages: u32, tag: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", "Font".into()),
        ("Subtype", "Type1".into()),
        ("BaseFont", "Helvetica".into()),
    ]));

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content = format!("BT /F1 12 Tf 72 700 Td ({tag}-Page-{n}) Tj ET");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", "Page".into()),
            ("Parent", pages_id.into()),
            ("Contents", content_id.into()),
            (
                "Resources",
                Dictionary::from_iter(vec![(
                    "Font",
                    Dictionary::from_iter(vec![("F1", font_id.into())]).into(),
                )])
                .into(),
            ),
            ("MediaBox", vec![0.into(), 0.into(), 612.into(), 792.into()].into()),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Object::Integer(pages as i64)),
            ("Kids", Object::Array(kids)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", "Catalog".into()),
        ("Pages", pages_id.into()),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Decoded content streams of one 1-based page.
pub fn page_text(pdf: &[u8], page: u32) -> String {
    let doc = Document::load_mem(pdf).unwrap();
    let id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned()
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// A ZIP archive holding `entries` as stored files.
pub fn make_zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    use zip::write::FileOptions;
    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Returns a one-page PDF tagged with the URL's last segment; URLs containing
/// "broken" fail.
pub struct FakeConverter;

#[async_trait]
impl PdfConverter for FakeConverter {
    async fn convert(&self, url: &str) -> Result<Vec<u8>, ExhibitError> {
        if url.contains("broken") {
            return Err(ExhibitError::ConversionFailed {
                url: url.to_string(),
                reason: "HTTP 502".into(),
            });
        }
        let tag = url.rsplit('/').next().unwrap_or("web");
        Ok(make_pdf(1, tag))
    }
}

/// Archives everything unless `fail_all` is set.
#[derive(Default)]
pub struct FakeArchiver {
    pub fail_all: bool,
    pub requests: Mutex<Vec<String>>,
}

#[async_trait]
impl Archiver for FakeArchiver {
    async fn archive(&self, url: &str) -> ArchiveOutcome {
        self.requests.lock().unwrap().push(url.to_string());
        if self.fail_all {
            ArchiveOutcome::failed(url, "connection refused")
        } else {
            ArchiveOutcome::archived(
                url,
                format!("https://web.archive.org/web/20240101000000/{url}"),
                false,
            )
        }
    }

    async fn check_existing(&self, _url: &str) -> Option<String> {
        None
    }
}

/// Folder id → children; file id → bytes.
#[derive(Default)]
pub struct FakeDrive {
    pub folders: HashMap<String, Vec<DriveFile>>,
    pub files: HashMap<String, Vec<u8>>,
}

pub fn drive_item(id: &str, name: &str, mime: &str) -> DriveFile {
    DriveFile {
        id: id.into(),
        name: name.into(),
        mime_type: mime.into(),
        size: None,
        created_time: None,
        path: name.into(),
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ExhibitError> {
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| ExhibitError::DriveFolderNotFound {
                folder_id: folder_id.into(),
            })
    }

    async fn download(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError> {
        self.files
            .get(&file.id)
            .cloned()
            .ok_or_else(|| ExhibitError::DriveApi {
                message: format!("missing {}", file.id),
            })
    }

    async fn export_pdf(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError> {
        self.download(file).await
    }
}

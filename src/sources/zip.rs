//! PDF extraction from ZIP archives.
//!
//! Entries are taken in archive order. Only files whose name ends in `.pdf`
//! (any case) are considered; directories, macOS resource forks under
//! `__MACOSX/`, dot-files and entries whose path would escape the archive
//! root are ignored.

use crate::error::{ExhibitError, SourceError};
use crate::exhibit::{ExhibitDraft, SourceKind};
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Result of extracting an archive.
#[derive(Debug, Default)]
pub struct ZipImport {
    pub drafts: Vec<ExhibitDraft>,
    /// PDF-named entries that could not be read or were not PDFs.
    pub skipped: Vec<SourceError>,
}

/// Whether an entry name is a PDF worth extracting.
pub fn is_pdf_entry(name: &str) -> bool {
    if name.ends_with('/') || !name.to_lowercase().ends_with(".pdf") {
        return false;
    }
    if name.split('/').any(|part| part == "__MACOSX") {
        return false;
    }
    let base = name.rsplit('/').next().unwrap_or(name);
    !base.starts_with('.')
}

fn open(archive_name: &str, bytes: &[u8]) -> Result<ZipArchive<Cursor<Vec<u8>>>, ExhibitError> {
    ZipArchive::new(Cursor::new(bytes.to_vec())).map_err(|e| ExhibitError::ZipFailed {
        name: archive_name.to_string(),
        detail: e.to_string(),
    })
}

/// Number of PDF entries, without extracting them.
pub fn count_pdfs(archive_name: &str, bytes: &[u8]) -> Result<usize, ExhibitError> {
    let mut archive = open(archive_name, bytes)?;
    let mut count = 0;
    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(|e| ExhibitError::ZipFailed {
            name: archive_name.to_string(),
            detail: e.to_string(),
        })?;
        if !file.is_dir() && is_pdf_entry(file.name()) && file.enclosed_name().is_some() {
            count += 1;
        }
    }
    Ok(count)
}

/// Extract every PDF entry as a draft exhibit, in archive order.
///
/// Fails with [`ExhibitError::NoPdfsInArchive`] when nothing usable was found.
pub fn extract_pdfs(archive_name: &str, bytes: &[u8]) -> Result<ZipImport, ExhibitError> {
    let mut archive = open(archive_name, bytes)?;
    let mut import = ZipImport::default();

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(f) => f,
            Err(e) => {
                warn!("{archive_name}: entry #{i} unreadable: {e}");
                import.skipped.push(SourceError::ZipEntrySkipped {
                    entry: format!("#{i}"),
                    detail: e.to_string(),
                });
                continue;
            }
        };
        let entry = file.name().to_string();
        if file.is_dir() || !is_pdf_entry(&entry) {
            continue;
        }
        if file.enclosed_name().is_none() {
            warn!("{archive_name}: skipping unsafe entry path {entry}");
            continue;
        }

        let mut content = Vec::new();
        if let Err(e) = file.read_to_end(&mut content) {
            import.skipped.push(SourceError::ZipEntrySkipped {
                entry,
                detail: e.to_string(),
            });
            continue;
        }
        if !crate::pdf::is_pdf(&content) {
            import.skipped.push(SourceError::ZipEntrySkipped {
                entry,
                detail: "not a PDF (missing %PDF header)".into(),
            });
            continue;
        }

        let display = entry.rsplit('/').next().unwrap_or(&entry).to_string();
        debug!("{archive_name}: extracted {entry} ({} bytes)", content.len());
        import
            .drafts
            .push(ExhibitDraft::new(SourceKind::Zip, display, content).with_origin(entry));
    }

    if import.drafts.is_empty() {
        return Err(ExhibitError::NoPdfsInArchive {
            name: archive_name.to_string(),
        });
    }
    Ok(import)
}

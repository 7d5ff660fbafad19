//! Local file uploads.

use crate::error::ExhibitError;
use crate::exhibit::{ExhibitDraft, SourceKind};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read a local PDF (or JPEG/PNG, wrapped into a PDF) as a draft exhibit.
///
/// The display name is the file name as given.
pub async fn read_upload(path: &Path) -> Result<ExhibitDraft, ExhibitError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ExhibitError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ExhibitError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExhibitError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = display_name(path);
    let content = super::ensure_pdf(&name, bytes)?;
    debug!("Read upload {} ({} bytes)", path.display(), content.len());
    Ok(ExhibitDraft::new(SourceKind::Upload, name, content).with_origin(path.display().to_string()))
}

/// File name component of `path`, or the whole path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testutil::make_pdf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_valid_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, make_pdf(2, "R")).unwrap();

        let draft = read_upload(&path).await.unwrap();
        assert_eq!(draft.display_name, "resume.pdf");
        assert_eq!(draft.source, SourceKind::Upload);
        assert!(crate::pdf::is_pdf(&draft.content));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = read_upload(Path::new("/definitely/not/here.pdf")).await.unwrap_err();
        assert!(matches!(err, ExhibitError::FileNotFound { .. }), "got {err}");
    }

    #[tokio::test]
    async fn directory_is_a_read_failure_not_missing() {
        let dir = TempDir::new().unwrap();
        let err = read_upload(dir.path()).await.unwrap_err();
        assert!(matches!(err, ExhibitError::ReadFailed { .. }), "got {err}");
    }

    #[tokio::test]
    async fn text_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let err = read_upload(&path).await.unwrap_err();
        assert!(matches!(err, ExhibitError::NotAPdf { .. }), "got {err}");
    }

    #[tokio::test]
    async fn png_upload_becomes_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, crate::pdf::image::tests::png_bytes(10, 10)).unwrap();
        let draft = read_upload(&path).await.unwrap();
        assert_eq!(draft.display_name, "scan.png");
        assert_eq!(crate::pdf::page_count("scan", &draft.content).unwrap(), 1);
    }
}

//! Error types for the exhibit-packager library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExhibitError`] — **Fatal for one action**: the requested step cannot
//!   proceed at all (unreadable file, bad Drive credentials, missing API key,
//!   nothing to package). Returned as `Err(ExhibitError)` from the session and
//!   package functions. The exhibit list itself is never corrupted by one.
//!
//! * [`SourceError`] — **Non-fatal**: a single exhibit degraded or was
//!   skipped (a URL could not be converted, a Drive file failed to download,
//!   stamping fell back to the unstamped original). Collected into the
//!   session and package reports so callers can show them inline.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the exhibit-packager library.
#[derive(Debug, Error)]
pub enum ExhibitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading an input (a directory, a device…).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// Image exhibit could not be decoded.
    #[error("Image '{name}' could not be decoded: {detail}")]
    InvalidImage { name: String, detail: String },

    /// The ZIP container itself is unreadable.
    #[error("ZIP archive '{name}' could not be read: {detail}")]
    ZipFailed { name: String, detail: String },

    /// The ZIP archive was readable but held no PDF entries.
    #[error("No PDF files found in ZIP archive '{name}'")]
    NoPdfsInArchive { name: String },

    // ── Network errors ────────────────────────────────────────────────────
    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input string is not a valid HTTP/HTTPS URL.
    #[error("Invalid URL '{input}': expected an http:// or https:// address")]
    InvalidUrl { input: String },

    // ── Google Drive errors ───────────────────────────────────────────────
    /// The service-account JSON could not be parsed or lacks required fields.
    #[error("Invalid Google service-account credentials: {detail}")]
    InvalidCredentials { detail: String },

    /// Token exchange or an API call was rejected as unauthenticated.
    #[error("Google Drive authentication failed: {detail}")]
    DriveAuthFailed { detail: String },

    /// Drive answered 404 for the folder.
    #[error("Google Drive folder '{folder_id}' was not found.\nCheck the folder URL.")]
    DriveFolderNotFound { folder_id: String },

    /// Drive answered 403: the service account cannot see the folder or file.
    #[error(
        "Permission denied for Google Drive item '{id}'.\n\
Share the folder with the service account's client_email."
    )]
    DrivePermissionDenied { id: String },

    /// Any other Drive API failure.
    #[error("Google Drive API error: {message}")]
    DriveApi { message: String },

    // ── Conversion API errors ─────────────────────────────────────────────
    /// URL-to-PDF conversion needs an API key and none was configured.
    #[error(
        "No PDF conversion API key configured.\n\
Set API2PDF_API_KEY or pass --api2pdf-key to convert web pages to PDF."
    )]
    ApiKeyMissing,

    /// Conversion API rejected the key (401/403).
    #[error("Conversion API rejected the API key: {detail}")]
    AuthError { detail: String },

    /// Conversion API returned an error for this URL.
    #[error("Failed to convert '{url}' to PDF: {reason}")]
    ConversionFailed { url: String, reason: String },

    // ── List / package errors ─────────────────────────────────────────────
    /// A reorder or removal referred to a position that does not exist.
    #[error("Exhibit position {index} is out of range (list has {len} exhibits)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No exhibit in the list has this id.
    #[error("No exhibit with id {id} in the list")]
    ExhibitNotFound { id: u64 },

    /// Generation was requested on an empty list.
    #[error("No exhibits to package.\nAdd PDFs, a ZIP archive, a Drive folder, or URLs first.")]
    NothingToPackage,

    /// A lopdf operation failed while building output.
    #[error("PDF operation failed: {0}")]
    PdfOperation(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal problem affecting one exhibit.
///
/// The action that produced it carried on; the exhibit was either skipped or
/// kept in a degraded form (e.g. without its label stamp).
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// A URL could not be turned into a PDF and was not added.
    #[error("{url}: could not be converted to PDF: {detail}")]
    UrlSkipped { url: String, detail: String },

    /// A Drive file failed to download or convert and was not added.
    #[error("Drive file '{name}' skipped: {detail}")]
    DriveFileSkipped { name: String, detail: String },

    /// A Drive file's MIME type cannot be turned into a PDF.
    #[error("Drive file '{name}' skipped: unsupported type {mime_type}")]
    UnsupportedDriveType { name: String, mime_type: String },

    /// A ZIP entry could not be read or was not a valid PDF.
    #[error("ZIP entry '{entry}' skipped: {detail}")]
    ZipEntrySkipped { entry: String, detail: String },

    /// Archiving failed; the original URL was kept.
    #[error("{url}: archive.org snapshot failed, keeping original URL: {detail}")]
    ArchiveFallback { url: String, detail: String },

    /// Stamping failed; the exhibit was merged without its label header.
    #[error("Exhibit {label}: label stamp failed, using original pages: {detail}")]
    StampFallback { label: String, detail: String },

    /// A whole input (file, archive, folder, URL list) was rejected; the
    /// remaining inputs were still added.
    #[error("Input '{input}' skipped: {detail}")]
    InputSkipped { input: String, detail: String },

    /// Compression failed or did not help; the original bytes were kept.
    #[error("Exhibit {label}: compression skipped: {detail}")]
    CompressionSkipped { label: String, detail: String },
}

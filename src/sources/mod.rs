//! Exhibit sources.
//!
//! Each submodule turns one kind of input into [`ExhibitDraft`]s whose
//! content is always PDF bytes.
//!
//! ## Data Flow
//!
//! ```text
//! local file ──▶ upload ─┐
//! .zip       ──▶ zip    ─┤
//! Drive URL  ──▶ drive  ─┼──▶ ExhibitDraft ──▶ ExhibitList::push
//! web URL    ──▶ url    ─┘
//! ```
//!
//! 1. [`upload`] — validate a local PDF, or wrap a JPEG/PNG
//! 2. [`zip`]    — extract `.pdf` entries in archive order
//! 3. [`drive`]  — service-account auth, recursive folder walk, download
//! 4. [`url`]    — direct download, or conversion through the PDF API
//!
//! [`ExhibitDraft`]: crate::exhibit::ExhibitDraft

pub mod drive;
pub mod upload;
pub mod url;
pub mod zip;

use crate::error::ExhibitError;
use crate::pdf;
use std::time::Duration;
use tracing::debug;

/// Browser-like User-Agent; some hosts refuse to serve files to unknown clients.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// A reqwest client with the crate's User-Agent and the given timeout.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ExhibitError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ExhibitError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Map a reqwest transport error onto the download error variants.
pub(crate) fn download_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> ExhibitError {
    if e.is_timeout() {
        ExhibitError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        ExhibitError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Make sure `bytes` are a PDF: pass PDFs through, wrap JPEG/PNG into a
/// one-page PDF, reject anything else.
pub fn ensure_pdf(name: &str, bytes: Vec<u8>) -> Result<Vec<u8>, ExhibitError> {
    if pdf::is_pdf(&bytes) {
        return Ok(bytes);
    }
    if pdf::image::is_supported_image(&bytes) {
        debug!("{name}: converting image to PDF");
        return pdf::image::image_to_pdf(name, &bytes);
    }
    // Produces NotAPdf with the offending magic bytes.
    pdf::load(name, &bytes).map(|_| bytes)
}

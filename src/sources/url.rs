//! Web URLs turned into PDF exhibits.
//!
//! ## Strategy
//!
//! 1. **Direct download.** Google Drive share links are rewritten to their
//!    `uc?export=download` form first. If the response body is already a PDF
//!    it is used as-is. Drive's "cannot scan for viruses" interstitial is
//!    followed once via its confirm link.
//! 2. **Conversion API.** Anything else (an HTML page, a blocked download)
//!    is rendered by the headless-Chrome endpoint of the conversion API,
//!    and the resulting file is downloaded.
//!
//! The HTTP side sits behind [`PdfConverter`] so sessions can be tested with
//! a fake converter.

use crate::error::ExhibitError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Chrome URL-to-PDF endpoint of the conversion API.
pub const API2PDF_ENDPOINT: &str = "https://v2.api2pdf.com/chrome/pdf/url";

const DRIVE_DOWNLOAD_BASE: &str = "https://drive.google.com/uc?export=download&id=";

static RE_DRIVE_CONFIRM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(/uc\?export=download[^"]+)""#).unwrap());

/// Anything that can turn a URL into PDF bytes.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, url: &str) -> Result<Vec<u8>, ExhibitError>;
}

// ── URL helpers ──────────────────────────────────────────────────────────────

/// Id of a Google Drive file link, if `url` is one.
///
/// Recognises `/file/d/<id>/…`, `open?id=<id>`, `preview?id=<id>` and any
/// `id=<id>` query parameter on a `drive.google.com` host.
pub fn drive_file_id(url: &str) -> Option<String> {
    if !url.contains("drive.google.com") {
        return None;
    }
    let id = if let Some((_, rest)) = url.split_once("/file/d/") {
        rest.split(['/', '?', '#']).next()
    } else if let Some((_, rest)) = url.split_once("id=") {
        rest.split(['&', '#']).next()
    } else {
        None
    }?;
    (!id.is_empty()).then(|| id.to_string())
}

/// The direct-download form of a Drive file link, or `None` for other URLs.
pub fn drive_download_url(url: &str) -> Option<String> {
    drive_file_id(url).map(|id| format!("{DRIVE_DOWNLOAD_BASE}{id}"))
}

/// Display name for an exhibit fetched from `url`.
///
/// Last path segment with `.pdf` appended when missing; Drive file links
/// become `drive_file_<id>.pdf`; anything without a usable segment becomes
/// `downloaded_file.pdf`.
pub fn filename_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme.split(['?', '#']).next().unwrap_or("");
    let segment = path
        .split_once('/')
        .map(|(_, p)| p.rsplit('/').next().unwrap_or(""))
        .unwrap_or("");

    if url.contains("drive.google.com") {
        if let Some(id) = drive_file_id(url) {
            if segment.is_empty() || segment == "view" || segment == "uc" || segment == "open" {
                return format!("drive_file_{id}.pdf");
            }
        }
    }
    if segment.is_empty() {
        return "downloaded_file.pdf".into();
    }
    if segment.to_lowercase().ends_with(".pdf") {
        segment.to_string()
    } else {
        format!("{segment}.pdf")
    }
}

/// Absolute confirm link from Drive's virus-scan interstitial page.
pub(crate) fn drive_confirm_link(html: &str) -> Option<String> {
    RE_DRIVE_CONFIRM
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| format!("https://drive.google.com{}", m.as_str().replace("&amp;", "&")))
}

// ── HTTP converter ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Api2PdfResponse {
    #[serde(rename = "FileUrl")]
    file_url: Option<String>,
    #[serde(rename = "Success", default)]
    success: Option<bool>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Direct download with conversion-API fallback.
pub struct HttpPdfConverter {
    client: reqwest::Client,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl HttpPdfConverter {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Result<Self, ExhibitError> {
        Ok(Self {
            client: super::http_client(timeout_secs)?,
            api_key,
            timeout_secs,
        })
    }

    /// Try to fetch a PDF without conversion. `Ok(None)` means the URL did
    /// not serve a PDF.
    async fn try_direct(&self, url: &str) -> Result<Option<Vec<u8>>, ExhibitError> {
        let target = drive_download_url(url).unwrap_or_else(|| url.to_string());
        let body = self.get_bytes(&target).await?;
        if crate::pdf::is_pdf(&body) {
            return Ok(Some(body));
        }

        if target.starts_with(DRIVE_DOWNLOAD_BASE) {
            let html = String::from_utf8_lossy(&body);
            if let Some(confirm) = drive_confirm_link(&html) {
                debug!("Following Drive confirm link for {url}");
                let body = self.get_bytes(&confirm).await?;
                if crate::pdf::is_pdf(&body) {
                    return Ok(Some(body));
                }
            }
        }
        Ok(None)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ExhibitError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| super::download_error(url, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(ExhibitError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| super::download_error(url, self.timeout_secs, e))
    }

    async fn convert_via_api(&self, url: &str) -> Result<Vec<u8>, ExhibitError> {
        let key = self.api_key.as_deref().ok_or(ExhibitError::ApiKeyMissing)?;

        let response = self
            .client
            .post(API2PDF_ENDPOINT)
            .header("Authorization", key)
            .json(&serde_json::json!({ "url": url, "inline": false }))
            .send()
            .await
            .map_err(|e| super::download_error(API2PDF_ENDPOINT, self.timeout_secs, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ExhibitError::AuthError {
                detail: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExhibitError::ConversionFailed {
                url: url.to_string(),
                reason: format!("HTTP {status}: {}", body.trim()),
            });
        }

        let parsed: Api2PdfResponse =
            response
                .json()
                .await
                .map_err(|e| ExhibitError::ConversionFailed {
                    url: url.to_string(),
                    reason: format!("unreadable API response: {e}"),
                })?;

        let file_url = match (parsed.file_url, parsed.success) {
            (Some(f), Some(true) | None) => f,
            (_, _) => {
                return Err(ExhibitError::ConversionFailed {
                    url: url.to_string(),
                    reason: parsed.error.unwrap_or_else(|| "no FileUrl in response".into()),
                })
            }
        };

        let pdf = self.get_bytes(&file_url).await?;
        if !crate::pdf::is_pdf(&pdf) {
            return Err(ExhibitError::ConversionFailed {
                url: url.to_string(),
                reason: "converted file is not a PDF".into(),
            });
        }
        Ok(pdf)
    }
}

#[async_trait]
impl PdfConverter for HttpPdfConverter {
    async fn convert(&self, url: &str) -> Result<Vec<u8>, ExhibitError> {
        if !super::is_url(url) {
            return Err(ExhibitError::InvalidUrl {
                input: url.to_string(),
            });
        }

        match self.try_direct(url).await {
            Ok(Some(pdf)) => {
                info!("Downloaded PDF directly from {url} ({} bytes)", pdf.len());
                return Ok(pdf);
            }
            Ok(None) => debug!("{url} did not serve a PDF, converting"),
            Err(e) => warn!("Direct download of {url} failed: {e}; converting"),
        }

        let pdf = self.convert_via_api(url).await?;
        info!("Converted {url} to PDF ({} bytes)", pdf.len());
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_links_are_rewritten() {
        let expected = Some("https://drive.google.com/uc?export=download&id=1AbC_d-9".to_string());
        assert_eq!(
            drive_download_url("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing"),
            expected
        );
        assert_eq!(drive_download_url("https://drive.google.com/open?id=1AbC_d-9"), expected);
        assert_eq!(
            drive_download_url("https://drive.google.com/uc?id=1AbC_d-9&export=download"),
            expected
        );
        assert_eq!(drive_download_url("https://example.com/file/d/xyz"), None);
        assert_eq!(drive_download_url("https://drive.google.com/drive/my-drive"), None);
    }

    #[test]
    fn filenames() {
        assert_eq!(filename_from_url("https://example.com/docs/award.pdf"), "award.pdf");
        assert_eq!(filename_from_url("https://example.com/news/article?x=1"), "article.pdf");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded_file.pdf");
        assert_eq!(filename_from_url("https://example.com"), "downloaded_file.pdf");
        assert_eq!(
            filename_from_url("https://drive.google.com/file/d/ABC123/view"),
            "drive_file_ABC123.pdf"
        );
    }

    #[test]
    fn confirm_link_is_extracted() {
        let html = r#"<form><a id="uc-download-link" href="/uc?export=download&amp;confirm=t&amp;id=XYZ">Download anyway</a></form>"#;
        assert_eq!(
            drive_confirm_link(html).as_deref(),
            Some("https://drive.google.com/uc?export=download&confirm=t&id=XYZ")
        );
        assert_eq!(drive_confirm_link("<html></html>"), None);
    }

    #[tokio::test]
    async fn non_url_is_rejected_before_network() {
        let converter = HttpPdfConverter::new(None, 5).unwrap();
        let err = converter.convert("not a url").await.unwrap_err();
        assert!(matches!(err, ExhibitError::InvalidUrl { .. }), "got {err}");
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let converter = HttpPdfConverter::new(None, 5).unwrap();
        let err = converter.convert_via_api("https://example.com").await.unwrap_err();
        assert!(matches!(err, ExhibitError::ApiKeyMissing), "got {err}");
    }
}

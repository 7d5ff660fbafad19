//! Optional per-exhibit size reduction.
//!
//! Two tiers are tried in order:
//!
//! 1. **Ghostscript** (`gs`, or `gswin64c` on Windows) rewrites the file with
//!    the preset's `-dPDFSETTINGS` profile and image resolutions. Only used
//!    when the binary is on `PATH`.
//! 2. **lopdf** drops unreferenced objects and empty streams and
//!    flate-compresses every uncompressed stream. Lossless.
//!
//! A tier's output is accepted only if it is a valid PDF strictly smaller
//! than the input; otherwise the original bytes come back unchanged.

use crate::config::QualityPreset;
use crate::error::ExhibitError;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Which tier produced the returned bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Ghostscript,
    Lopdf,
    /// Nothing helped; the input was returned as-is.
    None,
}

/// Result of compressing one document.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    pub method: CompressionMethod,
}

impl CompressionOutcome {
    /// Size reduction in percent (0 when nothing changed).
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_size as f64 / self.original_size as f64) * 100.0
    }

    fn unchanged(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            original_size: bytes.len(),
            compressed_size: bytes.len(),
            method: CompressionMethod::None,
        }
    }
}

/// Compress `bytes` with `preset`, falling back tier by tier.
///
/// Never fails because compression did not help; errors are reserved for
/// input that is not a PDF at all.
pub async fn compress_pdf(
    name: &str,
    bytes: &[u8],
    preset: QualityPreset,
) -> Result<CompressionOutcome, ExhibitError> {
    if !super::is_pdf(bytes) {
        // Yields NotAPdf with the offending magic bytes.
        super::load(name, bytes)?;
    }
    let original_size = bytes.len();

    match ghostscript(bytes, preset).await {
        Ok(Some(out)) if out.len() < original_size && super::is_pdf(&out) => {
            info!(
                "{name}: Ghostscript {} reduced {} → {} bytes",
                preset.settings().pdf_settings,
                original_size,
                out.len()
            );
            return Ok(CompressionOutcome {
                compressed_size: out.len(),
                bytes: out,
                original_size,
                method: CompressionMethod::Ghostscript,
            });
        }
        Ok(Some(_)) => debug!("{name}: Ghostscript output was not smaller"),
        Ok(None) => debug!("Ghostscript not available, using lopdf"),
        Err(e) => warn!("{name}: Ghostscript failed: {e}"),
    }

    match lopdf_rewrite(name, bytes) {
        Ok(out) if out.len() < original_size => {
            info!("{name}: lopdf rewrite reduced {} → {} bytes", original_size, out.len());
            Ok(CompressionOutcome {
                compressed_size: out.len(),
                bytes: out,
                original_size,
                method: CompressionMethod::Lopdf,
            })
        }
        Ok(_) => {
            debug!("{name}: already compact, keeping original");
            Ok(CompressionOutcome::unchanged(bytes))
        }
        Err(e) => {
            warn!("{name}: lopdf rewrite failed: {e}");
            Ok(CompressionOutcome::unchanged(bytes))
        }
    }
}

/// Ghostscript arguments for `preset`, excluding input/output paths.
pub fn ghostscript_args(preset: QualityPreset) -> Vec<String> {
    let s = preset.settings();
    vec![
        "-sDEVICE=pdfwrite".into(),
        "-dCompatibilityLevel=1.4".into(),
        format!("-dPDFSETTINGS={}", s.pdf_settings),
        format!("-dColorImageResolution={}", s.color_dpi),
        format!("-dGrayImageResolution={}", s.gray_dpi),
        format!("-dMonoImageResolution={}", s.mono_dpi),
        format!("-dJPEGQ={}", s.jpeg_quality),
        "-dColorImageDownsampleType=/Bicubic".into(),
        "-dGrayImageDownsampleType=/Bicubic".into(),
        "-dDownsampleColorImages=true".into(),
        "-dDownsampleGrayImages=true".into(),
        // Mono images are usually scanned text.
        "-dDownsampleMonoImages=false".into(),
        "-dCompressPages=true".into(),
        "-dEmbedAllFonts=true".into(),
        "-dSubsetFonts=true".into(),
        "-dNOPAUSE".into(),
        "-dQUIET".into(),
        "-dBATCH".into(),
    ]
}

fn ghostscript_binary() -> &'static str {
    if cfg!(windows) {
        "gswin64c"
    } else {
        "gs"
    }
}

/// Run Ghostscript. `Ok(None)` means the binary is not installed.
async fn ghostscript(bytes: &[u8], preset: QualityPreset) -> Result<Option<Vec<u8>>, ExhibitError> {
    let binary = ghostscript_binary();
    let available = Command::new(binary)
        .arg("--version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false);
    if !available {
        return Ok(None);
    }

    let dir = tempfile::tempdir()
        .map_err(|e| ExhibitError::Internal(format!("Cannot create temp dir: {e}")))?;
    let input = dir.path().join("input.pdf");
    let output = dir.path().join("output.pdf");
    tokio::fs::write(&input, bytes)
        .await
        .map_err(|e| ExhibitError::OutputWriteFailed {
            path: input.clone(),
            source: e,
        })?;

    let result = Command::new(binary)
        .args(ghostscript_args(preset))
        .arg(format!("-sOutputFile={}", output.display()))
        .arg(&input)
        .output()
        .await
        .map_err(|e| ExhibitError::Internal(format!("Failed to run {binary}: {e}")))?;
    if !result.status.success() {
        return Err(ExhibitError::PdfOperation(format!(
            "{binary} exited with {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        )));
    }

    let out = tokio::fs::read(&output)
        .await
        .map_err(|e| ExhibitError::Internal(format!("Ghostscript produced no output: {e}")))?;
    Ok(Some(out))
}

/// Lossless rewrite through lopdf.
fn lopdf_rewrite(name: &str, bytes: &[u8]) -> Result<Vec<u8>, ExhibitError> {
    let mut doc: Document = super::load(name, bytes)?;
    doc.prune_objects();
    doc.delete_zero_length_streams();
    doc.renumber_objects();
    super::save(doc)
}

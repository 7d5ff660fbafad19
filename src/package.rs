//! Final package assembly.
//!
//! ## Data Flow
//!
//! ```text
//! ExhibitRecord[] (ordered, labelled)
//!        │
//!        ├─▶ 1. compress   (optional, per exhibit, keeps original on failure)
//!        ├─▶ 2. stamp      ("Exhibit X" header + "Page n of m" footer)
//!        ├─▶ 3. toc        (optional, built from labels/titles/page counts)
//!        └─▶ 4. merge      (optional, TOC first, then exhibits in list order)
//!                 │
//!                 ▼
//!          GeneratedPackage ──▶ write_package (temp file + rename)
//! ```
//!
//! Per-exhibit problems in steps 1–2 never abort generation: they are
//! collected as [`SourceError`]s in [`GeneratedPackage::issues`]. TOC and
//! merge failures are fatal because there would be no package to return.

use crate::config::{CaseInfo, PackageConfig};
use crate::error::{ExhibitError, SourceError};
use crate::exhibit::ExhibitRecord;
use crate::pdf::compress::{compress_pdf, CompressionMethod};
use crate::pdf::merge::merge_documents;
use crate::pdf::stamp::stamp_exhibit;
use crate::pdf::toc::{generate_toc, TocDocument, TocEntry};
use crate::progress::Stage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// One exhibit as it appears in the package.
#[derive(Debug, Clone)]
pub struct PackagedExhibit {
    pub id: u64,
    pub label: String,
    pub display_name: String,
    pub page_count: usize,
    /// Stamped (and possibly compressed) PDF bytes.
    pub bytes: Vec<u8>,
    pub original_url: Option<String>,
    pub archived_url: Option<String>,
    pub compression: Option<CompressionMethod>,
    /// `false` when stamping failed and the unstamped pages were used.
    pub stamped: bool,
}

/// Statistics for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageStats {
    pub total_exhibits: usize,
    /// Pages across all exhibits, excluding the TOC.
    pub exhibit_pages: usize,
    pub toc_pages: usize,
    /// Pages of the merged PDF (0 when merging is off).
    pub merged_pages: usize,
    /// Exhibit bytes before compression.
    pub original_bytes: usize,
    /// Exhibit bytes after compression and stamping.
    pub final_bytes: usize,
    pub merged_bytes: usize,
    pub compressed_exhibits: usize,
    pub stamp_failures: usize,
    pub total_duration_ms: u64,
}

/// Everything produced by [`generate_package`].
#[derive(Debug, Clone)]
pub struct GeneratedPackage {
    pub case: CaseInfo,
    pub generated_on: NaiveDate,
    /// TOC followed by every exhibit; `None` when merging is off.
    pub merged: Option<Vec<u8>>,
    pub toc: Option<TocDocument>,
    pub exhibits: Vec<PackagedExhibit>,
    pub stats: PackageStats,
    pub issues: Vec<SourceError>,
}

/// Build the package for `records`, dated today.
///
/// # Errors
/// - [`ExhibitError::NothingToPackage`] if `records` is empty
/// - TOC layout or merge failures
pub async fn generate_package(
    records: &[ExhibitRecord],
    config: &PackageConfig,
) -> Result<GeneratedPackage, ExhibitError> {
    generate_package_on(records, config, chrono::Local::now().date_naive()).await
}

/// [`generate_package`] with an explicit date for the TOC and file names.
pub async fn generate_package_on(
    records: &[ExhibitRecord],
    config: &PackageConfig,
    generated_on: NaiveDate,
) -> Result<GeneratedPackage, ExhibitError> {
    if records.is_empty() {
        return Err(ExhibitError::NothingToPackage);
    }
    let start = Instant::now();
    let total = records.len();
    let cb = &config.progress_callback;
    let mut issues = Vec::new();
    info!("Generating package for {} exhibits", total);

    // ── Step 1: Compress ─────────────────────────────────────────────────
    let mut bodies: Vec<(Vec<u8>, Option<CompressionMethod>)> = Vec::with_capacity(total);
    match config.compression {
        Some(preset) => {
            cb.on_stage_start(Stage::Compress, total);
            let mut ok = 0;
            for (i, r) in records.iter().enumerate() {
                cb.on_item_start(Stage::Compress, i + 1, total, &r.display_name);
                match compress_pdf(&r.display_name, &r.content, preset).await {
                    Ok(outcome) => {
                        ok += 1;
                        cb.on_item_complete(Stage::Compress, i + 1, total, &r.display_name);
                        bodies.push((outcome.bytes, Some(outcome.method)));
                    }
                    Err(e) => {
                        warn!("Exhibit {}: compression skipped: {e}", r.label);
                        cb.on_item_error(Stage::Compress, i + 1, total, &e.to_string());
                        issues.push(SourceError::CompressionSkipped {
                            label: r.label.clone(),
                            detail: e.to_string(),
                        });
                        bodies.push((r.content.clone(), None));
                    }
                }
            }
            cb.on_stage_complete(Stage::Compress, total, ok);
        }
        None => bodies.extend(records.iter().map(|r| (r.content.clone(), None))),
    }

    // ── Step 2: Stamp ────────────────────────────────────────────────────
    cb.on_stage_start(Stage::Stamp, total);
    let mut exhibits = Vec::with_capacity(total);
    let mut stamped_ok = 0;
    for (i, (r, (body, compression))) in records.iter().zip(bodies).enumerate() {
        cb.on_item_start(Stage::Stamp, i + 1, total, &r.display_name);
        let (bytes, stamped) = match stamp_exhibit(&body, &r.label) {
            Ok(b) => {
                stamped_ok += 1;
                cb.on_item_complete(Stage::Stamp, i + 1, total, &r.display_name);
                (b, true)
            }
            Err(e) => {
                warn!("Exhibit {}: stamp failed, using original pages: {e}", r.label);
                cb.on_item_error(Stage::Stamp, i + 1, total, &e.to_string());
                issues.push(SourceError::StampFallback {
                    label: r.label.clone(),
                    detail: e.to_string(),
                });
                (body, false)
            }
        };
        exhibits.push(PackagedExhibit {
            id: r.id,
            label: r.label.clone(),
            display_name: r.display_name.clone(),
            page_count: r.page_count,
            bytes,
            original_url: r.original_url.clone(),
            archived_url: r.archived_url.clone(),
            compression,
            stamped,
        });
    }
    cb.on_stage_complete(Stage::Stamp, total, stamped_ok);

    // ── Step 3: Table of contents ────────────────────────────────────────
    let toc = if config.include_toc {
        cb.on_stage_start(Stage::Toc, 1);
        let entries: Vec<TocEntry> = exhibits.iter().map(toc_entry).collect();
        let toc = generate_toc(&config.case, &entries, generated_on)?;
        debug!("TOC has {} pages", toc.page_count);
        cb.on_stage_complete(Stage::Toc, 1, 1);
        Some(toc)
    } else {
        None
    };

    // ── Step 4: Merge ────────────────────────────────────────────────────
    let merged = if config.merge {
        let mut documents = Vec::with_capacity(total + 1);
        if let Some(ref t) = toc {
            documents.push(t.bytes.clone());
        }
        documents.extend(exhibits.iter().map(|e| e.bytes.clone()));
        let count = documents.len();
        cb.on_stage_start(Stage::Merge, count);
        let merged = merge_documents(documents)?;
        cb.on_stage_complete(Stage::Merge, count, count);
        Some(merged)
    } else {
        None
    };

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let exhibit_pages = exhibits.iter().map(|e| e.page_count).sum::<usize>();
    let toc_pages = toc.as_ref().map_or(0, |t| t.page_count);
    let stats = PackageStats {
        total_exhibits: total,
        exhibit_pages,
        toc_pages,
        merged_pages: if merged.is_some() { exhibit_pages + toc_pages } else { 0 },
        original_bytes: records.iter().map(|r| r.content.len()).sum(),
        final_bytes: exhibits.iter().map(|e| e.bytes.len()).sum(),
        merged_bytes: merged.as_ref().map_or(0, Vec::len),
        compressed_exhibits: exhibits
            .iter()
            .filter(|e| matches!(e.compression, Some(m) if m != CompressionMethod::None))
            .count(),
        stamp_failures: exhibits.iter().filter(|e| !e.stamped).count(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Package complete: {} exhibits, {} pages, {}ms",
        stats.total_exhibits,
        stats.exhibit_pages + stats.toc_pages,
        stats.total_duration_ms
    );

    Ok(GeneratedPackage {
        case: config.case.clone(),
        generated_on,
        merged,
        toc,
        exhibits,
        stats,
        issues,
    })
}

fn toc_entry(e: &PackagedExhibit) -> TocEntry {
    TocEntry {
        label: e.label.clone(),
        title: e.display_name.clone(),
        page_count: e.page_count,
        original_url: e.original_url.clone(),
        archived_url: e.archived_url.clone(),
    }
}

/// Synchronous wrapper around [`generate_package`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_package_sync(
    records: &[ExhibitRecord],
    config: &PackageConfig,
) -> Result<GeneratedPackage, ExhibitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExhibitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_package(records, config))
}

// ── Output files ─────────────────────────────────────────────────────────────

/// Reduce `text` to `[A-Za-z0-9_-]`, collapsing everything else to `_`.
pub fn file_component(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut out = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "exhibit".to_string()
    } else {
        trimmed.to_string()
    }
}

impl GeneratedPackage {
    /// `Exhibit_Package_<visa>_<YYYYMMDD>.pdf`, visa omitted when unknown.
    pub fn merged_file_name(&self) -> String {
        let date = self.generated_on.format("%Y%m%d");
        match self.case.visa_type.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(visa) => format!("Exhibit_Package_{}_{date}.pdf", file_component(visa)),
            None => format!("Exhibit_Package_{date}.pdf"),
        }
    }

    /// `<case>_TOC.pdf`.
    pub fn toc_file_name(&self) -> String {
        format!("{}_TOC.pdf", file_component(&self.case.case_name))
    }

    /// `Exhibit_<label>_<name>.pdf` for one exhibit.
    pub fn exhibit_file_name(exhibit: &PackagedExhibit) -> String {
        let stem = exhibit
            .display_name
            .strip_suffix(".pdf")
            .or_else(|| exhibit.display_name.strip_suffix(".PDF"))
            .unwrap_or(&exhibit.display_name);
        format!("Exhibit_{}_{}.pdf", file_component(&exhibit.label), file_component(stem))
    }
}

/// Write the package into `dir`, returning the paths written in order.
///
/// The merged PDF and TOC are written when present; individual exhibits only
/// when `keep_individual` is set. Each file goes through a temp file and a
/// rename so readers never see a partial PDF.
pub async fn write_package(
    package: &GeneratedPackage,
    dir: &Path,
    keep_individual: bool,
) -> Result<Vec<PathBuf>, ExhibitError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ExhibitError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::new();
    if let Some(ref merged) = package.merged {
        written.push(write_atomic(&dir.join(package.merged_file_name()), merged).await?);
    }
    if let Some(ref toc) = package.toc {
        written.push(write_atomic(&dir.join(package.toc_file_name()), &toc.bytes).await?);
    }
    if keep_individual {
        for exhibit in &package.exhibits {
            let path = dir.join(GeneratedPackage::exhibit_file_name(exhibit));
            written.push(write_atomic(&path, &exhibit.bytes).await?);
        }
    }
    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<PathBuf, ExhibitError> {
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| ExhibitError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExhibitError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path.to_path_buf())
}

//! # exhibit-packager
//!
//! Assemble numbered PDF exhibit packages, with a generated table of
//! contents, from local files, ZIP archives, Google Drive folders and web
//! URLs.
//!
//! ## Why this crate?
//!
//! Evidence bundles for petitions and filings are a stack of heterogeneous
//! documents that must be presented in a fixed order, each labelled
//! "Exhibit A", "Exhibit B", … with an index up front. Doing that by hand
//! means renaming, re-stamping and re-merging every time one document moves.
//! Here the list is the single source of truth: labels are derived from
//! position, so any edit renumbers everything, and the package is rebuilt
//! from scratch on demand.
//!
//! ## Pipeline Overview
//!
//! ```text
//! sources
//!  │
//!  ├─ 1. Import    upload / ZIP / Drive folder / URL → PDF bytes
//!  ├─ 2. Archive   optional archive.org snapshot per URL exhibit
//!  ├─ 3. Order     ExhibitList: move, remove, renumber (A / 1 / I)
//!  ├─ 4. Compress  optional Ghostscript or lopdf size reduction
//!  ├─ 5. Stamp     "Exhibit X" header + "Page n of m" footer
//!  ├─ 6. TOC       case details, exhibit table, archived-URL table
//!  └─ 7. Merge     TOC + exhibits → one PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exhibit_packager::{write_package, ExhibitSession, NumberingStyle, PackageConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PackageConfig::builder()
//!         .case_name("Smith O-1A")
//!         .visa_type("O-1A")
//!         .numbering(NumberingStyle::Letters)
//!         .build()?;
//!     let mut session = ExhibitSession::new(config)?;
//!     session.add_upload(Path::new("cv.pdf")).await?;
//!     session.add_urls(&["https://example.com/press".to_string()]).await;
//!
//!     let package = session.generate().await?;
//!     write_package(&package, Path::new("out"), false).await?;
//!     eprintln!("{} exhibits, {} pages",
//!         package.stats.total_exhibits,
//!         package.stats.merged_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `exhibit-pack` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! exhibit-packager = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Services
//!
//! | Service | Used for | Needs |
//! |---------|----------|-------|
//! | Google Drive v3 | folder import | service-account JSON key |
//! | archive.org | URL snapshots | nothing |
//! | api2pdf | web page → PDF | `API2PDF_API_KEY` |
//! | Ghostscript | best compression | `gs` on `PATH` (optional) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod error;
pub mod exhibit;
pub mod numbering;
pub mod package;
pub mod pdf;
pub mod progress;
pub mod session;
pub mod sources;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::{archive_many, ArchiveOutcome, ArchiveStats, Archiver, WaybackClient};
pub use config::{CaseInfo, PackageConfig, PackageConfigBuilder, QualityPreset};
pub use error::{ExhibitError, SourceError};
pub use exhibit::{ExhibitDraft, ExhibitList, ExhibitRecord, SourceKind};
pub use numbering::NumberingStyle;
pub use package::{
    generate_package, generate_package_sync, write_package, GeneratedPackage, PackageStats,
    PackagedExhibit,
};
pub use progress::{NoopProgressCallback, PackageProgressCallback, ProgressCallback, Stage};
pub use session::ExhibitSession;
pub use sources::drive::{DriveApi, DriveFile, GoogleDriveClient, ServiceAccountKey};
pub use sources::url::{HttpPdfConverter, PdfConverter};

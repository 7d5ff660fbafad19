//! The in-memory exhibit session.
//!
//! [`ExhibitSession`] is what a host (the CLI, or a UI) drives: it owns the
//! ordered [`ExhibitList`], the [`PackageConfig`], and the network clients
//! used by the URL and archive paths. Every mutating call either succeeds
//! completely or leaves the list untouched; per-item problems that do not
//! abort the call are collected in [`ExhibitSession::issues`].
//!
//! ```text
//! add_upload ─┐
//! add_zip    ─┤
//! add_drive  ─┼─▶ ExhibitList ──(remove / move / renumber)──▶ generate
//! add_urls   ─┘        ▲
//!     └── archive_many ┘ (sets archived_url, never removes)
//! ```

use crate::archive::{archive_many, ArchiveOutcome, ArchiveStats, Archiver, WaybackClient};
use crate::config::PackageConfig;
use crate::error::{ExhibitError, SourceError};
use crate::exhibit::{ExhibitDraft, ExhibitList, ExhibitRecord, SourceKind};
use crate::numbering::NumberingStyle;
use crate::package::{self, GeneratedPackage};
use crate::progress::Stage;
use crate::sources::drive::{self, DriveApi, GoogleDriveClient, ServiceAccountKey};
use crate::sources::url::{filename_from_url, HttpPdfConverter, PdfConverter};
use crate::sources::{self, upload, zip};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// An exhibit list plus everything needed to fill and package it.
pub struct ExhibitSession {
    list: ExhibitList,
    config: PackageConfig,
    converter: Arc<dyn PdfConverter>,
    archiver: Arc<dyn Archiver>,
    issues: Vec<SourceError>,
    archive_outcomes: Vec<ArchiveOutcome>,
}

impl ExhibitSession {
    /// A session using the HTTP converter and archive.org.
    pub fn new(config: PackageConfig) -> Result<Self, ExhibitError> {
        let converter = HttpPdfConverter::new(config.resolved_api_key(), config.download_timeout_secs)?;
        let archiver = WaybackClient::new(config.archive_timeout_secs)?;
        Ok(Self::with_clients(config, Arc::new(converter), Arc::new(archiver)))
    }

    /// A session with injected URL converter and archiver.
    pub fn with_clients(
        config: PackageConfig,
        converter: Arc<dyn PdfConverter>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            list: ExhibitList::new(config.numbering),
            config,
            converter,
            archiver,
            issues: Vec::new(),
            archive_outcomes: Vec::new(),
        }
    }

    pub fn list(&self) -> &ExhibitList {
        &self.list
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Non-fatal problems reported since the last [`take_issues`](Self::take_issues).
    pub fn issues(&self) -> &[SourceError] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<SourceError> {
        std::mem::take(&mut self.issues)
    }

    // ── Adding ───────────────────────────────────────────────────────────

    /// Add a local PDF, JPEG or PNG.
    pub async fn add_upload(&mut self, path: &Path) -> Result<u64, ExhibitError> {
        let draft = upload::read_upload(path).await?;
        let id = self.list.push(draft)?;
        info!("Added {} as exhibit {}", path.display(), self.label_of(id));
        Ok(id)
    }

    /// Add in-memory bytes (PDF, or an image converted to one).
    pub fn add_pdf_bytes(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        kind: SourceKind,
    ) -> Result<u64, ExhibitError> {
        let content = sources::ensure_pdf(name, bytes)?;
        self.list.push(ExhibitDraft::new(kind, name, content))
    }

    /// Add every PDF inside a ZIP archive, in archive order.
    ///
    /// Returns the new ids. Unreadable entries are reported as issues.
    pub fn add_zip(&mut self, archive_name: &str, bytes: &[u8]) -> Result<Vec<u64>, ExhibitError> {
        let import = zip::extract_pdfs(archive_name, bytes)?;
        self.issues.extend(import.skipped);
        let ids = self.push_all(import.drafts, |entry, detail| SourceError::ZipEntrySkipped {
            entry,
            detail,
        });
        info!("Added {} exhibits from {archive_name}", ids.len());
        Ok(ids)
    }

    /// Authenticate with a service-account key and import a Drive folder.
    pub async fn add_drive_folder(
        &mut self,
        folder_url: &str,
        credentials: &ServiceAccountKey,
    ) -> Result<Vec<u64>, ExhibitError> {
        let client = GoogleDriveClient::connect(credentials, self.config.download_timeout_secs).await?;
        self.add_drive_folder_with(&client, folder_url).await
    }

    /// Import a Drive folder through any [`DriveApi`].
    pub async fn add_drive_folder_with(
        &mut self,
        api: &dyn DriveApi,
        folder_url: &str,
    ) -> Result<Vec<u64>, ExhibitError> {
        let import = drive::import_folder(api, folder_url, drive::DEFAULT_MIME_TYPES).await?;
        self.issues.extend(import.skipped);
        let ids = self.push_all(import.drafts, |name, detail| SourceError::DriveFileSkipped {
            name,
            detail,
        });
        info!("Added {} exhibits from Drive folder", ids.len());
        Ok(ids)
    }

    /// Convert each URL to a PDF exhibit, then archive the added ones when
    /// enabled.
    ///
    /// URLs that cannot be converted are reported and skipped. Archiving runs
    /// as its own stage through [`archive_many`], pausing the configured
    /// delay between requests. Archive failures keep the exhibit with its
    /// original URL as the archived one.
    pub async fn add_urls(&mut self, urls: &[String]) -> Vec<u64> {
        let cb = Arc::clone(&self.config.progress_callback);
        let total = urls.len();
        let mut added: Vec<(u64, String)> = Vec::new();

        cb.on_stage_start(Stage::Import, total);
        for (i, raw) in urls.iter().enumerate() {
            let url = raw.trim();
            cb.on_item_start(Stage::Import, i + 1, total, url);
            match self.add_url(url).await {
                Ok(id) => {
                    cb.on_item_complete(Stage::Import, i + 1, total, url);
                    added.push((id, url.to_string()));
                }
                Err(e) => {
                    warn!("Skipping {url}: {e}");
                    cb.on_item_error(Stage::Import, i + 1, total, &e.to_string());
                    self.issues.push(SourceError::UrlSkipped {
                        url: url.to_string(),
                        detail: e.to_string(),
                    });
                }
            }
        }
        cb.on_stage_complete(Stage::Import, total, added.len());

        if self.config.archive_urls && !added.is_empty() {
            let targets: Vec<String> = added.iter().map(|(_, url)| url.clone()).collect();
            let delay = Duration::from_millis(self.config.archive_delay_ms);
            let outcomes = archive_many(self.archiver.as_ref(), &targets, delay, &cb).await;
            for ((id, url), outcome) in added.iter().zip(&outcomes) {
                if let Some(ref err) = outcome.error {
                    self.issues.push(SourceError::ArchiveFallback {
                        url: url.clone(),
                        detail: err.clone(),
                    });
                }
                self.list.set_archived_url(*id, outcome.archive_url.clone());
            }
            self.archive_outcomes.extend(outcomes);
        }

        added.into_iter().map(|(id, _)| id).collect()
    }

    /// Every archive attempt made by [`add_urls`](Self::add_urls) so far.
    pub fn archive_outcomes(&self) -> &[ArchiveOutcome] {
        &self.archive_outcomes
    }

    /// Totals over [`archive_outcomes`](Self::archive_outcomes); `None` when
    /// nothing was archived.
    pub fn archive_stats(&self) -> Option<ArchiveStats> {
        (!self.archive_outcomes.is_empty())
            .then(|| ArchiveStats::from_outcomes(&self.archive_outcomes))
    }

    async fn add_url(&mut self, url: &str) -> Result<u64, ExhibitError> {
        if !sources::is_url(url) {
            return Err(ExhibitError::InvalidUrl {
                input: url.to_string(),
            });
        }
        let pdf = self.converter.convert(url).await?;
        let draft = ExhibitDraft::new(SourceKind::Url, filename_from_url(url), pdf).with_url(url);
        self.list.push(draft)
    }

    /// Push drafts one by one; rejected ones become issues via `skipped`.
    fn push_all(
        &mut self,
        drafts: Vec<ExhibitDraft>,
        skipped: impl Fn(String, String) -> SourceError,
    ) -> Vec<u64> {
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let name = draft.display_name.clone();
            match self.list.push(draft) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!("Skipping {name}: {e}");
                    self.issues.push(skipped(name, e.to_string()));
                }
            }
        }
        ids
    }

    fn label_of(&self, id: u64) -> &str {
        self.list.get(id).map_or("?", |r| r.label.as_str())
    }

    // ── Editing ──────────────────────────────────────────────────────────

    /// Remove an exhibit; later exhibits are relabelled.
    pub fn remove(&mut self, id: u64) -> Result<ExhibitRecord, ExhibitError> {
        self.list.remove(id).ok_or(ExhibitError::ExhibitNotFound { id })
    }

    pub fn move_up(&mut self, id: u64) -> Result<(), ExhibitError> {
        self.list.move_up(id)
    }

    pub fn move_down(&mut self, id: u64) -> Result<(), ExhibitError> {
        self.list.move_down(id)
    }

    /// Move an exhibit to a 0-based position.
    pub fn move_to(&mut self, id: u64, position: usize) -> Result<(), ExhibitError> {
        self.list.move_to(id, position)
    }

    /// Switch numbering style; every label is recomputed.
    pub fn set_numbering(&mut self, style: NumberingStyle) {
        self.config.numbering = style;
        self.list.set_style(style);
    }

    /// Drop every exhibit, reported issue and archive outcome.
    pub fn clear(&mut self) {
        self.list.clear();
        self.issues.clear();
        self.archive_outcomes.clear();
    }

    // ── Packaging ────────────────────────────────────────────────────────

    /// Build the package from the current list. The list is left intact.
    pub async fn generate(&self) -> Result<GeneratedPackage, ExhibitError> {
        package::generate_package(self.list.records(), &self.config).await
    }
}

//! Wayback Machine snapshots for URL exhibits.
//!
//! Archiving never fails an exhibit. When archive.org cannot be reached, or
//! answers with an error, the outcome is marked unsuccessful and carries the
//! original URL as its `archive_url`, so the TOC always has something to
//! print.
//!
//! Requests are made one at a time with a pause between them; archive.org
//! rate-limits bursts from one client.

use crate::progress::{ProgressCallback, Stage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const WAYBACK_BASE: &str = "https://web.archive.org";

/// Default pause between consecutive archive requests.
pub const DEFAULT_ARCHIVE_DELAY: Duration = Duration::from_secs(1);

const AVAILABILITY_TIMEOUT_SECS: u64 = 10;

/// Result of archiving one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    pub original_url: String,
    /// Snapshot URL on success; the original URL on failure.
    pub archive_url: String,
    pub archived_at: DateTime<Utc>,
    pub success: bool,
    /// The snapshot already existed and no new capture was requested.
    pub used_existing: bool,
    pub error: Option<String>,
}

impl ArchiveOutcome {
    pub fn archived(url: &str, archive_url: String, used_existing: bool) -> Self {
        Self {
            original_url: url.to_string(),
            archive_url,
            archived_at: Utc::now(),
            success: true,
            used_existing,
            error: None,
        }
    }

    /// A failed attempt; `archive_url` falls back to `url`.
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            original_url: url.to_string(),
            archive_url: url.to_string(),
            archived_at: Utc::now(),
            success: false,
            used_existing: false,
            error: Some(error.into()),
        }
    }
}

/// Snapshot URL built from a capture timestamp.
pub fn snapshot_url(at: DateTime<Utc>, url: &str) -> String {
    format!("{WAYBACK_BASE}/web/{}/{url}", at.format("%Y%m%d%H%M%S"))
}

/// Something that can snapshot URLs.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Request a fresh capture of `url`.
    async fn archive(&self, url: &str) -> ArchiveOutcome;

    /// Closest existing snapshot of `url`, if any.
    async fn check_existing(&self, url: &str) -> Option<String>;

    /// Reuse an existing snapshot when there is one, otherwise capture.
    async fn archive_smart(&self, url: &str) -> ArchiveOutcome {
        if let Some(existing) = self.check_existing(url).await {
            debug!("Using existing snapshot for {url}");
            return ArchiveOutcome::archived(url, existing, true);
        }
        self.archive(url).await
    }
}

// ── archive.org client ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Availability {
    #[serde(default)]
    archived_snapshots: Snapshots,
}

#[derive(Default, Deserialize)]
struct Snapshots {
    closest: Option<Closest>,
}

#[derive(Deserialize)]
struct Closest {
    #[serde(default)]
    available: bool,
    url: Option<String>,
}

/// Wayback Machine "Save Page Now" and availability API.
pub struct WaybackClient {
    client: reqwest::Client,
    base_url: String,
}

impl WaybackClient {
    /// Client with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self, crate::error::ExhibitError> {
        Ok(Self {
            client: crate::sources::http_client(timeout_secs)?,
            base_url: WAYBACK_BASE.to_string(),
        })
    }

    /// Point the client at another Wayback-compatible host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Archiver for WaybackClient {
    async fn archive(&self, url: &str) -> ArchiveOutcome {
        let save_url = format!("{}/save/{url}", self.base_url);
        let response = match self.client.get(&save_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to archive {url}: {e}");
                return ArchiveOutcome::failed(url, e.to_string());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            warn!("archive.org answered HTTP {status} for {url}");
            return ArchiveOutcome::failed(url, format!("HTTP {status}"));
        }

        let archive_url = response
            .headers()
            .get(reqwest::header::CONTENT_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|loc| format!("{}{loc}", self.base_url))
            .unwrap_or_else(|| snapshot_url(Utc::now(), url));

        info!("Archived {url} → {archive_url}");
        ArchiveOutcome::archived(url, archive_url, false)
    }

    async fn check_existing(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/wayback/available", self.base_url))
            .query(&[("url", url)])
            .timeout(Duration::from_secs(AVAILABILITY_TIMEOUT_SECS))
            .send()
            .await;

        let data: Availability = match response {
            Ok(r) => match r.json().await {
                Ok(d) => d,
                Err(e) => {
                    debug!("Unreadable availability answer for {url}: {e}");
                    return None;
                }
            },
            Err(e) => {
                debug!("Availability check for {url} failed: {e}");
                return None;
            }
        };

        data.archived_snapshots
            .closest
            .filter(|c| c.available)
            .and_then(|c| c.url)
    }
}

// ── Batches ──────────────────────────────────────────────────────────────────

/// Archive `urls` one after another, pausing `delay` between requests (not
/// after the last one). Existing snapshots are reused through
/// [`Archiver::archive_smart`]. Outcomes are returned in input order.
pub async fn archive_many(
    archiver: &dyn Archiver,
    urls: &[String],
    delay: Duration,
    progress: &ProgressCallback,
) -> Vec<ArchiveOutcome> {
    let total = urls.len();
    progress.on_stage_start(Stage::Archive, total);

    let mut outcomes = Vec::with_capacity(total);
    for (i, url) in urls.iter().enumerate() {
        progress.on_item_start(Stage::Archive, i + 1, total, url);
        let outcome = archiver.archive_smart(url).await;
        match &outcome.error {
            None => progress.on_item_complete(Stage::Archive, i + 1, total, url),
            Some(e) => progress.on_item_error(Stage::Archive, i + 1, total, e),
        }
        outcomes.push(outcome);

        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let stats = ArchiveStats::from_outcomes(&outcomes);
    progress.on_stage_complete(Stage::Archive, total, stats.successful);
    outcomes
}

/// Summary of a batch of archive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage in `0.0..=100.0`; 0 for an empty batch.
    pub success_rate: f64,
}

impl ArchiveStats {
    pub fn from_outcomes(outcomes: &[ArchiveOutcome]) -> Self {
        let total = outcomes.len();
        let successful = outcomes.iter().filter(|o| o.success).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };
        Self {
            total,
            successful,
            failed: total - successful,
            success_rate,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::{NoopProgressCallback, PackageProgressCallback};
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    /// Records calls; URLs containing "fail" fail, URLs containing "old" have
    /// an existing snapshot.
    #[derive(Default)]
    pub(crate) struct FakeArchiver {
        pub calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Archiver for FakeArchiver {
        async fn archive(&self, url: &str) -> ArchiveOutcome {
            self.calls.lock().unwrap().push(url.to_string());
            if url.contains("fail") {
                ArchiveOutcome::failed(url, "HTTP 523")
            } else {
                ArchiveOutcome::archived(url, format!("{WAYBACK_BASE}/web/20240101000000/{url}"), false)
            }
        }

        async fn check_existing(&self, url: &str) -> Option<String> {
            url.contains("old")
                .then(|| format!("{WAYBACK_BASE}/web/20200101000000/{url}"))
        }
    }

    #[test]
    fn snapshot_url_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(
            snapshot_url(at, "https://example.com/a"),
            "https://web.archive.org/web/20240305070809/https://example.com/a"
        );
    }

    #[test]
    fn failure_keeps_original_url() {
        let o = ArchiveOutcome::failed("https://example.com", "timeout");
        assert!(!o.success);
        assert_eq!(o.archive_url, "https://example.com");
        assert_eq!(o.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn smart_prefers_existing_snapshot() {
        let archiver = FakeArchiver::default();
        let o = archiver.archive_smart("https://old.example.com").await;
        assert!(o.success && o.used_existing);
        assert!(o.archive_url.contains("20200101000000"));
        assert!(archiver.calls.lock().unwrap().is_empty());

        let o = archiver.archive_smart("https://new.example.com").await;
        assert!(o.success && !o.used_existing);
        assert_eq!(archiver.calls.lock().unwrap().len(), 1);
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl PackageProgressCallback for Recorder {
        fn on_item_complete(&self, _: Stage, index: usize, total: usize, _: &str) {
            self.events.lock().unwrap().push(format!("ok {index}/{total}"));
        }
        fn on_item_error(&self, _: Stage, index: usize, total: usize, _: &str) {
            self.events.lock().unwrap().push(format!("err {index}/{total}"));
        }
        fn on_stage_complete(&self, _: Stage, total: usize, success: usize) {
            self.events.lock().unwrap().push(format!("done {success}/{total}"));
        }
    }

    #[tokio::test]
    async fn many_keeps_order_and_reports_progress() {
        let archiver = FakeArchiver::default();
        let recorder = Arc::new(Recorder::default());
        let progress: ProgressCallback = recorder.clone();
        let urls = vec![
            "https://a.example.com".to_string(),
            "https://fail.example.com".to_string(),
            "https://c.example.com".to_string(),
        ];

        let outcomes = archive_many(&archiver, &urls, Duration::ZERO, &progress).await;
        let originals: Vec<&str> = outcomes.iter().map(|o| o.original_url.as_str()).collect();
        assert_eq!(originals, urls.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["ok 1/3", "err 2/3", "ok 3/3", "done 2/3"]
        );

        let stats = ArchiveStats::from_outcomes(&outcomes);
        assert_eq!((stats.total, stats.successful, stats.failed), (3, 2, 1));
        assert!((stats.success_rate - 66.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn many_reuses_existing_snapshots() {
        let archiver = FakeArchiver::default();
        let progress: ProgressCallback = Arc::new(NoopProgressCallback);
        let urls = vec!["https://old.example.com".to_string(), "https://new.example.com".to_string()];

        let outcomes = archive_many(&archiver, &urls, Duration::ZERO, &progress).await;
        assert!(outcomes[0].used_existing);
        assert!(!outcomes[1].used_existing);
        assert_eq!(*archiver.calls.lock().unwrap(), vec!["https://new.example.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_requests_only() {
        let archiver = FakeArchiver::default();
        let progress: ProgressCallback = Arc::new(NoopProgressCallback);
        let urls = vec!["https://a.example.com".to_string(), "https://b.example.com".to_string()];

        let start = tokio::time::Instant::now();
        archive_many(&archiver, &urls, Duration::from_secs(1), &progress).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        archive_many(&archiver, &urls[..1], Duration::from_secs(1), &progress).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn empty_stats() {
        let stats = ArchiveStats::from_outcomes(&[]);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.failed, 0);
    }
}

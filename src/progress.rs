//! Progress-callback trait for packaging events.
//!
//! Inject an [`Arc<dyn PackageProgressCallback>`] via
//! [`crate::config::PackageConfigBuilder::progress_callback`] to receive
//! events as sources are imported, URLs are archived and the package is
//! assembled.
//!
//! Callbacks keep the library ignorant of how the host shows progress: the
//! CLI drives an indicatif bar, a service could forward to a channel.
//!
//! # Example
//!
//! ```rust
//! use exhibit_packager::{PackageConfig, PackageProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     stamped: AtomicUsize,
//! }
//!
//! impl PackageProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: Stage, _index: usize, _total: usize, _name: &str) {
//!         if stage == Stage::Stamp {
//!             self.stamped.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { stamped: AtomicUsize::new(0) });
//! let config = PackageConfig::builder()
//!     .progress_callback(counter as Arc<dyn PackageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A phase of the packaging process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading uploads, ZIP entries, Drive files or URLs into the list.
    Import,
    /// Submitting URL exhibits to archive.org.
    Archive,
    /// Optional per-exhibit compression.
    Compress,
    /// Adding the `Exhibit X` / `Page n of m` overlay.
    Stamp,
    /// Building the table of contents.
    Toc,
    /// Concatenating everything into the final package.
    Merge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Import => "Importing",
            Stage::Archive => "Archiving",
            Stage::Compress => "Compressing",
            Stage::Stamp => "Stamping",
            Stage::Toc => "Building TOC",
            Stage::Merge => "Merging",
        })
    }
}

/// Called by the session and package generator as work progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Work is sequential, so events for one stage never
/// interleave; implementations still need `Send + Sync` because the config
/// is shared across tasks.
pub trait PackageProgressCallback: Send + Sync {
    /// Called once when a stage begins.
    ///
    /// # Arguments
    /// * `stage` — which phase is starting
    /// * `total` — number of items the stage will process
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called before an item is processed.
    ///
    /// * `index` — 1-indexed position within the stage
    fn on_item_start(&self, stage: Stage, index: usize, total: usize, name: &str) {
        let _ = (stage, index, total, name);
    }

    /// Called after an item is processed successfully.
    fn on_item_complete(&self, stage: Stage, index: usize, total: usize, name: &str) {
        let _ = (stage, index, total, name);
    }

    /// Called when an item fails or falls back.
    ///
    /// * `error` — human-readable description
    fn on_item_error(&self, stage: Stage, index: usize, total: usize, error: &str) {
        let _ = (stage, index, total, error);
    }

    /// Called once after every item in the stage has been attempted.
    ///
    /// * `success_count` — items that completed without error
    fn on_stage_complete(&self, stage: Stage, total: usize, success_count: usize) {
        let _ = (stage, total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PackageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PackageConfig`].
pub type ProgressCallback = Arc<dyn PackageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        stages: Mutex<Vec<Stage>>,
    }

    impl PackageProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage, _total: usize) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_item_start(&self, _stage: Stage, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _stage: Stage, _index: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _stage: Stage, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Stamp, 2);
        cb.on_item_start(Stage::Stamp, 1, 2, "a.pdf");
        cb.on_item_complete(Stage::Stamp, 1, 2, "a.pdf");
        cb.on_item_error(Stage::Stamp, 2, 2, "boom");
        cb.on_stage_complete(Stage::Stamp, 2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Archive, 3);
        tracker.on_item_start(Stage::Archive, 1, 3, "https://a");
        tracker.on_item_complete(Stage::Archive, 1, 3, "https://a");
        tracker.on_item_start(Stage::Archive, 2, 3, "https://b");
        tracker.on_item_error(Stage::Archive, 2, 3, "timeout");
        tracker.on_stage_start(Stage::Merge, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.stages.lock().unwrap(), vec![Stage::Archive, Stage::Merge]);
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(Stage::Toc.to_string(), "Building TOC");
        assert_eq!(serde_json::to_string(&Stage::Merge).unwrap(), "\"merge\"");
    }
}

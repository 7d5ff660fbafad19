//! Configuration types for exhibit packaging.
//!
//! Every knob that affects how a session imports sources and how the final
//! package is generated lives in [`PackageConfig`], built via its
//! [`PackageConfigBuilder`]. One struct means a run can be logged, shared
//! across the session and the generator, and compared against another run.

use crate::error::ExhibitError;
use crate::numbering::NumberingStyle;
use crate::progress::{NoopProgressCallback, PackageProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for building an exhibit package.
///
/// Built via [`PackageConfig::builder()`] or [`PackageConfig::default()`].
///
/// # Example
/// ```rust
/// use exhibit_packager::{NumberingStyle, PackageConfig};
///
/// let config = PackageConfig::builder()
///     .numbering(NumberingStyle::Roman)
///     .case_name("Smith O-1A")
///     .archive_urls(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.numbering, NumberingStyle::Roman);
/// ```
#[derive(Clone)]
pub struct PackageConfig {
    /// Label style for exhibits. Default: [`NumberingStyle::Letters`].
    pub numbering: NumberingStyle,

    /// Case details printed in the TOC header and used in output file names.
    pub case: CaseInfo,

    /// Generate the table of contents. Default: true.
    pub include_toc: bool,

    /// Produce the single merged package PDF. Default: true.
    ///
    /// With `merge = false` only the TOC and the individually stamped
    /// exhibits are produced.
    pub merge: bool,

    /// Keep each stamped exhibit as its own PDF in the output. Default: false.
    pub keep_individual: bool,

    /// Per-exhibit compression before stamping. Default: None (off).
    pub compression: Option<QualityPreset>,

    /// Submit URL exhibits to archive.org when they are added. Default: false.
    pub archive_urls: bool,

    /// Pause between consecutive archive.org requests, in milliseconds.
    /// Default: 1000.
    ///
    /// The Wayback Machine rate-limits anonymous saves; one second between
    /// requests is what it tolerates in practice.
    pub archive_delay_ms: u64,

    /// Timeout for downloading URL sources, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for one archive.org request, in seconds. Default: 30.
    pub archive_timeout_secs: u64,

    /// API key for the URL-to-PDF conversion service. Falls back to the
    /// `API2PDF_API_KEY` environment variable when None.
    pub api2pdf_key: Option<String>,

    /// Receives per-stage progress events. Default: no-op.
    pub progress_callback: ProgressCallback,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingStyle::default(),
            case: CaseInfo::default(),
            include_toc: true,
            merge: true,
            keep_individual: false,
            compression: None,
            archive_urls: false,
            archive_delay_ms: 1000,
            download_timeout_secs: 120,
            archive_timeout_secs: 30,
            api2pdf_key: None,
            progress_callback: Arc::new(NoopProgressCallback),
        }
    }
}

impl fmt::Debug for PackageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageConfig")
            .field("numbering", &self.numbering)
            .field("case", &self.case)
            .field("include_toc", &self.include_toc)
            .field("merge", &self.merge)
            .field("keep_individual", &self.keep_individual)
            .field("compression", &self.compression)
            .field("archive_urls", &self.archive_urls)
            .field("archive_delay_ms", &self.archive_delay_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("archive_timeout_secs", &self.archive_timeout_secs)
            .field("api2pdf_key", &self.api2pdf_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PackageConfig {
    /// Create a new builder for `PackageConfig`.
    pub fn builder() -> PackageConfigBuilder {
        PackageConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured API key, or `API2PDF_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api2pdf_key
            .clone()
            .or_else(|| std::env::var("API2PDF_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Builder for [`PackageConfig`].
pub struct PackageConfigBuilder {
    config: PackageConfig,
}

impl fmt::Debug for PackageConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PackageConfigBuilder {
    pub fn numbering(mut self, style: NumberingStyle) -> Self {
        self.config.numbering = style;
        self
    }

    pub fn case(mut self, case: CaseInfo) -> Self {
        self.config.case = case;
        self
    }

    pub fn case_name(mut self, name: impl Into<String>) -> Self {
        self.config.case.case_name = name.into();
        self
    }

    pub fn visa_type(mut self, visa: impl Into<String>) -> Self {
        self.config.case.visa_type = Some(visa.into());
        self
    }

    pub fn beneficiary(mut self, name: impl Into<String>) -> Self {
        self.config.case.beneficiary = Some(name.into());
        self
    }

    pub fn petitioner(mut self, name: impl Into<String>) -> Self {
        self.config.case.petitioner = Some(name.into());
        self
    }

    pub fn include_toc(mut self, v: bool) -> Self {
        self.config.include_toc = v;
        self
    }

    pub fn merge(mut self, v: bool) -> Self {
        self.config.merge = v;
        self
    }

    pub fn keep_individual(mut self, v: bool) -> Self {
        self.config.keep_individual = v;
        self
    }

    pub fn compression(mut self, preset: Option<QualityPreset>) -> Self {
        self.config.compression = preset;
        self
    }

    pub fn archive_urls(mut self, v: bool) -> Self {
        self.config.archive_urls = v;
        self
    }

    pub fn archive_delay_ms(mut self, ms: u64) -> Self {
        self.config.archive_delay_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn archive_timeout_secs(mut self, secs: u64) -> Self {
        self.config.archive_timeout_secs = secs;
        self
    }

    pub fn api2pdf_key(mut self, key: impl Into<String>) -> Self {
        self.config.api2pdf_key = Some(key.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PackageProgressCallback>) -> Self {
        self.config.progress_callback = cb;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PackageConfig, ExhibitError> {
        let c = &self.config;
        if !c.merge && !c.include_toc && !c.keep_individual {
            return Err(ExhibitError::InvalidConfig(
                "nothing would be produced: enable the merged package, the TOC, or individual exhibits"
                    .into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(ExhibitError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.archive_timeout_secs == 0 {
            return Err(ExhibitError::InvalidConfig(
                "archive timeout must be ≥ 1 second".into(),
            ));
        }
        if c.case.case_name.trim().is_empty() {
            return Err(ExhibitError::InvalidConfig("case name must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Case details ─────────────────────────────────────────────────────────

/// Case details shown in the TOC header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    /// Case identifier. Default: `"Exhibit Package"`.
    pub case_name: String,
    /// Visa category, e.g. `O-1A`, `EB-1A`.
    pub visa_type: Option<String>,
    pub beneficiary: Option<String>,
    pub petitioner: Option<String>,
}

impl Default for CaseInfo {
    fn default() -> Self {
        Self {
            case_name: "Exhibit Package".to_string(),
            visa_type: None,
            beneficiary: None,
            petitioner: None,
        }
    }
}

// ── Compression presets ──────────────────────────────────────────────────

/// Compression quality preset.
///
/// | Preset | Ghostscript profile | Colour / grey / mono dpi | JPEG quality |
/// |--------|---------------------|--------------------------|--------------|
/// | High | `/printer` | 200 / 200 / 300 | 85 |
/// | Balanced | `/ebook` | 150 / 150 / 300 | 80 |
/// | Maximum | `/screen` | 100 / 100 / 200 | 75 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// Near-lossless; suited to documents with photographs.
    High,
    /// Good quality at a noticeably smaller size. (default)
    #[default]
    Balanced,
    /// Smallest output; images visibly degrade.
    Maximum,
}

/// Resolved numeric settings for a [`QualityPreset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetSettings {
    pub pdf_settings: &'static str,
    pub color_dpi: u32,
    pub gray_dpi: u32,
    pub mono_dpi: u32,
    pub jpeg_quality: u8,
}

impl QualityPreset {
    pub fn settings(self) -> PresetSettings {
        match self {
            QualityPreset::High => PresetSettings {
                pdf_settings: "/printer",
                color_dpi: 200,
                gray_dpi: 200,
                mono_dpi: 300,
                jpeg_quality: 85,
            },
            QualityPreset::Balanced => PresetSettings {
                pdf_settings: "/ebook",
                color_dpi: 150,
                gray_dpi: 150,
                mono_dpi: 300,
                jpeg_quality: 80,
            },
            QualityPreset::Maximum => PresetSettings {
                pdf_settings: "/screen",
                color_dpi: 100,
                gray_dpi: 100,
                mono_dpi: 200,
                jpeg_quality: 75,
            },
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QualityPreset::High => "high",
            QualityPreset::Balanced => "balanced",
            QualityPreset::Maximum => "maximum",
        })
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "balanced" => Ok(QualityPreset::Balanced),
            "maximum" | "max" => Ok(QualityPreset::Maximum),
            other => Err(format!(
                "unknown quality preset '{other}' (expected high, balanced or maximum)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PackageConfig::default();
        assert_eq!(c.numbering, NumberingStyle::Letters);
        assert!(c.include_toc);
        assert!(c.merge);
        assert!(!c.keep_individual);
        assert_eq!(c.archive_delay_ms, 1000);
        assert_eq!(c.archive_timeout_secs, 30);
        assert_eq!(c.case.case_name, "Exhibit Package");
    }

    #[test]
    fn builder_rejects_empty_output() {
        let err = PackageConfig::builder()
            .merge(false)
            .include_toc(false)
            .build()
            .unwrap_err();
        assert!(matches!(err, ExhibitError::InvalidConfig(_)));
    }

    #[test]
    fn builder_allows_individual_only() {
        let c = PackageConfig::builder()
            .merge(false)
            .include_toc(false)
            .keep_individual(true)
            .build()
            .unwrap();
        assert!(c.keep_individual);
    }

    #[test]
    fn builder_rejects_zero_timeout_and_blank_case() {
        assert!(PackageConfig::builder().download_timeout_secs(0).build().is_err());
        assert!(PackageConfig::builder().archive_timeout_secs(0).build().is_err());
        assert!(PackageConfig::builder().case_name("  ").build().is_err());
    }

    #[test]
    fn configured_key_wins_over_environment() {
        let c = PackageConfig::builder().api2pdf_key("abc").build().unwrap();
        assert_eq!(c.resolved_api_key().as_deref(), Some("abc"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PackageConfig::builder().api2pdf_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn preset_settings() {
        assert_eq!(QualityPreset::High.settings().pdf_settings, "/printer");
        assert_eq!(QualityPreset::Balanced.settings().color_dpi, 150);
        let max = QualityPreset::Maximum.settings();
        assert_eq!((max.color_dpi, max.mono_dpi, max.jpeg_quality), (100, 200, 75));
        assert_eq!("max".parse(), Ok(QualityPreset::Maximum));
        assert!("ultra".parse::<QualityPreset>().is_err());
    }
}

//! CLI binary for exhibit-packager.
//!
//! A thin shim over the library crate: flags become a `PackageConfig`,
//! sources are added to an `ExhibitSession` in flag order, then the package
//! is generated and written.

use anyhow::{bail, Context, Result};
use clap::Parser;
use exhibit_packager::numbering::position_of;
use exhibit_packager::{
    write_package, ArchiveStats, ExhibitRecord, ExhibitSession, NumberingStyle, PackageConfig,
    PackageProgressCallback, PackageStats, ProgressCallback, QualityPreset, ServiceAccountKey,
    SourceError, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress: one bar, restyled at the start of every stage.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PackageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(stage.to_string());
        self.bar.reset_eta();
    }

    fn on_item_start(&self, _stage: Stage, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, _stage: Stage, _index: usize, _total: usize, _name: &str) {
        self.bar.inc(1);
    }

    fn on_item_error(&self, stage: Stage, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {stage} {index:>3}/{total:<3}  {}",
            red("✗"),
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, total: usize, success_count: usize) {
        let mark = if success_count == total {
            green("✓")
        } else {
            yellow("⚠")
        };
        self.bar
            .println(format!("{mark} {stage}: {success_count}/{total}"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Package two PDFs and a ZIP of evidence, lettered A, B, C…
  exhibit-pack --pdf cv.pdf --pdf award.pdf --zip letters.zip -o out/

  # Web pages as exhibits, archived on archive.org first
  export API2PDF_API_KEY=...
  exhibit-pack --url https://example.com/press --archive -o out/

  # Import a shared Google Drive folder with a service account
  exhibit-pack --drive-folder https://drive.google.com/drive/folders/1AbC... \
               --credentials service-account.json -o out/

  # Roman numerals, case details on the TOC, compressed exhibits
  exhibit-pack --pdf *.pdf --numbering roman --case-name "Smith O-1A" \
               --visa-type O-1A --beneficiary "Jane Smith" --compress --quality maximum

  # Reorder before generating: move exhibit 3 to position 1 (or by label)
  exhibit-pack --pdf a.pdf --pdf b.pdf --pdf c.pdf --move 3:1 -o out/
  exhibit-pack --pdf a.pdf --pdf b.pdf --pdf c.pdf --move C:A -o out/

  # Show the numbered list without generating anything
  exhibit-pack --zip evidence.zip --list-only

OUTPUT FILES:
  Exhibit_Package_<visa>_<YYYYMMDD>.pdf   TOC followed by every exhibit
  <case>_TOC.pdf                          table of contents on its own
  Exhibit_<label>_<name>.pdf              with --individual, one per exhibit

COMPRESSION PRESETS (--quality):
  Preset     Ghostscript profile   Colour/grey DPI   Mono DPI
  ────────   ───────────────────   ───────────────   ────────
  high       /printer              200               300
  balanced   /ebook                150               300
  maximum    /screen               100               200

  Ghostscript (gs) is used when installed; otherwise a lossless lopdf
  rewrite is applied. Files that would grow are kept as-is.

ENVIRONMENT VARIABLES:
  API2PDF_API_KEY     Key for converting web pages to PDF
  RUST_LOG            Log filter (e.g. exhibit_packager=debug)
  EXHIBIT_*           Single-valued options and switches can also be set as
                      EXHIBIT_<FLAG> (e.g. EXHIBIT_CASE_NAME); the source
                      flags (--pdf, --zip, --url, --url-file), --move and
                      --list-only are command-line only.

An input that cannot be read (bad PDF, unreadable ZIP, Drive error, missing
URL list) is reported and skipped; the package is built from the rest.
"#;

/// Assemble numbered PDF exhibit packages with a table of contents.
#[derive(Parser, Debug)]
#[command(
    name = "exhibit-pack",
    version,
    about = "Assemble numbered PDF exhibit packages with a table of contents",
    long_about = "Collect PDFs from local files, ZIP archives, Google Drive folders and web \
URLs, label them Exhibit A, B, C… (or 1, 2, 3 / I, II, III), stamp every page, and merge \
them behind a generated table of contents.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF, JPEG or PNG file (repeatable).
    #[arg(long = "pdf", value_name = "FILE")]
    pdfs: Vec<PathBuf>,

    /// ZIP archive whose PDFs become exhibits (repeatable).
    #[arg(long = "zip", value_name = "FILE")]
    zips: Vec<PathBuf>,

    /// Google Drive folder URL or id.
    #[arg(long, env = "EXHIBIT_DRIVE_FOLDER", requires = "credentials")]
    drive_folder: Option<String>,

    /// Service-account JSON key for Google Drive.
    #[arg(long, env = "EXHIBIT_CREDENTIALS", value_name = "JSON")]
    credentials: Option<PathBuf>,

    /// Web page or PDF URL (repeatable).
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// File with one URL per line (# comments allowed).
    #[arg(long, value_name = "FILE")]
    url_file: Option<PathBuf>,

    /// Label style.
    #[arg(long, env = "EXHIBIT_NUMBERING", value_enum, default_value = "letters")]
    numbering: NumberingArg,

    /// Snapshot URL exhibits on archive.org.
    #[arg(long, env = "EXHIBIT_ARCHIVE")]
    archive: bool,

    /// Delay between archive.org requests, in milliseconds.
    #[arg(long, env = "EXHIBIT_ARCHIVE_DELAY_MS", default_value_t = 1000)]
    archive_delay_ms: u64,

    /// Do not generate a table of contents.
    #[arg(long, env = "EXHIBIT_NO_TOC")]
    no_toc: bool,

    /// Do not merge into a single package PDF.
    #[arg(long, env = "EXHIBIT_NO_MERGE")]
    no_merge: bool,

    /// Also write each stamped exhibit as its own PDF.
    #[arg(long, env = "EXHIBIT_INDIVIDUAL")]
    individual: bool,

    /// Compress each exhibit before stamping.
    #[arg(long, env = "EXHIBIT_COMPRESS")]
    compress: bool,

    /// Compression preset.
    #[arg(long, env = "EXHIBIT_QUALITY", value_enum, default_value = "balanced")]
    quality: QualityArg,

    /// Case name shown on the TOC and used for the TOC file name.
    #[arg(long, env = "EXHIBIT_CASE_NAME", default_value = "Exhibit Package")]
    case_name: String,

    /// Visa type (e.g. O-1A, EB-1A, H-1B).
    #[arg(long, env = "EXHIBIT_VISA_TYPE")]
    visa_type: Option<String>,

    /// Beneficiary name.
    #[arg(long, env = "EXHIBIT_BENEFICIARY")]
    beneficiary: Option<String>,

    /// Petitioner name.
    #[arg(long, env = "EXHIBIT_PETITIONER")]
    petitioner: Option<String>,

    /// Move exhibit FROM to position TO: 1-based positions or labels such as
    /// C:A (repeatable, applied in order).
    #[arg(long = "move", value_name = "FROM:TO", value_parser = parse_move)]
    moves: Vec<(Slot, Slot)>,

    /// Directory for the generated files.
    #[arg(short, long, env = "EXHIBIT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// api2pdf key for converting web pages.
    #[arg(long, env = "API2PDF_API_KEY", hide_env_values = true)]
    api2pdf_key: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "EXHIBIT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON summary instead of text.
    #[arg(long, env = "EXHIBIT_JSON")]
    json: bool,

    /// Print the numbered list and exit without generating.
    #[arg(long)]
    list_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXHIBIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXHIBIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXHIBIT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NumberingArg {
    Letters,
    Numbers,
    Roman,
}

impl From<NumberingArg> for NumberingStyle {
    fn from(v: NumberingArg) -> Self {
        match v {
            NumberingArg::Letters => NumberingStyle::Letters,
            NumberingArg::Numbers => NumberingStyle::Numbers,
            NumberingArg::Roman => NumberingStyle::Roman,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum QualityArg {
    High,
    Balanced,
    Maximum,
}

impl From<QualityArg> for QualityPreset {
    fn from(v: QualityArg) -> Self {
        match v {
            QualityArg::High => QualityPreset::High,
            QualityArg::Balanced => QualityPreset::Balanced,
            QualityArg::Maximum => QualityPreset::Maximum,
        }
    }
}

/// One side of `--move`: a 1-based position or an exhibit label.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Position(usize),
    Label(String),
}

impl Slot {
    /// 0-based index under `style`, if it names one.
    fn resolve(&self, style: NumberingStyle) -> Option<usize> {
        match self {
            Slot::Position(n) => n.checked_sub(1),
            Slot::Label(label) => position_of(style, label),
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Position(n) => write!(f, "{n}"),
            Slot::Label(label) => f.write_str(label),
        }
    }
}

fn parse_slot(s: &str) -> Result<Slot, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty position".into());
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return match s.parse::<usize>() {
            Ok(0) => Err("positions are 1-based".into()),
            Ok(n) => Ok(Slot::Position(n)),
            Err(_) => Err(format!("invalid position '{s}'")),
        };
    }
    if s.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(Slot::Label(s.to_ascii_uppercase()));
    }
    Err(format!("invalid position '{s}'"))
}

/// Parse `FROM:TO`, each side a 1-based position or a label.
fn parse_move(s: &str) -> Result<(Slot, Slot), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{s}'"))?;
    Ok((parse_slot(from)?, parse_slot(to)?))
}

/// Machine-readable run summary for `--json`.
#[derive(Serialize)]
struct Summary<'a> {
    exhibits: &'a [ExhibitRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a PackageStats>,
    files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<ArchiveStats>,
    issues: &'a [SourceError],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is set.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, progress.clone())?;
    let mut session = ExhibitSession::new(config).context("Failed to set up session")?;

    // ── Add sources in flag order ────────────────────────────────────────
    // A rejected input is reported and skipped; only an empty list is fatal.
    let mut issues: Vec<SourceError> = Vec::new();

    for path in &cli.pdfs {
        if let Err(e) = session.add_upload(path).await {
            skip_input(&mut issues, path.display(), e);
        }
    }

    for path in &cli.zips {
        if let Err(e) = add_zip_file(&mut session, path).await {
            skip_input(&mut issues, path.display(), format!("{e:#}"));
        }
    }

    if let (Some(folder), Some(key_path)) = (&cli.drive_folder, &cli.credentials) {
        if let Err(e) = add_drive(&mut session, folder, key_path).await {
            skip_input(&mut issues, folder, format!("{e:#}"));
        }
    }

    let urls = match collect_urls(&cli).await {
        Ok(urls) => urls,
        Err(e) => {
            let input = cli.url_file.as_deref().unwrap_or(Path::new("--url-file"));
            skip_input(&mut issues, input.display(), format!("{e:#}"));
            cli.urls.clone()
        }
    };
    if !urls.is_empty() {
        session.add_urls(&urls).await;
    }
    issues.append(&mut session.take_issues());

    // ── Reorder ──────────────────────────────────────────────────────────
    let style = session.config().numbering;
    for (from, to) in &cli.moves {
        let len = session.list().len();
        let resolved = from
            .resolve(style)
            .zip(to.resolve(style))
            .filter(|&(f, t)| f < len && t < len);
        let Some((from_idx, to_idx)) = resolved else {
            if let Some(ref p) = progress {
                p.finish();
            }
            bail!("--move {from}:{to}: the list has {len} exhibits");
        };
        let id = session.list().records()[from_idx].id;
        session.move_to(id, to_idx)?;
    }

    if session.list().is_empty() {
        if let Some(ref p) = progress {
            p.finish();
        }
        print_issues(&issues);
        bail!("No exhibits were added. Pass --pdf, --zip, --drive-folder or --url.");
    }

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        if let Some(ref p) = progress {
            p.finish();
        }
        if cli.json {
            let summary = Summary {
                exhibits: session.list().records(),
                stats: None,
                files: vec![],
                archive: session.archive_stats(),
                issues: &issues,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_list(session.list().records());
            print_issues(&issues);
        }
        return Ok(());
    }

    // ── Generate and write ───────────────────────────────────────────────
    let mut package = session.generate().await.context("Package generation failed")?;
    let files = write_package(&package, &cli.output_dir, cli.individual)
        .await
        .context("Failed to write package")?;
    if let Some(ref p) = progress {
        p.finish();
    }

    issues.append(&mut package.issues);

    if cli.json {
        let summary = Summary {
            exhibits: session.list().records(),
            stats: Some(&package.stats),
            files,
            archive: session.archive_stats(),
            issues: &issues,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !cli.quiet {
        print_list(session.list().records());
        print_issues(&issues);
        let s = &package.stats;
        eprintln!(
            "{}  {} exhibits  {} pages  {}ms",
            if issues.is_empty() { green("✔") } else { cyan("⚠") },
            bold(&s.total_exhibits.to_string()),
            s.exhibit_pages + s.toc_pages,
            s.total_duration_ms,
        );
        for f in &files {
            eprintln!("   →  {}", bold(&f.display().to_string()));
        }
    }
    Ok(())
}

/// Map CLI args to `PackageConfig`.
fn build_config(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<PackageConfig> {
    let mut builder = PackageConfig::builder()
        .numbering(cli.numbering.into())
        .case_name(cli.case_name.clone())
        .include_toc(!cli.no_toc)
        .merge(!cli.no_merge)
        .keep_individual(cli.individual)
        .compression(cli.compress.then(|| cli.quality.into()))
        .archive_urls(cli.archive)
        .archive_delay_ms(cli.archive_delay_ms)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref v) = cli.visa_type {
        builder = builder.visa_type(v.clone());
    }
    if let Some(ref b) = cli.beneficiary {
        builder = builder.beneficiary(b.clone());
    }
    if let Some(ref p) = cli.petitioner {
        builder = builder.petitioner(p.clone());
    }
    if let Some(ref k) = cli.api2pdf_key {
        builder = builder.api2pdf_key(k.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

/// Record a rejected input and carry on.
fn skip_input(
    issues: &mut Vec<SourceError>,
    input: impl std::fmt::Display,
    err: impl std::fmt::Display,
) {
    warn!("Skipping {input}: {err}");
    issues.push(SourceError::InputSkipped {
        input: input.to_string(),
        detail: err.to_string(),
    });
}

async fn add_zip_file(session: &mut ExhibitSession, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    session
        .add_zip(&name, &bytes)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    Ok(())
}

async fn add_drive(session: &mut ExhibitSession, folder: &str, key_path: &Path) -> Result<()> {
    let key = ServiceAccountKey::from_file(key_path)
        .await
        .context("Failed to load Google credentials")?;
    session
        .add_drive_folder(folder, &key)
        .await
        .context("Google Drive import failed")?;
    Ok(())
}

/// `--url` values followed by the non-empty, non-comment lines of `--url-file`.
async fn collect_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = cli.urls.clone();
    if let Some(ref path) = cli.url_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read URL list from {}", path.display()))?;
        urls.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    Ok(urls)
}

fn print_list(records: &[ExhibitRecord]) {
    for r in records {
        let url = r
            .archived_url
            .as_deref()
            .or(r.original_url.as_deref())
            .map(|u| format!("  {}", dim(u)))
            .unwrap_or_default();
        println!(
            "{:>10}  {:<40}  {:>4} pp{url}",
            bold(&format!("Exhibit {}", r.label)),
            r.display_name,
            r.page_count
        );
    }
}

fn print_issues(issues: &[SourceError]) {
    for issue in issues {
        eprintln!("  {} {}", yellow("⚠"), issue);
    }
}

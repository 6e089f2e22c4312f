//! The population driver: walks the file index in id order, routes each file
//! to its extractor, stores the record and keeps a per-run audit log.

pub mod runlog;
pub mod sniffing;

use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use casefile_common::config::AppConfig;
use casefile_extract_dispatch::{run_extractor, Route, Router, RouterBuilder, SkipReason};
use casefile_extract_types::{Capabilities, ExtractOutcome, Extractor, ExtractorConfig, Family};
use casefile_store::{self as store, FileFilter, FileRow};

use crate::runlog::RunLog;

pub use sniffing::{sniff_pass, SniffSummary};

/// Capabilities this build was compiled with.
pub fn compiled_capabilities() -> Capabilities {
    Capabilities {
        content_sniffing: casefile_sniff::CONTENT_SNIFFING_AVAILABLE,
        pdf_text: casefile_extract_dispatch::PDF_TEXT_AVAILABLE,
        ..Capabilities::all()
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Worker `index` of `count`: processes rows with `id % count == index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub count: u32,
    pub index: u32,
}

/// Parses `k/n`.
impl FromStr for Shard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (k, n) = s.split_once('/').ok_or_else(|| anyhow!("expected <index>/<count>, got {s:?}"))?;
        let index: u32 = k.trim().parse().with_context(|| format!("bad shard index {k:?}"))?;
        let count: u32 = n.trim().parse().with_context(|| format!("bad shard count {n:?}"))?;
        if count == 0 || index >= count {
            bail!("shard index must be below a non-zero count, got {index}/{count}");
        }
        Ok(Shard { count, index })
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub extractor: ExtractorConfig,
    pub log_dir: PathBuf,
    pub log_prefix: String,
    /// Sniff rows whose true extension is still NULL before routing them.
    pub sniff_unresolved: bool,
    /// Joined onto relative stored paths.
    pub base_dir: Option<PathBuf>,
    pub shard: Option<Shard>,
}

impl RunOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            extractor: cfg.extractor_config(compiled_capabilities()),
            log_dir: PathBuf::from(&cfg.populate.log_dir),
            log_prefix: cfg.populate.log_prefix.clone(),
            sniff_unresolved: cfg.populate.sniff_unresolved,
            base_dir: cfg.index.base_dir.as_ref().map(PathBuf::from),
            shard: None,
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success { family: Family, partial: Option<String> },
    Skipped(SkipReason),
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success { family, partial: None } => write!(f, "SUCCESS ({family})"),
            Status::Success { family, partial: Some(reason) } => write!(f, "SUCCESS ({family}, partial: {reason})"),
            Status::Skipped(reason) => write!(f, "SKIPPED ({reason})"),
            Status::Error(reason) => write!(f, "ERROR: {reason}"),
        }
    }
}

impl Status {
    fn from_outcome(outcome: &ExtractOutcome) -> Self {
        match outcome {
            ExtractOutcome::Success(rec) => Status::Success { family: rec.family(), partial: None },
            ExtractOutcome::PartialSuccess(rec, reason) => {
                Status::Success { family: rec.family(), partial: Some(reason.clone()) }
            }
            ExtractOutcome::Failure(reason) => Status::Error(reason.clone()),
        }
    }
}

/// Handed to the progress callback after each file.
#[derive(Debug, Clone)]
pub struct Progress {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub filename: String,
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ok: usize,
    pub skipped: usize,
    pub errors: usize,
    pub log_path: PathBuf,
    /// The callback asked to stop before every file was processed.
    pub stopped_early: bool,
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Populates every file in the index with the default routing table.
pub fn run<F>(conn: &Connection, opts: &RunOptions, progress: F) -> Result<RunSummary>
where
    F: FnMut(&Progress) -> ControlFlow<()>,
{
    let router = RouterBuilder::with_defaults().build();
    run_with_router(conn, &router, opts, progress)
}

/// Like [`run`] with a caller-built router.
///
/// Fails before touching any file when the listing query fails or the run
/// log cannot be created.  After that, per-file problems become `ERROR`
/// lines and the run carries on.
pub fn run_with_router<F>(conn: &Connection, router: &Router, opts: &RunOptions, mut progress: F) -> Result<RunSummary>
where
    F: FnMut(&Progress) -> ControlFlow<()>,
{
    let filter = match opts.shard {
        Some(s) => FileFilter::Shard { count: s.count, index: s.index },
        None => FileFilter::All,
    };
    let files = store::list_files(conn, filter).context("listing files to populate")?;
    let mut log = RunLog::create(&opts.log_dir, &opts.log_prefix, opts.shard)?;

    let total = files.len();
    info!("populating {total} files, run log {}", log.path().display());
    let mut summary = RunSummary { log_path: log.path().to_path_buf(), ..Default::default() };

    for (i, file) in files.iter().enumerate() {
        let status = process_file(conn, router, opts, file);
        match &status {
            Status::Success { .. } => summary.ok += 1,
            Status::Skipped(_) => summary.skipped += 1,
            Status::Error(reason) => {
                warn!("{}: {reason}", file.path);
                summary.errors += 1;
            }
        }

        let filename = display_name(opts.base_dir.as_deref(), &file.path);
        log.file_line(&status, &filename)?;

        let p = Progress { index: i + 1, total, filename, status };
        if progress(&p).is_break() {
            summary.stopped_early = i + 1 < total;
            break;
        }
    }

    log.summary_line(&summary)?;
    info!(
        "populate finished: ok={} skipped={} errors={}",
        summary.ok, summary.skipped, summary.errors
    );
    Ok(summary)
}

/// Runs `extractor` over the file with id `file_id` and stores the record.
///
/// A `Failure` outcome is returned as-is and nothing is written.
pub fn populate(conn: &Connection, file_id: i64, extractor: &dyn Extractor, cfg: &ExtractorConfig) -> Result<ExtractOutcome> {
    let file = store::get_file(conn, file_id)?.ok_or_else(|| anyhow!("no file with id {file_id}"))?;
    populate_path(conn, file_id, Path::new(&file.path), extractor, cfg)
}

fn populate_path(
    conn: &Connection,
    file_id: i64,
    path: &Path,
    extractor: &dyn Extractor,
    cfg: &ExtractorConfig,
) -> Result<ExtractOutcome> {
    let outcome = run_extractor(extractor, path, cfg);
    if let Some(record) = outcome.record() {
        store::write_record(conn, file_id, record)?;
    }
    Ok(outcome)
}

fn process_file(conn: &Connection, router: &Router, opts: &RunOptions, file: &FileRow) -> Status {
    let path = resolve_stored_path(opts.base_dir.as_deref(), &file.path);

    let mut true_extension = file.true_extension.clone();
    if true_extension.is_none() && opts.sniff_unresolved {
        match casefile_sniff::sniff_path(&path, &opts.extractor.capabilities) {
            Ok(sniffed) => {
                if let Some(ext) = &sniffed.extension {
                    if let Err(e) = store::set_true_extension(conn, file.id, Some(ext)) {
                        return Status::Error(format!("{e:#}"));
                    }
                }
                true_extension = sniffed.extension;
            }
            // Routing falls back to the declared extension; the extractor
            // reports the unreadable file.
            Err(e) => debug!("cannot sniff {}: {e}", path.display()),
        }
    }

    let route = router.resolve(&file.file_name_lower(), true_extension.as_deref(), file.decl_extension.as_deref());
    match route {
        Route::Skip(reason) => Status::Skipped(reason),
        Route::Dispatch(extractor, key) => {
            debug!("{} -> {} via {key}", file.path, extractor.family());
            match populate_path(conn, file.id, &path, extractor.as_ref(), &opts.extractor) {
                Ok(outcome) => Status::from_outcome(&outcome),
                Err(e) => Status::Error(format!("{e:#}")),
            }
        }
    }
}

pub(crate) fn resolve_stored_path(base_dir: Option<&Path>, stored: &str) -> PathBuf {
    let p = Path::new(stored);
    match base_dir {
        Some(base) if p.is_relative() => base.join(p),
        _ => p.to_path_buf(),
    }
}

/// The stored path relative to `base_dir` when it lies beneath it, else the
/// stored path unchanged.
fn display_name(base_dir: Option<&Path>, stored: &str) -> String {
    base_dir
        .and_then(|base| Path::new(stored).strip_prefix(base).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| rel.to_string_lossy().into_owned())
        .unwrap_or_else(|| stored.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefile_store::NewFile;

    fn options(log_dir: &Path) -> RunOptions {
        RunOptions {
            extractor: ExtractorConfig::default(),
            log_dir: log_dir.to_path_buf(),
            log_prefix: "metadata_run".into(),
            sniff_unresolved: true,
            base_dir: Some(log_dir.to_path_buf()),
            shard: None,
        }
    }

    #[test]
    fn test_status_display() {
        let ok = Status::Success { family: Family::Pdf, partial: None };
        assert_eq!(ok.to_string(), "SUCCESS (pdf)");
        let partial = Status::Success { family: Family::Model3d, partial: Some("no faces".into()) };
        assert_eq!(partial.to_string(), "SUCCESS (3d, partial: no faces)");
        assert_eq!(Status::Skipped(SkipReason::NoCollector).to_string(), "SKIPPED (No Collector)");
        assert_eq!(Status::Skipped(SkipReason::Ignored).to_string(), "SKIPPED (Ignored System File)");
        assert_eq!(Status::Error("cannot stat x".into()).to_string(), "ERROR: cannot stat x");
    }

    #[test]
    fn test_shard_parse() {
        assert_eq!("1/4".parse::<Shard>().unwrap(), Shard { count: 4, index: 1 });
        assert!("4/4".parse::<Shard>().is_err());
        assert!("0/0".parse::<Shard>().is_err());
        assert!("two".parse::<Shard>().is_err());
    }

    #[test]
    fn test_resolve_stored_path() {
        let base = Path::new("/evidence");
        assert_eq!(resolve_stored_path(Some(base), "a/b.txt"), PathBuf::from("/evidence/a/b.txt"));
        assert_eq!(resolve_stored_path(Some(base), "/x/y.txt"), PathBuf::from("/x/y.txt"));
        assert_eq!(resolve_stored_path(None, "a/b.txt"), PathBuf::from("a/b.txt"));
    }

    #[test]
    fn test_display_name() {
        let base = Path::new("/evidence");
        assert_eq!(display_name(Some(base), "/evidence/2023/a.txt"), "2023/a.txt");
        assert_eq!(display_name(Some(base), "/other/a.txt"), "/other/a.txt");
        assert_eq!(display_name(Some(base), "docs/a.txt"), "docs/a.txt");
        assert_eq!(display_name(None, "/evidence/a.txt"), "/evidence/a.txt");
    }

    #[test]
    fn test_run_mixed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "first line\nsecond line\n").unwrap();
        let font = dir.path().join("font.woff2");
        std::fs::write(&font, b"wOF2\0\0\0\0").unwrap();

        let conn = store::open_in_memory().unwrap();
        let notes_id = store::upsert_file(&conn, &NewFile::from_path(notes.to_str().unwrap())).unwrap();
        store::upsert_file(&conn, &NewFile::from_path(font.to_str().unwrap())).unwrap();
        store::upsert_file(&conn, &NewFile::from_path(dir.path().join("Thumbs.db").to_str().unwrap())).unwrap();

        let mut seen = Vec::new();
        let summary = run(&conn, &options(dir.path()), |p| {
            seen.push((p.index, p.total, p.filename.clone()));
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!((summary.ok, summary.skipped, summary.errors), (1, 2, 0));
        assert!(!summary.stopped_early);
        assert_eq!(seen[0], (1, 3, "notes.txt".to_string()));
        assert_eq!(seen[2].2, "Thumbs.db");
        assert!(store::read_record(&conn, Family::Text, notes_id).unwrap().is_some());

        let log = std::fs::read_to_string(&summary.log_path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[SUCCESS (text)] : notes.txt");
        assert_eq!(lines[2], "[SKIPPED (Ignored System File)] : Thumbs.db");
        assert_eq!(lines[3], "RESULTS : OK=1 | SKIPPED=2 | ERRORS=0");
    }

    #[test]
    fn test_populate_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        std::fs::write(&path, "def main():\n    pass\n").unwrap();
        let conn = store::open_in_memory().unwrap();
        let id = store::upsert_file(&conn, &NewFile::from_path(path.to_str().unwrap())).unwrap();

        let router = RouterBuilder::with_defaults().build();
        let Route::Dispatch(extractor, _) = router.resolve("main.py", None, Some(".py")) else {
            panic!("main.py should route");
        };
        let outcome = populate(&conn, id, extractor.as_ref(), &ExtractorConfig::default()).unwrap();
        assert_eq!(outcome.record().map(|r| r.family()), Some(Family::Code));
        assert_eq!(store::count_records(&conn, Family::Code).unwrap(), 1);

        assert!(populate(&conn, id + 100, extractor.as_ref(), &ExtractorConfig::default()).is_err());
    }

    #[test]
    fn test_compiled_capabilities_keep_builtin_parsers() {
        let caps = compiled_capabilities();
        assert!(caps.exif && caps.pe_parsing && caps.sqlite_inspection);
        assert_eq!(caps.content_sniffing, casefile_sniff::CONTENT_SNIFFING_AVAILABLE);
    }
}

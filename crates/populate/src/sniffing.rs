//! Standalone sniff pass: fills `file.true_extension` from file content
//! without running any extractor.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use casefile_extract_types::Capabilities;
use casefile_store::{self as store, FileFilter};

use crate::resolve_stored_path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SniffSummary {
    /// Rows that got a true extension.
    pub resolved: usize,
    /// Readable files of an unrecognised type; left NULL, or reset to NULL
    /// on a full re-sniff.
    pub unknown: usize,
    pub errors: usize,
}

/// Sniffs unresolved rows, or every row when `all` is set.  A full pass
/// clears a stored true extension the content no longer supports.
///
/// Each row is committed on its own.  `progress` gets the 1-based index, the
/// total and the stored path.
pub fn sniff_pass<F>(
    conn: &Connection,
    caps: &Capabilities,
    all: bool,
    base_dir: Option<&Path>,
    mut progress: F,
) -> Result<SniffSummary>
where
    F: FnMut(usize, usize, &str),
{
    let filter = if all { FileFilter::All } else { FileFilter::Unresolved };
    let files = store::list_files(conn, filter).context("listing files to sniff")?;
    let total = files.len();
    let mut summary = SniffSummary::default();

    for (i, file) in files.iter().enumerate() {
        let path = resolve_stored_path(base_dir, &file.path);
        match casefile_sniff::sniff_path(&path, caps) {
            Ok(sniffed) => match sniffed.extension {
                Some(ext) => match store::set_true_extension(conn, file.id, Some(&ext)) {
                    Ok(()) => summary.resolved += 1,
                    Err(e) => {
                        warn!("{}: {e:#}", file.path);
                        summary.errors += 1;
                    }
                },
                None if all && file.true_extension.is_some() => {
                    match store::set_true_extension(conn, file.id, None) {
                        Ok(()) => summary.unknown += 1,
                        Err(e) => {
                            warn!("{}: {e:#}", file.path);
                            summary.errors += 1;
                        }
                    }
                }
                None => summary.unknown += 1,
            },
            Err(e) => {
                warn!("cannot sniff {}: {e}", path.display());
                summary.errors += 1;
            }
        }
        progress(i + 1, total, &file.path);
    }

    info!(
        "sniffed {total} files: resolved={} unknown={} errors={}",
        summary.resolved, summary.unknown, summary.errors
    );
    Ok(summary)
}

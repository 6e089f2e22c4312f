//! The per-run audit log: one line per file in processing order, then one
//! summary line.  Every line is flushed as soon as it is written, so a crash
//! leaves a log that is complete up to the last finished file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{RunSummary, Shard, Status};

pub struct RunLog {
    out: BufWriter<File>,
    path: PathBuf,
}

impl RunLog {
    /// Creates `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.log`, with a
    /// `_shard<k>of<n>` suffix for sharded runs.
    pub fn create(dir: &Path, prefix: &str, shard: Option<Shard>) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = match shard {
            Some(s) => format!("{prefix}_{stamp}_shard{}of{}.log", s.index, s.count),
            None => format!("{prefix}_{stamp}.log"),
        };
        let path = dir.join(name);
        let file = File::create(&path).with_context(|| format!("creating run log {}", path.display()))?;
        Ok(Self { out: BufWriter::new(file), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[<status>] : <filename>`
    ///
    /// Control characters in either part are written escaped, so a file name
    /// or error message can never start a line of its own.
    pub fn file_line(&mut self, status: &Status, filename: &str) -> Result<()> {
        self.write_line(&escape_control(&format!("[{status}] : {filename}")))
    }

    /// `RESULTS : OK=n | SKIPPED=n | ERRORS=n`
    pub fn summary_line(&mut self, summary: &RunSummary) -> Result<()> {
        self.write_line(&format!(
            "RESULTS : OK={} | SKIPPED={} | ERRORS={}",
            summary.ok, summary.skipped, summary.errors
        ))
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")
            .and_then(|_| self.out.flush())
            .with_context(|| format!("writing run log {}", self.path.display()))
    }
}

/// `\n` becomes the two characters `\` `n`; other control characters take
/// the `\u{..}` form.
fn escape_control(line: &str) -> String {
    if !line.chars().any(char::is_control) {
        return line.to_string();
    }
    line.chars()
        .fold(String::with_capacity(line.len() + 8), |mut out, c| {
            if c.is_control() {
                out.extend(c.escape_default());
            } else {
                out.push(c);
            }
            out
        })
}

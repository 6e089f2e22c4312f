//! Tabular data files and database files.

mod database;
mod delimited;
mod parquet;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{bail, Context, Result};

use casefile_extract_text::read_text;
use casefile_extract_types::records::TabularMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, Source, TypeRecord,
};

pub use delimited::{sniff_delimiter, split_record};

pub struct TabularExtractor;

impl Extractor for TabularExtractor {
    fn family(&self) -> Family {
        Family::Tabular
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(lower_ext(path).as_str(), "csv" | "tsv" | "tab" | "psv" | "parquet" | "nc")
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_tabular(path, cfg)
    }
}

pub struct DatabaseExtractor;

impl Extractor for DatabaseExtractor {
    fn family(&self) -> Family {
        Family::Database
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(
            lower_ext(path).as_str(),
            "sqlite" | "sqlite3" | "db" | "db3" | "mdb" | "accdb"
        )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        match read_prefix(path, 2048) {
            Ok(header) => database::extract(path, &header, cfg),
            Err(reason) => ExtractOutcome::Failure(reason),
        }
    }
}

/// At most `limit` leading bytes.
fn read_prefix(path: &Path, limit: u64) -> Result<Vec<u8>, String> {
    Source::open(path)?.head(limit)
}

pub fn extract_tabular(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let head = match read_prefix(path, 8) {
        Ok(h) => h,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    if head.starts_with(b"PAR1") {
        extract_parquet(path)
    } else if head.starts_with(b"CDF\x01") || head.starts_with(b"CDF\x02") || head.starts_with(b"\x89HDF\r\n\x1a\n") {
        extract_netcdf(&head)
    } else {
        extract_delimited(path, cfg)
    }
}

fn extract_delimited(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let decoded = match read_text(path, cfg.max_text_bytes) {
        Ok(d) => d,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let fallback = match lower_ext(path).as_str() {
        "tsv" | "tab" => '\t',
        "psv" => '|',
        _ => ',',
    };
    let table = delimited::analyze(&decoded.text, fallback);

    let mut meta = table.meta;
    let tab_separated = meta.delimiter.as_deref() == Some("\\t");
    meta.data_format = Some(if tab_separated { "TSV" } else { "CSV" }.to_string());
    meta.encoding = Some(decoded.encoding.to_string());

    let mut issues = Vec::new();
    if decoded.truncated {
        issues.push(format!("only the first {} bytes were analysed", cfg.max_text_bytes));
    }
    if decoded.looks_binary {
        issues.push("content looks binary".to_string());
    }

    let mut text = summary(&meta);
    text.push_str("\n-- PREVIEW --\n");
    if meta.has_header == Some(true) {
        text.push_str(&table.columns.join(" | "));
        text.push('\n');
        text.push_str(&"-".repeat(20));
        text.push('\n');
    }
    for row in &table.preview {
        text.push_str(&row.join(" | "));
        text.push('\n');
    }

    let mime = if tab_separated { "text/tab-separated-values" } else { "text/csv" };
    let record = TypeRecord::new(FamilyMeta::Tabular(meta))
        .with_mime(mime)
        .with_excerpts(Excerpts::from_text(text.trim_end()));
    ExtractOutcome::from_issues(record, issues)
}

fn extract_parquet(path: &Path) -> ExtractOutcome {
    let mut meta = TabularMeta {
        data_format: Some("Parquet".to_string()),
        ..Default::default()
    };
    let outcome = match read_parquet_footer(path) {
        Ok(footer) => {
            let names: Vec<&str> = footer.columns.iter().map(|(n, _)| n.as_str()).collect();
            meta.row_count = Some(footer.num_rows.max(0) as u64);
            meta.column_count = Some(footer.columns.len() as u32);
            meta.numeric_col_count = Some(footer.numeric_columns() as u32);
            meta.text_col_count = Some(footer.text_columns() as u32);
            meta.column_names = (!names.is_empty()).then(|| names.join(", "));
            None
        }
        Err(e) => Some(format!("{e:#}")),
    };
    let record = TypeRecord::new(FamilyMeta::Tabular(meta.clone()))
        .with_mime("application/vnd.apache.parquet")
        .with_excerpts(Excerpts::from_text(summary(&meta).trim_end()));
    match outcome {
        None => ExtractOutcome::Success(record),
        Some(reason) => ExtractOutcome::PartialSuccess(record, reason),
    }
}

/// Reads the `PAR1` head and the footer from the end of the file without
/// loading the column chunks.
fn read_parquet_footer(path: &Path) -> Result<parquet::Footer> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let size = file.metadata()?.len();
    if size < 12 {
        bail!("file too small for Parquet");
    }
    let mut head = [0u8; 4];
    file.read_exact(&mut head)?;
    let mut trailer = [0u8; 8];
    file.seek(SeekFrom::End(-8))?;
    file.read_exact(&mut trailer)?;
    let footer_len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;
    if footer_len + 12 > size {
        bail!("footer length exceeds file size");
    }
    file.seek(SeekFrom::End(-((footer_len + 8) as i64)))?;
    let mut buf = head.to_vec();
    file.take(footer_len + 8).read_to_end(&mut buf)?;
    parquet::read_footer(&buf)
}

fn extract_netcdf(head: &[u8]) -> ExtractOutcome {
    let classic = head.starts_with(b"CDF");
    let mut meta = TabularMeta {
        data_format: Some(if classic { "NetCDF" } else { "NetCDF-4/HDF5" }.to_string()),
        ..Default::default()
    };
    // Classic header: record count of the unlimited dimension, 0xFFFFFFFF while streaming.
    if classic {
        if let Some(n) = head.get(4..8).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]])) {
            if n != u32::MAX {
                meta.row_count = Some(n as u64);
            }
        }
    }
    let text = summary(&meta);
    let record = TypeRecord::new(FamilyMeta::Tabular(meta))
        .with_mime("application/x-netcdf")
        .with_excerpts(Excerpts::from_text(text.trim_end()));
    ExtractOutcome::PartialSuccess(record, "NetCDF variables not parsed".to_string())
}

fn summary(meta: &TabularMeta) -> String {
    let mut text = format!(
        "FORMAT: {}\nSHAPE: {} rows x {} cols\n",
        meta.data_format.as_deref().unwrap_or("Unknown"),
        meta.row_count.unwrap_or(0),
        meta.column_count.unwrap_or(0)
    );
    if let Some(names) = &meta.column_names {
        text.push_str(&format!("COLUMNS: {names}\n"));
    }
    text
}

mod package;
mod rtf;
mod xml;

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader};
use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use tracing::debug;

use casefile_extract_types::records::OfficeMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, Source, TypeRecord,
};

/// Office documents: OOXML and OpenDocument packages, EPUB, RTF, and the
/// legacy OLE2 formats.
pub struct OfficeExtractor;

impl Extractor for OfficeExtractor {
    fn family(&self) -> Family {
        Family::Office
    }

    fn accepts(&self, path: &Path) -> bool {
        accepts(path)
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract(path, cfg)
    }
}

pub fn accepts(path: &Path) -> bool {
    matches!(
        lower_ext(path).as_str(),
        "docx" | "docm" | "dotx" | "doc"
            | "xlsx" | "xlsm" | "xls"
            | "pptx" | "pptm" | "ppt"
            | "odt" | "ods" | "odp" | "epub" | "rtf"
    )
}

/// What the format-specific readers fill in.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    pub meta: OfficeMeta,
    pub text: String,
    pub mime: Option<&'static str>,
    pub issues: Vec<String>,
}

/// Reads document properties and body text.
///
/// The layout is decided from the bytes, not the name: routing may hand
/// over a file whose declared extension lies about its content.
pub fn extract(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let ext = lower_ext(path);
    let mut parsed = Parsed::default();
    let mut src = match Source::open(path) {
        Ok(src) => src,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    if src.len() > cfg.max_parse_bytes {
        debug!("{}: larger than {} bytes, container not opened", path.display(), cfg.max_parse_bytes);
        parsed.meta.office_type = office_type_for_ext(&ext).map(str::to_string);
        parsed.issues.push(format!("file larger than {} bytes; container not parsed", cfg.max_parse_bytes));
        return finish(parsed, &ext, cfg);
    }
    let bytes = match src.head(cfg.max_parse_bytes) {
        Ok(b) => b,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };

    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
        package::read(&bytes, &ext, cfg, &mut parsed);
    } else if bytes.starts_with(b"{\\rtf") {
        rtf::read(&bytes, &mut parsed);
    } else if bytes.starts_with(&OLE2_MAGIC) {
        read_legacy(&bytes, &mut parsed);
    } else {
        parsed.meta.office_type = office_type_for_ext(&ext).map(str::to_string);
        parsed.issues.push("not an office document container".to_string());
    }

    finish(parsed, &ext, cfg)
}

fn finish(mut parsed: Parsed, ext: &str, cfg: &ExtractorConfig) -> ExtractOutcome {
    let text = parsed.text.trim();
    if !text.is_empty() {
        if parsed.meta.word_count.is_none() {
            parsed.meta.word_count = Some(text.split_whitespace().count() as u64);
        }
        if parsed.meta.char_count.is_none() {
            parsed.meta.char_count = Some(text.chars().count() as u64);
        }
    }
    let text = cap_text(text, cfg.max_text_bytes);
    let mime = parsed.mime.or_else(|| mime_for_ext(ext));

    let mut record = TypeRecord::new(FamilyMeta::Office(parsed.meta)).with_excerpts(Excerpts::from_text(text));
    if let Some(mime) = mime {
        record = record.with_mime(mime);
    }
    ExtractOutcome::from_issues(record, parsed.issues)
}

// ── Legacy OLE2 ───────────────────────────────────────────────────────────────

const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Compound files are identified by the name of their main stream.  Excel
/// workbooks are read through calamine; Word and PowerPoint binaries only
/// get their type recorded.
fn read_legacy(bytes: &[u8], parsed: &mut Parsed) {
    if has_utf16_name(bytes, "Workbook") || has_utf16_name(bytes, "Book") {
        parsed.meta.office_type = Some("excel".into());
        parsed.mime = Some("application/vnd.ms-excel");
        match calamine::Xls::new(Cursor::new(bytes.to_vec())) {
            Ok(mut wb) => {
                let (sheets, text) = workbook_text(&mut wb);
                parsed.meta.sheet_count = Some(sheets);
                parsed.text = text;
            }
            Err(e) => parsed.issues.push(format!("legacy workbook unreadable: {e}")),
        }
        if has_utf16_name(bytes, "_VBA_PROJECT_CUR") {
            parsed.meta.has_macros = Some(true);
        }
    } else if has_utf16_name(bytes, "WordDocument") {
        parsed.meta.office_type = Some("word".into());
        parsed.meta.has_macros = Some(has_utf16_name(bytes, "Macros"));
        parsed.mime = Some("application/msword");
        parsed.issues.push("legacy binary Word document: properties not parsed".into());
    } else if has_utf16_name(bytes, "PowerPoint Document") {
        parsed.meta.office_type = Some("powerpoint".into());
        parsed.mime = Some("application/vnd.ms-powerpoint");
        parsed.issues.push("legacy binary PowerPoint document: properties not parsed".into());
    } else {
        parsed.issues.push("compound file without a known office stream".into());
    }
}

/// Directory entries of a compound file store their names as UTF-16LE.
fn has_utf16_name(bytes: &[u8], name: &str) -> bool {
    let needle: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    bytes.windows(needle.len()).any(|w| w == needle.as_slice())
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Sheet count and the non-empty rows of every sheet, tab separated.
pub(crate) fn workbook_text<RS, R>(wb: &mut R) -> (u32, String)
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let names = wb.sheet_names().to_vec();
    let mut text = String::new();
    for sheet_name in &names {
        text.push_str(&format!("[{sheet_name}]\n"));
        match wb.worksheet_range(sheet_name) {
            Ok(range) => {
                for row in range.rows() {
                    let cells: Vec<String> = row
                        .iter()
                        .filter_map(|cell| match cell {
                            Data::Empty => None,
                            Data::String(s) if s.trim().is_empty() => None,
                            other => Some(other.to_string()).filter(|s| !s.is_empty()),
                        })
                        .collect();
                    if !cells.is_empty() {
                        text.push_str(&cells.join("\t"));
                        text.push('\n');
                    }
                }
            }
            Err(e) => debug!("sheet {sheet_name} unreadable: {e:?}"),
        }
    }
    (names.len() as u32, text)
}

/// Office timestamps come as W3CDTF (`2024-01-15T10:30:00Z`) or, in
/// OpenDocument, without an offset and with fractional seconds.
pub(crate) fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    Some(raw.to_string())
}

fn cap_text(text: &str, max_bytes: u64) -> &str {
    let max = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn office_type_for_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "docx" | "docm" | "dotx" | "doc" | "odt" => Some("word"),
        "xlsx" | "xlsm" | "xls" | "ods" => Some("excel"),
        "pptx" | "pptm" | "ppt" | "odp" => Some("powerpoint"),
        "rtf" => Some("rtf"),
        "epub" => Some("ebook"),
        _ => None,
    }
}

fn mime_for_ext(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docm" => "application/vnd.ms-word.document.macroEnabled.12",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptm" => "application/vnd.ms-powerpoint.presentation.macroEnabled.12",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "epub" => "application/epub+zip",
        "rtf" => "application/rtf",
        _ => return None,
    })
}

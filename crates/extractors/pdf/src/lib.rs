use std::path::Path;
use std::sync::OnceLock;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use lopdf::{Dictionary, Document, Object};
use regex::bytes::Regex;
use tracing::{debug, warn};

use casefile_extract_types::records::PdfMeta;
use casefile_extract_types::{
    Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, Source, TypeRecord,
};

/// Whether this build can extract the PDF text layer.
pub const TEXT_EXTRACTION_AVAILABLE: bool = cfg!(feature = "pdf-text");

const HEADER_LEN: u64 = 1024;

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn family(&self) -> Family {
        Family::Pdf
    }

    fn accepts(&self, path: &Path) -> bool {
        accepts(path)
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        let mut src = match Source::open(path) {
            Ok(src) => src,
            Err(reason) => return ExtractOutcome::Failure(reason),
        };
        if src.len() > cfg.max_parse_bytes {
            return match src.head(HEADER_LEN) {
                Ok(head) => oversized(&head, cfg.max_parse_bytes),
                Err(reason) => ExtractOutcome::Failure(reason),
            };
        }
        match src.head(cfg.max_parse_bytes) {
            Ok(bytes) => extract_from_bytes(&bytes, &path.display().to_string(), cfg),
            Err(reason) => ExtractOutcome::Failure(reason),
        }
    }
}

/// Check if a file is a PDF based on extension.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Header version only; the cross-reference data sits at the end of the file.
fn oversized(head: &[u8], limit: u64) -> ExtractOutcome {
    let meta = PdfMeta { pdf_version: header_version(head), ..Default::default() };
    let record = TypeRecord::new(FamilyMeta::Pdf(meta)).with_mime("application/pdf");
    ExtractOutcome::PartialSuccess(record, format!("file larger than {limit} bytes; structure not parsed"))
}

/// Read document structure, the info dictionary and (when available) the
/// text layer from PDF bytes.
///
/// The object graph is loaded with lopdf, which resolves cross-reference
/// streams and object streams.  A file it cannot load still gets a record
/// with zero pages and the header version; this never fails outright.
pub fn extract_from_bytes(bytes: &[u8], name: &str, cfg: &ExtractorConfig) -> ExtractOutcome {
    let mut issues = Vec::new();
    let mut meta = PdfMeta::default();

    meta.pdf_version = header_version(bytes);
    if meta.pdf_version.is_none() {
        issues.push("missing %PDF header".to_string());
    }

    let doc = match load_document(bytes) {
        Ok(doc) => doc,
        Err(reason) => {
            debug!("{name}: {reason}");
            meta.page_count = Some(0);
            issues.push(reason);
            let record = TypeRecord::new(FamilyMeta::Pdf(meta)).with_mime("application/pdf");
            return ExtractOutcome::from_issues(record, issues);
        }
    };
    read_structure(doc, &mut meta, &mut issues);

    let mut excerpts = Excerpts::default();
    if cfg.capabilities.pdf_text {
        match extract_text(bytes, name) {
            Some(Ok(text)) => {
                let text = text.trim();
                meta.has_text = Some(!text.is_empty());
                excerpts = Excerpts::from_text(text);
            }
            Some(Err(reason)) => issues.push(reason),
            None => debug!("pdf text extraction not compiled in; skipping text layer for {name}"),
        }
    }
    meta.is_ocr_required = ocr_required(meta.has_text, meta.has_images);

    let record = TypeRecord::new(FamilyMeta::Pdf(meta))
        .with_mime("application/pdf")
        .with_excerpts(excerpts);
    ExtractOutcome::from_issues(record, issues)
}

/// A scan is needed when there are images and the text layer is known to
/// be empty.
fn ocr_required(has_text: Option<bool>, has_images: Option<bool>) -> Option<bool> {
    match (has_text, has_images) {
        (Some(text), Some(images)) => Some(!text && images),
        _ => None,
    }
}

#[cfg(feature = "pdf-text")]
fn extract_text(bytes: &[u8], name: &str) -> Option<Result<String, String>> {
    // pdf-extract can panic on malformed input.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    Some(match result {
        Ok(Ok(t)) => Ok(t),
        Ok(Err(e)) => {
            debug!("PDF text extraction error for {name}: {e}");
            Err(format!("text extraction failed: {e}"))
        }
        Err(_) => {
            warn!("PDF text extraction panicked for {name}");
            Err("text extraction panicked".to_string())
        }
    })
}

#[cfg(not(feature = "pdf-text"))]
fn extract_text(_bytes: &[u8], _name: &str) -> Option<Result<String, String>> {
    None
}

// ── Document structure ────────────────────────────────────────────────────────

fn load_document(bytes: &[u8]) -> Result<Document, String> {
    match std::panic::catch_unwind(|| Document::load_mem(bytes)) {
        Ok(Ok(doc)) => Ok(doc),
        Ok(Err(e)) => Err(format!("document structure unreadable: {e}")),
        Err(_) => {
            warn!("PDF parser panicked");
            Err("document structure unreadable: parser panicked".to_string())
        }
    }
}

fn read_structure(mut doc: Document, meta: &mut PdfMeta, issues: &mut Vec<String>) {
    let pages = doc.get_pages().len() as u32;
    if pages == 0 {
        issues.push("page tree is empty".to_string());
    }
    meta.page_count = Some(pages);

    let encrypted = doc.is_encrypted();
    meta.is_encrypted = Some(encrypted);
    // Strings stay ciphertext unless the empty user password opens the file.
    let readable = !encrypted || doc.decrypt("").is_ok();
    if !readable {
        issues.push("encrypted; info dictionary not readable".to_string());
    }

    let catalog = doc.catalog().ok();
    meta.has_forms = Some(catalog.is_some_and(|c| c.has(b"AcroForm")));
    if readable {
        meta.language = catalog.and_then(|c| text_entry(&doc, c, b"Lang"));
        meta.pdf_conformance = catalog
            .and_then(|c| stream_content(&doc, c, b"Metadata"))
            .and_then(|xmp| pdfa_conformance(&xmp));
        if let Some(info) = info_dict(&doc) {
            meta.title = text_entry(&doc, info, b"Title");
            meta.author = text_entry(&doc, info, b"Author");
            meta.subject = text_entry(&doc, info, b"Subject");
            meta.keywords = text_entry(&doc, info, b"Keywords");
            meta.creator = text_entry(&doc, info, b"Creator");
            meta.producer = text_entry(&doc, info, b"Producer");
            meta.created_at = text_entry(&doc, info, b"CreationDate").as_deref().and_then(parse_pdf_date);
            meta.modified_at = text_entry(&doc, info, b"ModDate").as_deref().and_then(parse_pdf_date);
        }
    }

    let mut images = false;
    let mut signatures = false;
    for object in doc.objects.values() {
        images |= matches!(object, Object::Stream(s) if name_is(&s.dict, b"Subtype", b"Image"));
        signatures |= any_dict(object, &|d| {
            name_is(d, b"FT", b"Sig") || name_is(d, b"Type", b"Sig") || d.has(b"ByteRange")
        });
        if images && signatures {
            break;
        }
    }
    meta.has_images = Some(images);
    meta.has_signatures = Some(signatures);
}

/// The dictionary the trailer's `/Info` entry points at, and nothing else.
fn info_dict(doc: &Document) -> Option<&Dictionary> {
    let entry = doc.trailer.get(b"Info").ok()?;
    doc.dereference(entry).ok()?.1.as_dict().ok()
}

fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let (_, value) = doc.dereference(dict.get(key).ok()?).ok()?;
    let text = decode_text_bytes(value.as_str().ok()?);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn stream_content(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<u8>> {
    let (_, value) = doc.dereference(dict.get(key).ok()?).ok()?;
    value.as_stream().ok()?.get_plain_content().ok()
}

fn name_is(dict: &Dictionary, key: &[u8], name: &[u8]) -> bool {
    dict.get(key).and_then(Object::as_name).ok() == Some(name)
}

/// Direct dictionaries only; references are visited as their own objects.
fn any_dict(object: &Object, pred: &dyn Fn(&Dictionary) -> bool) -> bool {
    match object {
        Object::Dictionary(d) => pred(d) || d.iter().any(|(_, v)| any_dict(v, pred)),
        Object::Stream(s) => pred(&s.dict),
        Object::Array(items) => items.iter().any(|v| any_dict(v, pred)),
        _ => false,
    }
}

fn header_version(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(HEADER_LEN as usize)];
    let caps = header_re().captures(window)?;
    Some(String::from_utf8_lossy(&caps[1]).into_owned())
}

fn pdfa_conformance(xmp: &[u8]) -> Option<String> {
    let part = pdfa_part_re().captures(xmp)?;
    let part = String::from_utf8_lossy(&part[1]).into_owned();
    let level = pdfa_level_re()
        .captures(xmp)
        .map(|c| String::from_utf8_lossy(&c[1]).to_lowercase())
        .unwrap_or_default();
    Some(format!("PDF/A-{part}{level}"))
}

macro_rules! lazy_re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).expect("static regex"))
        }
    };
}

lazy_re!(header_re, r"%PDF-(\d\.\d)");
lazy_re!(pdfa_part_re, r#"pdfaid:part(?:="|>)(\d)"#);
lazy_re!(pdfa_level_re, r#"pdfaid:conformance(?:="|>)([A-Za-z])"#);

/// UTF-16BE with BOM, else UTF-8, else Latin-1.
fn decode_text_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        let units: Vec<u16> = rest.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// `D:YYYYMMDDHHmmSSOHH'mm'` to ISO 8601.  Missing trailing components take
/// their lowest value; a missing zone yields a local (offset-less) time.
pub fn parse_pdf_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digit_len = s.bytes().take_while(u8::is_ascii_digit).count();
    let digits = &s[..digit_len];
    if digits.len() < 4 {
        return None;
    }
    let field = |start: usize, default: u32| -> u32 {
        digits.get(start..start + 2).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let year: i32 = digits[..4].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(4, 1), field(6, 1))?
        .and_hms_opt(field(8, 0), field(10, 0), field(12, 0))?;

    let zone = &s[digit_len..];
    let offset_secs = match zone.chars().next() {
        Some('Z') => Some(0),
        Some(sign @ ('+' | '-')) => {
            let tz: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
            let hh: i32 = tz.get(0..2)?.parse().ok()?;
            let mm: i32 = tz.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let secs = hh * 3600 + mm * 60;
            Some(if sign == '-' { -secs } else { secs })
        }
        _ => None,
    };

    match offset_secs {
        Some(secs) => {
            let offset = FixedOffset::east_opt(secs)?;
            Some(offset.from_local_datetime(&naive).single()?.to_rfc3339())
        }
        None => Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefile_extract_types::Capabilities;

    /// Numbered objects with a classic cross-reference table.
    fn classic_pdf(objects: &[String], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for off in offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} {trailer} >>\nstartxref\n{xref_at}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }

    /// Minimal well-formed PDF with one text line per page.
    fn minimal_pdf(pages: &[&str], title: &str) -> Vec<u8> {
        let n = pages.len();
        let font_id = 3 + 2 * n;
        let info_id = font_id + 1;
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
        ];
        for (i, text) in pages.iter().enumerate() {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >>",
                4 + 2 * i,
                font_id
            ));
            objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
        }
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
        objects.push(format!("<< /Title ({title}) /CreationDate (D:20240131093000+01'00') >>"));
        classic_pdf(&objects, &format!("/Root 1 0 R /Info {info_id} 0 R"))
    }

    /// PDF 1.5 layout: every dictionary inside one object stream, located
    /// through a cross-reference stream instead of an xref table.
    fn object_stream_pdf(title: &str) -> Vec<u8> {
        let bodies = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string(),
            format!("<< /Title ({title}) /Producer (Stream Writer) >>"),
        ];
        let mut index = String::new();
        let mut body = String::new();
        for (i, b) in bodies.iter().enumerate() {
            index.push_str(&format!("{} {} ", i + 1, body.len()));
            body.push_str(b);
            body.push('\n');
        }
        let content = format!("{index}{body}");

        let mut out = b"%PDF-1.5\n%\xe2\xe3\xcf\xd3\n".to_vec();
        let objstm_at = out.len();
        out.extend_from_slice(
            format!(
                "6 0 obj\n<< /Type /ObjStm /N 5 /First {} /Length {} >>\nstream\n{content}\nendstream\nendobj\n",
                index.len(),
                content.len()
            )
            .as_bytes(),
        );

        let xref_at = out.len();
        let entry = |kind: u8, field: u32, gen: u16| {
            let mut e = vec![kind];
            e.extend_from_slice(&field.to_be_bytes());
            e.extend_from_slice(&gen.to_be_bytes());
            e
        };
        let mut table = entry(0, 0, 0xFFFF);
        for i in 0..5u16 {
            table.extend(entry(2, 6, i));
        }
        table.extend(entry(1, objstm_at as u32, 0));
        table.extend(entry(1, xref_at as u32, 0));

        out.extend_from_slice(
            format!(
                "7 0 obj\n<< /Type /XRef /Size 8 /W [1 4 2] /Root 1 0 R /Info 5 0 R /Length {} >>\nstream\n",
                table.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&table);
        out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref_at}\n%%EOF\n").as_bytes());
        out
    }

    fn no_text() -> ExtractorConfig {
        ExtractorConfig {
            capabilities: Capabilities { pdf_text: false, ..Capabilities::all() },
            ..Default::default()
        }
    }

    fn meta_of(outcome: &ExtractOutcome) -> &PdfMeta {
        match &outcome.record().expect("record").meta {
            FamilyMeta::Pdf(m) => m,
            other => panic!("wrong family: {other:?}"),
        }
    }

    #[test]
    fn test_two_page_structure() {
        let pdf = minimal_pdf(&["Hello", "World"], "Quarterly");
        let out = extract_from_bytes(&pdf, "q.pdf", &no_text());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.page_count, Some(2));
        assert_eq!(m.pdf_version.as_deref(), Some("1.4"));
        assert_eq!(m.title.as_deref(), Some("Quarterly"));
        assert_eq!(m.created_at.as_deref(), Some("2024-01-31T09:30:00+01:00"));
        assert_eq!(m.is_encrypted, Some(false));
        assert_eq!(m.has_forms, Some(false));
        assert_eq!(m.has_images, Some(false));
        assert_eq!(m.has_text, None);
        assert_eq!(out.record().unwrap().mime.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_pages_and_info_inside_object_streams() {
        let pdf = object_stream_pdf("Compressed Layout");
        let out = extract_from_bytes(&pdf, "objstm.pdf", &no_text());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.page_count, Some(2));
        assert_eq!(m.pdf_version.as_deref(), Some("1.5"));
        assert_eq!(m.title.as_deref(), Some("Compressed Layout"));
        assert_eq!(m.producer.as_deref(), Some("Stream Writer"));
    }

    #[test]
    fn test_info_comes_from_trailer_not_outline() {
        // The info dictionary is written before the outline, whose entry
        // titles must not leak into the document title.
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R /Outlines 5 0 R /Lang (en-GB) >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string(),
            "<< /Title (Annual Report 2024) /Author <FEFF004A006F> >>".to_string(),
            "<< /Type /Outlines /First 6 0 R /Last 6 0 R /Count 1 >>".to_string(),
            "<< /Title (Chapter 1: Introduction) /Parent 5 0 R /Dest [3 0 R /Fit] >>".to_string(),
        ];
        let pdf = classic_pdf(&objects, "/Root 1 0 R /Info 4 0 R");
        let out = extract_from_bytes(&pdf, "report.pdf", &no_text());
        let m = meta_of(&out);
        assert_eq!(m.title.as_deref(), Some("Annual Report 2024"));
        assert_eq!(m.author.as_deref(), Some("Jo"));
        assert_eq!(m.language.as_deref(), Some("en-GB"));
        assert_eq!(m.page_count, Some(1));
    }

    #[test]
    fn test_no_info_dictionary_leaves_title_empty() {
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R /Outlines 4 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string(),
            "<< /Type /Outlines /First 5 0 R /Last 5 0 R /Count 1 >>".to_string(),
            "<< /Title (Appendix) /Parent 4 0 R >>".to_string(),
        ];
        let out = extract_from_bytes(&classic_pdf(&objects, "/Root 1 0 R"), "x.pdf", &no_text());
        assert_eq!(meta_of(&out).title, None);
    }

    #[test]
    fn test_forms_images_and_signatures() {
        let objects = vec![
            "<< /Type /Catalog /Pages 2 0 R /AcroForm << /Fields [5 0 R] >> >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /XObject << /Im1 4 0 R >> >> >>"
                .to_string(),
            "<< /Type /XObject /Subtype /Image /Width 1 /Height 1 /BitsPerComponent 8 /ColorSpace /DeviceGray /Length 1 >>\nstream\n\x7f\nendstream"
                .to_string(),
            "<< /FT /Sig /T (Signature1) /V << /Type /Sig /ByteRange [0 10 20 10] >> >>".to_string(),
        ];
        let out = extract_from_bytes(&classic_pdf(&objects, "/Root 1 0 R"), "signed.pdf", &no_text());
        let m = meta_of(&out);
        assert_eq!(m.has_forms, Some(true));
        assert_eq!(m.has_images, Some(true));
        assert_eq!(m.has_signatures, Some(true));
        // text layer not read, so no OCR verdict
        assert_eq!(m.is_ocr_required, None);
    }

    #[test]
    fn test_text_layer_when_enabled() {
        let pdf = minimal_pdf(&["Hello", "World"], "T");
        let out = extract_from_bytes(&pdf, "q.pdf", &ExtractorConfig::default());
        // Text extraction may succeed or degrade; the structure is read regardless.
        assert!(!out.is_failure());
        assert_eq!(meta_of(&out).page_count, Some(2));
    }

    #[test]
    fn test_corrupt_pdf_degrades() {
        let out = extract_from_bytes(b"%PDF-1.7\n\x00\x01garbage without objects", "bad.pdf", &ExtractorConfig::default());
        match &out {
            ExtractOutcome::PartialSuccess(_, reason) => assert!(reason.contains("document structure unreadable"), "{reason}"),
            other => panic!("expected partial, got {other:?}"),
        }
        let m = meta_of(&out);
        assert_eq!(m.page_count, Some(0));
        assert_eq!(m.pdf_version.as_deref(), Some("1.7"));
        assert_eq!(m.title, None);
        assert_eq!(m.has_text, None);
    }

    #[test]
    fn test_truncated_pdf_degrades() {
        let pdf = minimal_pdf(&["Hello"], "Cut");
        let out = extract_from_bytes(&pdf[..pdf.len() / 2], "cut.pdf", &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::PartialSuccess(..)), "{out:?}");
        assert_eq!(meta_of(&out).page_count, Some(0));
    }

    #[test]
    fn test_not_a_pdf() {
        let out = extract_from_bytes(b"PK\x03\x04 not a pdf", "x.pdf", &no_text());
        assert!(matches!(out, ExtractOutcome::PartialSuccess(..)));
        assert_eq!(meta_of(&out).pdf_version, None);
    }

    #[test]
    fn test_missing_file_is_failure() {
        let out = PdfExtractor.extract(Path::new("/no/such/file.pdf"), &ExtractorConfig::default());
        assert!(out.is_failure());
    }

    #[test]
    fn test_file_over_parse_limit_reads_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        let pdf = minimal_pdf(&["Hello"], "Big");
        std::fs::write(&path, &pdf).unwrap();

        let cfg = ExtractorConfig { max_parse_bytes: 64, ..no_text() };
        let out = PdfExtractor.extract(&path, &cfg);
        match &out {
            ExtractOutcome::PartialSuccess(_, reason) => assert!(reason.contains("structure not parsed"), "{reason}"),
            other => panic!("expected partial, got {other:?}"),
        }
        assert_eq!(meta_of(&out).pdf_version.as_deref(), Some("1.4"));
        assert_eq!(meta_of(&out).page_count, None);

        let out = PdfExtractor.extract(&path, &no_text());
        assert_eq!(meta_of(&out).title.as_deref(), Some("Big"));
    }

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(parse_pdf_date("D:20231105").as_deref(), Some("2023-11-05T00:00:00"));
        assert_eq!(parse_pdf_date("D:20231105142233Z").as_deref(), Some("2023-11-05T14:22:33+00:00"));
        assert_eq!(parse_pdf_date("D:20231105142233-05'30'").as_deref(), Some("2023-11-05T14:22:33-05:30"));
        assert_eq!(parse_pdf_date("2023").as_deref(), Some("2023-01-01T00:00:00"));
        assert_eq!(parse_pdf_date("D:20231399"), None);
        assert_eq!(parse_pdf_date("yesterday"), None);
    }

    #[test]
    fn test_decode_text_bytes() {
        assert_eq!(decode_text_bytes(b"\xFE\xFF\x00H\x00i"), "Hi");
        assert_eq!(decode_text_bytes("café".as_bytes()), "café");
        assert_eq!(decode_text_bytes(b"caf\xe9"), "café");
    }

    #[test]
    fn test_ocr_required() {
        assert_eq!(ocr_required(Some(false), Some(true)), Some(true));
        assert_eq!(ocr_required(Some(true), Some(true)), Some(false));
        assert_eq!(ocr_required(None, Some(true)), None);
    }

    #[test]
    fn test_pdfa_conformance() {
        let xmp = br#"<rdf:Description pdfaid:part="2" pdfaid:conformance="B"/>"#;
        assert_eq!(pdfa_conformance(xmp).as_deref(), Some("PDF/A-2b"));
    }
}

use std::io::{Cursor, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value as ExifValue};
use rusqlite::Connection;
use serde_json::Value;

use casefile_extract_types::{ExtractorConfig, Family};
use casefile_populate::{run, RunOptions, RunSummary, Shard};
use casefile_store::{self as store, NewFile};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
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
    objects.push("<< /Title (Invoice 2024-117) /CreationDate (D:20240131093000+01'00') >>".to_string());

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
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            info_id,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn ascii_field(tag: Tag, s: &str) -> Field {
    Field { tag, ifd_num: In::PRIMARY, value: ExifValue::Ascii(vec![s.as_bytes().to_vec()]) }
}

fn dms(d: u32, m: u32, s_hundredths: u32) -> ExifValue {
    ExifValue::Rational(vec![
        Rational { num: d, denom: 1 },
        Rational { num: m, denom: 1 },
        Rational { num: s_hundredths, denom: 100 },
    ])
}

/// Baseline JPEG: SOI, APP1 Exif with camera and GPS tags, SOF0, SOS, EOI.
fn jpeg_with_gps(width: u16, height: u16) -> Vec<u8> {
    let fields = vec![
        ascii_field(Tag::Make, "Canon"),
        ascii_field(Tag::Model, "EOS 5D"),
        Field { tag: Tag::GPSLatitude, ifd_num: In::PRIMARY, value: dms(48, 51, 2400) },
        ascii_field(Tag::GPSLatitudeRef, "N"),
        Field { tag: Tag::GPSLongitude, ifd_num: In::PRIMARY, value: dms(2, 21, 0) },
        ascii_field(Tag::GPSLongitudeRef, "W"),
    ];
    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();

    let mut out = vec![0xFF, 0xD8];
    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend(tiff.into_inner());
    out.extend([0xFF, 0xE1]);
    out.extend(((app1.len() + 2) as u16).to_be_bytes());
    out.extend(app1);

    let mut sof = vec![8];
    sof.extend(height.to_be_bytes());
    sof.extend(width.to_be_bytes());
    sof.extend([3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    out.extend([0xFF, 0xC0]);
    out.extend(((sof.len() + 2) as u16).to_be_bytes());
    out.extend(sof);
    out.extend([0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
    out
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;

const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
    xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/">
  <dc:title>Board Minutes</dc:title>
  <dc:creator>Jane Smith</dc:creator>
  <dcterms:created>2024-01-15T10:30:00Z</dcterms:created>
</cp:coreProperties>"#;

const DOCUMENT: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body><w:p><w:r><w:t>Minutes of the meeting.</w:t></w:r></w:p></w:body>
</w:document>"#;

fn docx() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zw = zip::ZipWriter::new(&mut buf);
        for (name, body) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("docProps/core.xml", CORE),
            ("word/document.xml", DOCUMENT),
        ] {
            zw.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
            zw.write_all(body.as_bytes()).unwrap();
        }
        zw.finish().unwrap();
    }
    buf.into_inner()
}

// ── Harness ───────────────────────────────────────────────────────────────────

struct Case {
    _dir: tempfile::TempDir,
    root: PathBuf,
    conn: Connection,
}

impl Case {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let conn = store::open(&root.join("index.db")).unwrap();
        Self { _dir: dir, root, conn }
    }

    /// Writes `bytes` under the case root (unless `None`) and indexes it.
    fn add(&self, name: &str, bytes: Option<&[u8]>) -> i64 {
        let path = self.root.join("evidence").join(name);
        if let Some(bytes) = bytes {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, bytes).unwrap();
        }
        store::upsert_file(&self.conn, &NewFile::from_path(path.to_str().unwrap())).unwrap()
    }

    fn options(&self, log_dir: &str) -> RunOptions {
        RunOptions {
            extractor: ExtractorConfig::default(),
            log_dir: self.root.join(log_dir),
            log_prefix: "metadata_run".into(),
            sniff_unresolved: true,
            base_dir: Some(self.root.join("evidence")),
            shard: None,
        }
    }

    fn run(&self, opts: &RunOptions) -> RunSummary {
        run(&self.conn, opts, |_| ControlFlow::Continue(())).unwrap()
    }

    fn record(&self, family: Family, id: i64) -> serde_json::Map<String, Value> {
        store::read_record(&self.conn, family, id)
            .unwrap()
            .unwrap_or_else(|| panic!("no {family} record for file {id}"))
    }
}

fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn three_file_scenario() {
    let case = Case::new();
    let pdf = case.add("invoice.pdf", Some(&minimal_pdf(&["Invoice total 42 EUR", "Thank you"])));
    let jpeg = case.add("photo.jpeg", Some(&jpeg_with_gps(1920, 1080)));
    let docx = case.add("archive.docx", Some(&docx()));

    let summary = case.run(&case.options("logs"));
    assert_eq!((summary.ok, summary.skipped, summary.errors), (3, 0, 0));

    let p = case.record(Family::Pdf, pdf);
    assert_eq!(p["page_count"], Value::from(2));
    assert_eq!(p["title"], Value::from("Invoice 2024-117"));
    if casefile_extract_dispatch::PDF_TEXT_AVAILABLE {
        assert_eq!(p["has_text"], Value::from(1));
    }

    let i = case.record(Family::Image, jpeg);
    assert_eq!(i["width_px"], Value::from(1920));
    assert_eq!(i["height_px"], Value::from(1080));
    assert!((i["gps_lat"].as_f64().unwrap() - 48.856667).abs() < 1e-4);
    assert!((i["gps_lon"].as_f64().unwrap() + 2.35).abs() < 1e-4);

    let o = case.record(Family::Office, docx);
    assert_eq!(o["office_type"], Value::from("word"));
    assert_eq!(o["title"], Value::from("Board Minutes"));
    let row = store::get_file(&case.conn, docx).unwrap().unwrap();
    assert_eq!(row.true_extension.as_deref(), Some(".docx"));

    let (mime, family) = store::file_classification(&case.conn, pdf).unwrap().unwrap();
    assert_eq!(mime.as_deref(), Some("application/pdf"));
    assert_eq!(family.as_deref(), Some("pdf"));
    let (_, family) = store::file_classification(&case.conn, jpeg).unwrap().unwrap();
    assert_eq!(family.as_deref(), Some("image"));
}

#[test]
fn second_run_rewrites_identical_records() {
    let case = Case::new();
    let pdf = case.add("invoice.pdf", Some(&minimal_pdf(&["one page"])));
    let jpeg = case.add("photo.jpg", Some(&jpeg_with_gps(640, 480)));
    let notes = case.add("notes.md", Some(b"# Notes\n\nsee https://example.org\n"));

    case.run(&case.options("first"));
    let before: Vec<_> = [(Family::Pdf, pdf), (Family::Image, jpeg), (Family::Text, notes)]
        .iter()
        .map(|&(f, id)| case.record(f, id))
        .collect();

    case.run(&case.options("second"));
    let after: Vec<_> = [(Family::Pdf, pdf), (Family::Image, jpeg), (Family::Text, notes)]
        .iter()
        .map(|&(f, id)| case.record(f, id))
        .collect();

    assert_eq!(before, after);
    assert_eq!(store::count_records(&case.conn, Family::Pdf).unwrap(), 1);
}

#[test]
fn log_has_one_line_per_file_and_a_summary() {
    let case = Case::new();
    case.add("a.txt", Some(b"alpha\n"));
    case.add(".DS_Store", Some(b"\0\0\0\x01Bud1"));
    case.add("font.woff2", Some(b"wOF2\0\x01\0\0"));
    case.add("NOEXT", Some(b"plain words without a type\n"));
    case.add("gone.pdf", None);

    let summary = case.run(&case.options("logs"));
    let lines = log_lines(&summary.log_path);
    assert_eq!(lines.len(), 6, "{lines:?}");

    assert_eq!(lines[0], "[SUCCESS (text)] : a.txt");
    assert_eq!(lines[1], "[SKIPPED (Ignored System File)] : .DS_Store");
    assert_eq!(lines[2], "[SKIPPED (No Collector)] : font.woff2");
    assert_eq!(lines[3], "[SKIPPED (No Extension)] : NOEXT");
    assert!(lines[4].starts_with("[ERROR: "), "{}", lines[4]);
    assert!(lines[4].ends_with("] : gone.pdf"), "{}", lines[4]);
    assert_eq!(lines[5], "RESULTS : OK=1 | SKIPPED=3 | ERRORS=1");

    let name = summary.log_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("metadata_run_") && name.ends_with(".log"), "{name}");
}

#[test]
fn literal_name_routes_before_extension() {
    let case = Case::new();
    let license = case.add("LICENSE", Some(b"MIT License\n\nPermission is hereby granted, free of charge\n"));
    let makefile = case.add("Makefile", Some(b"all:\n\tcc -o app main.c\n"));

    let summary = case.run(&case.options("logs"));
    assert_eq!(summary.ok, 2);
    case.record(Family::Text, license);
    case.record(Family::Code, makefile);
}

#[test]
fn content_beats_declared_extension() {
    let case = Case::new();
    let id = case.add("report.pdf", Some(&docx()));

    let summary = case.run(&case.options("logs"));
    assert_eq!(summary.ok, 1);
    let row = store::get_file(&case.conn, id).unwrap().unwrap();
    assert_eq!(row.true_extension.as_deref(), Some(".docx"));
    case.record(Family::Office, id);
    assert!(store::read_record(&case.conn, Family::Pdf, id).unwrap().is_none());
    assert_eq!(log_lines(&summary.log_path)[0], "[SUCCESS (office)] : report.pdf");
}

#[test]
fn unsniffed_rows_route_by_declared_extension() {
    let case = Case::new();
    let id = case.add("report.pdf", Some(&docx()));
    let opts = RunOptions { sniff_unresolved: false, ..case.options("logs") };

    let summary = case.run(&opts);
    // the PDF parser still yields a degraded record for a non-PDF body
    assert_eq!(summary.errors + summary.ok, 1);
    let row = store::get_file(&case.conn, id).unwrap().unwrap();
    assert_eq!(row.true_extension, None);
    assert!(store::read_record(&case.conn, Family::Office, id).unwrap().is_none());
}

#[test]
fn break_stops_before_next_file() {
    let case = Case::new();
    let first = case.add("one.txt", Some(b"one\n"));
    let second = case.add("two.txt", Some(b"two\n"));

    let mut calls = 0;
    let summary = run(&case.conn, &case.options("logs"), |p| {
        calls += 1;
        assert_eq!((p.index, p.total), (1, 2));
        ControlFlow::Break(())
    })
    .unwrap();

    assert_eq!(calls, 1);
    assert!(summary.stopped_early);
    assert_eq!(summary.ok, 1);
    assert!(store::read_record(&case.conn, Family::Text, first).unwrap().is_some());
    assert!(store::read_record(&case.conn, Family::Text, second).unwrap().is_none());
    assert_eq!(
        log_lines(&summary.log_path),
        vec!["[SUCCESS (text)] : one.txt".to_string(), "RESULTS : OK=1 | SKIPPED=0 | ERRORS=0".to_string()]
    );
}

#[test]
fn shards_cover_the_index_disjointly() {
    let case = Case::new();
    let ids: Vec<i64> = (0..5)
        .map(|i| case.add(&format!("f{i}.txt"), Some(format!("file {i}\n").as_bytes())))
        .collect();

    let mut total = 0;
    for index in 0..2 {
        let opts = RunOptions { shard: Some(Shard { count: 2, index }), ..case.options(&format!("shard{index}")) };
        let summary = case.run(&opts);
        let name = summary.log_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(&format!("_shard{index}of2.log")), "{name}");
        let expected = ids.iter().filter(|id| *id % 2 == i64::from(index)).count();
        assert_eq!(summary.ok, expected);
        total += summary.ok;
    }
    assert_eq!(total, 5);
    assert_eq!(store::count_records(&case.conn, Family::Text).unwrap(), 5);
}

#[test]
fn relative_paths_resolve_against_base_dir() {
    let case = Case::new();
    std::fs::create_dir_all(case.root.join("mount/docs")).unwrap();
    std::fs::write(case.root.join("mount/docs/readme.txt"), b"hello\n").unwrap();
    let id = store::upsert_file(&case.conn, &NewFile::from_path("docs/readme.txt")).unwrap();

    let opts = RunOptions { base_dir: Some(case.root.join("mount")), ..case.options("logs") };
    let summary = case.run(&opts);
    assert_eq!(summary.ok, 1);
    case.record(Family::Text, id);
}

#[test]
fn log_names_are_relative_to_base_dir() {
    let case = Case::new();
    case.add("2023/report.txt", Some(b"first draft\n"));
    case.add("2024/report.txt", Some(b"final\n"));

    let summary = case.run(&case.options("logs"));
    assert_eq!(
        log_lines(&summary.log_path),
        vec![
            "[SUCCESS (text)] : 2023/report.txt".to_string(),
            "[SUCCESS (text)] : 2024/report.txt".to_string(),
            "RESULTS : OK=2 | SKIPPED=0 | ERRORS=0".to_string(),
        ]
    );

    // outside the base directory the stored path is logged as-is
    let opts = RunOptions { base_dir: None, ..case.options("absolute") };
    let summary = case.run(&opts);
    let first = &log_lines(&summary.log_path)[0];
    assert!(first.ends_with(&format!("{}", case.root.join("evidence/2023/report.txt").display())), "{first}");
}

#[test]
fn newline_in_file_name_cannot_forge_log_lines() {
    let case = Case::new();
    case.add("a\nRESULTS : OK=9 | SKIPPED=0 | ERRORS=0.txt", Some(b"forged\n"));
    case.add("b.txt", Some(b"plain\n"));

    let summary = case.run(&case.options("logs"));
    let lines = log_lines(&summary.log_path);
    assert_eq!(lines.len(), 3, "{lines:?}");
    assert_eq!(lines[0], "[SUCCESS (text)] : a\\nRESULTS : OK=9 | SKIPPED=0 | ERRORS=0.txt");
    assert_eq!(lines.iter().filter(|l| l.starts_with("RESULTS")).count(), 1);
    assert_eq!(lines[2], "RESULTS : OK=2 | SKIPPED=0 | ERRORS=0");
}

#[test]
fn persistence_failure_is_an_error_and_the_run_continues() {
    let case = Case::new();
    let first = case.add("one.txt", Some(b"one\n"));
    let pdf = case.add("invoice.pdf", Some(&minimal_pdf(&["total 42"])));
    let last = case.add("two.txt", Some(b"two\n"));
    case.conn
        .execute_batch(&format!(
            "CREATE TRIGGER refuse_text BEFORE INSERT ON {} BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            Family::Text.table()
        ))
        .unwrap();

    let summary = case.run(&case.options("logs"));
    assert_eq!((summary.ok, summary.skipped, summary.errors), (1, 0, 2));

    let lines = log_lines(&summary.log_path);
    assert_eq!(lines.len(), 4, "{lines:?}");
    assert!(lines[0].starts_with("[ERROR: ") && lines[0].contains("disk full"), "{}", lines[0]);
    assert_eq!(lines[1], "[SUCCESS (pdf)] : invoice.pdf");
    assert!(lines[2].starts_with("[ERROR: ") && lines[2].ends_with("] : two.txt"), "{}", lines[2]);
    assert_eq!(lines[3], "RESULTS : OK=1 | SKIPPED=0 | ERRORS=2");

    case.record(Family::Pdf, pdf);
    for id in [first, last] {
        assert!(store::read_record(&case.conn, Family::Text, id).unwrap().is_none());
        // the family classification rolls back with the failed insert
        let (_, family) = store::file_classification(&case.conn, id).unwrap().unwrap();
        assert_eq!(family, None);
    }
}

#[test]
fn unlistable_index_is_fatal() {
    let case = Case::new();
    case.conn.execute_batch("DROP TABLE file;").unwrap();

    let opts = case.options("logs");
    let err = run(&case.conn, &opts, |_| ControlFlow::Continue(())).unwrap_err();
    assert!(format!("{err:#}").contains("listing files"), "{err:#}");
    assert!(!opts.log_dir.exists());
}

#[test]
fn damaged_pdf_is_a_degraded_success() {
    let case = Case::new();
    let pdf = minimal_pdf(&["cut short"]);
    let id = case.add("damaged.pdf", Some(&pdf[..pdf.len() / 2]));

    let summary = case.run(&case.options("logs"));
    assert_eq!((summary.ok, summary.errors), (1, 0));
    let line = &log_lines(&summary.log_path)[0];
    assert!(line.starts_with("[SUCCESS (pdf, partial: "), "{line}");
    assert!(line.ends_with("] : damaged.pdf"), "{line}");

    let p = case.record(Family::Pdf, id);
    assert_eq!(p["page_count"], Value::from(0));
    assert_eq!(p["pdf_version"], Value::from("1.4"));
    assert_eq!(p["title"], Value::Null);
}

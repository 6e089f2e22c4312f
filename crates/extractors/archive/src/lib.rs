use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use flate2::read::GzDecoder;
use tracing::{debug, warn};
use xz2::read::XzDecoder;

use casefile_extract_types::records::ArchiveMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, TypeRecord,
};

pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn family(&self) -> Family {
        Family::Archive
    }

    fn accepts(&self, path: &Path) -> bool {
        accepts(path)
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract(path, cfg)
    }
}

/// Check if a file is an archive based on extension.
pub fn accepts(path: &Path) -> bool {
    is_archive_ext(&lower_ext(path))
}

pub fn is_archive_ext(ext: &str) -> bool {
    matches!(
        ext,
        "zip" | "tar" | "gz" | "bz2" | "xz" | "tgz" | "tbz2" | "txz" | "7z" | "rar" | "jar" | "war" | "apk"
    )
}

/// List an archive's entries without extracting member content.
///
/// The member listing becomes the excerpt; counts, sizes and timestamps are
/// aggregated into the record.  A corrupt or unsupported archive yields a
/// partial record with the format and on-disk size filled in.
pub fn extract(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let on_disk = match std::fs::metadata(path) {
        Ok(m) if m.is_file() => m.len(),
        Ok(_) => return ExtractOutcome::Failure(format!("{} is not a regular file", path.display())),
        Err(e) => return ExtractOutcome::Failure(format!("cannot stat {}: {e}", path.display())),
    };
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("").to_lowercase();

    let kind = match detect_kind(path, &name) {
        Ok(Some(kind)) => kind,
        Ok(None) => {
            let meta = ArchiveMeta { compressed_size: Some(on_disk), ..Default::default() };
            return ExtractOutcome::PartialSuccess(
                TypeRecord::new(FamilyMeta::Archive(meta)),
                "unrecognised archive format".to_string(),
            );
        }
        Err(e) => return ExtractOutcome::Failure(format!("{e:#}")),
    };

    let mut meta = ArchiveMeta {
        archive_format: Some(kind.name().to_string()),
        compressed_size: Some(on_disk),
        is_multivolume: Some(looks_multivolume(&name)),
        ..Default::default()
    };
    let mut issues = Vec::new();

    let listing = match kind {
        ArchiveKind::Zip => list_zip(path),
        ArchiveKind::Tar => open(path).and_then(list_tar),
        ArchiveKind::TarGz => open(path).and_then(|f| list_tar(GzDecoder::new(f))),
        ArchiveKind::TarBz2 => open(path).and_then(|f| list_tar(BzDecoder::new(f))),
        ArchiveKind::TarXz => open(path).and_then(|f| list_tar(XzDecoder::new(f))),
        ArchiveKind::Gz => list_gz(path),
        ArchiveKind::Bz2 => open(path).and_then(|f| list_single(BzDecoder::new(f), inner_name(path))),
        ArchiveKind::Xz => open(path).and_then(|f| list_single(XzDecoder::new(f), inner_name(path))),
        ArchiveKind::SevenZip if cfg.capabilities.archive_7z => list_7z(path),
        ArchiveKind::SevenZip => Err(anyhow::anyhow!("7z listing disabled")),
        ArchiveKind::Rar => rar_flags(path),
    };

    let mut excerpts = Excerpts::default();
    match listing {
        Ok(listing) => {
            summarize(&listing, on_disk, &mut meta);
            excerpts = Excerpts::from_text(&listing_text(&listing, cfg.max_listed_entries));
            issues.extend(listing.issues);
        }
        Err(e) => {
            debug!("archive listing failed for {}: {e:#}", path.display());
            issues.push(format!("{e:#}"));
        }
    }

    let record = TypeRecord::new(FamilyMeta::Archive(meta))
        .with_mime(kind.mime())
        .with_excerpts(excerpts);
    ExtractOutcome::from_issues(record, issues)
}

// ============================================================================
// ARCHIVE KIND DETECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    Tar,
    Gz,       // single-file gzip (e.g. foo.log.gz)
    Bz2,      // single-file bzip2
    Xz,       // single-file xz
    SevenZip,
    Rar,
}

impl ArchiveKind {
    fn name(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::TarBz2 => "tar.bz2",
            ArchiveKind::TarXz => "tar.xz",
            ArchiveKind::Tar => "tar",
            ArchiveKind::Gz => "gz",
            ArchiveKind::Bz2 => "bz2",
            ArchiveKind::Xz => "xz",
            ArchiveKind::SevenZip => "7z",
            ArchiveKind::Rar => "rar",
        }
    }

    fn mime(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "application/zip",
            ArchiveKind::Tar => "application/x-tar",
            ArchiveKind::TarGz | ArchiveKind::Gz => "application/gzip",
            ArchiveKind::TarBz2 | ArchiveKind::Bz2 => "application/x-bzip2",
            ArchiveKind::TarXz | ArchiveKind::Xz => "application/x-xz",
            ArchiveKind::SevenZip => "application/x-7z-compressed",
            ArchiveKind::Rar => "application/vnd.rar",
        }
    }
}

/// Signature first; a compressed stream is a tarball when its first
/// decompressed block carries the `ustar` magic.  Falls back to the name.
fn detect_kind(path: &Path, name: &str) -> Result<Option<ArchiveKind>> {
    let mut prefix = Vec::with_capacity(512);
    open(path)?.take(512).read_to_end(&mut prefix).context("reading archive header")?;

    let kind = if prefix.starts_with(b"PK\x03\x04") || prefix.starts_with(b"PK\x05\x06") || prefix.starts_with(b"PK\x07\x08") {
        Some(ArchiveKind::Zip)
    } else if prefix.starts_with(b"7z\xBC\xAF\x27\x1C") {
        Some(ArchiveKind::SevenZip)
    } else if prefix.starts_with(b"Rar!\x1A\x07") {
        Some(ArchiveKind::Rar)
    } else if prefix.starts_with(b"\x1F\x8B") {
        Some(if is_tar(GzDecoder::new(open(path)?)) { ArchiveKind::TarGz } else { ArchiveKind::Gz })
    } else if prefix.starts_with(b"BZh") {
        Some(if is_tar(BzDecoder::new(open(path)?)) { ArchiveKind::TarBz2 } else { ArchiveKind::Bz2 })
    } else if prefix.starts_with(b"\xFD7zXZ\0") {
        Some(if is_tar(XzDecoder::new(open(path)?)) { ArchiveKind::TarXz } else { ArchiveKind::Xz })
    } else if is_tar_block(&prefix) {
        Some(ArchiveKind::Tar)
    } else {
        None
    };
    Ok(kind.or_else(|| detect_kind_from_name(name)))
}

fn detect_kind_from_name(name: &str) -> Option<ArchiveKind> {
    let n = name.to_lowercase();
    // Compound extensions must be checked before simple ones
    if n.ends_with(".tar.gz") || n.ends_with(".tgz")   { return Some(ArchiveKind::TarGz);   }
    if n.ends_with(".tar.bz2") || n.ends_with(".tbz2") { return Some(ArchiveKind::TarBz2);  }
    if n.ends_with(".tar.xz") || n.ends_with(".txz")   { return Some(ArchiveKind::TarXz);   }
    if n.ends_with(".tar")                              { return Some(ArchiveKind::Tar);     }
    if n.ends_with(".zip") || n.ends_with(".jar") || n.ends_with(".war") || n.ends_with(".apk") {
        return Some(ArchiveKind::Zip);
    }
    if n.ends_with(".gz")                               { return Some(ArchiveKind::Gz);      }
    if n.ends_with(".bz2")                              { return Some(ArchiveKind::Bz2);     }
    if n.ends_with(".xz")                               { return Some(ArchiveKind::Xz);      }
    if n.ends_with(".7z")                               { return Some(ArchiveKind::SevenZip);}
    if n.ends_with(".rar")                              { return Some(ArchiveKind::Rar);     }
    None
}

fn is_tar<R: Read>(reader: R) -> bool {
    let mut block = Vec::with_capacity(512);
    reader.take(512).read_to_end(&mut block).is_ok() && is_tar_block(&block)
}

fn is_tar_block(block: &[u8]) -> bool {
    block.get(257..262) == Some(&b"ustar"[..])
}

/// `.001`, `.z01`, `.r00` and `.partN.rar` segments.
fn looks_multivolume(name: &str) -> bool {
    let ext = name.rsplit('.').next().unwrap_or("");
    let numbered = ext.len() == 3
        && (ext.bytes().all(|b| b.is_ascii_digit())
            || (matches!(ext.as_bytes()[0], b'z' | b'r') && ext[1..].bytes().all(|b| b.is_ascii_digit())));
    let rar_part = name
        .strip_suffix(".rar")
        .and_then(|stem| stem.rsplit('.').next())
        .and_then(|seg| seg.strip_prefix("part"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    numbered || rar_part
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Default)]
struct Listing {
    entries: Vec<Entry>,
    comment: Option<String>,
    is_encrypted: bool,
    is_solid: Option<bool>,
    /// Set by header-only readers.
    is_multivolume: bool,
    issues: Vec<String>,
}

#[derive(Debug)]
struct Entry {
    name: String,
    is_dir: bool,
    size: u64,
    mtime: Option<NaiveDateTime>,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(f))
}

fn list_zip(path: &Path) -> Result<Listing> {
    let mut archive = zip::ZipArchive::new(open(path)?).context("opening zip")?;
    let comment = String::from_utf8_lossy(archive.comment()).trim().to_string();
    let mut listing = Listing {
        comment: (!comment.is_empty()).then_some(comment),
        is_solid: Some(false),
        ..Default::default()
    };

    for i in 0..archive.len() {
        // Raw access reads headers only, so encrypted members still list.
        let entry = match archive.by_index_raw(i) {
            Ok(e) => e,
            Err(e) => {
                warn!("zip: skipping entry {i}: {e:#}");
                listing.issues.push(format!("zip entry {i} unreadable: {e}"));
                continue;
            }
        };
        listing.is_encrypted |= entry.encrypted();
        let mtime = entry.last_modified().and_then(|t| {
            NaiveDate::from_ymd_opt(i32::from(t.year()), u32::from(t.month()), u32::from(t.day()))?
                .and_hms_opt(u32::from(t.hour()), u32::from(t.minute()), u32::from(t.second()))
        });
        listing.entries.push(Entry {
            name: entry.name().to_string(),
            is_dir: entry.is_dir(),
            size: entry.size(),
            mtime,
        });
    }
    Ok(listing)
}

fn list_tar<R: Read>(reader: R) -> Result<Listing> {
    let mut archive = tar::Archive::new(reader);
    let mut listing = Listing { is_solid: Some(true), ..Default::default() };

    for entry_result in archive.entries().context("reading tar entries")? {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                // A broken header desyncs the stream; stop here.
                warn!("tar: stopping at unreadable entry: {e:#}");
                listing.issues.push(format!("tar stream truncated: {e}"));
                break;
            }
        };
        let header = entry.header();
        let entry_type = header.entry_type();
        if !(entry_type.is_file() || entry_type.is_dir()) {
            continue;
        }
        let name = entry.path().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        let mtime = header
            .mtime()
            .ok()
            .filter(|t| *t > 0)
            .and_then(|t| DateTime::from_timestamp(i64::try_from(t).ok()?, 0))
            .map(|d| d.naive_utc());
        listing.entries.push(Entry {
            name,
            is_dir: entry_type.is_dir(),
            size: header.size().unwrap_or(0),
            mtime,
        });
    }
    Ok(listing)
}

/// Single-stream gzip: the header may carry the original name and mtime.
fn list_gz(path: &Path) -> Result<Listing> {
    let mut decoder = GzDecoder::new(open(path)?);
    let size = io::copy(&mut decoder, &mut io::sink()).context("decompressing gzip stream")?;
    let (name, mtime) = match decoder.header() {
        Some(h) => (
            h.filename().map(|n| String::from_utf8_lossy(n).into_owned()),
            DateTime::from_timestamp(i64::from(h.mtime()), 0)
                .filter(|_| h.mtime() > 0)
                .map(|d| d.naive_utc()),
        ),
        None => (None, None),
    };
    Ok(Listing {
        entries: vec![Entry { name: name.unwrap_or_else(|| inner_name(path)), is_dir: false, size, mtime }],
        is_solid: Some(false),
        ..Default::default()
    })
}

fn list_single<R: Read>(mut reader: R, inner: String) -> Result<Listing> {
    let size = io::copy(&mut reader, &mut io::sink()).context("decompressing stream")?;
    Ok(Listing {
        entries: vec![Entry { name: inner, is_dir: false, size, mtime: None }],
        is_solid: Some(false),
        ..Default::default()
    })
}

/// Name of the member inside a single-file compressed stream.
fn inner_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string()
}

fn list_7z(path: &Path) -> Result<Listing> {
    let archive = {
        let mut f = File::open(path)?;
        match sevenz_rust2::Archive::read(&mut f, &sevenz_rust2::Password::empty()) {
            Ok(a) => a,
            Err(e) if e.to_string().to_lowercase().contains("password") => {
                return Ok(Listing {
                    is_encrypted: true,
                    issues: vec!["7z header is encrypted".to_string()],
                    ..Default::default()
                });
            }
            Err(e) => return Err(e).context("7z: failed to parse archive header"),
        }
    };

    // Solid when any block holds more than one file.
    let mut per_block: HashMap<usize, usize> = HashMap::new();
    for bi in archive.stream_map.file_block_index.iter().flatten() {
        *per_block.entry(*bi).or_default() += 1;
    }

    let entries = archive
        .files
        .iter()
        .map(|entry| Entry {
            name: entry.name().to_string(),
            is_dir: entry.is_directory(),
            size: entry.size(),
            mtime: None,
        })
        .collect();
    Ok(Listing {
        entries,
        is_solid: Some(per_block.values().any(|&n| n > 1)),
        ..Default::default()
    })
}

/// RAR members are not listed; the RAR 4 main header still says whether
/// the archive is solid, encrypted or one volume of a set.
fn rar_flags(path: &Path) -> Result<Listing> {
    let mut head = [0u8; 16];
    let n = open(path)?.read(&mut head).context("reading rar header")?;
    let mut listing = Listing {
        issues: vec!["RAR member listing not supported".to_string()],
        ..Default::default()
    };
    // RAR 4: 7-byte marker, then CRC(2) TYPE(1)=0x73 FLAGS(2).
    if n >= 12 && head.starts_with(b"Rar!\x1A\x07\x00") && head[9] == 0x73 {
        let flags = u16::from_le_bytes([head[10], head[11]]);
        listing.is_multivolume = flags & 0x0001 != 0;
        listing.is_solid = Some(flags & 0x0008 != 0);
        listing.is_encrypted = flags & 0x0080 != 0;
    }
    Ok(listing)
}

// ============================================================================
// SUMMARY
// ============================================================================

fn summarize(listing: &Listing, on_disk: u64, meta: &mut ArchiveMeta) {
    let files: Vec<&Entry> = listing.entries.iter().filter(|e| !e.is_dir).collect();
    let total: u64 = files.iter().map(|e| e.size).sum();

    meta.is_encrypted = Some(listing.is_encrypted);
    meta.is_solid = listing.is_solid;
    if listing.is_multivolume {
        meta.is_multivolume = Some(true);
    }
    if listing.entries.is_empty() && !listing.issues.is_empty() {
        return;
    }

    meta.file_count = Some(files.len() as u64);
    meta.dir_count = Some(listing.entries.iter().filter(|e| e.is_dir).count() as u64);
    meta.total_uncompressed_size = Some(total);
    meta.compression_ratio = Some(compression_ratio(total, on_disk));
    meta.largest_file_size = files.iter().map(|e| e.size).max();
    meta.has_executables = Some(files.iter().any(|e| is_executable_name(&e.name)));

    let top: HashSet<&str> = listing
        .entries
        .iter()
        .filter_map(|e| {
            e.name
                .trim_start_matches("./")
                .trim_start_matches('/')
                .split('/')
                .next()
                .filter(|s| !s.is_empty())
        })
        .collect();
    meta.top_level_entry_count = Some(top.len() as u64);

    let times = || listing.entries.iter().filter_map(|e| e.mtime);
    meta.oldest_entry_time = times().min().map(iso);
    meta.newest_entry_time = times().max().map(iso);
}

/// Uncompressed total over on-disk size, two decimals; 0 for an empty file.
pub fn compression_ratio(uncompressed: u64, on_disk: u64) -> f64 {
    if on_disk == 0 {
        return 0.0;
    }
    (uncompressed as f64 / on_disk as f64 * 100.0).round() / 100.0
}

fn is_executable_name(name: &str) -> bool {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();
    matches!(
        ext.as_str(),
        "exe" | "dll" | "msi" | "com" | "scr" | "bat" | "cmd" | "ps1" | "vbs" | "sh" | "so" | "dylib" | "elf" | "apk" | "jar"
    )
}

fn iso(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Optional comment header, then one member per line, capped at `max`.
fn listing_text(listing: &Listing, max: usize) -> String {
    let mut text = String::new();
    if let Some(c) = &listing.comment {
        text.push_str(&format!("COMMENT: {c}\n\nFILES:\n"));
    }
    let names: Vec<&str> = listing.entries.iter().take(max).map(|e| e.name.as_str()).collect();
    text.push_str(&names.join("\n"));
    if listing.entries.len() > max {
        text.push_str(&format!("\n... {} more entries", listing.entries.len() - max));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use zip::write::SimpleFileOptions;

    fn meta_of(out: &ExtractOutcome) -> ArchiveMeta {
        match &out.record().expect("record").meta {
            FamilyMeta::Archive(m) => m.clone(),
            other => panic!("wrong family: {other:?}"),
        }
    }

    fn sample_zip(path: &Path) {
        let mut w = zip::ZipWriter::new(File::create(path).unwrap());
        let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        w.set_comment("backup set");
        w.add_directory("docs/", opts).unwrap();
        w.start_file("docs/readme.txt", opts).unwrap();
        w.write_all(&b"hello world ".repeat(200)).unwrap();
        w.start_file("tools/setup.exe", opts).unwrap();
        w.write_all(b"MZ").unwrap();
        w.finish().unwrap();
    }

    fn sample_tar() -> Vec<u8> {
        let mut b = tar::Builder::new(Vec::new());
        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_mtime(1_600_000_000);
        dir.set_cksum();
        b.append_data(&mut dir, "src/", &[][..]).unwrap();
        for (name, body, mtime) in [("src/main.rs", &b"fn main() {}"[..], 1_700_000_000u64), ("Cargo.toml", &b"[package]"[..], 1_650_000_000)] {
            let mut h = tar::Header::new_gnu();
            h.set_size(body.len() as u64);
            h.set_mode(0o644);
            h.set_mtime(mtime);
            h.set_cksum();
            b.append_data(&mut h, name, body).unwrap();
        }
        b.into_inner().unwrap()
    }

    #[test]
    fn test_zip_listing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bundle.zip");
        sample_zip(&path);

        let out = extract(&path, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.archive_format.as_deref(), Some("zip"));
        assert_eq!(m.file_count, Some(2));
        assert_eq!(m.dir_count, Some(1));
        assert_eq!(m.total_uncompressed_size, Some(2402));
        assert_eq!(m.largest_file_size, Some(2400));
        assert_eq!(m.has_executables, Some(true));
        assert_eq!(m.is_encrypted, Some(false));
        assert_eq!(m.top_level_entry_count, Some(2));
        let on_disk = std::fs::metadata(&path).unwrap().len();
        assert_eq!(m.compression_ratio, Some(compression_ratio(2402, on_disk)));

        let rec = out.record().unwrap();
        assert_eq!(rec.mime.as_deref(), Some("application/zip"));
        let full = rec.excerpts.full.as_deref().unwrap();
        assert!(full.starts_with("COMMENT: backup set"));
        assert!(full.contains("tools/setup.exe"));
    }

    #[test]
    fn test_tar_gz_detected_by_content() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&sample_tar()).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        // Misleading name: content decides.
        let path = dir.path().join("snapshot.gz");
        std::fs::write(&path, enc.finish().unwrap()).unwrap();

        let m = meta_of(&extract(&path, &ExtractorConfig::default()));
        assert_eq!(m.archive_format.as_deref(), Some("tar.gz"));
        assert_eq!(m.file_count, Some(2));
        assert_eq!(m.dir_count, Some(1));
        assert_eq!(m.oldest_entry_time.as_deref(), Some("2020-09-13T12:26:40"));
        assert_eq!(m.newest_entry_time.as_deref(), Some("2023-11-14T22:13:20"));
        assert_eq!(m.has_executables, Some(false));
    }

    #[test]
    fn test_single_gzip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&b"line\n".repeat(100)).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.log.gz");
        std::fs::write(&path, enc.finish().unwrap()).unwrap();

        let out = extract(&path, &ExtractorConfig::default());
        let m = meta_of(&out);
        assert_eq!(m.archive_format.as_deref(), Some("gz"));
        assert_eq!(m.file_count, Some(1));
        assert_eq!(m.total_uncompressed_size, Some(500));
        assert_eq!(out.record().unwrap().excerpts.full.as_deref(), Some("app.log"));
    }

    #[test]
    fn test_corrupt_zip_is_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"PK\x03\x04 truncated").unwrap();
        let out = extract(&path, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::PartialSuccess(..)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.archive_format.as_deref(), Some("zip"));
        assert_eq!(m.file_count, None);
    }

    #[test]
    fn test_7z_capability_off() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.7z");
        std::fs::write(&path, b"7z\xBC\xAF\x27\x1C\x00\x04").unwrap();
        let cfg = ExtractorConfig {
            capabilities: casefile_extract_types::Capabilities { archive_7z: false, ..Default::default() },
            ..Default::default()
        };
        match extract(&path, &cfg) {
            ExtractOutcome::PartialSuccess(rec, reason) => {
                assert!(reason.contains("disabled"));
                assert_eq!(rec.mime.as_deref(), Some("application/x-7z-compressed"));
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn test_rar_header_flags() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("set.part1.rar");
        let mut rar = b"Rar!\x1A\x07\x00".to_vec();
        rar.extend([0x00, 0x00, 0x73, 0x09, 0x00, 0x0D, 0x00]);
        std::fs::write(&path, rar).unwrap();
        let out = extract(&path, &ExtractorConfig::default());
        let m = meta_of(&out);
        assert!(matches!(out, ExtractOutcome::PartialSuccess(..)));
        assert_eq!(m.archive_format.as_deref(), Some("rar"));
        assert_eq!(m.is_multivolume, Some(true));
        assert_eq!(m.is_solid, Some(true));
    }

    #[test]
    fn test_missing_file_is_failure() {
        assert!(extract(Path::new("/nonexistent/a.zip"), &ExtractorConfig::default()).is_failure());
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1000, 0), 0.0);
        assert_eq!(compression_ratio(1000, 300), 3.33);
        assert_eq!(compression_ratio(0, 10), 0.0);
    }

    #[test]
    fn test_listing_cap() {
        let listing = Listing {
            entries: (0..5).map(|i| Entry { name: format!("f{i}"), is_dir: false, size: 1, mtime: None }).collect(),
            ..Default::default()
        };
        assert_eq!(listing_text(&listing, 3), "f0\nf1\nf2\n... 2 more entries");
    }

    #[test]
    fn test_looks_multivolume() {
        assert!(looks_multivolume("backup.7z.001"));
        assert!(looks_multivolume("disk.z01"));
        assert!(looks_multivolume("movie.part2.rar"));
        assert!(!looks_multivolume("movie.rar"));
        assert!(!looks_multivolume("photo.jpg"));
    }
}

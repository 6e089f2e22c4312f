use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::Sniffed;

pub(crate) fn is_zip_signature(prefix: &[u8]) -> bool {
    prefix.starts_with(b"PK\x03\x04") || prefix.starts_with(b"PK\x05\x06") || prefix.starts_with(b"PK\x07\x08")
}

/// Tell ZIP-based formats apart by their member names.
///
/// Office Open XML is recognised by its top-level part directories, OpenDocument
/// and EPUB by the stored `mimetype` entry, Android and Java packages by their
/// manifests.  Anything else, including a file that only looks like a ZIP,
/// falls back to ".zip".
pub fn zip_subtype(path: &Path) -> Sniffed {
    match inspect_zip(path) {
        Ok(found) => found,
        Err(e) => {
            debug!("ZIP inspection failed for {}: {e}", path.display());
            Sniffed::new(".zip", "ZIP-like file (invalid or unreadable as ZIP)")
        }
    }
}

fn inspect_zip(path: &Path) -> anyhow::Result<Sniffed> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let names: Vec<String> = archive.file_names().map(|n| n.to_lowercase()).collect();
    let any_under = |dir: &str| names.iter().any(|n| n.starts_with(dir));
    let has = |name: &str| names.iter().any(|n| n == name);

    if any_under("word/") {
        return Ok(Sniffed::new(".docx", "Microsoft Word Open XML document (DOCX)"));
    }
    if any_under("xl/") {
        return Ok(Sniffed::new(".xlsx", "Microsoft Excel Open XML spreadsheet (XLSX)"));
    }
    if any_under("ppt/") {
        return Ok(Sniffed::new(".pptx", "Microsoft PowerPoint Open XML presentation (PPTX)"));
    }

    if has("mimetype") {
        let mut mt = String::new();
        if let Ok(mut entry) = archive.by_name("mimetype") {
            let mut raw = Vec::new();
            if entry.read_to_end(&mut raw).is_ok() {
                mt = String::from_utf8_lossy(&raw).trim().to_string();
            }
        }
        match mt.as_str() {
            "application/vnd.oasis.opendocument.text" => return Ok(Sniffed::new(".odt", "OpenDocument Text (ODT)")),
            "application/vnd.oasis.opendocument.spreadsheet" => {
                return Ok(Sniffed::new(".ods", "OpenDocument Spreadsheet (ODS)"))
            }
            "application/vnd.oasis.opendocument.presentation" => {
                return Ok(Sniffed::new(".odp", "OpenDocument Presentation (ODP)"))
            }
            "application/epub+zip" => return Ok(Sniffed::new(".epub", "EPUB e-book")),
            _ => {}
        }
    }

    if has("androidmanifest.xml") {
        return Ok(Sniffed::new(".apk", "Android application package (APK)"));
    }
    if has("meta-inf/manifest.mf") {
        if any_under("web-inf/") {
            return Ok(Sniffed::new(".war", "Java Web Application Archive (WAR)"));
        }
        return Ok(Sniffed::new(".jar", "Java archive (JAR)"));
    }

    Ok(Sniffed::new(".zip", "Generic ZIP archive"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn zip_with(entries: &[(&str, &str)]) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut w = zip::ZipWriter::new(tmp.reopen().unwrap());
        let opts = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, body) in entries {
            w.start_file(*name, opts).unwrap();
            w.write_all(body.as_bytes()).unwrap();
        }
        w.finish().unwrap();
        tmp
    }

    fn ext_of(entries: &[(&str, &str)]) -> String {
        zip_subtype(zip_with(entries).path()).extension.unwrap()
    }

    #[test]
    fn test_ooxml() {
        assert_eq!(ext_of(&[("xl/workbook.xml", "")]), ".xlsx");
        assert_eq!(ext_of(&[("ppt/presentation.xml", "")]), ".pptx");
        assert_eq!(ext_of(&[("Word/document.xml", "")]), ".docx");
    }

    #[test]
    fn test_odf_and_epub() {
        assert_eq!(ext_of(&[("mimetype", "application/vnd.oasis.opendocument.text")]), ".odt");
        assert_eq!(ext_of(&[("mimetype", "application/vnd.oasis.opendocument.spreadsheet\n")]), ".ods");
        assert_eq!(ext_of(&[("mimetype", "application/epub+zip")]), ".epub");
        assert_eq!(ext_of(&[("mimetype", "application/x-unknown")]), ".zip");
    }

    #[test]
    fn test_java_and_android() {
        assert_eq!(ext_of(&[("AndroidManifest.xml", "")]), ".apk");
        assert_eq!(ext_of(&[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0")]), ".jar");
        assert_eq!(ext_of(&[("META-INF/MANIFEST.MF", ""), ("WEB-INF/web.xml", "")]), ".war");
    }

    #[test]
    fn test_truncated_zip_degrades() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"PK\x03\x04 this is not really a zip").unwrap();
        let s = zip_subtype(tmp.path());
        assert_eq!(s.extension.as_deref(), Some(".zip"));
        assert_eq!(s.description, "ZIP-like file (invalid or unreadable as ZIP)");
    }
}

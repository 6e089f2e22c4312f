//! Executable images: PE (EXE, DLL, SYS, ...), ELF and Mach-O.
//!
//! The format is chosen from the leading magic, never from the extension;
//! game data files such as `.pak` or `.sav` are routed here too and come back
//! as partial records when they carry no executable header.

mod elf;
mod macho;
mod pe;

use std::path::Path;

use tracing::debug;

use casefile_extract_types::records::ExeMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, Source, TypeRecord,
};

/// Number of exported names listed in the summary.
const EXPORT_SAMPLE: usize = 20;

pub struct ExeExtractor;

impl Extractor for ExeExtractor {
    fn family(&self) -> Family {
        Family::Executable
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(
            lower_ext(path).as_str(),
            "exe" | "dll" | "sys" | "scr" | "cpl" | "ocx" | "drv" | "efi" | "msi" | "bin" | "elf"
                | "so" | "dylib" | "pak" | "dat" | "sav"
        )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        let mut src = match Source::open(path) {
            Ok(s) => s,
            Err(reason) => return ExtractOutcome::Failure(reason),
        };
        let data = match read_image(&mut src, cfg.max_parse_bytes) {
            Ok(d) => d,
            Err(reason) => return ExtractOutcome::Failure(reason),
        };
        let mut bin = parse(&data, cfg);
        if has_executable_magic(&data) && (data.len() as u64) < src.len() {
            bin.issues.push(format!("only the first {} bytes were parsed", data.len()));
        }
        let summary = bin.summary();
        let record = TypeRecord::new(FamilyMeta::Executable(bin.meta))
            .with_mime(bin.mime)
            .with_excerpts(Excerpts::from_text(&summary));
        ExtractOutcome::from_issues(record, bin.issues)
    }
}

/// What one of the format readers recovered.
#[derive(Debug, Default)]
pub(crate) struct Binary {
    pub(crate) meta: ExeMeta,
    /// `(name, raw size)` per section.
    pub(crate) sections: Vec<(String, u64)>,
    pub(crate) libraries: Vec<String>,
    pub(crate) exports: Vec<String>,
    pub(crate) version_info: Vec<String>,
    pub(crate) mime: &'static str,
    pub(crate) issues: Vec<String>,
}

impl Binary {
    /// Technical summary stored as the excerpt.
    fn summary(&self) -> String {
        let m = &self.meta;
        let unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| "Unknown".to_string());
        let mut lines = vec![
            format!("FORMAT: {}", unknown(&m.exe_format).to_uppercase()),
            format!("ARCH: {}", unknown(&m.architecture)),
            format!("COMPILED: {}", unknown(&m.compile_timestamp)),
            format!("SUBSYSTEM: {}", unknown(&m.subsystem)),
            format!("SIGNED: {}", if m.is_signed == Some(true) { "Yes" } else { "No" }),
            format!("ENTRY_POINT: {}", unknown(&m.entry_point)),
            String::new(),
        ];
        if !self.sections.is_empty() {
            let sections: Vec<String> = self
                .sections
                .iter()
                .map(|(name, size)| format!("{name} (0x{size:x})"))
                .collect();
            lines.push("SECTIONS:".to_string());
            lines.push(sections.join(", "));
            lines.push(String::new());
        }
        if !self.libraries.is_empty() {
            lines.push("IMPORTED DLLs:".to_string());
            lines.push(self.libraries.join(", "));
            lines.push(String::new());
        }
        if !self.exports.is_empty() {
            let sample: Vec<&str> = self.exports.iter().take(EXPORT_SAMPLE).map(String::as_str).collect();
            lines.push("EXPORTS (Sample):".to_string());
            lines.push(sample.join(", "));
            lines.push(String::new());
        }
        if !self.version_info.is_empty() {
            lines.push("VERSION INFO:".to_string());
            lines.extend(self.version_info.iter().cloned());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// Leading bytes checked for an executable header.
const MAGIC_LEN: u64 = 4096;

/// Files without an executable header cost one small read; images are read
/// up to `limit` bytes.
fn read_image(src: &mut Source, limit: u64) -> Result<Vec<u8>, String> {
    let head = src.head(MAGIC_LEN)?;
    if !has_executable_magic(&head) || src.len() <= MAGIC_LEN {
        return Ok(head);
    }
    debug!("reading {} of {} bytes of {}", limit.min(src.len()), src.len(), src.path().display());
    src.head(limit)
}

fn has_executable_magic(data: &[u8]) -> bool {
    data.starts_with(b"MZ") || data.starts_with(b"\x7fELF") || macho::thin_magic(data).is_some() || macho::is_fat(data)
}

fn parse(data: &[u8], cfg: &ExtractorConfig) -> Binary {
    if data.starts_with(b"MZ") {
        pe::read(data, cfg.capabilities.pe_parsing)
    } else if data.starts_with(b"\x7fELF") {
        elf::read(data)
    } else if macho::thin_magic(data).is_some() || macho::is_fat(data) {
        macho::read(data)
    } else {
        Binary {
            mime: "application/octet-stream",
            issues: vec!["no executable header found".to_string()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Endian {
    Little,
    Big,
}

impl Endian {
    pub(crate) fn u16(self, data: &[u8], at: usize) -> Option<u16> {
        let b: [u8; 2] = data.get(at..at.checked_add(2)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u16::from_le_bytes(b),
            Endian::Big => u16::from_be_bytes(b),
        })
    }

    pub(crate) fn u32(self, data: &[u8], at: usize) -> Option<u32> {
        let b: [u8; 4] = data.get(at..at.checked_add(4)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u32::from_le_bytes(b),
            Endian::Big => u32::from_be_bytes(b),
        })
    }

    pub(crate) fn u64(self, data: &[u8], at: usize) -> Option<u64> {
        let b: [u8; 8] = data.get(at..at.checked_add(8)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u64::from_le_bytes(b),
            Endian::Big => u64::from_be_bytes(b),
        })
    }
}

pub(crate) fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    Endian::Little.u16(data, at)
}

pub(crate) fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    Endian::Little.u32(data, at)
}

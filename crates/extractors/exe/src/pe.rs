//! Portable Executable images.
//!
//! The COFF and optional headers are read directly so that architecture,
//! timestamp, subsystem, sections and the signature directory are available
//! even when the import/export tables are corrupt or `pe_parsing` is off.
//! `pelite` supplies the tables and the version resource.

use chrono::DateTime;
use tracing::debug;

use casefile_extract_types::records::ExeMeta;

use crate::{le_u16, le_u32, Binary};

const IMAGE_DIRECTORY_ENTRY_SECURITY: usize = 4;

#[derive(Debug, Default)]
struct Tables {
    libraries: Vec<String>,
    import_count: u32,
    exports: Vec<String>,
    version_info: Vec<String>,
}

pub(crate) fn read(data: &[u8], tables_enabled: bool) -> Binary {
    let mut bin = Binary {
        mime: "application/x-dosexec",
        ..Default::default()
    };

    let Some(pe_offset) = pe_header_offset(data) else {
        bin.meta.exe_format = Some("dos".to_string());
        bin.issues.push("MZ executable without a PE header".to_string());
        return bin;
    };
    if let Err(reason) = read_headers(data, pe_offset, &mut bin) {
        bin.issues.push(reason);
        return bin;
    }

    if !tables_enabled {
        bin.issues.push("PE table parsing disabled; headers only".to_string());
        return bin;
    }
    match tables64(data).or_else(|_| tables32(data)) {
        Ok(tables) => {
            bin.meta.import_count = Some(tables.import_count);
            bin.meta.export_count = Some(tables.exports.len() as u32);
            bin.libraries = tables.libraries;
            bin.exports = tables.exports;
            bin.version_info = tables.version_info;
        }
        Err(e) => {
            debug!("pelite rejected image: {e}");
            bin.issues.push(format!("import/export tables unreadable: {e}"));
        }
    }
    bin
}

fn pe_header_offset(data: &[u8]) -> Option<usize> {
    let offset = le_u32(data, 0x3C)? as usize;
    (data.get(offset..offset + 4)? == b"PE\0\0").then_some(offset)
}

fn read_headers(data: &[u8], pe: usize, bin: &mut Binary) -> Result<(), String> {
    let coff = pe + 4;
    let truncated = || "PE headers truncated".to_string();
    let machine = le_u16(data, coff).ok_or_else(truncated)?;
    let section_count = le_u16(data, coff + 2).ok_or_else(truncated)?;
    let timestamp = le_u32(data, coff + 4).ok_or_else(truncated)?;
    let optional_size = le_u16(data, coff + 16).ok_or_else(truncated)? as usize;

    bin.meta = ExeMeta {
        exe_format: Some("pe".to_string()),
        architecture: Some(machine_name(machine)),
        compile_timestamp: format_timestamp(timestamp),
        section_count: Some(section_count as u32),
        ..Default::default()
    };

    let opt = coff + 20;
    let (dirs_count_at, dirs_at) = match le_u16(data, opt) {
        Some(0x10b) => (opt + 92, opt + 96),
        Some(0x20b) => (opt + 108, opt + 112),
        Some(magic) => return Err(format!("unknown optional header magic 0x{magic:x}")),
        None => return Err(truncated()),
    };
    let entry = le_u32(data, opt + 16).ok_or_else(truncated)?;
    bin.meta.entry_point = Some(format!("0x{entry:x}"));
    bin.meta.subsystem = le_u16(data, opt + 68).map(subsystem_name);

    let dirs_count = le_u32(data, dirs_count_at).unwrap_or(0) as usize;
    bin.meta.is_signed = Some(if dirs_count > IMAGE_DIRECTORY_ENTRY_SECURITY {
        let at = dirs_at + IMAGE_DIRECTORY_ENTRY_SECURITY * 8;
        let address = le_u32(data, at).unwrap_or(0);
        let size = le_u32(data, at + 4).unwrap_or(0);
        address != 0 && size > 0
    } else {
        false
    });

    let mut at = opt + optional_size;
    for _ in 0..section_count {
        let Some(header) = data.get(at..at + 40) else {
            return Err("section table truncated".to_string());
        };
        let name = String::from_utf8_lossy(&header[..8])
            .trim_end_matches('\0')
            .to_string();
        let raw_size = le_u32(header, 16).unwrap_or(0) as u64;
        bin.sections.push((name, raw_size));
        at += 40;
    }
    Ok(())
}

macro_rules! pe_tables {
    ($name:ident, $bits:ident) => {
        fn $name(data: &[u8]) -> Result<Tables, pelite::Error> {
            use pelite::$bits::{Pe, PeFile};

            let pe = PeFile::from_bytes(data)?;
            let mut tables = Tables::default();

            if let Ok(imports) = pe.imports() {
                for desc in imports {
                    let dll = desc.dll_name()?;
                    if let Ok(name) = dll.to_str() {
                        tables.libraries.push(name.to_string());
                    }
                    let functions = desc.int()?.filter(|import| import.is_ok()).count();
                    tables.import_count += functions as u32;
                }
            }

            if let Ok(exports) = pe.exports() {
                let by = exports.by()?;
                for (name, _) in by.iter_names() {
                    if let Some(name) = name.ok().and_then(|n| n.to_str().ok()) {
                        tables.exports.push(name.to_string());
                    }
                }
            }

            if let Ok(resources) = pe.resources() {
                if let Ok(version_info) = resources.version_info() {
                    tables.version_info = version_info_lines(&version_info);
                }
            }
            Ok(tables)
        }
    };
}

pe_tables!(tables64, pe64);
pe_tables!(tables32, pe32);

fn version_info_lines(version_info: &pelite::resources::version_info::VersionInfo<'_>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(fixed) = version_info.fixed() {
        let file_ver = fixed.dwFileVersion;
        let product_ver = fixed.dwProductVersion;
        lines.push(format!(
            "FileVersion: {}.{}.{}.{}",
            file_ver.Major, file_ver.Minor, file_ver.Patch, file_ver.Build
        ));
        lines.push(format!(
            "ProductVersion: {}.{}.{}.{}",
            product_ver.Major, product_ver.Minor, product_ver.Patch, product_ver.Build
        ));
    }

    let keys = [
        "ProductName",
        "FileDescription",
        "CompanyName",
        "LegalCopyright",
        "OriginalFilename",
        "InternalName",
    ];
    if let Some(lang) = version_info.translation().first() {
        version_info.strings(*lang, |key, value| {
            if keys.contains(&key) && !value.trim().is_empty() {
                lines.push(format!("{}: {}", key, value.trim()));
            }
        });
    }
    lines
}

pub(crate) fn machine_name(machine: u16) -> String {
    match machine {
        0x14c => "x86 (32-bit)".to_string(),
        0x8664 => "x64 (64-bit)".to_string(),
        0x200 => "Intel Itanium".to_string(),
        0xaa64 => "ARM64".to_string(),
        0x1c0 | 0x1c4 => "ARM".to_string(),
        other => format!("Unknown (0x{other:x})"),
    }
}

pub(crate) fn subsystem_name(subsystem: u16) -> String {
    match subsystem {
        1 => "Native/Driver".to_string(),
        2 => "GUI (Windows)".to_string(),
        3 => "Console (CUI)".to_string(),
        7 => "POSIX".to_string(),
        9 => "Windows CE".to_string(),
        10 => "EFI Application".to_string(),
        11 => "EFI Boot Service Driver".to_string(),
        12 => "EFI Runtime Driver".to_string(),
        other => format!("Other ({other})"),
    }
}

/// UTC `YYYY-MM-DD HH:MM:SS`; a zero stamp means the linker left it unset.
fn format_timestamp(secs: u32) -> Option<String> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

//! Mach-O images and universal (fat) wrappers.

use casefile_extract_types::records::ExeMeta;

use crate::{Binary, Endian};

const LC_SEGMENT: u32 = 0x1;
const LC_LOAD_DYLIB: u32 = 0xC;
const LC_SEGMENT_64: u32 = 0x19;
const LC_CODE_SIGNATURE: u32 = 0x1D;
const LC_LOAD_WEAK_DYLIB: u32 = 0x8000_0018;
const LC_REEXPORT_DYLIB: u32 = 0x8000_001F;
const LC_MAIN: u32 = 0x8000_0028;

/// Byte order and width from the leading magic, if it is a thin Mach-O.
pub(crate) fn thin_magic(data: &[u8]) -> Option<(Endian, bool)> {
    match data.get(..4)? {
        [0xFE, 0xED, 0xFA, 0xCE] => Some((Endian::Big, false)),
        [0xCE, 0xFA, 0xED, 0xFE] => Some((Endian::Little, false)),
        [0xFE, 0xED, 0xFA, 0xCF] => Some((Endian::Big, true)),
        [0xCF, 0xFA, 0xED, 0xFE] => Some((Endian::Little, true)),
        _ => None,
    }
}

/// `CAFEBABE` is shared with Java class files; a universal binary carries a
/// small architecture count where a class file has its version number.
pub(crate) fn is_fat(data: &[u8]) -> bool {
    data.starts_with(&[0xCA, 0xFE, 0xBA, 0xBE])
        && matches!(Endian::Big.u32(data, 4), Some(n) if n > 0 && n < 20)
}

pub(crate) fn read(data: &[u8]) -> Binary {
    if is_fat(data) {
        return read_fat(data);
    }
    let mut bin = Binary {
        meta: ExeMeta {
            exe_format: Some("macho".to_string()),
            is_signed: Some(false),
            ..Default::default()
        },
        mime: "application/x-mach-binary",
        ..Default::default()
    };
    let Some((endian, wide)) = thin_magic(data) else {
        bin.issues.push("not a Mach-O image".to_string());
        return bin;
    };

    let (Some(cputype), Some(filetype), Some(ncmds)) =
        (endian.u32(data, 4), endian.u32(data, 12), endian.u32(data, 16))
    else {
        bin.issues.push("Mach-O header truncated".to_string());
        return bin;
    };
    bin.meta.architecture = Some(cpu_name(cputype));
    bin.meta.subsystem = Some(
        match filetype {
            1 => "Object",
            2 => "Executable",
            6 => "Dynamic library",
            7 => "Dynamic linker",
            8 => "Bundle",
            _ => "Other",
        }
        .to_string(),
    );

    let mut at = if wide { 32 } else { 28 };
    let mut sections = 0u32;
    let mut dylibs = 0u32;
    for _ in 0..ncmds {
        let (Some(cmd), Some(size)) = (endian.u32(data, at), endian.u32(data, at + 4)) else {
            bin.issues.push("load commands truncated".to_string());
            break;
        };
        match cmd {
            LC_SEGMENT => sections += endian.u32(data, at + 48).unwrap_or(0),
            LC_SEGMENT_64 => sections += endian.u32(data, at + 64).unwrap_or(0),
            LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB => dylibs += 1,
            LC_CODE_SIGNATURE => bin.meta.is_signed = Some(true),
            LC_MAIN => {
                bin.meta.entry_point = endian.u64(data, at + 8).map(|e| format!("0x{e:x}"));
            }
            _ => {}
        }
        if size < 8 {
            bin.issues.push("malformed load command".to_string());
            break;
        }
        at += size as usize;
    }
    bin.meta.section_count = Some(sections);
    bin.meta.import_count = Some(dylibs);
    bin
}

/// Lists every slice's architecture and reads the first slice in full.
fn read_fat(data: &[u8]) -> Binary {
    let count = Endian::Big.u32(data, 4).unwrap_or(0) as usize;
    let mut archs = Vec::new();
    let mut first = None;
    for i in 0..count {
        let at = 8 + i * 20;
        let (Some(cputype), Some(offset), Some(size)) = (
            Endian::Big.u32(data, at),
            Endian::Big.u32(data, at + 8),
            Endian::Big.u32(data, at + 12),
        ) else {
            break;
        };
        archs.push(cpu_name(cputype));
        if first.is_none() {
            first = Some((offset as usize, size as usize));
        }
    }

    let mut bin = match first.and_then(|(o, s)| data.get(o..o.saturating_add(s))) {
        Some(slice) => read(slice),
        None => {
            let mut bin = Binary {
                mime: "application/x-mach-binary",
                ..Default::default()
            };
            bin.issues.push("universal binary slice out of range".to_string());
            bin
        }
    };
    bin.meta.exe_format = Some("macho".to_string());
    if !archs.is_empty() {
        bin.meta.architecture = Some(format!("Universal ({})", archs.join(", ")));
    }
    bin
}

fn cpu_name(cputype: u32) -> String {
    match cputype {
        7 => "x86 (32-bit)".to_string(),
        0x0100_0007 => "x64 (64-bit)".to_string(),
        12 => "ARM".to_string(),
        0x0100_000C => "ARM64".to_string(),
        18 => "PowerPC".to_string(),
        0x0100_0012 => "PowerPC64".to_string(),
        other => format!("Unknown (0x{other:x})"),
    }
}

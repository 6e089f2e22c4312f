//! ELF headers, the section table, and `DT_NEEDED` entries of the dynamic
//! section.

use casefile_extract_types::records::ExeMeta;

use crate::{Binary, Endian};

const SHT_DYNAMIC: u32 = 6;
const DT_NEEDED: u64 = 1;

pub(crate) fn read(data: &[u8]) -> Binary {
    let mut bin = Binary {
        meta: ExeMeta {
            exe_format: Some("elf".to_string()),
            is_signed: Some(false),
            ..Default::default()
        },
        mime: "application/x-executable",
        ..Default::default()
    };

    let wide = match data.get(4) {
        Some(1) => false,
        Some(2) => true,
        _ => {
            bin.issues.push("unknown ELF class".to_string());
            return bin;
        }
    };
    let endian = match data.get(5) {
        Some(2) => Endian::Big,
        _ => Endian::Little,
    };

    let Some(e_type) = endian.u16(data, 16) else {
        bin.issues.push("ELF header truncated".to_string());
        return bin;
    };
    if e_type == 3 {
        bin.mime = "application/x-sharedlib";
    }
    bin.meta.subsystem = Some(
        match e_type {
            1 => "Relocatable",
            2 => "Executable",
            3 => "Shared object",
            4 => "Core dump",
            _ => "Unknown",
        }
        .to_string(),
    );
    bin.meta.architecture = endian.u16(data, 18).map(|m| machine_name(m, wide));

    let (entry, shoff, shentsize, shnum) = if wide {
        (
            endian.u64(data, 24),
            endian.u64(data, 40),
            endian.u16(data, 58),
            endian.u16(data, 60),
        )
    } else {
        (
            endian.u32(data, 24).map(u64::from),
            endian.u32(data, 32).map(u64::from),
            endian.u16(data, 46),
            endian.u16(data, 48),
        )
    };
    bin.meta.entry_point = entry.map(|e| format!("0x{e:x}"));
    bin.meta.section_count = shnum.map(u32::from);

    let (Some(shoff), Some(shentsize), Some(shnum)) = (shoff, shentsize, shnum) else {
        bin.issues.push("ELF header truncated".to_string());
        return bin;
    };
    let mut needed = 0u32;
    for i in 0..shnum as u64 {
        let at = match shoff.checked_add(i * shentsize as u64) {
            Some(at) if at as usize + shentsize as usize <= data.len() => at as usize,
            _ => {
                bin.issues.push("section table extends past end of file".to_string());
                break;
            }
        };
        if endian.u32(data, at + 4) != Some(SHT_DYNAMIC) {
            continue;
        }
        let (offset, size) = if wide {
            (endian.u64(data, at + 24), endian.u64(data, at + 32))
        } else {
            (endian.u32(data, at + 16).map(u64::from), endian.u32(data, at + 20).map(u64::from))
        };
        if let (Some(offset), Some(size)) = (offset, size) {
            needed += count_needed(data, offset as usize, size as usize, wide, endian);
        }
    }
    bin.meta.import_count = Some(needed);
    bin
}

fn count_needed(data: &[u8], offset: usize, size: usize, wide: bool, endian: Endian) -> u32 {
    let step = if wide { 16 } else { 8 };
    let end = offset.saturating_add(size).min(data.len());
    let mut count = 0;
    let mut at = offset;
    while at + step <= end {
        let tag = if wide {
            endian.u64(data, at)
        } else {
            endian.u32(data, at).map(u64::from)
        };
        match tag {
            Some(0) | None => break,
            Some(DT_NEEDED) => count += 1,
            _ => {}
        }
        at += step;
    }
    count
}

fn machine_name(machine: u16, wide: bool) -> String {
    let bits = if wide { "64-bit" } else { "32-bit" };
    match machine {
        0x03 => "x86 (32-bit)".to_string(),
        0x3E => "x64 (64-bit)".to_string(),
        0x28 => "ARM".to_string(),
        0xB7 => "ARM64".to_string(),
        0xF3 => format!("RISC-V ({bits})"),
        0x08 => format!("MIPS ({bits})"),
        0x14 => "PowerPC".to_string(),
        0x15 => "PowerPC64".to_string(),
        other => format!("Unknown (0x{other:x})"),
    }
}

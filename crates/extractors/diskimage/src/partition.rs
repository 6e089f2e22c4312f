//! MBR and GPT partition tables, plus filesystem probing by boot-sector
//! and superblock signatures.

use std::io::{Read, Seek};

use anyhow::Result;

use crate::Disk;

const LBA: u64 = 512;
const MAX_GPT_ENTRIES: u32 = 256;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Partition {
    pub(crate) index: usize,
    /// MBR type byte as `0x07`, or the GPT type GUID's well-known name.
    pub(crate) kind: String,
    pub(crate) start_lba: u64,
    pub(crate) sectors: u64,
    pub(crate) bootable: bool,
    pub(crate) filesystem: Option<&'static str>,
}

#[derive(Debug, Default)]
pub(crate) struct Layout {
    pub(crate) has_mbr: bool,
    pub(crate) has_gpt: bool,
    pub(crate) partitions: Vec<Partition>,
    /// Set when the image is a bare filesystem with no partition table.
    pub(crate) whole_disk_fs: Option<&'static str>,
}

impl Layout {
    pub(crate) fn bootable(&self) -> bool {
        self.partitions.iter().any(|p| p.bootable)
    }

    /// Distinct filesystems in partition order.
    pub(crate) fn filesystems(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for fs in self.whole_disk_fs.into_iter().chain(self.partitions.iter().filter_map(|p| p.filesystem)) {
            if !out.contains(&fs) {
                out.push(fs);
            }
        }
        out
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.has_mbr && !self.has_gpt && self.whole_disk_fs.is_none()
    }
}

/// Reads the partition scheme of a raw disk starting at `base`.
pub(crate) fn inspect<R: Read + Seek>(disk: &mut Disk<R>, base: u64) -> Result<Layout> {
    let mut layout = Layout::default();
    let sector0 = disk.read_at(base, LBA as usize)?;
    if sector0.len() < LBA as usize {
        return Ok(layout);
    }

    // a FAT or NTFS volume boot record also ends in 55 AA
    if let Some(fs) = probe_filesystem(disk, base)? {
        layout.whole_disk_fs = Some(fs);
        return Ok(layout);
    }
    if sector0[510..512] != [0x55, 0xAA] {
        return Ok(layout);
    }
    layout.has_mbr = true;

    let mut protective = false;
    for i in 0..4 {
        let e = &sector0[446 + i * 16..446 + (i + 1) * 16];
        let kind = e[4];
        if kind == 0 {
            continue;
        }
        if kind == 0xEE {
            protective = true;
            continue;
        }
        let start_lba = le_u32(e, 8) as u64;
        let filesystem = match probe_filesystem(disk, base + start_lba * LBA)? {
            Some(fs) => Some(fs),
            None => mbr_type_filesystem(kind),
        };
        layout.partitions.push(Partition {
            index: i + 1,
            kind: format!("0x{kind:02X}"),
            start_lba,
            sectors: le_u32(e, 12) as u64,
            bootable: e[0] == 0x80,
            filesystem,
        });
    }

    let header = disk.read_at(base + LBA, 92)?;
    if header.len() == 92 && header.starts_with(b"EFI PART") {
        layout.has_gpt = true;
        layout.partitions = read_gpt(disk, base, &header)?;
    } else if protective {
        layout.has_gpt = true;
    }
    Ok(layout)
}

fn read_gpt<R: Read + Seek>(disk: &mut Disk<R>, base: u64, header: &[u8]) -> Result<Vec<Partition>> {
    let entries_lba = le_u64(header, 72);
    let count = le_u32(header, 80).min(MAX_GPT_ENTRIES);
    let size = le_u32(header, 84) as usize;
    if size < 128 {
        return Ok(Vec::new());
    }
    let table = disk.read_at(base + entries_lba * LBA, count as usize * size)?;

    let mut partitions = Vec::new();
    for (i, e) in table.chunks_exact(size).enumerate() {
        let guid = &e[0..16];
        if guid.iter().all(|&b| b == 0) {
            continue;
        }
        let guid = format_guid(guid);
        let start_lba = le_u64(e, 32);
        let end_lba = le_u64(e, 40);
        let kind = gpt_type_name(&guid);
        let filesystem = match probe_filesystem(disk, base + start_lba * LBA)? {
            Some(fs) => Some(fs),
            None => gpt_type_filesystem(&guid),
        };
        partitions.push(Partition {
            index: i + 1,
            kind: kind.map(str::to_string).unwrap_or(guid),
            start_lba,
            sectors: end_lba.saturating_sub(start_lba) + 1,
            bootable: kind == Some("EFI System"),
            filesystem,
        });
    }
    Ok(partitions)
}

/// Identifies the filesystem whose first sector sits at `offset`.
pub(crate) fn probe_filesystem<R: Read + Seek>(disk: &mut Disk<R>, offset: u64) -> Result<Option<&'static str>> {
    let head = disk.read_at(offset, 4096)?;
    let at = |from: usize, sig: &[u8]| head.get(from..from + sig.len()) == Some(sig);

    let fs = if at(3, b"NTFS    ") {
        Some("ntfs")
    } else if at(3, b"EXFAT   ") {
        Some("exfat")
    } else if at(82, b"FAT32   ") {
        Some("fat32")
    } else if at(54, b"FAT16   ") {
        Some("fat16")
    } else if at(54, b"FAT12   ") {
        Some("fat12")
    } else if at(0, b"XFSB") {
        Some("xfs")
    } else if at(32, b"NXSB") {
        Some("apfs")
    } else if at(1024, b"H+") {
        Some("hfsplus")
    } else if at(1024, b"HX") {
        Some("hfsx")
    } else if at(1080, &[0x53, 0xEF]) {
        Some("ext")
    } else {
        None
    };
    Ok(fs)
}

fn mbr_type_filesystem(kind: u8) -> Option<&'static str> {
    match kind {
        0x01 => Some("fat12"),
        0x04 | 0x06 | 0x0E => Some("fat16"),
        0x0B | 0x0C => Some("fat32"),
        0x07 => Some("ntfs"),
        0x82 => Some("linux-swap"),
        0x83 => Some("ext"),
        0xAF => Some("hfsplus"),
        _ => None,
    }
}

fn gpt_type_name(guid: &str) -> Option<&'static str> {
    match guid {
        "C12A7328-F81F-11D2-BA4B-00A0C93EC93B" => Some("EFI System"),
        "E3C9E316-0B5C-4DB8-817D-F92DF00215AE" => Some("Microsoft Reserved"),
        "EBD0A0A2-B9E5-4433-87C0-68B6B72699C7" => Some("Microsoft Basic Data"),
        "DE94BBA4-06D1-4D40-A16A-BFD50179D6AC" => Some("Windows Recovery"),
        "0FC63DAF-8483-4772-8E79-3D69D8477DE4" => Some("Linux Filesystem"),
        "0657FD6D-A4AB-43C4-84E5-0933C84B4F4F" => Some("Linux Swap"),
        "E6D6D379-F507-44C2-A23C-238F2A3DF928" => Some("Linux LVM"),
        "48465300-0000-11AA-AA11-00306543ECAC" => Some("Apple HFS+"),
        "7C3457EF-0000-11AA-AA11-00306543ECAC" => Some("Apple APFS"),
        "21686148-6449-6E6F-744E-656564454649" => Some("BIOS Boot"),
        _ => None,
    }
}

fn gpt_type_filesystem(guid: &str) -> Option<&'static str> {
    match gpt_type_name(guid)? {
        "EFI System" => Some("fat32"),
        "Microsoft Basic Data" => Some("ntfs"),
        "Linux Filesystem" => Some("ext"),
        "Linux Swap" => Some("linux-swap"),
        "Apple HFS+" => Some("hfsplus"),
        "Apple APFS" => Some("apfs"),
        _ => None,
    }
}

/// GPT GUIDs store the first three fields little-endian.
fn format_guid(b: &[u8]) -> String {
    format!(
        "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        le_u32(b, 0),
        u16::from_le_bytes([b[4], b[5]]),
        u16::from_le_bytes([b[6], b[7]]),
        b[8],
        b[9],
        b[10],
        b[11],
        b[12],
        b[13],
        b[14],
        b[15]
    )
}

/// Operating system implied by the filesystems found, first match wins.
pub(crate) fn os_from_filesystems(filesystems: &[&str]) -> Option<&'static str> {
    filesystems.iter().find_map(|fs| match *fs {
        "ntfs" => Some("Windows"),
        "ext" | "xfs" | "linux-swap" => Some("Linux"),
        "apfs" | "hfsplus" | "hfsx" => Some("macOS"),
        _ => None,
    })
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn le_u64(data: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(b)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// One bootable FAT32 partition at LBA 8.
    pub(crate) fn mbr_fat32_image() -> Vec<u8> {
        let mut img = vec![0u8; 9 * 512];
        let e = 446;
        img[e] = 0x80;
        img[e + 4] = 0x0C;
        img[e + 8..e + 12].copy_from_slice(&8u32.to_le_bytes());
        img[e + 12..e + 16].copy_from_slice(&100u32.to_le_bytes());
        img[510] = 0x55;
        img[511] = 0xAA;
        let vbr = 8 * 512;
        img[vbr + 82..vbr + 90].copy_from_slice(b"FAT32   ");
        img[vbr + 510] = 0x55;
        img[vbr + 511] = 0xAA;
        img
    }

    /// Protective MBR, GPT header, one Linux partition holding an ext superblock.
    pub(crate) fn gpt_linux_image() -> Vec<u8> {
        let mut img = vec![0u8; 34 * 512 + 2048];
        img[446 + 4] = 0xEE;
        img[510] = 0x55;
        img[511] = 0xAA;
        let h = 512;
        img[h..h + 8].copy_from_slice(b"EFI PART");
        img[h + 72..h + 80].copy_from_slice(&2u64.to_le_bytes());
        img[h + 80..h + 84].copy_from_slice(&4u32.to_le_bytes());
        img[h + 84..h + 88].copy_from_slice(&128u32.to_le_bytes());
        let t = 2 * 512;
        img[t..t + 16].copy_from_slice(&[
            0xAF, 0x3D, 0xC6, 0x0F, 0x83, 0x84, 0x72, 0x47, 0x8E, 0x79, 0x3D, 0x69, 0xD8, 0x47, 0x7D, 0xE4,
        ]);
        img[t + 32..t + 40].copy_from_slice(&34u64.to_le_bytes());
        img[t + 40..t + 48].copy_from_slice(&99u64.to_le_bytes());
        let sb = 34 * 512 + 1080;
        img[sb] = 0x53;
        img[sb + 1] = 0xEF;
        img
    }

    #[test]
    fn test_mbr_with_fat32() {
        let mut disk = Disk::new(Cursor::new(mbr_fat32_image())).unwrap();
        let layout = inspect(&mut disk, 0).unwrap();
        assert!(layout.has_mbr);
        assert!(!layout.has_gpt);
        assert!(layout.bootable());
        assert_eq!(layout.partitions.len(), 1);
        let p = &layout.partitions[0];
        assert_eq!((p.kind.as_str(), p.start_lba, p.sectors), ("0x0C", 8, 100));
        assert_eq!(layout.filesystems(), vec!["fat32"]);
    }

    #[test]
    fn test_gpt_with_ext() {
        let mut disk = Disk::new(Cursor::new(gpt_linux_image())).unwrap();
        let layout = inspect(&mut disk, 0).unwrap();
        assert!(layout.has_mbr);
        assert!(layout.has_gpt);
        assert_eq!(layout.partitions.len(), 1);
        assert_eq!(layout.partitions[0].kind, "Linux Filesystem");
        assert_eq!(layout.partitions[0].sectors, 66);
        assert_eq!(layout.filesystems(), vec!["ext"]);
        assert_eq!(os_from_filesystems(&layout.filesystems()), Some("Linux"));
    }

    #[test]
    fn test_bare_fat_volume_is_not_mbr() {
        let mut img = vec![0u8; 1024];
        img[54..62].copy_from_slice(b"FAT12   ");
        img[510] = 0x55;
        img[511] = 0xAA;
        let mut disk = Disk::new(Cursor::new(img)).unwrap();
        let layout = inspect(&mut disk, 0).unwrap();
        assert!(!layout.has_mbr);
        assert_eq!(layout.whole_disk_fs, Some("fat12"));
        assert!(layout.partitions.is_empty());
    }

    #[test]
    fn test_blank_disk() {
        let mut disk = Disk::new(Cursor::new(vec![0u8; 4096])).unwrap();
        assert!(inspect(&mut disk, 0).unwrap().is_empty());
    }

    #[test]
    fn test_format_guid() {
        let bytes = [
            0x28, 0x73, 0x2A, 0xC1, 0x1F, 0xF8, 0xD2, 0x11, 0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B,
        ];
        assert_eq!(format_guid(&bytes), "C12A7328-F81F-11D2-BA4B-00A0C93EC93B");
    }
}

//! ISO 9660 volumes: descriptors, El Torito, Joliet names, directory walk.

use std::collections::{HashSet, VecDeque};
use std::io::{Read, Seek};

use anyhow::{bail, Result};
use tracing::debug;

use crate::Disk;

const SECTOR: u64 = 2048;
const FIRST_DESCRIPTOR: u64 = 16;
const MAX_DESCRIPTORS: u64 = 32;
const MAX_DIRECTORIES: usize = 10_000;
const MAX_DIRECTORY_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Default)]
pub(crate) struct IsoVolume {
    pub(crate) label: Option<String>,
    pub(crate) system_id: Option<String>,
    pub(crate) bootable: bool,
    pub(crate) joliet: bool,
    pub(crate) udf: bool,
    pub(crate) volume_bytes: Option<u64>,
    pub(crate) file_count: u64,
    /// The first `max_listed` file paths in breadth-first order.
    pub(crate) files: Vec<String>,
    pub(crate) issues: Vec<String>,
}

impl IsoVolume {
    /// "ISO9660", "ISO9660+Joliet", with "+UDF" for bridge discs.
    pub(crate) fn filesystem_label(&self) -> String {
        let mut fs = "ISO9660".to_string();
        if self.joliet {
            fs.push_str("+Joliet");
        }
        if self.udf {
            fs.push_str("+UDF");
        }
        fs
    }
}

/// `CD001` (ISO 9660) or `BEA01` (UDF) in the first volume descriptor.
pub(crate) fn probe<R: Read + Seek>(disk: &mut Disk<R>) -> Result<bool> {
    let id = disk.read_at(FIRST_DESCRIPTOR * SECTOR + 1, 5)?;
    Ok(id == b"CD001" || id == b"BEA01")
}

#[derive(Clone, Copy)]
struct Root {
    extent: u32,
    size: u32,
}

pub(crate) fn read<R: Read + Seek>(disk: &mut Disk<R>, max_listed: usize) -> Result<IsoVolume> {
    let mut vol = IsoVolume::default();
    let mut primary_root = None;
    let mut joliet_root = None;

    for n in FIRST_DESCRIPTOR..FIRST_DESCRIPTOR + MAX_DESCRIPTORS {
        let d = disk.read_at(n * SECTOR, SECTOR as usize)?;
        if d.len() < SECTOR as usize {
            vol.issues.push("volume descriptors truncated".to_string());
            break;
        }
        match &d[1..6] {
            b"CD001" => {}
            b"BEA01" | b"NSR02" | b"NSR03" | b"TEA01" => {
                if &d[1..6] != b"BEA01" && &d[1..6] != b"TEA01" {
                    vol.udf = true;
                }
                continue;
            }
            _ => break,
        }
        match d[0] {
            0 if d[7..39].starts_with(b"EL TORITO SPECIFICATION") => vol.bootable = true,
            1 => {
                vol.system_id = a_chars(&d[8..40]);
                vol.label = a_chars(&d[40..72]);
                let blocks = le_u32(&d, 80) as u64;
                let block_size = u16::from_le_bytes([d[128], d[129]]) as u64;
                vol.volume_bytes = Some(blocks * block_size);
                primary_root = Some(root_of(&d));
            }
            2 if matches!(&d[88..91], b"%/@" | b"%/C" | b"%/E") => {
                vol.joliet = true;
                if let Some(label) = ucs2_be(&d[40..72]).filter(|l| !l.is_empty()) {
                    vol.label = Some(label);
                }
                joliet_root = Some(root_of(&d));
            }
            255 => break,
            _ => {}
        }
    }

    let (root, joliet) = match (joliet_root, primary_root) {
        (Some(root), _) => (root, true),
        (None, Some(root)) => (root, false),
        (None, None) if vol.udf => {
            vol.issues.push("UDF-only volume: directory tree not read".to_string());
            return Ok(vol);
        }
        (None, None) => bail!("no primary volume descriptor"),
    };
    walk(disk, root, joliet, max_listed, &mut vol)?;
    Ok(vol)
}

fn root_of(descriptor: &[u8]) -> Root {
    let rec = &descriptor[156..190];
    Root { extent: le_u32(rec, 2), size: le_u32(rec, 10) }
}

fn walk<R: Read + Seek>(disk: &mut Disk<R>, root: Root, joliet: bool, max_listed: usize, vol: &mut IsoVolume) -> Result<()> {
    let mut queue = VecDeque::from([(root, String::new())]);
    let mut visited = HashSet::new();
    while let Some((dir, prefix)) = queue.pop_front() {
        if !visited.insert(dir.extent) {
            continue;
        }
        if visited.len() > MAX_DIRECTORIES {
            vol.issues.push(format!("directory walk stopped after {MAX_DIRECTORIES} directories"));
            break;
        }
        let data = disk.read_at(dir.extent as u64 * SECTOR, dir.size.min(MAX_DIRECTORY_BYTES) as usize)?;
        if data.len() < dir.size.min(MAX_DIRECTORY_BYTES) as usize {
            debug!("directory at extent {} runs past end of image", dir.extent);
            vol.issues.push("directory extent past end of image".to_string());
        }

        let mut i = 0;
        while i < data.len() {
            let len = data[i] as usize;
            if len == 0 {
                // records never straddle a sector; the rest of this one is padding
                i = (i / SECTOR as usize + 1) * SECTOR as usize;
                continue;
            }
            let Some(rec) = data.get(i..i + len).filter(|r| r.len() >= 33) else {
                break;
            };
            i += len;

            let name_len = rec[32] as usize;
            let Some(raw_name) = rec.get(33..33 + name_len) else { continue };
            if raw_name == [0] || raw_name == [1] {
                continue;
            }
            let name = if joliet {
                ucs2_be(raw_name).unwrap_or_default()
            } else {
                String::from_utf8_lossy(raw_name).into_owned()
            };
            let name = strip_version(&name);
            let path = format!("{prefix}/{name}");
            let entry = Root { extent: le_u32(rec, 2), size: le_u32(rec, 10) };
            if rec[25] & 0x02 != 0 {
                queue.push_back((entry, path));
            } else {
                vol.file_count += 1;
                if vol.files.len() < max_listed {
                    vol.files.push(path);
                }
            }
        }
    }
    Ok(())
}

/// `README.TXT;1` → `README.TXT`, `NOEXT.;1` → `NOEXT`.
fn strip_version(name: &str) -> String {
    let base = name.split(';').next().unwrap_or(name);
    base.strip_suffix('.').unwrap_or(base).to_string()
}

fn a_chars(raw: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(raw).trim_end_matches([' ', '\0']).to_string();
    (!s.is_empty()).then_some(s)
}

fn ucs2_be(raw: &[u8]) -> Option<String> {
    let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    let s = String::from_utf16(&units).ok()?;
    Some(s.trim_end_matches([' ', '\0']).to_string())
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

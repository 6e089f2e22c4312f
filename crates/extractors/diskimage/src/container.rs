//! Virtual disk containers identified by their header or footer signature.

/// What a container header says about the disk it wraps.
#[derive(Debug, PartialEq)]
pub(crate) struct Container {
    pub(crate) format: &'static str,
    pub(crate) virtual_size: Option<u64>,
    pub(crate) details: Vec<String>,
    /// Offset of raw sector 0 when the container stores the disk unencoded.
    pub(crate) raw_offset: Option<u64>,
}

impl Container {
    fn new(format: &'static str) -> Self {
        Self { format, virtual_size: None, details: Vec::new(), raw_offset: None }
    }
}

/// `head` is the first 1 KiB of the file, `tail` the last 512 bytes.
pub(crate) fn identify(head: &[u8], tail: &[u8]) -> Option<Container> {
    if head.starts_with(b"KDMV") {
        return Some(vmdk_sparse(head));
    }
    if head.starts_with(b"# Disk DescriptorFile") {
        return Some(vmdk_descriptor(&String::from_utf8_lossy(head)));
    }
    if head.starts_with(b"QFI\xfb") {
        return Some(qcow2(head));
    }
    if head.get(64..68) == Some(&[0x7f, 0x10, 0xda, 0xbe]) {
        return Some(vdi(head));
    }
    if head.starts_with(b"vhdxfile") {
        return Some(vhdx(head));
    }
    if tail.starts_with(b"conectix") {
        return Some(vhd(tail));
    }
    if head.starts_with(b"conectix") {
        return Some(vhd(head));
    }
    if tail.starts_with(b"koly") {
        return Some(dmg(tail));
    }
    None
}

fn vmdk_sparse(h: &[u8]) -> Container {
    let mut c = Container::new("vmdk");
    c.details.push(format!("VMDK sparse extent, version {}", le_u32(h, 4)));
    c.virtual_size = Some(le_u64(h, 12) * 512);
    let desc_offset = le_u64(h, 28) as usize * 512;
    let desc_size = le_u64(h, 36) as usize * 512;
    if desc_offset > 0 && desc_size > 0 {
        if let Some(desc) = h.get(desc_offset..(desc_offset + desc_size).min(h.len())) {
            c.details.extend(descriptor_lines(&String::from_utf8_lossy(desc)));
        }
    }
    c
}

fn vmdk_descriptor(text: &str) -> Container {
    let mut c = Container::new("vmdk");
    c.details.push("VMDK descriptor".to_string());
    c.details.extend(descriptor_lines(text));
    c
}

/// `createType` and extent lines from a VMDK text descriptor.
fn descriptor_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("createType") || l.starts_with("RW ") || l.starts_with("RDONLY "))
        .map(str::to_string)
        .collect()
}

fn qcow2(h: &[u8]) -> Container {
    let mut c = Container::new("qcow2");
    c.details.push(format!("QCOW version {}", be_u32(h, 4)));
    c.virtual_size = Some(be_u64(h, 24));
    if be_u64(h, 8) != 0 {
        c.details.push("backing file present".to_string());
    }
    if be_u32(h, 32) != 0 {
        c.details.push("encrypted".to_string());
    }
    c
}

fn vdi(h: &[u8]) -> Container {
    let mut c = Container::new("vdi");
    let banner = String::from_utf8_lossy(&h[..64]);
    let banner = banner.trim_end_matches(['\0', '\n']).trim();
    if !banner.is_empty() {
        c.details.push(banner.to_string());
    }
    let image_type = match le_u32(h, 76) {
        1 => "dynamic",
        2 => "fixed",
        3 => "undo",
        4 => "differencing",
        _ => "unknown",
    };
    c.details.push(format!("VDI image type: {image_type}"));
    if h.len() >= 376 {
        c.virtual_size = Some(le_u64(h, 368));
    }
    c
}

fn vhdx(h: &[u8]) -> Container {
    let mut c = Container::new("vhdx");
    let creator: Vec<u16> = h
        .get(8..520)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .take_while(|&u| u != 0)
        .collect();
    let creator = String::from_utf16_lossy(&creator);
    if !creator.is_empty() {
        c.details.push(format!("Creator: {creator}"));
    }
    c
}

/// The VHD footer is big-endian; fixed disks are raw data followed by it.
fn vhd(footer: &[u8]) -> Container {
    let mut c = Container::new("vhd");
    if footer.len() < 64 {
        return c;
    }
    let creator = String::from_utf8_lossy(&footer[28..32]).trim().to_string();
    if !creator.is_empty() {
        c.details.push(format!("Creator application: {creator}"));
    }
    c.virtual_size = Some(be_u64(footer, 48));
    let disk_type = match be_u32(footer, 60) {
        2 => "fixed",
        3 => "dynamic",
        4 => "differencing",
        _ => "unknown",
    };
    c.details.push(format!("VHD disk type: {disk_type}"));
    if disk_type == "fixed" {
        c.raw_offset = Some(0);
    }
    c
}

fn dmg(koly: &[u8]) -> Container {
    let mut c = Container::new("dmg");
    c.details.push(format!("UDIF version {}", be_u32(koly, 4)));
    if koly.len() >= 0x1F4 {
        c.virtual_size = Some(be_u64(koly, 0x1EC) * 512);
    }
    c
}

fn le_u32(d: &[u8], at: usize) -> u32 {
    d.get(at..at + 4).map_or(0, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_u64(d: &[u8], at: usize) -> u64 {
    d.get(at..at + 8).map_or(0, |b| {
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        u64::from_le_bytes(a)
    })
}

fn be_u32(d: &[u8], at: usize) -> u32 {
    d.get(at..at + 4).map_or(0, |b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn be_u64(d: &[u8], at: usize) -> u64 {
    d.get(at..at + 8).map_or(0, |b| {
        let mut a = [0u8; 8];
        a.copy_from_slice(b);
        u64::from_be_bytes(a)
    })
}

//! Disk and optical images: ISO 9660 volumes, raw disks with MBR/GPT
//! partition tables, and virtual disk containers (VMDK, QCOW2, VDI, VHD,
//! VHDX, DMG).
//!
//! Images can be many gigabytes, so nothing here reads a whole file; every
//! structure is fetched by offset through [`Disk::read_at`].

mod container;
mod iso9660;
mod partition;

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use casefile_extract_types::records::DiskImageMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, TypeRecord,
};
use tracing::debug;

use container::Container;
use iso9660::IsoVolume;
use partition::Layout;

pub struct DiskImageExtractor;

impl Extractor for DiskImageExtractor {
    fn family(&self) -> Family {
        Family::DiskImage
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(
            lower_ext(path).as_str(),
            "iso" | "img" | "vhd" | "vhdx" | "vmdk" | "dmg" | "qcow2" | "qcow" | "vdi" | "raw" | "dd"
        )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        let mut disk = match open(path) {
            Ok(d) => d,
            Err(reason) => return ExtractOutcome::Failure(reason),
        };
        match analyse(&mut disk, &lower_ext(path), cfg.max_listed_entries) {
            Ok(a) => {
                let record = TypeRecord::new(FamilyMeta::DiskImage(a.meta))
                    .with_mime(a.mime)
                    .with_excerpts(Excerpts::from_text(&a.excerpt));
                ExtractOutcome::from_issues(record, a.issues)
            }
            Err(e) => ExtractOutcome::Failure(format!("{e:#}")),
        }
    }
}

/// Random access over an image with a known length.
pub(crate) struct Disk<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> Disk<R> {
    pub(crate) fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Up to `len` bytes at `offset`; short or empty past the end.
    pub(crate) fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        if offset >= self.len {
            return Ok(Vec::new());
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        let want = (len as u64).min(self.len - offset);
        let mut buf = Vec::with_capacity(want as usize);
        (&mut self.inner).take(want).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

fn open(path: &Path) -> Result<Disk<File>, String> {
    let meta = std::fs::metadata(path).map_err(|e| format!("cannot stat {}: {e}", path.display()))?;
    if !meta.is_file() {
        return Err(format!("{} is not a regular file", path.display()));
    }
    File::open(path)
        .and_then(Disk::new)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))
}

struct Analysis {
    meta: DiskImageMeta,
    excerpt: String,
    mime: &'static str,
    issues: Vec<String>,
}

fn analyse<R: Read + Seek>(disk: &mut Disk<R>, ext: &str, max_listed: usize) -> Result<Analysis> {
    let head = disk.read_at(0, 4096).context("reading image header")?;
    let tail = disk.read_at(disk.len().saturating_sub(512), 512).context("reading image footer")?;

    if let Some(c) = container::identify(&head, &tail) {
        debug!("container format {}", c.format);
        return from_container(disk, c);
    }
    if iso9660::probe(disk)? {
        let vol = iso9660::read(disk, max_listed).context("reading ISO 9660 volume")?;
        let layout = partition::inspect(disk, 0)?;
        return Ok(from_iso(disk.len(), vol, layout));
    }
    from_raw(disk, ext)
}

fn from_iso(size: u64, vol: IsoVolume, layout: Layout) -> Analysis {
    let mut filesystems = vec!["iso9660"];
    if vol.joliet {
        filesystems.push("joliet");
    }
    if vol.udf {
        filesystems.push("udf");
    }
    filesystems.extend(layout.filesystems());

    let os_guess = vol
        .system_id
        .as_deref()
        .and_then(os_from_identifier)
        .or_else(|| vol.label.as_deref().and_then(os_from_identifier))
        .or_else(|| partition::os_from_filesystems(&filesystems));

    let mut excerpt = format!(
        "LABEL: {}\nFS: {}\nBOOTABLE: {}\n\nFILES:\n{}",
        vol.label.as_deref().unwrap_or("Unknown"),
        vol.filesystem_label(),
        yes_no(vol.bootable || layout.bootable()),
        vol.files.join("\n"),
    );
    let unlisted = vol.file_count.saturating_sub(vol.files.len() as u64);
    if unlisted > 0 {
        excerpt.push_str(&format!("\n... ({unlisted} more)"));
    }

    Analysis {
        meta: DiskImageMeta {
            disk_image_format: Some("iso".to_string()),
            size_bytes: Some(size),
            is_bootable: Some(vol.bootable || layout.bootable()),
            partition_count: Some(layout.partitions.len() as u32),
            filesystem_types: Some(filesystems.join(",")),
            has_mbr: Some(layout.has_mbr),
            has_gpt: Some(layout.has_gpt),
            os_guess: os_guess.map(str::to_string),
            volume_label: vol.label,
            file_count: Some(vol.file_count),
        },
        excerpt,
        mime: mime_for("iso"),
        issues: vol.issues,
    }
}

fn from_container<R: Read + Seek>(disk: &mut Disk<R>, c: Container) -> Result<Analysis> {
    let layout = match c.raw_offset {
        Some(offset) => Some(partition::inspect(disk, offset)?),
        None => None,
    };
    let mut lines = vec![format!("FORMAT: {}", c.format.to_uppercase()), format!("SIZE: {} bytes", disk.len())];
    if let Some(v) = c.virtual_size {
        lines.push(format!("VIRTUAL SIZE: {v} bytes"));
    }
    lines.extend(c.details.iter().cloned());

    let mut meta = DiskImageMeta {
        disk_image_format: Some(c.format.to_string()),
        size_bytes: Some(disk.len()),
        ..Default::default()
    };
    if let Some(layout) = &layout {
        apply_layout(&mut meta, layout);
        lines.extend(partition_lines(layout));
    }
    Ok(Analysis { meta, excerpt: lines.join("\n"), mime: mime_for(c.format), issues: Vec::new() })
}

fn from_raw<R: Read + Seek>(disk: &mut Disk<R>, ext: &str) -> Result<Analysis> {
    let layout = partition::inspect(disk, 0)?;
    let mut issues = Vec::new();
    let format = match ext {
        "iso" | "vhd" | "vhdx" | "vmdk" | "dmg" | "qcow2" | "vdi" => {
            issues.push(format!("no {} signature found", ext.to_uppercase()));
            ext
        }
        "qcow" => "qcow2",
        _ => "raw_img",
    };
    if layout.is_empty() {
        issues.push("no partition table or filesystem recognised".to_string());
    }

    let mut meta = DiskImageMeta {
        disk_image_format: Some(format.to_string()),
        size_bytes: Some(disk.len()),
        ..Default::default()
    };
    apply_layout(&mut meta, &layout);

    let mut lines = vec![format!("FORMAT: {}", format.to_uppercase()), format!("SIZE: {} bytes", disk.len())];
    lines.extend(partition_lines(&layout));
    Ok(Analysis { meta, excerpt: lines.join("\n"), mime: mime_for(format), issues })
}

fn apply_layout(meta: &mut DiskImageMeta, layout: &Layout) {
    let filesystems = layout.filesystems();
    meta.is_bootable = Some(layout.bootable());
    meta.partition_count = Some(layout.partitions.len() as u32);
    meta.has_mbr = Some(layout.has_mbr);
    meta.has_gpt = Some(layout.has_gpt);
    meta.os_guess = partition::os_from_filesystems(&filesystems).map(str::to_string);
    if !filesystems.is_empty() {
        meta.filesystem_types = Some(filesystems.join(","));
    }
}

fn partition_lines(layout: &Layout) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(fs) = layout.whole_disk_fs {
        lines.push(format!("FILESYSTEM: {fs} (no partition table)"));
    }
    if layout.partitions.is_empty() {
        return lines;
    }
    let scheme = if layout.has_gpt { "GPT" } else { "MBR" };
    lines.push(format!("PARTITIONS ({scheme}):"));
    for p in &layout.partitions {
        lines.push(format!(
            "  #{} {} start={} sectors={} fs={}{}",
            p.index,
            p.kind,
            p.start_lba,
            p.sectors,
            p.filesystem.unwrap_or("unknown"),
            if p.bootable { " [boot]" } else { "" }
        ));
    }
    lines
}

fn os_from_identifier(id: &str) -> Option<&'static str> {
    let id = id.to_ascii_uppercase();
    if ["LINUX", "UBUNTU", "DEBIAN", "FEDORA", "CENTOS", "KALI"].iter().any(|k| id.contains(k)) {
        Some("Linux")
    } else if ["WIN", "CCCOMA", "CCSA", "CPBA"].iter().any(|k| id.contains(k)) {
        Some("Windows")
    } else if id.contains("APPLE") || id.contains("MAC OS") {
        Some("macOS")
    } else {
        None
    }
}

fn mime_for(format: &str) -> &'static str {
    match format {
        "iso" => "application/x-iso9660-image",
        "vmdk" => "application/x-virtualbox-vmdk",
        "vdi" => "application/x-virtualbox-vdi",
        "qcow2" => "application/x-qemu-disk",
        "dmg" => "application/x-apple-diskimage",
        "vhd" => "application/x-vhd",
        "vhdx" => "application/x-vhdx",
        _ => "application/x-raw-disk-image",
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

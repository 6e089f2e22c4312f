//! Per-family metadata records.
//!
//! Field names are the column names of the matching table; the store turns a
//! record into an `INSERT OR REPLACE` by serializing it.  Every field is
//! optional so that a degraded extraction can leave what it could not read
//! as NULL.

use serde::Serialize;
use serde_json::Value;

use crate::{Excerpts, Family};

/// One extractor's output for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRecord {
    /// MIME type the extractor settled on; written to `file.mime_detected`.
    pub mime: Option<String>,
    #[serde(flatten)]
    pub excerpts: Excerpts,
    pub meta: FamilyMeta,
}

impl TypeRecord {
    pub fn new(meta: FamilyMeta) -> Self {
        Self { mime: None, excerpts: Excerpts::default(), meta }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_excerpts(mut self, excerpts: Excerpts) -> Self {
        self.excerpts = excerpts;
        self
    }

    pub fn family(&self) -> Family {
        self.meta.family()
    }

    /// Column/value pairs for the family table, excerpts included, in
    /// declaration order.
    pub fn columns(&self) -> serde_json::Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for v in [serde_json::to_value(&self.meta)?, serde_json::to_value(&self.excerpts)?] {
            if let Value::Object(map) = v {
                out.extend(map);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FamilyMeta {
    Image(ImageMeta),
    Audio(AudioMeta),
    Video(VideoMeta),
    Office(OfficeMeta),
    Pdf(PdfMeta),
    Text(TextMeta),
    Archive(ArchiveMeta),
    Executable(ExeMeta),
    Code(CodeMeta),
    Tabular(TabularMeta),
    Database(DatabaseMeta),
    Model3d(Model3dMeta),
    DiskImage(DiskImageMeta),
}

impl FamilyMeta {
    pub fn family(&self) -> Family {
        match self {
            FamilyMeta::Image(_) => Family::Image,
            FamilyMeta::Audio(_) => Family::Audio,
            FamilyMeta::Video(_) => Family::Video,
            FamilyMeta::Office(_) => Family::Office,
            FamilyMeta::Pdf(_) => Family::Pdf,
            FamilyMeta::Text(_) => Family::Text,
            FamilyMeta::Archive(_) => Family::Archive,
            FamilyMeta::Executable(_) => Family::Executable,
            FamilyMeta::Code(_) => Family::Code,
            FamilyMeta::Tabular(_) => Family::Tabular,
            FamilyMeta::Database(_) => Family::Database,
            FamilyMeta::Model3d(_) => Family::Model3d,
            FamilyMeta::DiskImage(_) => Family::DiskImage,
        }
    }
}

// ── Image ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageMeta {
    /// "raster" or "vector".
    pub image_type: Option<String>,
    pub format: Option<String>,
    pub width_px: Option<u32>,
    pub height_px: Option<u32>,
    pub dpi_x: Option<f64>,
    pub dpi_y: Option<f64>,
    pub bits_per_pixel: Option<u32>,
    pub color_space: Option<String>,
    pub has_alpha: Option<bool>,
    /// EXIF orientation, 1..=8.
    pub orientation: Option<u32>,
    pub has_embedded_thumbnail: Option<bool>,
    pub exif_datetime_original: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_model: Option<String>,
    pub focal_length_mm: Option<f64>,
    pub aperture_f: Option<f64>,
    pub exposure_time_s: Option<f64>,
    pub iso: Option<u32>,
    pub flash_used: Option<bool>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub gps_alt: Option<f64>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub copyright: Option<String>,
    pub software: Option<String>,
}

// ── Audio / Video ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioMeta {
    pub container_format: Option<String>,
    pub audio_codec: Option<String>,
    pub duration_sec: Option<f64>,
    pub bitrate_kbps: Option<f64>,
    pub sample_rate_hz: Option<u32>,
    pub channels: Option<u32>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub track_total: Option<u32>,
    pub disc_number: Option<u32>,
    pub disc_total: Option<u32>,
    pub year: Option<i32>,
    pub date: Option<String>,
    pub has_lyrics: Option<bool>,
    pub has_cover: Option<bool>,
    pub copyright: Option<String>,
    pub publisher: Option<String>,
    pub encoder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoMeta {
    pub container_format: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub duration_sec: Option<f64>,
    pub width_px: Option<u32>,
    pub height_px: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub creation_time: Option<String>,
    pub encoder: Option<String>,
}

// ── Documents ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OfficeMeta {
    /// "word", "excel", "powerpoint", "rtf" or "ebook".
    pub office_type: Option<String>,
    pub page_count: Option<u32>,
    pub slide_count: Option<u32>,
    pub sheet_count: Option<u32>,
    pub word_count: Option<u64>,
    pub char_count: Option<u64>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub author: Option<String>,
    pub last_modified_by: Option<String>,
    pub company: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub printed_at: Option<String>,
    pub revision_number: Option<String>,
    pub has_macros: Option<bool>,
    pub template_name: Option<String>,
    pub total_editing_time_sec: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PdfMeta {
    pub page_count: Option<u32>,
    pub has_text: Option<bool>,
    pub has_images: Option<bool>,
    pub has_forms: Option<bool>,
    pub has_signatures: Option<bool>,
    pub is_encrypted: Option<bool>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub pdf_version: Option<String>,
    pub pdf_conformance: Option<String>,
    /// Set when the document has images but no extractable text layer.
    #[serde(rename = "is_llavaocr_req")]
    pub is_ocr_required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextMeta {
    pub encoding: Option<String>,
    pub has_bom: Option<bool>,
    pub line_count: Option<u64>,
    pub word_count: Option<u64>,
    pub char_count: Option<u64>,
    pub avg_line_length: Option<f64>,
    pub detected_text_type: Option<String>,
    pub is_json_valid: Option<bool>,
    pub is_xml_valid: Option<bool>,
    pub is_yaml_valid: Option<bool>,
    pub has_urls: Option<bool>,
    pub has_emails: Option<bool>,
    pub has_ips: Option<bool>,
    pub has_secrets: Option<bool>,
    pub license_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodeMeta {
    pub language: Option<String>,
    pub encoding: Option<String>,
    pub lines_total: Option<u64>,
    pub lines_code: Option<u64>,
    pub lines_comment: Option<u64>,
    pub lines_empty: Option<u64>,
    pub comment_ratio: Option<f64>,
    pub function_count: Option<u64>,
    pub class_count: Option<u64>,
    pub import_count: Option<u64>,
    pub todo_count: Option<u64>,
    pub has_tests: Option<bool>,
    pub has_main_entrypoint: Option<bool>,
    pub license_name: Option<String>,
    /// "spaces" or "tabs".
    pub indent_style: Option<String>,
    pub indent_size: Option<u32>,
    pub has_secrets: Option<bool>,
}

// ── Containers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveMeta {
    pub archive_format: Option<String>,
    /// Size of the archive file on disk.
    pub compressed_size: Option<u64>,
    pub total_uncompressed_size: Option<u64>,
    /// `total_uncompressed_size / compressed_size`, two decimals.
    pub compression_ratio: Option<f64>,
    pub file_count: Option<u64>,
    pub dir_count: Option<u64>,
    pub largest_file_size: Option<u64>,
    pub has_executables: Option<bool>,
    pub is_encrypted: Option<bool>,
    pub is_solid: Option<bool>,
    pub is_multivolume: Option<bool>,
    pub oldest_entry_time: Option<String>,
    pub newest_entry_time: Option<String>,
    pub top_level_entry_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskImageMeta {
    pub disk_image_format: Option<String>,
    pub size_bytes: Option<u64>,
    pub is_bootable: Option<bool>,
    pub partition_count: Option<u32>,
    /// Comma separated, e.g. "iso9660,fat32".
    pub filesystem_types: Option<String>,
    pub has_mbr: Option<bool>,
    pub has_gpt: Option<bool>,
    pub os_guess: Option<String>,
    pub volume_label: Option<String>,
    pub file_count: Option<u64>,
}

// ── Binaries ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExeMeta {
    /// "pe", "elf", "macho".
    pub exe_format: Option<String>,
    pub architecture: Option<String>,
    pub compile_timestamp: Option<String>,
    pub entry_point: Option<String>,
    pub subsystem: Option<String>,
    pub is_signed: Option<bool>,
    pub section_count: Option<u32>,
    pub import_count: Option<u32>,
    pub export_count: Option<u32>,
}

// ── Data ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularMeta {
    pub data_format: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub has_header: Option<bool>,
    pub row_count: Option<u64>,
    pub column_count: Option<u32>,
    pub numeric_col_count: Option<u32>,
    pub text_col_count: Option<u32>,
    pub has_missing_values: Option<bool>,
    pub missing_value_ratio: Option<f64>,
    pub has_duplicate_rows: Option<bool>,
    pub sheet_count: Option<u32>,
    /// Comma separated header names.
    pub column_names: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseMeta {
    pub engine: Option<String>,
    pub schema_version: Option<String>,
    pub table_count: Option<u32>,
    pub view_count: Option<u32>,
    pub index_count: Option<u32>,
    pub trigger_count: Option<u32>,
    pub row_count_estimate: Option<u64>,
    pub largest_table_name: Option<String>,
    pub largest_table_row_count: Option<u64>,
    pub has_foreign_keys: Option<bool>,
    pub is_encrypted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Model3dMeta {
    pub format: Option<String>,
    pub is_binary: Option<bool>,
    pub mesh_count: Option<u64>,
    pub vertex_count: Option<u64>,
    pub face_count: Option<u64>,
    pub material_count: Option<u64>,
    pub texture_count: Option<u64>,
    pub has_animations: Option<bool>,
    pub has_cameras: Option<bool>,
    pub has_lights: Option<bool>,
    pub bbox_min_x: Option<f64>,
    pub bbox_min_y: Option<f64>,
    pub bbox_min_z: Option<f64>,
    pub bbox_max_x: Option<f64>,
    pub bbox_max_y: Option<f64>,
    pub bbox_max_z: Option<f64>,
    pub author: Option<String>,
    pub tool: Option<String>,
}

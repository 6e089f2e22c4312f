//! Contract shared by every metadata extractor and by the code that routes
//! files to them and persists what they return.

mod capability;
mod excerpt;
pub mod records;
mod source;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use capability::Capabilities;
pub use excerpt::{Excerpts, FULL_LIMIT, HUNDRED_LIMIT, THOUSAND_LIMIT};
pub use records::{FamilyMeta, TypeRecord};
pub use source::Source;

// ── Families ──────────────────────────────────────────────────────────────────

/// Format family an extractor is responsible for.  Each family owns exactly
/// one metadata table in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Image,
    Audio,
    Video,
    Office,
    Pdf,
    Text,
    Archive,
    Executable,
    Code,
    Tabular,
    Database,
    Model3d,
    DiskImage,
}

impl Family {
    pub const ALL: [Family; 13] = [
        Family::Image,
        Family::Audio,
        Family::Video,
        Family::Office,
        Family::Pdf,
        Family::Text,
        Family::Archive,
        Family::Executable,
        Family::Code,
        Family::Tabular,
        Family::Database,
        Family::Model3d,
        Family::DiskImage,
    ];

    /// Short name written to `file.ext_family` and to the run log.
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Image => "image",
            Family::Audio => "audio",
            Family::Video => "video",
            Family::Office => "office",
            Family::Pdf => "pdf",
            Family::Text => "text",
            Family::Archive => "archive",
            Family::Executable => "executable",
            Family::Code => "code",
            Family::Tabular => "tabular",
            Family::Database => "database",
            Family::Model3d => "3d",
            Family::DiskImage => "disk_image",
        }
    }

    /// Name of the per-family metadata table.
    pub fn table(self) -> &'static str {
        match self {
            Family::Image => "file_image_metadata",
            Family::Audio => "file_audio_metadata",
            Family::Video => "file_video_metadata",
            Family::Office => "file_office_metadata",
            Family::Pdf => "file_pdf_metadata",
            Family::Text => "file_text_metadata",
            Family::Archive => "file_archive_metadata",
            Family::Executable => "file_exe_metadata",
            Family::Code => "file_code_metadata",
            Family::Tabular => "file_data_metadata",
            Family::Database => "file_database_metadata",
            Family::Model3d => "file_3d_metadata",
            Family::DiskImage => "file_disk_image_metadata",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of running one extractor over one file.
///
/// A malformed or partially unreadable file is still a result: the extractor
/// returns `PartialSuccess` with whatever fields it could fill and a reason.
/// `Failure` is reserved for conditions where no record can be produced at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Success(TypeRecord),
    PartialSuccess(TypeRecord, String),
    Failure(String),
}

impl ExtractOutcome {
    /// Builds `Success` when `issues` is empty, otherwise `PartialSuccess`
    /// with the issues joined into one reason.
    pub fn from_issues(record: TypeRecord, issues: Vec<String>) -> Self {
        if issues.is_empty() {
            ExtractOutcome::Success(record)
        } else {
            ExtractOutcome::PartialSuccess(record, issues.join("; "))
        }
    }

    pub fn record(&self) -> Option<&TypeRecord> {
        match self {
            ExtractOutcome::Success(r) | ExtractOutcome::PartialSuccess(r, _) => Some(r),
            ExtractOutcome::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExtractOutcome::Failure(_))
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Settings threaded into every extractor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Optional-dependency availability, resolved once at startup.
    pub capabilities: Capabilities,
    /// Text-bearing files larger than this are read only up to this many
    /// bytes when building excerpts and statistics.
    pub max_text_bytes: u64,
    /// Upper bound on archive entries listed into the excerpt.
    pub max_listed_entries: usize,
    /// Formats that must be parsed from memory (PDF, PE, text meshes) read
    /// at most this many bytes; larger files get a partial record.
    pub max_parse_bytes: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::all(),
            max_text_bytes: 16 * 1024 * 1024,
            max_listed_entries: 2000,
            max_parse_bytes: 256 * 1024 * 1024,
        }
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Implemented once per format family.
pub trait Extractor: Send + Sync {
    fn family(&self) -> Family;

    /// Whether this extractor claims the file by its extension.  Routing
    /// normally decides this; `accepts` is the fallback used by the debug
    /// CLI when a file is passed directly.
    fn accepts(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome;
}

/// Lowercased extension of `path` without the dot, or "" when absent.
pub fn lower_ext(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

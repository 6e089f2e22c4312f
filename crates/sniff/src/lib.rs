//! Content-based file type detection.
//!
//! [`sniff`] looks at the first bytes of a file (and, for ZIP containers, at
//! the archive's member names) and proposes the extension the file *really*
//! has, regardless of what its name says.  Detection runs in a fixed order:
//!
//!   ZIP container inspection → content-sniffing library → built-in magic table
//!
//! and returns the first answer.  Nothing here ever fails: unreadable
//! containers and unknown signatures degrade to a descriptive result.

mod container;
mod magic;
mod mime;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use casefile_extract_types::Capabilities;

pub use container::zip_subtype;
pub use mime::extension_for_mime;

/// Bytes read from the start of a file for detection.
pub const PREFIX_LEN: usize = 4096;

/// Whether this build carries the content-sniffing library.
pub const CONTENT_SNIFFING_AVAILABLE: bool = cfg!(feature = "sniff");

/// Detection result.
///
/// `extension` is lowercase with a leading dot (".pdf"), the empty string for
/// native executables whose extension is conventionally absent (ELF, Mach-O),
/// or `None` when the format is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sniffed {
    pub extension: Option<String>,
    pub description: String,
}

impl Sniffed {
    pub(crate) fn new(ext: &str, description: &str) -> Self {
        Self { extension: Some(ext.to_string()), description: description.to_string() }
    }

    pub(crate) fn unknown() -> Self {
        Self { extension: None, description: "Unknown or unsupported format".into() }
    }
}

/// Detect the type of a file from its leading bytes.
///
/// `container` is the path of the file the prefix was read from; it lets
/// ZIP-based formats be told apart by their member names.  Pass `None` when
/// only bytes are available.
pub fn sniff(prefix: &[u8], container: Option<&Path>, caps: &Capabilities) -> Sniffed {
    if container::is_zip_signature(prefix) {
        if let Some(path) = container {
            return zip_subtype(path);
        }
    }

    if caps.content_sniffing {
        if let Some(found) = mime::sniff_with_library(prefix, container) {
            return found;
        }
    }

    magic::sniff_manual(prefix)
}

/// Read at most [`PREFIX_LEN`] bytes from the start of `path`.
pub fn read_prefix(path: &Path) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(PREFIX_LEN);
    File::open(path)?.take(PREFIX_LEN as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// [`read_prefix`] followed by [`sniff`] with the file as container.
pub fn sniff_path(path: &Path, caps: &Capabilities) -> io::Result<Sniffed> {
    let prefix = read_prefix(path)?;
    Ok(sniff(&prefix, Some(path), caps))
}

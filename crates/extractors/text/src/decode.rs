use std::path::Path;

use tracing::debug;

use casefile_extract_types::Source;

/// A text file read into memory, at most `max_bytes` of it.
#[derive(Debug)]
pub struct Decoded {
    pub text: String,
    /// "utf-8", "utf-8-sig", "utf-16le", "utf-16be" or "latin-1".
    pub encoding: &'static str,
    pub has_bom: bool,
    /// Only a prefix of the file was read.
    pub truncated: bool,
    /// `content_inspector` judged the bytes to be binary.
    pub looks_binary: bool,
}

/// `Err` carries the reason the file could not be read at all.
pub fn read_text(path: &Path, max_bytes: u64) -> Result<Decoded, String> {
    let mut src = Source::open(path)?;
    let bytes = src.head(max_bytes)?;
    let truncated = src.len() > bytes.len() as u64;
    if truncated {
        debug!("{}: read {} of {} bytes", path.display(), bytes.len(), src.len());
    }
    Ok(decode(&bytes, truncated))
}

pub fn decode(bytes: &[u8], truncated: bool) -> Decoded {
    let sample = &bytes[..bytes.len().min(8192)];
    let looks_binary = content_inspector::inspect(sample).is_binary();

    let (text, encoding, has_bom) = if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        (utf8_prefix(rest, truncated), "utf-8-sig", true)
    } else if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        (utf16(rest, u16::from_le_bytes), "utf-16le", true)
    } else if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        (utf16(rest, u16::from_be_bytes), "utf-16be", true)
    } else {
        match std::str::from_utf8(bytes) {
            Ok(s) => (s.to_string(), "utf-8", false),
            // A cut in the middle of a multi-byte sequence at the read limit.
            Err(e) if truncated && e.error_len().is_none() => {
                (String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned(), "utf-8", false)
            }
            Err(_) => (bytes.iter().map(|&b| char::from(b)).collect(), "latin-1", false),
        }
    };

    Decoded { text, encoding, has_bom, truncated, looks_binary }
}

fn utf8_prefix(bytes: &[u8], truncated: bool) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) if truncated && e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn utf16(bytes: &[u8], to_u16: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| to_u16([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}

use serde::{Deserialize, Serialize};

/// Which optional parsing dependencies are usable in this process.
///
/// Resolved once at startup from compiled cargo features combined with the
/// `[capabilities]` config section, then passed down by value.  Extractors
/// consult the relevant flag and degrade to fewer fields when it is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Library-backed content sniffing (`infer`).
    pub content_sniffing: bool,
    /// Full PDF text extraction (`pdf-extract`).
    pub pdf_text: bool,
    /// EXIF parsing for images.
    pub exif: bool,
    /// PE header and import/export table parsing.
    pub pe_parsing: bool,
    /// 7-Zip archive listing.
    pub archive_7z: bool,
    /// Opening SQLite databases read-only to count schema objects.
    pub sqlite_inspection: bool,
}

impl Capabilities {
    pub const fn all() -> Self {
        Self {
            content_sniffing: true,
            pdf_text: true,
            exif: true,
            pe_parsing: true,
            archive_7z: true,
            sqlite_inspection: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            content_sniffing: false,
            pdf_text: false,
            exif: false,
            pe_parsing: false,
            archive_7z: false,
            sqlite_inspection: false,
        }
    }

    /// Flags that are on in both `self` and `other`.
    pub fn intersect(self, other: Capabilities) -> Self {
        Self {
            content_sniffing: self.content_sniffing && other.content_sniffing,
            pdf_text: self.pdf_text && other.pdf_text,
            exif: self.exif && other.exif,
            pe_parsing: self.pe_parsing && other.pe_parsing,
            archive_7z: self.archive_7z && other.archive_7z,
            sqlite_inspection: self.sqlite_inspection && other.sqlite_inspection,
        }
    }

    /// `(name, enabled)` pairs, for startup logging.
    pub fn describe(&self) -> [(&'static str, bool); 6] {
        [
            ("content_sniffing", self.content_sniffing),
            ("pdf_text", self.pdf_text),
            ("exif", self.exif),
            ("pe_parsing", self.pe_parsing),
            ("archive_7z", self.archive_7z),
            ("sqlite_inspection", self.sqlite_inspection),
        ]
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let mut compiled = Capabilities::all();
        compiled.pdf_text = false;
        let mut configured = Capabilities::all();
        configured.exif = false;
        let caps = compiled.intersect(configured);
        assert!(!caps.pdf_text);
        assert!(!caps.exif);
        assert!(caps.content_sniffing);
        assert_eq!(Capabilities::none().intersect(Capabilities::all()), Capabilities::none());
    }
}

use std::path::Path;

use crate::Sniffed;

/// Extension for a MIME type, from the curated table.  An empty string means
/// "known executable format without a conventional extension".
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        // Images
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/tiff" => ".tif",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "image/vnd.adobe.photoshop" => ".psd",
        "image/heif" | "image/heic" => ".heic",

        // Audio
        "audio/mpeg" => ".mp3",
        "audio/x-wav" | "audio/wav" => ".wav",
        "audio/flac" | "audio/x-flac" => ".flac",
        "audio/ogg" => ".ogg",
        "audio/opus" => ".opus",
        "audio/m4a" | "audio/x-m4a" | "audio/mp4" => ".m4a",
        "audio/aac" => ".aac",

        // Video
        "video/mp4" => ".mp4",
        "video/x-msvideo" => ".avi",
        "video/x-matroska" => ".mkv",
        "video/webm" => ".webm",
        "video/3gpp" => ".3gp",
        "video/quicktime" => ".mov",
        "video/x-flv" => ".flv",

        // Archives
        "application/zip" => ".zip",
        "application/x-7z-compressed" => ".7z",
        "application/x-rar-compressed" | "application/vnd.rar" => ".rar",
        "application/gzip" | "application/x-gzip" => ".gz",
        "application/x-bzip2" => ".bz2",
        "application/x-xz" => ".xz",
        "application/x-lz4" => ".lz4",
        "application/x-tar" => ".tar",
        "application/vnd.ms-cab-compressed" => ".cab",

        // Documents
        "application/pdf" => ".pdf",
        "application/postscript" => ".ps",
        "application/rtf" | "text/rtf" => ".rtf",
        "text/plain" => ".txt",
        "text/html" | "application/xhtml+xml" => ".html",
        "application/xml" | "text/xml" => ".xml",
        "application/json" => ".json",
        "application/x-ole-storage" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => ".pptx",
        "application/vnd.oasis.opendocument.text" => ".odt",
        "application/vnd.oasis.opendocument.spreadsheet" => ".ods",
        "application/vnd.oasis.opendocument.presentation" => ".odp",
        "application/epub+zip" => ".epub",

        // Databases
        "application/vnd.sqlite3" | "application/x-sqlite3" => ".sqlite",

        // Fonts
        "font/ttf" | "application/font-sfnt" => ".ttf",
        "font/otf" => ".otf",
        "font/woff" | "application/font-woff" => ".woff",
        "font/woff2" => ".woff2",

        // Executables
        "application/x-dosexec" | "application/vnd.microsoft.portable-executable" => ".exe",
        "application/x-executable" | "application/x-mach-binary" | "application/x-sharedlib" => "",
        "application/java-vm" | "application/x-java-applet" => ".class",
        "text/x-shellscript" => ".sh",

        _ => return None,
    };
    Some(ext)
}

/// Extension reported by the sniffing library itself, used when the MIME
/// type is not in the curated table.  Only plain alphanumeric tokens are
/// accepted.
pub(crate) fn generic_extension(raw: &str) -> Option<String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let raw = raw.to_ascii_lowercase();
    Some(match raw.as_str() {
        "jpe" | "jpeg" => ".jpg".to_string(),
        _ => format!(".{raw}"),
    })
}

#[cfg(feature = "sniff")]
pub(crate) fn sniff_with_library(prefix: &[u8], container: Option<&Path>) -> Option<Sniffed> {
    let kind = infer::get(prefix)?;
    let mime = kind.mime_type();

    if mime == "application/zip" {
        if let Some(path) = container {
            return Some(crate::zip_subtype(path));
        }
    }

    let ext = match extension_for_mime(mime) {
        Some(e) => e.to_string(),
        None => generic_extension(kind.extension())?,
    };
    Some(Sniffed { extension: Some(ext), description: format!("Detected by content sniffing: {mime}") })
}

#[cfg(not(feature = "sniff"))]
pub(crate) fn sniff_with_library(_prefix: &[u8], _container: Option<&Path>) -> Option<Sniffed> {
    None
}

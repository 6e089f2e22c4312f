use crate::container::is_zip_signature;
use crate::Sniffed;

const MACHO_MAGICS: [&[u8]; 4] = [
    b"\xFE\xED\xFA\xCE",
    b"\xCE\xFA\xED\xFE",
    b"\xFE\xED\xFA\xCF",
    b"\xCF\xFA\xED\xFE",
];

/// Built-in signature table.  Order matters: the more specific prefixes
/// come first and the text heuristics come late.
pub(crate) fn sniff_manual(data: &[u8]) -> Sniffed {
    // ── Archives & compression ────────────────────────────────────────────────
    if is_zip_signature(data) {
        return Sniffed::new(".zip", "Generic ZIP archive");
    }
    if data.starts_with(b"Rar!\x1A\x07\x00") {
        return Sniffed::new(".rar", "RAR archive (v1.5-4.x)");
    }
    if data.starts_with(b"Rar!\x1A\x07\x01\x00") {
        return Sniffed::new(".rar", "RAR archive (v5+)");
    }
    if data.starts_with(b"7z\xBC\xAF\x27\x1C") {
        return Sniffed::new(".7z", "7-Zip archive");
    }
    if data.starts_with(b"\x1F\x8B\x08") {
        return Sniffed::new(".gz", "GZIP compressed file");
    }
    if data.starts_with(b"BZh") {
        return Sniffed::new(".bz2", "BZIP2 compressed file");
    }
    if data.starts_with(b"\xFD7zXZ\x00") {
        return Sniffed::new(".xz", "XZ compressed file");
    }
    if data.starts_with(b"\x04\x22\x4D\x18") {
        return Sniffed::new(".lz4", "LZ4 frame");
    }
    if data.starts_with(b"MSCF") {
        return Sniffed::new(".cab", "Microsoft Cabinet archive");
    }
    if data.get(257..262) == Some(&b"ustar"[..]) {
        return Sniffed::new(".tar", "TAR archive");
    }

    // ── Images ────────────────────────────────────────────────────────────────
    if data.starts_with(b"\xFF\xD8\xFF") {
        return Sniffed::new(".jpg", "JPEG image");
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Sniffed::new(".png", "PNG image");
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Sniffed::new(".gif", "GIF image");
    }
    if data.starts_with(b"BM") {
        return Sniffed::new(".bmp", "BMP bitmap image");
    }
    if data.starts_with(b"II*\x00") {
        return Sniffed::new(".tif", "TIFF image (little-endian)");
    }
    if data.starts_with(b"MM\x00*") || data.starts_with(b"MM\x00+") {
        return Sniffed::new(".tif", "TIFF image (big-endian)");
    }
    if data.starts_with(b"\x00\x00\x01\x00") {
        return Sniffed::new(".ico", "ICO icon (Windows)");
    }
    if data.starts_with(b"\x00\x00\x02\x00") {
        return Sniffed::new(".cur", "CUR cursor (Windows)");
    }
    if data.starts_with(b"8BPS") {
        return Sniffed::new(".psd", "Adobe Photoshop document (PSD)");
    }

    // ── RIFF ──────────────────────────────────────────────────────────────────
    if data.starts_with(b"RIFF") {
        match data.get(8..12) {
            Some(b"WEBP") => return Sniffed::new(".webp", "WebP image"),
            Some(b"WAVE") => return Sniffed::new(".wav", "WAVE audio (RIFF/WAVE)"),
            Some(b"AVI ") => return Sniffed::new(".avi", "AVI video (RIFF/AVI)"),
            _ => {}
        }
    }

    // ── Audio / video ─────────────────────────────────────────────────────────
    if data.starts_with(b"OggS") {
        return Sniffed::new(".ogg", "Ogg container (Vorbis/Opus/etc.)");
    }
    if data.starts_with(b"fLaC") {
        return Sniffed::new(".flac", "FLAC audio");
    }
    if data.starts_with(b"ID3") {
        return Sniffed::new(".mp3", "MP3 audio (ID3v2 tag)");
    }
    if data.starts_with(b"\x1A\x45\xDF\xA3") {
        return Sniffed::new(".mkv", "Matroska/WebM container (MKV/WEBM)");
    }
    if data.get(4..8) == Some(&b"ftyp"[..]) {
        if let Some(brand) = data.get(8..12) {
            return match brand {
                b"isom" | b"mp42" | b"mp41" | b"MSNV" => Sniffed::new(".mp4", "MP4/ISO Base Media file"),
                b"qt  " => Sniffed::new(".mov", "QuickTime movie"),
                b if b.starts_with(b"3gp") => Sniffed::new(".3gp", "3GPP media file"),
                _ => Sniffed::new(".mp4", "ISO Base Media (MP4-like)"),
            };
        }
    }

    // ── Documents & databases ─────────────────────────────────────────────────
    if data.starts_with(b"%PDF-") {
        return Sniffed::new(".pdf", "PDF document");
    }
    if data.starts_with(b"%!PS-") {
        return Sniffed::new(".ps", "PostScript document");
    }
    if data.starts_with(b"{\\rtf") {
        return Sniffed::new(".rtf", "RTF document");
    }
    if data.starts_with(b"SQLite format 3\x00") {
        return Sniffed::new(".sqlite", "SQLite 3 database");
    }

    // Text heuristics, not real signatures.
    let trimmed = trim_ascii_start(data);
    let head: Vec<u8> = trimmed.iter().take(16).map(|b| b.to_ascii_lowercase()).collect();
    if head.starts_with(b"<?xml") {
        return Sniffed::new(".xml", "XML text document");
    }
    if head.starts_with(b"<!doctype html") || head.starts_with(b"<html") {
        return Sniffed::new(".html", "HTML document");
    }
    if head.starts_with(b"{") || head.starts_with(b"[") {
        return Sniffed::new(".json", "JSON text (heuristic)");
    }

    // Compound File Binary: DOC, XLS, PPT, MSG all share it.
    if data.starts_with(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1") {
        return Sniffed::new(".doc", "OLE2 Compound File (DOC/XLS/PPT/etc.)");
    }

    // ── Executables & scripts ─────────────────────────────────────────────────
    if data.starts_with(b"MZ") {
        return Sniffed::new(".exe", "PE executable or library (Windows EXE/DLL/SYS)");
    }
    if data.starts_with(b"\x7FELF") {
        return Sniffed::new("", "ELF executable or shared object (Unix/Linux)");
    }
    if MACHO_MAGICS.iter().any(|m| data.starts_with(m)) {
        return Sniffed::new("", "Mach-O executable (macOS)");
    }
    if data.starts_with(b"\xCA\xFE\xBA\xBE") {
        return Sniffed::new(".class", "Java class file (or Mach-O fat binary)");
    }
    if data.starts_with(b"#!") {
        return Sniffed::new(".sh", "Script with shebang (shell / Python / etc.)");
    }

    // ── Fonts ─────────────────────────────────────────────────────────────────
    if data.starts_with(b"\x00\x01\x00\x00") {
        return Sniffed::new(".ttf", "TrueType font");
    }
    if data.starts_with(b"OTTO") {
        return Sniffed::new(".otf", "OpenType font (CFF)");
    }
    if data.starts_with(b"wOFF") {
        return Sniffed::new(".woff", "WOFF web font");
    }
    if data.starts_with(b"wOF2") {
        return Sniffed::new(".woff2", "WOFF2 web font");
    }

    // ── Captures ──────────────────────────────────────────────────────────────
    if data.starts_with(b"\xD4\xC3\xB2\xA1") || data.starts_with(b"\xA1\xB2\xC3\xD4") {
        return Sniffed::new(".pcap", "PCAP capture file");
    }
    if data.starts_with(b"\x0A\x0D\x0D\x0A") {
        return Sniffed::new(".pcapng", "PCAP-NG capture file");
    }

    Sniffed::unknown()
}

fn trim_ascii_start(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    &data[start..]
}

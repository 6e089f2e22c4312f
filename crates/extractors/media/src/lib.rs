//! Image, audio and video metadata.
//!
//! Three families share this crate because they share container parsing
//! (ISO base media boxes appear in HEIC, M4A and MP4 alike).  Each family
//! gets its own [`Extractor`] so the router can register them separately.

mod audio;
mod image;
mod isobmff;
mod video;

use std::path::Path;

use casefile_extract_types::{
    lower_ext, ExtractOutcome, Extractor, ExtractorConfig, Family,
};

pub use audio::extract_audio;
pub use image::{extract_image, extract_image_file};
pub use video::extract_video;

pub struct ImageExtractor;
pub struct AudioExtractor;
pub struct VideoExtractor;

impl Extractor for ImageExtractor {
    fn family(&self) -> Family {
        Family::Image
    }

    fn accepts(&self, path: &Path) -> bool {
        is_image_ext(&lower_ext(path))
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_image_file(path, cfg)
    }
}

impl Extractor for AudioExtractor {
    fn family(&self) -> Family {
        Family::Audio
    }

    fn accepts(&self, path: &Path) -> bool {
        is_audio_ext(&lower_ext(path))
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_audio(path, cfg)
    }
}

impl Extractor for VideoExtractor {
    fn family(&self) -> Family {
        Family::Video
    }

    fn accepts(&self, path: &Path) -> bool {
        is_video_ext(&lower_ext(path))
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        extract_video(path, cfg)
    }
}

/// Check if a file is a media file based on extension.
pub fn accepts(path: &Path) -> bool {
    let ext = lower_ext(path);
    is_image_ext(&ext) || is_audio_ext(&ext) || is_video_ext(&ext)
}

pub fn is_image_ext(ext: &str) -> bool {
    matches!(
        ext,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tiff" | "tif" | "webp"
        | "ico" | "svg" | "xcf" | "heic" | "heif"
    )
}

pub fn is_audio_ext(ext: &str) -> bool {
    matches!(
        ext,
        "mp3" | "wav" | "flac" | "ogg" | "m4a" | "aac" | "wma" | "opus"
    )
}

pub fn is_video_ext(ext: &str) -> bool {
    matches!(
        ext,
        "mp4" | "mkv" | "avi" | "mov" | "webm" | "flv" | "m4v" | "wmv" | "mpg" | "mpeg" | "3gp"
    )
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn be_u16(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(b.get(at..at + 2)?.try_into().ok()?))
}

fn be_u32(b: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(b.get(at..at + 4)?.try_into().ok()?))
}

fn be_u64(b: &[u8], at: usize) -> Option<u64> {
    Some(u64::from_be_bytes(b.get(at..at + 8)?.try_into().ok()?))
}

fn le_u16(b: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(b.get(at..at + 2)?.try_into().ok()?))
}

fn le_u32(b: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(b.get(at..at + 4)?.try_into().ok()?))
}

/// Round to two decimals.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Leading four-digit year of a free-form date tag.
fn year_of(date: &str) -> Option<i32> {
    let head = date.trim().get(..4)?;
    if head.bytes().all(|b| b.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts() {
        assert!(accepts(Path::new("a/IMG_0001.JPG")));
        assert!(accepts(Path::new("song.flac")));
        assert!(accepts(Path::new("clip.mkv")));
        assert!(!accepts(Path::new("notes.txt")));
        assert!(!accepts(Path::new("Makefile")));
    }

    #[test]
    fn test_families() {
        assert_eq!(ImageExtractor.family(), Family::Image);
        assert_eq!(AudioExtractor.family(), Family::Audio);
        assert_eq!(VideoExtractor.family(), Family::Video);
        assert!(AudioExtractor.accepts(Path::new("x.ogg")));
        assert!(!VideoExtractor.accepts(Path::new("x.ogg")));
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2019-04-01"), Some(2019));
        assert_eq!(year_of(" 1987"), Some(1987));
        assert_eq!(year_of("April"), None);
        assert_eq!(year_of("19"), None);
    }
}

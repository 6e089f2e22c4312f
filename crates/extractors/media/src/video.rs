use std::path::Path;

use audio_video_metadata::{get_format_from_slice, Metadata};
use tracing::debug;

use casefile_extract_types::records::VideoMeta;
use casefile_extract_types::{lower_ext, ExtractOutcome, ExtractorConfig, FamilyMeta, Source, TypeRecord};

use crate::{isobmff, le_u32, round2, year_of};

/// Leading bytes read for AVI headers and the generic header reader.
const HEAD_LEN: u64 = 4 * 1024 * 1024;

/// Largest `moov` box loaded into memory.
const MAX_MOOV: u64 = 64 * 1024 * 1024;

/// Container, codecs, dimensions and duration for one video file.
///
/// ISO media (MP4/MOV/M4V/3GP) and AVI headers are read directly; other
/// containers go through the generic header reader over the leading bytes.
pub fn extract_video(path: &Path, _cfg: &ExtractorConfig) -> ExtractOutcome {
    let mut src = match Source::open(path) {
        Ok(s) => s,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let head = match src.head(HEAD_LEN) {
        Ok(h) => h,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let ext = lower_ext(path);
    let mut meta = VideoMeta::default();
    let mut issues = Vec::new();

    let mime = if head.get(4..8) == Some(&b"ftyp"[..]) {
        meta.container_format = Some(if ext == "mov" { "mov" } else { "mp4" }.to_string());
        let len = src.len();
        match isobmff::load_top_level(src.file_mut(), len, b"moov", MAX_MOOV) {
            Ok(Some(moov)) => read_iso_media(path, &moov, &mut meta),
            Ok(None) => issues.push("movie box not found".to_string()),
            Err(e) => issues.push(format!("movie box unreadable: {e}")),
        }
        if ext == "mov" { "video/quicktime" } else { "video/mp4" }
    } else if head.starts_with(b"RIFF") && head.get(8..12) == Some(&b"AVI "[..]) {
        meta.container_format = Some("avi".to_string());
        if !read_avi(&head, &mut meta) {
            issues.push("AVI main header missing".to_string());
        }
        "video/x-msvideo"
    } else {
        let mime = read_generic(&head, &ext, &mut meta, &mut issues);
        if meta.container_format.is_none() {
            meta.container_format = (!ext.is_empty()).then(|| ext.clone());
        }
        mime
    };

    if let (Some(w), Some(h)) = (meta.width_px, meta.height_px) {
        meta.aspect_ratio = aspect_ratio(w, h);
    }

    let record = TypeRecord::new(FamilyMeta::Video(meta)).with_mime(mime);
    ExtractOutcome::from_issues(record, issues)
}

/// `moov` is the movie box itself.
fn read_iso_media(path: &Path, moov: &[u8], meta: &mut VideoMeta) {
    if let Some(mh) = isobmff::movie_header(moov) {
        meta.duration_sec = mh.duration_sec.map(round2);
        meta.creation_time = mh.creation_time;
    }
    if let Some((w, h)) = isobmff::track_dimensions(moov) {
        meta.width_px = Some(w);
        meta.height_px = Some(h);
    }
    meta.video_codec = isobmff::video_codec(moov).map(str::to_string);
    meta.audio_codec = isobmff::audio_codec(moov).map(str::to_string);

    match mp4ameta::Tag::read_from_path(path) {
        Ok(tag) => {
            meta.title = tag.title().map(str::to_string);
            meta.encoder = tag.encoder().map(str::to_string);
            meta.year = tag.year().and_then(year_of);
        }
        Err(e) => debug!("no MP4 tags in {}: {e}", path.display()),
    }
    if meta.year.is_none() {
        meta.year = meta.creation_time.as_deref().and_then(year_of);
    }
}

/// `avih` main header plus the handler of the first video stream.
fn read_avi(bytes: &[u8], meta: &mut VideoMeta) -> bool {
    let Some(at) = find(bytes, b"avih") else { return false };
    let body = at + 8;
    let usec_per_frame = le_u32(bytes, body).unwrap_or(0);
    let frames = le_u32(bytes, body + 16).unwrap_or(0);
    meta.width_px = le_u32(bytes, body + 32).filter(|w| *w > 0);
    meta.height_px = le_u32(bytes, body + 36).filter(|h| *h > 0);
    if usec_per_frame > 0 && frames > 0 {
        meta.duration_sec = Some(round2(f64::from(frames) * f64::from(usec_per_frame) / 1_000_000.0));
    }
    // Stream header: fccType "vids" followed by the fccHandler.
    if let Some(vids) = find(bytes, b"vids") {
        meta.video_codec = bytes
            .get(vids + 4..vids + 8)
            .map(|h| String::from_utf8_lossy(h).trim_matches(char::from(0)).trim().to_lowercase())
            .filter(|s| !s.is_empty());
    }
    true
}

fn read_generic(head: &[u8], ext: &str, meta: &mut VideoMeta, issues: &mut Vec<String>) -> &'static str {
    match get_format_from_slice(head) {
        Ok(Metadata::Video(m)) => {
            meta.container_format = Some(format!("{:?}", m.format).to_lowercase());
            meta.width_px = Some(m.dimensions.width as u32).filter(|w| *w > 0);
            meta.height_px = Some(m.dimensions.height as u32).filter(|h| *h > 0);
            meta.duration_sec = m.audio.duration.map(|d| round2(d.as_secs_f64()));
        }
        Ok(Metadata::Audio(m)) => {
            // Detected as audio only; keep the duration.
            meta.duration_sec = m.duration.map(|d| round2(d.as_secs_f64()));
        }
        Err(e) => issues.push(format!("container not recognised: {e:?}")),
    }
    match ext {
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "mpg" | "mpeg" => "video/mpeg",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

/// Reduced `w:h`, e.g. "16:9".
fn aspect_ratio(w: u32, h: u32) -> Option<String> {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    if w == 0 || h == 0 {
        return None;
    }
    let g = gcd(w, h);
    Some(format!("{}:{}", w / g, h / g))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

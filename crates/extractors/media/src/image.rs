use std::io::{BufRead, BufReader, Cursor, Seek, SeekFrom};
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{Exif, In, Tag, Value};
use tracing::debug;

use casefile_extract_types::records::ImageMeta;
use casefile_extract_types::{lower_ext, ExtractOutcome, ExtractorConfig, FamilyMeta, Source, TypeRecord};

use crate::{be_u16, be_u32, le_u16, le_u32, round2};

/// Leading bytes handed to the header parsers.
const HEAD_LEN: u64 = 4 * 1024 * 1024;

/// Reads an image from disk.  Headers come from a bounded prefix and EXIF
/// is located by seeking, except for TIFF whose EXIF reader loads the
/// container into memory and so gets at most `max_parse_bytes`.
pub fn extract_image_file(path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
    let mut src = match Source::open(path) {
        Ok(s) => s,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let head = match src.head(HEAD_LEN) {
        Ok(h) => h,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let ext = lower_ext(path);

    if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        return match src.head(cfg.max_parse_bytes) {
            Ok(data) => extract_image(&data, &ext, cfg),
            Err(reason) => ExtractOutcome::Failure(reason),
        };
    }
    if let Err(e) = src.file_mut().seek(SeekFrom::Start(0)) {
        return ExtractOutcome::Failure(format!("cannot read {}: {e}", path.display()));
    }
    let mut container = BufReader::new(src.file_mut());
    extract_image_from(&head, &mut container, &ext, cfg)
}

/// Header fields plus EXIF for one in-memory image.  `ext` is the lowercased
/// extension without the dot; it only names the format when the header is
/// not recognised.
pub fn extract_image(bytes: &[u8], ext: &str, cfg: &ExtractorConfig) -> ExtractOutcome {
    extract_image_from(bytes, &mut Cursor::new(bytes), ext, cfg)
}

fn extract_image_from<R: BufRead + Seek>(
    bytes: &[u8],
    container: &mut R,
    ext: &str,
    cfg: &ExtractorConfig,
) -> ExtractOutcome {
    let mut issues = Vec::new();
    let mut meta = ImageMeta::default();

    let header = read_header(bytes);
    let (format, mime) = match &header {
        Some(h) => (h.format, h.mime),
        None => {
            issues.push("unrecognised image header".to_string());
            format_for_ext(ext)
        }
    };
    meta.format = Some(format.to_string());
    meta.image_type = Some(if format == "svg" { "vector" } else { "raster" }.to_string());
    if let Some(h) = header {
        meta.width_px = h.width;
        meta.height_px = h.height;
        meta.bits_per_pixel = h.bits_per_pixel;
        meta.color_space = h.color_space.map(str::to_string);
        meta.has_alpha = h.has_alpha;
        meta.dpi_x = h.dpi.map(|d| d.0);
        meta.dpi_y = h.dpi.map(|d| d.1);
    }

    if cfg.capabilities.exif && format != "svg" {
        match exif::Reader::new().read_from_container(container) {
            Ok(exif) => apply_exif(&exif, &mut meta),
            Err(exif::Error::NotFound(_)) => meta.has_embedded_thumbnail = Some(false),
            Err(e) if matches!(format, "jpeg" | "tiff") => issues.push(format!("EXIF unreadable: {e}")),
            Err(e) => debug!("no EXIF in {format} image: {e}"),
        }
    }

    let record = TypeRecord::new(FamilyMeta::Image(meta)).with_mime(mime);
    ExtractOutcome::from_issues(record, issues)
}

fn format_for_ext(ext: &str) -> (&'static str, &'static str) {
    match ext {
        "jpg" | "jpeg" => ("jpeg", "image/jpeg"),
        "png" => ("png", "image/png"),
        "gif" => ("gif", "image/gif"),
        "bmp" => ("bmp", "image/bmp"),
        "tif" | "tiff" => ("tiff", "image/tiff"),
        "webp" => ("webp", "image/webp"),
        "ico" => ("ico", "image/x-icon"),
        "svg" => ("svg", "image/svg+xml"),
        "heic" | "heif" => ("heic", "image/heic"),
        "xcf" => ("xcf", "image/x-xcf"),
        _ => ("unknown", "application/octet-stream"),
    }
}

// ============================================================================
// NATIVE HEADERS
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
struct Header {
    format: &'static str,
    mime: &'static str,
    width: Option<u32>,
    height: Option<u32>,
    bits_per_pixel: Option<u32>,
    color_space: Option<&'static str>,
    has_alpha: Option<bool>,
    dpi: Option<(f64, f64)>,
}

impl Header {
    fn new(format: &'static str, mime: &'static str) -> Self {
        Self { format, mime, ..Default::default() }
    }

    fn sized(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

fn read_header(buf: &[u8]) -> Option<Header> {
    if buf.len() < 8 {
        return None;
    }

    if buf.starts_with(b"\xFF\xD8\xFF") {
        return Some(jpeg_header(buf));
    }

    // PNG: \x89PNG\r\n\x1a\n
    if buf.starts_with(b"\x89PNG\r\n\x1a\n") {
        let mut h = Header::new("png", "image/png");
        if buf.len() >= 26 {
            h = h.sized(be_u32(buf, 16)?, be_u32(buf, 20)?);
            let bit_depth = u32::from(buf[24]);
            let (channels, space, alpha) = match buf[25] {
                0 => (1, "Gray", false),
                2 => (3, "sRGB", false),
                3 => (1, "sRGB", false),
                4 => (2, "Gray", true),
                6 => (4, "sRGB", true),
                _ => (0, "Unknown", false),
            };
            h.bits_per_pixel = (channels > 0).then_some(bit_depth * channels);
            h.color_space = Some(space);
            h.has_alpha = Some(alpha);
        }
        return Some(h);
    }

    // GIF: GIF87a or GIF89a
    if buf.starts_with(b"GIF87a") || buf.starts_with(b"GIF89a") {
        let mut h = Header::new("gif", "image/gif");
        if buf.len() >= 11 {
            h = h.sized(u32::from(le_u16(buf, 6)?), u32::from(le_u16(buf, 8)?));
            h.bits_per_pixel = Some(u32::from(buf[10] & 0x07) + 1);
            h.color_space = Some("sRGB");
        }
        return Some(h);
    }

    // WebP: RIFF....WEBP
    if buf.starts_with(b"RIFF") && buf.get(8..12) == Some(&b"WEBP"[..]) {
        return Some(webp_header(buf));
    }

    // BMP: BM
    if buf.starts_with(b"BM") && buf.len() >= 30 {
        let width = i32::from_le_bytes(buf[18..22].try_into().ok()?).unsigned_abs();
        let height = i32::from_le_bytes(buf[22..26].try_into().ok()?).unsigned_abs();
        let bit_count = u32::from(le_u16(buf, 28)?);
        let mut h = Header::new("bmp", "image/bmp").sized(width, height);
        h.bits_per_pixel = Some(bit_count);
        h.has_alpha = Some(bit_count == 32);
        h.color_space = Some(if bit_count <= 8 { "Indexed" } else { "sRGB" });
        return Some(h);
    }

    if buf.starts_with(b"II*\0") || buf.starts_with(b"MM\0*") {
        return Some(Header::new("tiff", "image/tiff"));
    }

    if buf.starts_with(b"\0\0\x01\0") {
        let mut h = Header::new("ico", "image/x-icon");
        if buf.len() >= 8 {
            // A stored 0 means 256.
            let dim = |b: u8| if b == 0 { 256 } else { u32::from(b) };
            h = h.sized(dim(buf[6]), dim(buf[7]));
        }
        return Some(h);
    }

    if buf.get(4..8) == Some(&b"ftyp"[..]) && matches!(buf.get(8..12), Some(b"heic" | b"heix" | b"mif1" | b"msf1")) {
        return Some(Header::new("heic", "image/heic"));
    }

    if buf.starts_with(b"gimp xcf") {
        let mut h = Header::new("xcf", "image/x-xcf");
        if let (Some(w), Some(hh)) = (be_u32(buf, 14), be_u32(buf, 18)) {
            h = h.sized(w, hh);
        }
        return Some(h);
    }

    let head = String::from_utf8_lossy(&buf[..buf.len().min(512)]).to_lowercase();
    if head.contains("<svg") {
        return Some(Header::new("svg", "image/svg+xml"));
    }

    None
}

/// Walks marker segments up to the first start-of-scan, reading the JFIF
/// density and the frame header.
fn jpeg_header(buf: &[u8]) -> Header {
    let mut h = Header::new("jpeg", "image/jpeg");
    let mut i = 2;
    while i + 4 <= buf.len() {
        if buf[i] != 0xFF {
            break;
        }
        let marker = buf[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            i += 2;
            continue;
        }
        let Some(len) = be_u16(buf, i + 2).map(usize::from) else { break };
        if len < 2 {
            break;
        }
        let seg = &buf[(i + 4).min(buf.len())..(i + 2 + len).min(buf.len())];

        match marker {
            0xE0 if seg.starts_with(b"JFIF\0") && seg.len() >= 12 => {
                let (x, y) = (be_u16(seg, 8).unwrap_or(0), be_u16(seg, 10).unwrap_or(0));
                let scale = match seg[7] {
                    1 => Some(1.0),
                    2 => Some(2.54),
                    _ => None,
                };
                if let (Some(scale), true) = (scale, x > 0 && y > 0) {
                    h.dpi = Some((round2(f64::from(x) * scale), round2(f64::from(y) * scale)));
                }
            }
            // SOF0..SOF15 except DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) && seg.len() >= 6 => {
                let precision = u32::from(seg[0]);
                let height = u32::from(be_u16(seg, 1).unwrap_or(0));
                let width = u32::from(be_u16(seg, 3).unwrap_or(0));
                let components = u32::from(seg[5]);
                h = h.sized(width, height);
                h.bits_per_pixel = Some(precision * components);
                h.color_space = match components {
                    1 => Some("Gray"),
                    3 => Some("sRGB"),
                    4 => Some("CMYK"),
                    _ => None,
                };
                h.has_alpha = Some(false);
                break;
            }
            0xDA => break,
            _ => {}
        }
        i += 2 + len;
    }
    h
}

fn webp_header(buf: &[u8]) -> Header {
    let h = Header::new("webp", "image/webp");
    let chunk = buf.get(12..16).unwrap_or_default();
    let b = |i: usize| u32::from(buf.get(i).copied().unwrap_or(0));

    if chunk == b"VP8 " && buf.len() >= 30 {
        let frame_tag = b(20) | (b(21) << 8) | (b(22) << 16);
        if frame_tag & 1 == 0 && buf[23] == 0x9D && buf[24] == 0x01 && buf[25] == 0x2A {
            let width = u32::from(le_u16(buf, 26).unwrap_or(0) & 0x3FFF);
            let height = u32::from(le_u16(buf, 28).unwrap_or(0) & 0x3FFF);
            let mut h = h.sized(width, height);
            h.has_alpha = Some(false);
            return h;
        }
    } else if chunk == b"VP8L" && buf.len() >= 25 && buf[20] == 0x2F {
        let packed = le_u32(buf, 21).unwrap_or(0);
        let width = (packed & 0x3FFF) + 1;
        let height = ((packed >> 14) & 0x3FFF) + 1;
        let mut h = h.sized(width, height);
        h.has_alpha = Some(packed >> 28 & 1 == 1);
        return h;
    } else if chunk == b"VP8X" && buf.len() >= 30 {
        let width = b(24) | (b(25) << 8) | (b(26) << 16);
        let height = b(27) | (b(28) << 8) | (b(29) << 16);
        let mut h = h.sized(width + 1, height + 1);
        h.has_alpha = Some(buf[20] & 0x10 != 0);
        return h;
    }
    h
}

// ============================================================================
// EXIF
// ============================================================================

fn apply_exif(exif: &Exif, meta: &mut ImageMeta) {
    if meta.width_px.is_none() {
        meta.width_px = uint(exif, Tag::PixelXDimension).or_else(|| uint(exif, Tag::ImageWidth));
        meta.height_px = uint(exif, Tag::PixelYDimension).or_else(|| uint(exif, Tag::ImageLength));
    }
    if meta.dpi_x.is_none() {
        let scale = match uint(exif, Tag::ResolutionUnit) {
            Some(3) => 2.54,
            _ => 1.0,
        };
        meta.dpi_x = rational(exif, Tag::XResolution, 0).map(|v| round2(v * scale));
        meta.dpi_y = rational(exif, Tag::YResolution, 0).map(|v| round2(v * scale));
    }

    meta.orientation = uint(exif, Tag::Orientation);
    meta.exif_datetime_original = ascii(exif, Tag::DateTimeOriginal)
        .or_else(|| ascii(exif, Tag::DateTime))
        .and_then(|dt| exif_datetime_to_iso(&dt));
    meta.camera_make = ascii(exif, Tag::Make);
    meta.camera_model = ascii(exif, Tag::Model);
    meta.lens_model = ascii(exif, Tag::LensModel);
    meta.focal_length_mm = rational(exif, Tag::FocalLength, 0).map(round2);
    meta.aperture_f = rational(exif, Tag::FNumber, 0).map(round2);
    meta.exposure_time_s = rational(exif, Tag::ExposureTime, 0);
    meta.iso = uint(exif, Tag::PhotographicSensitivity);
    meta.flash_used = uint(exif, Tag::Flash).map(|f| f & 1 == 1);

    meta.gps_lat = gps_coord(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S');
    meta.gps_lon = gps_coord(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W');
    meta.gps_alt = rational(exif, Tag::GPSAltitude, 0).map(|alt| {
        // Ref 1 means below sea level.
        if uint(exif, Tag::GPSAltitudeRef) == Some(1) { -alt } else { alt }
    });

    meta.author = ascii(exif, Tag::Artist);
    meta.title = ascii(exif, Tag::ImageDescription);
    meta.description = user_comment(exif);
    meta.copyright = ascii(exif, Tag::Copyright);
    meta.software = ascii(exif, Tag::Software);
    meta.has_embedded_thumbnail = Some(exif.get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL).is_some());
}

fn ascii(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Ascii(parts) = &field.value else { return None };
    let joined = parts
        .iter()
        .map(|p| String::from_utf8_lossy(p).trim_matches(char::from(0)).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

fn rational(exif: &Exif, tag: Tag, idx: usize) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let v = match &field.value {
        Value::Rational(v) => v.get(idx)?.to_f64(),
        Value::SRational(v) => v.get(idx)?.to_f64(),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Degrees/minutes/seconds to signed decimal degrees.
fn gps_coord(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative_ref: char) -> Option<f64> {
    let deg = rational(exif, value_tag, 0)?;
    let min = rational(exif, value_tag, 1).unwrap_or(0.0);
    let sec = rational(exif, value_tag, 2).unwrap_or(0.0);
    let decimal = dms_to_decimal(deg, min, sec);
    let negative = ascii(exif, ref_tag)
        .map(|r| r.trim().eq_ignore_ascii_case(&negative_ref.to_string()))
        .unwrap_or(false);
    Some(if negative { -decimal } else { decimal })
}

fn dms_to_decimal(deg: f64, min: f64, sec: f64) -> f64 {
    let v = deg + min / 60.0 + sec / 3600.0;
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// UserComment carries an 8-byte character-code prefix before the text.
fn user_comment(exif: &Exif) -> Option<String> {
    let field = exif.get_field(Tag::UserComment, In::PRIMARY)?;
    let Value::Undefined(bytes, _) = &field.value else { return None };
    let body = bytes.get(8..)?;
    let text = if bytes.starts_with(b"UNICODE\0") {
        let units: Vec<u16> = body.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(body).into_owned()
    };
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string();
    (!text.is_empty()).then_some(text)
}

/// `YYYY:MM:DD HH:MM:SS` to `YYYY-MM-DDTHH:MM:SS`.
fn exif_datetime_to_iso(dt: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(dt.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefile_extract_types::Capabilities;
    use exif::experimental::Writer;
    use exif::{Field, Rational};

    fn ascii_field(tag: Tag, s: &str) -> Field {
        Field { tag, ifd_num: In::PRIMARY, value: Value::Ascii(vec![s.as_bytes().to_vec()]) }
    }

    fn dms(d: u32, m: u32, s_hundredths: u32) -> Value {
        Value::Rational(vec![
            Rational { num: d, denom: 1 },
            Rational { num: m, denom: 1 },
            Rational { num: s_hundredths, denom: 100 },
        ])
    }

    /// Baseline JPEG skeleton: SOI, APP1 Exif (when given), SOF0, SOS, EOI.
    fn jpeg_with_exif(width: u16, height: u16, tiff: Option<Vec<u8>>) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        if let Some(tiff) = tiff {
            let mut app1 = b"Exif\0\0".to_vec();
            app1.extend(tiff);
            out.extend([0xFF, 0xE1]);
            out.extend(((app1.len() + 2) as u16).to_be_bytes());
            out.extend(app1);
        }
        let mut sof = vec![8];
        sof.extend(height.to_be_bytes());
        sof.extend(width.to_be_bytes());
        sof.extend([3, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        out.extend([0xFF, 0xC0]);
        out.extend(((sof.len() + 2) as u16).to_be_bytes());
        out.extend(sof);
        out.extend([0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]);
        out
    }

    fn camera_tiff() -> Vec<u8> {
        let fields = vec![
            ascii_field(Tag::Make, "Canon"),
            ascii_field(Tag::Model, "EOS 5D"),
            ascii_field(Tag::DateTimeOriginal, "2021:07:14 18:30:05"),
            Field { tag: Tag::Orientation, ifd_num: In::PRIMARY, value: Value::Short(vec![6]) },
            Field { tag: Tag::GPSLatitude, ifd_num: In::PRIMARY, value: dms(48, 51, 2400) },
            ascii_field(Tag::GPSLatitudeRef, "N"),
            Field { tag: Tag::GPSLongitude, ifd_num: In::PRIMARY, value: dms(2, 21, 0) },
            ascii_field(Tag::GPSLongitudeRef, "W"),
        ];
        let mut writer = Writer::new();
        for f in &fields {
            writer.push_field(f);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    fn meta_of(out: &ExtractOutcome) -> ImageMeta {
        match &out.record().expect("record").meta {
            FamilyMeta::Image(m) => m.clone(),
            other => panic!("wrong family: {other:?}"),
        }
    }

    #[test]
    fn test_jpeg_with_gps() {
        let jpeg = jpeg_with_exif(1920, 1080, Some(camera_tiff()));
        let out = extract_image(&jpeg, "jpg", &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!((m.width_px, m.height_px), (Some(1920), Some(1080)));
        assert_eq!(m.format.as_deref(), Some("jpeg"));
        assert_eq!(m.bits_per_pixel, Some(24));
        assert_eq!(m.camera_make.as_deref(), Some("Canon"));
        assert_eq!(m.orientation, Some(6));
        assert_eq!(m.exif_datetime_original.as_deref(), Some("2021-07-14T18:30:05"));
        assert!((m.gps_lat.unwrap() - 48.856667).abs() < 1e-4);
        assert!((m.gps_lon.unwrap() + 2.35).abs() < 1e-4);
        assert_eq!(out.record().unwrap().mime.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_exif_capability_off() {
        let jpeg = jpeg_with_exif(640, 480, Some(camera_tiff()));
        let cfg = ExtractorConfig {
            capabilities: Capabilities { exif: false, ..Capabilities::all() },
            ..Default::default()
        };
        let m = meta_of(&extract_image(&jpeg, "jpg", &cfg));
        assert_eq!(m.width_px, Some(640));
        assert_eq!(m.camera_make, None);
        assert_eq!(m.gps_lat, None);
    }

    #[test]
    fn test_png_header() {
        let mut png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec();
        png.extend(300u32.to_be_bytes());
        png.extend(200u32.to_be_bytes());
        png.extend([8, 6, 0, 0, 0]);
        let m = meta_of(&extract_image(&png, "png", &ExtractorConfig::default()));
        assert_eq!((m.width_px, m.height_px), (Some(300), Some(200)));
        assert_eq!(m.bits_per_pixel, Some(32));
        assert_eq!(m.has_alpha, Some(true));
        assert_eq!(m.image_type.as_deref(), Some("raster"));
    }

    #[test]
    fn test_garbage_is_partial() {
        let out = extract_image(b"definitely not an image", "gif", &ExtractorConfig::default());
        match out {
            ExtractOutcome::PartialSuccess(rec, reason) => {
                assert!(reason.contains("unrecognised"));
                assert_eq!(rec.mime.as_deref(), Some("image/gif"));
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn test_svg_is_vector() {
        let svg = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"/>"#;
        let m = meta_of(&extract_image(svg, "svg", &ExtractorConfig::default()));
        assert_eq!(m.image_type.as_deref(), Some("vector"));
    }

    #[test]
    fn test_large_file_reads_header_and_exif_without_loading() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("IMG_0042.JPG");
        std::fs::write(&path, jpeg_with_exif(4000, 3000, Some(camera_tiff()))).unwrap();
        std::fs::OpenOptions::new().write(true).open(&path).unwrap().set_len(5 << 30).unwrap();

        let cfg = ExtractorConfig { max_parse_bytes: 1024, ..ExtractorConfig::default() };
        let out = extract_image_file(&path, &cfg);
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!((m.width_px, m.height_px), (Some(4000), Some(3000)));
        assert_eq!(m.camera_model.as_deref(), Some("EOS 5D"));
    }

    #[test]
    fn test_dms_to_decimal() {
        assert_eq!(dms_to_decimal(10.0, 30.0, 0.0), 10.5);
        assert_eq!(exif_datetime_to_iso("2020:01:02 03:04:05").as_deref(), Some("2020-01-02T03:04:05"));
        assert_eq!(exif_datetime_to_iso("0000:00:00 00:00:00"), None);
    }
}

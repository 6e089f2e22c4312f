use std::path::Path;

use id3::TagLike;
use tracing::debug;

use casefile_extract_types::records::AudioMeta;
use casefile_extract_types::{lower_ext, ExtractOutcome, ExtractorConfig, FamilyMeta, Source, TypeRecord};

use crate::{be_u32, isobmff, le_u16, le_u32, round2, year_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Mp3,
    Flac,
    Ogg,
    Wav,
    Mp4,
    Aac,
    Wma,
    Unknown,
}

impl Container {
    /// Content first, then the extension.
    fn detect(bytes: &[u8], ext: &str) -> Self {
        if bytes.starts_with(b"ID3") || (bytes.len() > 2 && bytes[0] == 0xFF && bytes[1] & 0xE6 == 0xE2) {
            return Container::Mp3;
        }
        if bytes.starts_with(b"fLaC") {
            return Container::Flac;
        }
        if bytes.starts_with(b"OggS") {
            return Container::Ogg;
        }
        if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WAVE"[..]) {
            return Container::Wav;
        }
        if bytes.get(4..8) == Some(&b"ftyp"[..]) {
            return Container::Mp4;
        }
        if bytes.len() > 2 && bytes[0] == 0xFF && bytes[1] & 0xF6 == 0xF0 {
            return Container::Aac;
        }
        match ext {
            "mp3" => Container::Mp3,
            "flac" => Container::Flac,
            "ogg" | "opus" => Container::Ogg,
            "wav" => Container::Wav,
            "m4a" => Container::Mp4,
            "aac" => Container::Aac,
            "wma" => Container::Wma,
            _ => Container::Unknown,
        }
    }

    fn mime(self) -> &'static str {
        match self {
            Container::Mp3 => "audio/mpeg",
            Container::Flac => "audio/flac",
            Container::Ogg => "audio/ogg",
            Container::Wav => "audio/wav",
            Container::Mp4 => "audio/mp4",
            Container::Aac => "audio/aac",
            Container::Wma => "audio/x-ms-wma",
            Container::Unknown => "application/octet-stream",
        }
    }
}

/// Leading bytes used for container detection and stream headers.
const HEAD_LEN: u64 = 4 * 1024 * 1024;

/// Window searched for the first MPEG frame after the ID3v2 tag.
const FRAME_SCAN: u64 = 64 * 1024;

/// Trailing bytes searched for the last Ogg page.
const OGG_TAIL: u64 = 64 * 1024;

/// Largest `moov` box loaded into memory.
const MAX_MOOV: u64 = 64 * 1024 * 1024;

/// Stream parameters and tags for one audio file.
///
/// Only headers, the tail of Ogg streams and the MP4 movie box are read;
/// tag libraries seek through the file themselves.
pub fn extract_audio(path: &Path, _cfg: &ExtractorConfig) -> ExtractOutcome {
    let mut src = match Source::open(path) {
        Ok(s) => s,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let head = match src.head(HEAD_LEN) {
        Ok(h) => h,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };
    let len = src.len();
    let ext = lower_ext(path);
    let container = Container::detect(&head, &ext);

    let mut meta = AudioMeta {
        container_format: Some(if ext.is_empty() { format!("{container:?}").to_lowercase() } else { ext.clone() }),
        ..Default::default()
    };
    let mut issues = Vec::new();

    match container {
        Container::Mp3 => {
            let start = id3v2_len(&head) as u64;
            match src.read_at(start, FRAME_SCAN) {
                Ok(window) => read_mpeg_stream(&window, len.saturating_sub(start), &mut meta),
                Err(reason) => issues.push(reason),
            }
            read_id3(path, &mut meta, &mut issues);
        }
        Container::Flac => read_flac(path, len, &mut meta, &mut issues),
        Container::Ogg => match src.tail(OGG_TAIL) {
            Ok(tail) => read_ogg(&head, &tail, &mut meta),
            Err(reason) => issues.push(reason),
        },
        Container::Wav => {
            if !read_wav(&head, len, &mut meta) {
                issues.push("WAV fmt chunk missing".to_string());
            }
        }
        Container::Mp4 => match isobmff::load_top_level(src.file_mut(), len, b"moov", MAX_MOOV) {
            Ok(Some(moov)) => read_mp4(path, &moov, &mut meta),
            Ok(None) => issues.push("movie box not found".to_string()),
            Err(e) => issues.push(format!("movie box unreadable: {e}")),
        },
        Container::Aac => meta.audio_codec = Some("AAC".to_string()),
        Container::Wma => meta.audio_codec = Some("WMA".to_string()),
        Container::Unknown => issues.push("unrecognised audio container".to_string()),
    }

    if let (Some(dur), None) = (meta.duration_sec, meta.bitrate_kbps) {
        if dur > 0.0 {
            meta.bitrate_kbps = Some(round2(len as f64 * 8.0 / dur / 1000.0));
        }
    }
    if meta.year.is_none() {
        meta.year = meta.date.as_deref().and_then(year_of);
    }

    let record = TypeRecord::new(FamilyMeta::Audio(meta)).with_mime(container.mime());
    ExtractOutcome::from_issues(record, issues)
}

/// "3/12" → (3, 12); "07" → (7, None).
fn parse_position(raw: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = raw.splitn(2, '/');
    let num = parts.next().and_then(|s| s.trim().parse().ok());
    let total = parts.next().and_then(|s| s.trim().parse().ok());
    (num, total)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

// ============================================================================
// MP3
// ============================================================================

fn read_id3(path: &Path, meta: &mut AudioMeta, issues: &mut Vec<String>) {
    let tag = match id3::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => return,
        Err(e) => {
            issues.push(format!("ID3 tag unreadable: {e}"));
            return;
        }
    };
    let text = |id: &str| tag.get(id).and_then(|f| f.content().text()).and_then(non_empty);

    meta.title = tag.title().and_then(non_empty);
    meta.artist = tag.artist().and_then(non_empty);
    meta.album = tag.album().and_then(non_empty);
    meta.album_artist = tag.album_artist().and_then(non_empty);
    meta.genre = tag.genre().and_then(non_empty);
    meta.composer = text("TCOM");
    meta.copyright = text("TCOP");
    meta.publisher = text("TPUB");
    meta.encoder = text("TSSE");
    meta.track_number = tag.track();
    meta.track_total = tag.total_tracks();
    meta.disc_number = tag.disc();
    meta.disc_total = tag.total_discs();
    meta.date = tag.date_recorded().map(|d| d.to_string()).or_else(|| text("TDRC"));
    meta.year = tag.year();
    meta.has_lyrics = Some(tag.lyrics().next().is_some());
    meta.has_cover = Some(tag.pictures().next().is_some());
}

/// First MPEG audio frame header in `window`, which starts right after any
/// ID3v2 tag; `stream_len` counts from the same point.  Duration assumes a
/// constant bitrate.
fn read_mpeg_stream(window: &[u8], stream_len: u64, meta: &mut AudioMeta) {
    let Some(offset) = (0..window.len().saturating_sub(4))
        .find(|&i| window[i] == 0xFF && window[i + 1] & 0xE0 == 0xE0 && frame_header(&window[i..]).is_some())
    else {
        meta.audio_codec = Some("MP3".to_string());
        return;
    };
    let Some(frame) = frame_header(&window[offset..]) else { return };
    meta.audio_codec = Some(frame.codec.to_string());
    meta.sample_rate_hz = Some(frame.sample_rate);
    meta.channels = Some(frame.channels);
    if frame.bitrate_kbps > 0 {
        meta.bitrate_kbps = Some(f64::from(frame.bitrate_kbps));
        let audio_bytes = stream_len.saturating_sub(offset as u64) as f64;
        meta.duration_sec = Some(round2(audio_bytes * 8.0 / (f64::from(frame.bitrate_kbps) * 1000.0)));
    }
}

fn id3v2_len(bytes: &[u8]) -> usize {
    if !bytes.starts_with(b"ID3") || bytes.len() < 10 {
        return 0;
    }
    // Syncsafe: 7 bits per byte.
    let size = bytes[6..10].iter().fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    10 + size
}

struct FrameHeader {
    codec: &'static str,
    bitrate_kbps: u32,
    sample_rate: u32,
    channels: u32,
}

fn frame_header(h: &[u8]) -> Option<FrameHeader> {
    if h.len() < 4 || h[0] != 0xFF || h[1] & 0xE0 != 0xE0 {
        return None;
    }
    let version = (h[1] >> 3) & 0x03; // 3 = MPEG1, 2 = MPEG2, 0 = MPEG2.5
    let layer = (h[1] >> 1) & 0x03; // 1 = III, 2 = II, 3 = I
    let bitrate_idx = usize::from(h[2] >> 4);
    let rate_idx = usize::from((h[2] >> 2) & 0x03);
    if version == 1 || layer == 0 || bitrate_idx == 0x0F || rate_idx == 3 {
        return None;
    }

    const V1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
    const V1_L2: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
    const V1_L1: [u32; 15] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
    const V2_L1: [u32; 15] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
    const V2_L23: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

    let table = match (version, layer) {
        (3, 1) => &V1_L3,
        (3, 2) => &V1_L2,
        (3, _) => &V1_L1,
        (_, 3) => &V2_L1,
        _ => &V2_L23,
    };
    let sample_rate = match version {
        3 => [44100, 48000, 32000][rate_idx],
        2 => [22050, 24000, 16000][rate_idx],
        _ => [11025, 12000, 8000][rate_idx],
    };
    Some(FrameHeader {
        codec: match layer {
            1 => "MP3",
            2 => "MP2",
            _ => "MP1",
        },
        bitrate_kbps: table[bitrate_idx],
        sample_rate,
        channels: if h[3] >> 6 == 3 { 1 } else { 2 },
    })
}

// ============================================================================
// FLAC
// ============================================================================

fn read_flac(path: &Path, file_size: u64, meta: &mut AudioMeta, issues: &mut Vec<String>) {
    meta.audio_codec = Some("FLAC".to_string());
    let tag = match metaflac::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) => {
            issues.push(format!("FLAC metadata unreadable: {e}"));
            return;
        }
    };

    if let Some(info) = tag.get_streaminfo() {
        meta.sample_rate_hz = Some(info.sample_rate);
        meta.channels = Some(u32::from(info.num_channels));
        if info.sample_rate > 0 && info.total_samples > 0 {
            let secs = info.total_samples as f64 / f64::from(info.sample_rate);
            meta.duration_sec = Some(round2(secs));
            meta.bitrate_kbps = Some(round2(file_size as f64 * 8.0 / secs / 1000.0));
        }
    }

    if let Some(vorbis) = tag.vorbis_comments() {
        let get = |key: &str| {
            vorbis
                .comments
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .and_then(|(_, values)| values.first())
                .and_then(|v| non_empty(v))
        };
        meta.title = get("TITLE");
        meta.artist = get("ARTIST");
        meta.album = get("ALBUM");
        meta.album_artist = get("ALBUMARTIST");
        meta.composer = get("COMPOSER");
        meta.genre = get("GENRE");
        meta.date = get("DATE");
        meta.copyright = get("COPYRIGHT");
        meta.publisher = get("ORGANIZATION").or_else(|| get("LABEL"));
        meta.encoder = get("ENCODER");
        meta.has_lyrics = Some(get("LYRICS").is_some() || get("UNSYNCEDLYRICS").is_some());
        if let Some(track) = get("TRACKNUMBER") {
            let (num, total) = parse_position(&track);
            meta.track_number = num;
            meta.track_total = total.or_else(|| get("TRACKTOTAL").and_then(|t| t.parse().ok()));
        }
        if let Some(disc) = get("DISCNUMBER") {
            let (num, total) = parse_position(&disc);
            meta.disc_number = num;
            meta.disc_total = total.or_else(|| get("DISCTOTAL").and_then(|t| t.parse().ok()));
        }
    }
    meta.has_cover = Some(tag.pictures().next().is_some());
}

// ============================================================================
// OGG / WAV / MP4
// ============================================================================

/// Codec and channels from the identification header in `head`; duration
/// from the granule position of the last page in `tail`.
fn read_ogg(head: &[u8], tail: &[u8], meta: &mut AudioMeta) {
    // Identification header: "\x01vorbis", version, channels, sample rate.
    let mut pre_skip = 0u64;
    if let Some(pos) = find(head, b"\x01vorbis") {
        meta.audio_codec = Some("Vorbis".to_string());
        meta.channels = head.get(pos + 11).map(|&c| u32::from(c));
        meta.sample_rate_hz = le_u32(head, pos + 12);
    } else if let Some(pos) = find(head, b"OpusHead") {
        meta.audio_codec = Some("Opus".to_string());
        meta.channels = head.get(pos + 9).map(|&c| u32::from(c));
        meta.sample_rate_hz = le_u32(head, pos + 12);
        pre_skip = le_u16(head, pos + 10).map(u64::from).unwrap_or(0);
    }

    // Opus granules always count 48 kHz samples.
    let clock = match meta.audio_codec.as_deref() {
        Some("Opus") => Some(48_000),
        _ => meta.sample_rate_hz,
    };
    match (last_granule(tail), clock.filter(|c| *c > 0)) {
        (Some(granule), Some(clock)) => {
            let samples = granule.saturating_sub(pre_skip);
            meta.duration_sec = Some(round2(samples as f64 / f64::from(clock)));
        }
        _ => debug!("no usable Ogg granule position"),
    }
}

/// Granule position of the last page that ends a packet.
fn last_granule(tail: &[u8]) -> Option<u64> {
    let mut end = tail.len();
    while let Some(pos) = tail[..end].windows(4).rposition(|w| w == b"OggS") {
        let granule = tail.get(pos + 6..pos + 14).and_then(|b| b.try_into().ok()).map(u64::from_le_bytes);
        if tail.get(pos + 4) == Some(&0) {
            if let Some(g) = granule.filter(|g| *g != u64::MAX) {
                return Some(g);
            }
        }
        end = pos;
    }
    None
}

/// Returns false when there is no `fmt ` chunk.  `head` holds the leading
/// chunks; `file_len` bounds the declared data size.
fn read_wav(head: &[u8], file_len: u64, meta: &mut AudioMeta) -> bool {
    let mut pos = 12;
    let mut byte_rate = None;
    let mut data_len = None;
    while pos + 8 <= head.len() {
        let id = &head[pos..pos + 4];
        let Some(len) = le_u32(head, pos + 4).map(|l| l as usize) else { break };
        let body = pos + 8;
        if id == b"fmt " {
            let codec = le_u16(head, body).unwrap_or(0);
            meta.audio_codec = Some(
                match codec {
                    1 => "PCM",
                    3 => "IEEE float",
                    6 => "A-law",
                    7 => "mu-law",
                    0x55 => "MP3",
                    0xFFFE => "PCM (extensible)",
                    _ => "other",
                }
                .to_string(),
            );
            meta.channels = le_u16(head, body + 2).map(u32::from);
            meta.sample_rate_hz = le_u32(head, body + 4);
            byte_rate = le_u32(head, body + 8);
        } else if id == b"data" {
            data_len = Some((len as u64).min(file_len.saturating_sub(body as u64)));
        }
        // Chunks are word aligned.
        pos = body + len + (len & 1);
    }
    if let Some(rate) = byte_rate.filter(|r| *r > 0) {
        meta.bitrate_kbps = Some(round2(f64::from(rate) * 8.0 / 1000.0));
        if let Some(len) = data_len {
            meta.duration_sec = Some(round2(len as f64 / f64::from(rate)));
        }
    }
    byte_rate.is_some()
}

/// `moov` is the movie box itself.
fn read_mp4(path: &Path, moov: &[u8], meta: &mut AudioMeta) {
    meta.audio_codec = isobmff::audio_codec(moov).map(|c| c.to_uppercase());
    if let Some(mh) = isobmff::movie_header(moov) {
        meta.duration_sec = mh.duration_sec.map(round2);
    }
    // Sample entry: 28 bytes in, channel count then sample size then the
    // 16.16 sample rate.
    if let Some(entry) = isobmff::find_boxes(moov, b"mp4a").next() {
        meta.channels = entry.get(16..18).map(|c| u32::from(u16::from_be_bytes([c[0], c[1]])));
        meta.sample_rate_hz = be_u32(entry, 24).map(|r| r >> 16);
    }

    match mp4ameta::Tag::read_from_path(path) {
        Ok(tag) => {
            meta.title = tag.title().and_then(non_empty);
            meta.artist = tag.artist().and_then(non_empty);
            meta.album = tag.album().and_then(non_empty);
            meta.album_artist = tag.album_artist().and_then(non_empty);
            meta.composer = tag.composer().and_then(non_empty);
            meta.genre = tag.genre().and_then(non_empty);
            meta.date = tag.year().and_then(non_empty);
            meta.copyright = tag.copyright().and_then(non_empty);
            meta.encoder = tag.encoder().and_then(non_empty);
            meta.track_number = tag.track_number().map(u32::from);
            meta.track_total = tag.total_tracks().map(u32::from);
            meta.disc_number = tag.disc_number().map(u32::from);
            meta.disc_total = tag.total_discs().map(u32::from);
            meta.has_lyrics = Some(tag.lyrics().is_some());
            meta.has_cover = Some(tag.artwork().is_some());
        }
        Err(e) => debug!("no MP4 tags in {}: {e}", path.display()),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
        (dir, path)
    }

    fn wav(seconds: u32) -> Vec<u8> {
        let (rate, channels, bits) = (8000u32, 1u16, 16u16);
        let byte_rate = rate * u32::from(channels) * u32::from(bits) / 8;
        let data_len = byte_rate * seconds;
        let mut out = b"RIFF".to_vec();
        out.extend((36 + data_len).to_le_bytes());
        out.extend(b"WAVEfmt ");
        out.extend(16u32.to_le_bytes());
        out.extend(1u16.to_le_bytes());
        out.extend(channels.to_le_bytes());
        out.extend(rate.to_le_bytes());
        out.extend(byte_rate.to_le_bytes());
        out.extend((channels * bits / 8).to_le_bytes());
        out.extend(bits.to_le_bytes());
        out.extend(b"data");
        out.extend(data_len.to_le_bytes());
        out.extend(vec![0u8; data_len as usize]);
        out
    }

    fn meta_of(out: &ExtractOutcome) -> AudioMeta {
        match &out.record().expect("record").meta {
            FamilyMeta::Audio(m) => m.clone(),
            other => panic!("wrong family: {other:?}"),
        }
    }

    #[test]
    fn test_wav_header() {
        let (_dir, path) = write_tmp("tone.wav", &wav(2));
        let out = extract_audio(&path, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.audio_codec.as_deref(), Some("PCM"));
        assert_eq!(m.sample_rate_hz, Some(8000));
        assert_eq!(m.channels, Some(1));
        assert_eq!(m.duration_sec, Some(2.0));
        assert_eq!(m.bitrate_kbps, Some(128.0));
        assert_eq!(m.container_format.as_deref(), Some("wav"));
        assert_eq!(out.record().unwrap().mime.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn test_multi_gigabyte_wav_reads_header_only() {
        // Eight-bit mono at 8 kHz: one byte per sample.
        let data_len: u32 = 0xF000_0000;
        let mut header = b"RIFF".to_vec();
        header.extend((36 + data_len).to_le_bytes());
        header.extend(b"WAVEfmt ");
        header.extend(16u32.to_le_bytes());
        header.extend(1u16.to_le_bytes());
        header.extend(1u16.to_le_bytes());
        header.extend(8000u32.to_le_bytes());
        header.extend(8000u32.to_le_bytes());
        header.extend(1u16.to_le_bytes());
        header.extend(8u16.to_le_bytes());
        header.extend(b"data");
        header.extend(data_len.to_le_bytes());

        let (_dir, path) = write_tmp("interview.wav", &header);
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(44 + u64::from(data_len))
            .unwrap();

        let out = extract_audio(&path, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.duration_sec, Some(503_316.48));
        assert_eq!(m.bitrate_kbps, Some(64.0));
    }

    #[test]
    fn test_ogg_duration_from_last_page() {
        fn page(granule: u64, body: &[u8]) -> Vec<u8> {
            let mut p = b"OggS\0\x02".to_vec();
            p.extend(granule.to_le_bytes());
            p.extend([0u8; 13]);
            p.extend(body);
            p
        }
        let mut ident = b"\x01vorbis".to_vec();
        ident.extend(0u32.to_le_bytes());
        ident.push(2);
        ident.extend(44_100u32.to_le_bytes());
        ident.extend([0u8; 13]);

        let mut ogg = page(0, &ident);
        ogg.extend(page(220_500, &[7u8; 64]));
        ogg.extend(page(u64::MAX, &[7u8; 16]));
        ogg.extend(page(441_000, &[7u8; 64]));

        let (_dir, path) = write_tmp("memo.ogg", &ogg);
        let m = meta_of(&extract_audio(&path, &ExtractorConfig::default()));
        assert_eq!(m.audio_codec.as_deref(), Some("Vorbis"));
        assert_eq!(m.channels, Some(2));
        assert_eq!(m.sample_rate_hz, Some(44_100));
        assert_eq!(m.duration_sec, Some(10.0));
    }

    #[test]
    fn test_mp3_frame_without_tags() {
        // MPEG1 layer III, 128 kbps, 44.1 kHz, joint stereo.
        let mut mp3 = Vec::new();
        for _ in 0..50 {
            mp3.extend([0xFF, 0xFB, 0x90, 0x44]);
            mp3.extend(vec![0u8; 413]);
        }
        let (_dir, path) = write_tmp("song.mp3", &mp3);
        let m = meta_of(&extract_audio(&path, &ExtractorConfig::default()));
        assert_eq!(m.audio_codec.as_deref(), Some("MP3"));
        assert_eq!(m.sample_rate_hz, Some(44100));
        assert_eq!(m.channels, Some(2));
        assert_eq!(m.bitrate_kbps, Some(128.0));
        assert_eq!(m.title, None);
    }

    #[test]
    fn test_unknown_container_is_partial() {
        let (_dir, path) = write_tmp("noise.xyz", b"random bytes here");
        let out = extract_audio(&path, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::PartialSuccess(..)));
    }

    #[test]
    fn test_detect_prefers_content() {
        assert_eq!(Container::detect(b"fLaC\0\0\0\x22", "mp3"), Container::Flac);
        assert_eq!(Container::detect(b"\0\0\0\0", "wma"), Container::Wma);
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("3/12"), (Some(3), Some(12)));
        assert_eq!(parse_position("07"), (Some(7), None));
        assert_eq!(parse_position("x"), (None, None));
    }
}

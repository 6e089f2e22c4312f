//! Just enough of the ISO base media file format (MP4, MOV, M4A) to read the
//! movie header, track dimensions and sample-entry codecs.
//!
//! The top level is walked by seeking from header to header.  Inside a
//! loaded box, children are located by scanning for their four-character
//! code rather than by walking the tree, which tolerates truncated files
//! and unknown parents.

use std::io::{self, Read, Seek, SeekFrom};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use crate::{be_u32, be_u64};

/// Seconds between 1904-01-01 (the QuickTime epoch) and 1970-01-01.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// First top-level box with the given code, header included.
///
/// Only box headers are read on the way; `mdat` and anything else in front
/// is skipped by seeking, so a `moov` at the end of a large file costs one
/// read.  A matching box larger than `max` is an error.
pub(crate) fn load_top_level<R: Read + Seek>(
    src: &mut R,
    len: u64,
    code: &[u8; 4],
    max: u64,
) -> io::Result<Option<Vec<u8>>> {
    let mut pos = 0u64;
    while pos.saturating_add(8) <= len {
        src.seek(SeekFrom::Start(pos))?;
        let mut header = [0u8; 16];
        src.read_exact(&mut header[..8])?;
        let mut size = u64::from(u32::from_be_bytes([header[0], header[1], header[2], header[3]]));
        let mut header_len = 8;
        if size == 1 {
            src.read_exact(&mut header[8..])?;
            size = u64::from_be_bytes([
                header[8], header[9], header[10], header[11], header[12], header[13], header[14], header[15],
            ]);
            header_len = 16;
        } else if size == 0 {
            // Runs to the end of the file.
            size = len - pos;
        }
        if size < header_len {
            break;
        }
        if &header[4..8] == code {
            if size > max {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} box of {size} bytes", String::from_utf8_lossy(code)),
                ));
            }
            let want = size.min(len - pos);
            src.seek(SeekFrom::Start(pos))?;
            let mut buf = Vec::with_capacity(usize::try_from(want).unwrap_or(0));
            src.by_ref().take(want).read_to_end(&mut buf)?;
            return Ok(Some(buf));
        }
        pos = pos.saturating_add(size);
    }
    Ok(None)
}

/// Payloads of every box with the given code.
pub(crate) fn find_boxes<'a>(data: &'a [u8], code: &'a [u8; 4]) -> impl Iterator<Item = &'a [u8]> + 'a {
    data.windows(4)
        .enumerate()
        .filter(move |(pos, w)| *pos >= 4 && *w == code)
        .filter_map(move |(pos, _)| {
            let size = be_u32(data, pos - 4)? as usize;
            if size < 8 {
                return None;
            }
            let end = (pos - 4).saturating_add(size).min(data.len());
            data.get(pos + 4..end)
        })
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct MovieHeader {
    pub duration_sec: Option<f64>,
    pub creation_time: Option<String>,
}

/// `mvhd`: version 0 uses 32-bit times, version 1 uses 64-bit.
pub(crate) fn movie_header(data: &[u8]) -> Option<MovieHeader> {
    let mvhd = find_boxes(data, b"mvhd").next()?;
    let (created, timescale, duration) = match mvhd.first()? {
        1 => (be_u64(mvhd, 4)?, be_u32(mvhd, 20)?, be_u64(mvhd, 24)?),
        _ => (
            u64::from(be_u32(mvhd, 4)?),
            be_u32(mvhd, 12)?,
            u64::from(be_u32(mvhd, 16)?),
        ),
    };
    let duration_sec = (timescale > 0).then(|| duration as f64 / f64::from(timescale));
    Some(MovieHeader { duration_sec, creation_time: mac_time(created) })
}

fn mac_time(secs: u64) -> Option<String> {
    if secs == 0 {
        return None;
    }
    let unix = i64::try_from(secs).ok()? - MAC_EPOCH_OFFSET;
    let epoch: DateTime<Utc> = Utc.timestamp_opt(0, 0).single()?;
    let at = epoch.checked_add_signed(ChronoDuration::seconds(unix))?;
    Some(at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Width and height of the first track with a non-zero size (`tkhd`,
/// 16.16 fixed point).
pub(crate) fn track_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    find_boxes(data, b"tkhd").find_map(|tkhd| {
        let at = if tkhd.first() == Some(&1) { 88 } else { 76 };
        let w = be_u32(tkhd, at)? >> 16;
        let h = be_u32(tkhd, at + 4)? >> 16;
        (w > 0 && h > 0).then_some((w, h))
    })
}

pub(crate) fn video_codec(data: &[u8]) -> Option<&'static str> {
    const CODECS: [(&[u8; 4], &str); 6] = [
        (b"avc1", "h264"),
        (b"avc3", "h264"),
        (b"hvc1", "hevc"),
        (b"hev1", "hevc"),
        (b"av01", "av1"),
        (b"mp4v", "mpeg4"),
    ];
    CODECS
        .iter()
        .find(|(code, _)| find_boxes(data, code).next().is_some())
        .map(|(_, name)| *name)
}

pub(crate) fn audio_codec(data: &[u8]) -> Option<&'static str> {
    const CODECS: [(&[u8; 4], &str); 4] = [
        (b"mp4a", "aac"),
        (b"alac", "alac"),
        (b"ac-3", "ac3"),
        (b"Opus", "opus"),
    ];
    CODECS
        .iter()
        .find(|(code, _)| find_boxes(data, code).next().is_some())
        .map(|(_, name)| *name)
}

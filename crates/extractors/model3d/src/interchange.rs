//! Interchange formats identified by header: Autodesk FBX and STEP (ISO 10303-21).

use std::sync::OnceLock;

use regex::Regex;

use crate::mesh::find;
use crate::Parsed;

pub(crate) const FBX_BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary";

pub(crate) fn read_fbx(data: &[u8]) -> Parsed {
    if data.starts_with(FBX_BINARY_MAGIC) {
        let mut parsed = Parsed::new("FBX", true, "application/vnd.autodesk.fbx");
        let version = data.get(23..27).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        parsed.meta.tool = binary_creator(data);
        parsed.info = match version {
            Some(v) => format!("FBX {}.{} binary", v / 1000, v % 1000 / 100),
            None => "FBX binary".to_string(),
        };
        parsed.issues.push("FBX geometry not parsed".to_string());
        return parsed;
    }

    let mut parsed = Parsed::new("FBX", false, "application/vnd.autodesk.fbx");
    let text = String::from_utf8_lossy(&data[..data.len().min(64 * 1024)]);
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Creator:") {
            parsed.meta.tool = Some(rest.trim().trim_matches('"').to_string());
            break;
        }
    }
    parsed.info = "FBX ASCII".to_string();
    parsed.issues.push("FBX geometry not parsed".to_string());
    parsed
}

/// The `Creator` node's string property: name length 7, the name, then an
/// `S` property with a little-endian u32 length.
fn binary_creator(data: &[u8]) -> Option<String> {
    let at = find(data, b"\x07Creator")? + 8;
    if *data.get(at)? != b'S' {
        return None;
    }
    let len = data.get(at + 1..at + 5).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))? as usize;
    let raw = data.get(at + 5..at + 5 + len)?;
    let creator = String::from_utf8_lossy(raw).trim().to_string();
    (!creator.is_empty()).then_some(creator)
}

fn file_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)FILE_NAME\s*\(\s*'(?:[^']|'')*'\s*,\s*'(?:[^']|'')*'\s*,\s*\(([^)]*)\)\s*,\s*\([^)]*\)\s*,\s*'((?:[^']|'')*)'\s*,\s*'((?:[^']|'')*)'",
        )
        .expect("static regex")
    })
}

/// Authoring details from the `HEADER` section; cartesian points and
/// advanced faces stand in for vertex and face counts.
pub(crate) fn read_step(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("STEP", false, "model/step");
    let text = String::from_utf8_lossy(data);

    if let Some(cap) = file_name_re().captures(&text) {
        let authors: Vec<&str> = cap[1]
            .split(',')
            .map(|a| a.trim().trim_matches('\''))
            .filter(|a| !a.is_empty())
            .collect();
        if !authors.is_empty() {
            parsed.meta.author = Some(authors.join(", "));
        }
        let system = cap[3].trim();
        let preprocessor = cap[2].trim();
        parsed.meta.tool = [system, preprocessor]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string);
    }

    let points = text.matches("CARTESIAN_POINT(").count() as u64;
    let faces = text.matches("ADVANCED_FACE(").count() as u64;
    parsed.meta.vertex_count = Some(points);
    parsed.meta.face_count = Some(faces);
    parsed.meta.mesh_count = Some(text.matches("MANIFOLD_SOLID_BREP(").count() as u64);
    parsed.info = "STEP (ISO 10303-21)".to_string();
    parsed
}

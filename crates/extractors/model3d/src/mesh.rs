//! Mesh formats whose geometry is read directly: STL, Wavefront OBJ, PLY.

use std::collections::HashSet;
use std::io::Read;

use tracing::warn;

use crate::{Bounds, Parsed};

// ── STL ───────────────────────────────────────────────────────────────────────

/// ASCII only when the header says `solid`, the prefix is clean ASCII, and
/// the file size does not match the binary layout for the declared triangle
/// count.  Many binary exporters also start their header with "solid".
pub fn stl_is_ascii(head: &[u8], file_len: u64) -> bool {
    if !head.starts_with(b"solid") {
        return false;
    }
    let prefix = &head[..head.len().min(1024)];
    if !prefix.iter().all(|&b| b.is_ascii() && (b >= 0x20 || b.is_ascii_whitespace())) {
        return false;
    }
    match triangle_count(head) {
        Some(n) => file_len != 84 + 50 * u64::from(n),
        None => true,
    }
}

fn triangle_count(data: &[u8]) -> Option<u32> {
    data.get(80..84).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn read_stl(data: &[u8]) -> Parsed {
    if stl_is_ascii(data, data.len() as u64) {
        read_stl_ascii(data)
    } else {
        read_stl_binary(data, data.len() as u64)
    }
}

/// Streams the triangle records, so memory use does not grow with the file.
pub(crate) fn read_stl_binary<R: Read>(mut reader: R, file_len: u64) -> Parsed {
    let mut parsed = Parsed::new("STL", true, "model/stl");
    let mut header = [0u8; 84];
    if reader.read_exact(&mut header).is_err() {
        parsed.issues.push("binary STL shorter than its 84-byte header".to_string());
        return parsed;
    }
    let declared = triangle_count(&header).map(u64::from).unwrap_or(0);
    let available = file_len.saturating_sub(84) / 50;
    let faces = declared.min(available);
    if faces < declared {
        parsed.issues.push(format!("truncated: {faces} of {declared} triangles present"));
    }

    let mut bounds = Bounds::default();
    let mut triangle = [0u8; 50];
    let mut seen = 0u64;
    while seen < faces {
        if let Err(e) = reader.read_exact(&mut triangle) {
            warn!("binary STL read stopped after {seen} triangles: {e}");
            parsed.issues.push(format!("read failed after {seen} triangles: {e}"));
            break;
        }
        for v in 0..3 {
            let at = 12 + v * 12;
            let f = |k: usize| {
                let b = &triangle[at + k * 4..at + k * 4 + 4];
                f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64
            };
            bounds.extend([f(0), f(1), f(2)]);
        }
        seen += 1;
    }
    parsed.meta.face_count = Some(seen);
    parsed.meta.vertex_count = Some(seen * 3);
    parsed.meta.mesh_count = Some(1);
    bounds.apply(&mut parsed.meta);

    let name = String::from_utf8_lossy(&header[..80]);
    let name = name.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    parsed.info = format!("Binary STL Header: {name}");
    parsed
}

fn read_stl_ascii(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("STL", false, "model/stl");
    let text = String::from_utf8_lossy(data);
    let mut vertices = 0u64;
    let mut faces = 0u64;
    let mut bounds = Bounds::default();
    for line in text.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix("vertex") {
            vertices += 1;
            if let Some(p) = parse_point(rest) {
                bounds.extend(p);
            }
        } else if line.starts_with("facet") {
            faces += 1;
        }
    }
    parsed.meta.vertex_count = Some(vertices);
    parsed.meta.face_count = Some(faces);
    parsed.meta.mesh_count = Some(1);
    bounds.apply(&mut parsed.meta);
    parsed.info = "ASCII STL".to_string();
    parsed
}

// ── OBJ ───────────────────────────────────────────────────────────────────────

pub(crate) fn read_obj(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("OBJ", false, "model/obj");
    let text = String::from_utf8_lossy(data);
    let mut vertices = 0u64;
    let mut faces = 0u64;
    let mut objects = 0u64;
    let mut materials = HashSet::new();
    let mut has_library = false;
    let mut bounds = Bounds::default();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                vertices += 1;
                if let Some(p) = parse_point(&line.trim_start()[1..]) {
                    bounds.extend(p);
                }
            }
            Some("f") => faces += 1,
            Some("o") | Some("g") => objects += 1,
            Some("usemtl") => {
                if let Some(name) = parts.next() {
                    materials.insert(name.to_string());
                }
            }
            Some("mtllib") => has_library = true,
            _ => {}
        }
    }
    let meta = &mut parsed.meta;
    meta.vertex_count = Some(vertices);
    meta.face_count = Some(faces);
    meta.mesh_count = Some(if objects == 0 && vertices > 0 { 1 } else { objects });
    meta.material_count = Some(materials.len() as u64);
    bounds.apply(meta);
    parsed.info = if has_library {
        "Wavefront OBJ (material library referenced)".to_string()
    } else {
        "Wavefront OBJ".to_string()
    };
    parsed
}

// ── PLY ───────────────────────────────────────────────────────────────────────

pub(crate) fn read_ply(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("PLY", false, "model/ply");
    let Some(header_end) = find(data, b"end_header") else {
        parsed.issues.push("PLY header has no end_header".to_string());
        return parsed;
    };
    let header = String::from_utf8_lossy(&data[..header_end]);

    let mut binary = false;
    let mut vertices = None;
    let mut faces = None;
    let mut in_vertex = false;
    let mut vertex_props: Vec<String> = Vec::new();
    for line in header.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["format", kind, ..] => binary = kind.starts_with("binary"),
            ["element", name, count, ..] => {
                in_vertex = *name == "vertex";
                let count = count.parse::<u64>().ok();
                match *name {
                    "vertex" => vertices = count,
                    "face" => faces = count,
                    _ => {}
                }
            }
            ["property", .., prop] if in_vertex => vertex_props.push(prop.to_string()),
            ["comment", rest @ ..] => {
                let comment = rest.join(" ");
                if let Some(tool) = comment.strip_prefix("Created by ").or_else(|| comment.strip_prefix("generated by ")) {
                    parsed.meta.tool = Some(tool.to_string());
                } else if let Some(author) = comment.strip_prefix("author ") {
                    parsed.meta.author = Some(author.to_string());
                }
            }
            _ => {}
        }
    }

    parsed.meta.is_binary = Some(binary);
    parsed.meta.vertex_count = vertices;
    parsed.meta.face_count = faces;
    parsed.meta.mesh_count = Some(1);

    if !binary {
        let axis = |name: &str| vertex_props.iter().position(|p| p == name);
        if let (Some(x), Some(y), Some(z)) = (axis("x"), axis("y"), axis("z")) {
            let body = String::from_utf8_lossy(&data[header_end + "end_header".len()..]);
            let mut bounds = Bounds::default();
            for line in body.lines().filter(|l| !l.trim().is_empty()).take(vertices.unwrap_or(0) as usize) {
                let values: Vec<f64> = line.split_whitespace().filter_map(|v| v.parse().ok()).collect();
                if let (Some(&px), Some(&py), Some(&pz)) = (values.get(x), values.get(y), values.get(z)) {
                    bounds.extend([px, py, pz]);
                }
            }
            bounds.apply(&mut parsed.meta);
        }
    }
    parsed.info = format!("PLY Header detected. Format: {}", if binary { "Binary" } else { "ASCII" });
    parsed
}

fn parse_point(text: &str) -> Option<[f64; 3]> {
    let mut it = text.split_whitespace().map(|v| v.parse::<f64>());
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Some([x, y, z]),
        _ => None,
    }
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

//! 3D models and CAD exchange files.
//!
//! The parser is picked from the content where a format has a signature
//! (glTF binary, FBX binary, PLY, STEP) and from the extension otherwise.
//! Every record carries a short technical summary as its excerpt.

mod gltf;
mod interchange;
mod mesh;

use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use casefile_extract_types::records::Model3dMeta;
use casefile_extract_types::{
    lower_ext, Excerpts, ExtractOutcome, Extractor, ExtractorConfig, Family, FamilyMeta, Source, TypeRecord,
};

pub use mesh::stl_is_ascii;

pub struct Model3dExtractor;

impl Extractor for Model3dExtractor {
    fn family(&self) -> Family {
        Family::Model3d
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(
            lower_ext(path).as_str(),
            "stl" | "obj" | "ply" | "gltf" | "glb" | "fbx" | "step" | "stp"
        )
    }

    fn extract(&self, path: &Path, cfg: &ExtractorConfig) -> ExtractOutcome {
        match Source::open(path) {
            Ok(mut src) => extract_source(&mut src, &lower_ext(path), cfg.max_parse_bytes),
            Err(reason) => ExtractOutcome::Failure(reason),
        }
    }
}

/// Enough for every signature and the ASCII STL check.
const HEAD_LEN: u64 = 1024;

/// Binary STL is streamed triangle by triangle; every other format is
/// parsed from memory, reading at most `limit` bytes.
fn extract_source(src: &mut Source, ext: &str, limit: u64) -> ExtractOutcome {
    let head = match src.head(HEAD_LEN) {
        Ok(h) => h,
        Err(reason) => return ExtractOutcome::Failure(reason),
    };

    let parsed = if ext == "stl" && !has_signature(&head) && !mesh::stl_is_ascii(&head, src.len()) {
        debug!("streaming binary STL {}", src.path().display());
        if let Err(e) = src.file_mut().seek(SeekFrom::Start(0)) {
            return ExtractOutcome::Failure(format!("cannot read {}: {e}", src.path().display()));
        }
        let len = src.len();
        Some(mesh::read_stl_binary(BufReader::new(src.file_mut()), len))
    } else {
        let data = match src.head(limit) {
            Ok(d) => d,
            Err(reason) => return ExtractOutcome::Failure(reason),
        };
        let mut parsed = parse(&data, ext);
        if let Some(p) = parsed.as_mut().filter(|_| src.len() > limit) {
            debug!("{} is {} bytes; parsed the first {limit}", src.path().display(), src.len());
            p.issues.push(format!("only the first {limit} bytes were parsed"));
        }
        parsed
    };

    let Some(parsed) = parsed else {
        debug!("no 3D parser for {} (extension {ext:?})", src.path().display());
        let record = TypeRecord::new(FamilyMeta::Model3d(Model3dMeta::default()))
            .with_mime("application/octet-stream");
        return ExtractOutcome::PartialSuccess(record, "unrecognised 3D format".to_string());
    };
    let summary = parsed.summary();
    let record = TypeRecord::new(FamilyMeta::Model3d(parsed.meta))
        .with_mime(parsed.mime)
        .with_excerpts(Excerpts::from_text(&summary));
    ExtractOutcome::from_issues(record, parsed.issues)
}

fn has_signature(data: &[u8]) -> bool {
    data.starts_with(b"glTF")
        || data.starts_with(interchange::FBX_BINARY_MAGIC)
        || data.starts_with(b"ply\n")
        || data.starts_with(b"ply\r\n")
        || data.starts_with(b"ISO-10303-21")
}

fn parse(data: &[u8], ext: &str) -> Option<Parsed> {
    let parsed = if data.starts_with(b"glTF") {
        gltf::read_glb(data)
    } else if data.starts_with(interchange::FBX_BINARY_MAGIC) {
        interchange::read_fbx(data)
    } else if data.starts_with(b"ply\n") || data.starts_with(b"ply\r\n") {
        mesh::read_ply(data)
    } else if data.starts_with(b"ISO-10303-21") {
        interchange::read_step(data)
    } else {
        match ext {
            "stl" => mesh::read_stl(data),
            "obj" => mesh::read_obj(data),
            "gltf" => gltf::read_gltf(data),
            "fbx" => interchange::read_fbx(data),
            "ply" => mesh::read_ply(data),
            "step" | "stp" => interchange::read_step(data),
            _ => return None,
        }
    };
    Some(parsed)
}

/// What one format reader recovered.
#[derive(Debug)]
pub(crate) struct Parsed {
    pub(crate) meta: Model3dMeta,
    pub(crate) info: String,
    pub(crate) mime: &'static str,
    pub(crate) issues: Vec<String>,
}

impl Parsed {
    pub(crate) fn new(format: &str, binary: bool, mime: &'static str) -> Self {
        Self {
            meta: Model3dMeta {
                format: Some(format.to_string()),
                is_binary: Some(binary),
                ..Default::default()
            },
            info: String::new(),
            mime,
            issues: Vec::new(),
        }
    }

    fn summary(&self) -> String {
        let m = &self.meta;
        let count = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        let mut lines = vec![
            format!("FORMAT: {}", m.format.as_deref().unwrap_or("Unknown")),
            format!("ENCODING: {}", if m.is_binary == Some(true) { "Binary" } else { "ASCII" }),
            format!("VERTICES: {}", count(m.vertex_count)),
            format!("FACES: {}", count(m.face_count)),
        ];
        if let Some(meshes) = m.mesh_count {
            lines.push(format!("MESHES: {meshes}"));
        }
        if let (Some(x0), Some(y0), Some(z0), Some(x1), Some(y1), Some(z1)) =
            (m.bbox_min_x, m.bbox_min_y, m.bbox_min_z, m.bbox_max_x, m.bbox_max_y, m.bbox_max_z)
        {
            lines.push(format!("BBOX: ({x0}, {y0}, {z0}) - ({x1}, {y1}, {z1})"));
        }
        if let Some(tool) = &m.tool {
            lines.push(format!("TOOL: {tool}"));
        }
        if let Some(author) = &m.author {
            lines.push(format!("AUTHOR: {author}"));
        }
        lines.push(format!("INFO: {}", self.info));
        lines.join("\n")
    }
}

/// Axis-aligned bounding box accumulated point by point.
#[derive(Debug, Default)]
pub(crate) struct Bounds {
    min: Option<[f64; 3]>,
    max: [f64; 3],
}

impl Bounds {
    pub(crate) fn extend(&mut self, p: [f64; 3]) {
        if p.iter().any(|v| !v.is_finite()) {
            return;
        }
        match &mut self.min {
            None => {
                self.min = Some(p);
                self.max = p;
            }
            Some(min) => {
                for k in 0..3 {
                    min[k] = min[k].min(p[k]);
                    self.max[k] = self.max[k].max(p[k]);
                }
            }
        }
    }

    /// Leaves the box fields null when no point was seen.
    pub(crate) fn apply(&self, meta: &mut Model3dMeta) {
        if let Some(min) = self.min {
            meta.bbox_min_x = Some(min[0]);
            meta.bbox_min_y = Some(min[1]);
            meta.bbox_min_z = Some(min[2]);
            meta.bbox_max_x = Some(self.max[0]);
            meta.bbox_max_y = Some(self.max[1]);
            meta.bbox_max_z = Some(self.max[2]);
        }
    }
}

//! glTF 2.0, as JSON (`.gltf`) or binary container (`.glb`).

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{Bounds, Parsed};

const GLB_JSON_CHUNK: u32 = 0x4E4F_534A;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Document {
    asset: Asset,
    meshes: Vec<Mesh>,
    accessors: Vec<Accessor>,
    materials: Vec<Value>,
    textures: Vec<Value>,
    animations: Vec<Value>,
    cameras: Vec<Value>,
    extensions: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Asset {
    generator: Option<String>,
    copyright: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Mesh {
    primitives: Vec<Primitive>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Primitive {
    attributes: HashMap<String, usize>,
    indices: Option<usize>,
    mode: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Accessor {
    count: u64,
    min: Option<Vec<f64>>,
    max: Option<Vec<f64>>,
}

pub(crate) fn read_gltf(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("GLTF", false, "model/gltf+json");
    parsed.info = "GLTF JSON".to_string();
    apply_json(data, &mut parsed);
    parsed
}

pub(crate) fn read_glb(data: &[u8]) -> Parsed {
    let mut parsed = Parsed::new("GLTF", true, "model/gltf-binary");
    parsed.info = "GLTF Binary (GLB)".to_string();

    let u32_at = |at: usize| {
        data.get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    };
    match (u32_at(12), u32_at(16)) {
        (Some(len), Some(GLB_JSON_CHUNK)) => {
            let end = 20usize.saturating_add(len as usize);
            match data.get(20..end) {
                Some(json) => apply_json(json, &mut parsed),
                None => parsed.issues.push("JSON chunk extends past end of file".to_string()),
            }
        }
        (Some(_), Some(_)) => parsed.issues.push("first GLB chunk is not JSON".to_string()),
        _ => parsed.issues.push("GLB header truncated".to_string()),
    }
    parsed
}

fn apply_json(json: &[u8], parsed: &mut Parsed) {
    let doc: Document = match serde_json::from_slice(json) {
        Ok(doc) => doc,
        Err(e) => {
            parsed.issues.push(format!("invalid glTF JSON: {e}"));
            return;
        }
    };
    let meta = &mut parsed.meta;
    let accessor = |i: usize| doc.accessors.get(i);

    let mut vertices = 0u64;
    let mut faces = 0u64;
    let mut bounds = Bounds::default();
    for primitive in doc.meshes.iter().flat_map(|m| &m.primitives) {
        let position = primitive.attributes.get("POSITION").and_then(|&i| accessor(i));
        let Some(position) = position else { continue };
        vertices += position.count;
        if let (Some(min), Some(max)) = (&position.min, &position.max) {
            if min.len() >= 3 && max.len() >= 3 {
                bounds.extend([min[0], min[1], min[2]]);
                bounds.extend([max[0], max[1], max[2]]);
            }
        }
        let drawn = primitive
            .indices
            .and_then(accessor)
            .map(|a| a.count)
            .unwrap_or(position.count);
        faces += match primitive.mode.unwrap_or(4) {
            4 => drawn / 3,
            5 | 6 => drawn.saturating_sub(2),
            _ => 0,
        };
    }

    meta.mesh_count = Some(doc.meshes.len() as u64);
    meta.vertex_count = Some(vertices);
    meta.face_count = Some(faces);
    meta.material_count = Some(doc.materials.len() as u64);
    meta.texture_count = Some(doc.textures.len() as u64);
    meta.has_animations = Some(!doc.animations.is_empty());
    meta.has_cameras = Some(!doc.cameras.is_empty());
    meta.has_lights = Some(
        doc.extensions
            .get("KHR_lights_punctual")
            .and_then(|ext| ext.get("lights"))
            .and_then(Value::as_array)
            .is_some_and(|lights| !lights.is_empty()),
    );
    meta.tool = doc.asset.generator.clone();
    meta.author = doc.asset.copyright.clone();
    bounds.apply(meta);

    parsed.info.push_str(&format!(" | Meshes: {}", doc.meshes.len()));
    if let Some(version) = &doc.asset.version {
        parsed.info.push_str(&format!(" | glTF {version}"));
    }
}

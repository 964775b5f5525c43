//! Wavefront OBJ reader, the mesh-only legacy source format
//!
//! OBJ carries no skinning or scene metadata, so every mesh it produces is
//! unskinned. Faces with more than three corners are fan-triangulated.

use crate::types::{SceneData, SceneMesh};
use lodestar_core::{LodestarError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub fn load_obj_scene<P: AsRef<Path>>(path: P) -> Result<SceneData> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let mesh = parse_obj(&text, name)?;
    Ok(SceneData { meshes: vec![mesh] })
}

pub(crate) fn parse_obj(text: &str, name: String) -> Result<SceneMesh> {
    let mut src_positions: Vec<[f32; 3]> = Vec::new();
    let mut src_normals: Vec<[f32; 3]> = Vec::new();
    let mut src_uvs: Vec<[f32; 2]> = Vec::new();
    let mut material: Option<String> = None;

    // Corner (v/vt/vn) to output vertex index
    let mut corner_cache: HashMap<(usize, Option<usize>, Option<usize>), u32> = HashMap::new();
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => src_positions.push(parse_floats::<3>(parts, line_no)?),
            Some("vn") => src_normals.push(parse_floats::<3>(parts, line_no)?),
            Some("vt") => src_uvs.push(parse_floats::<2>(parts, line_no)?),
            Some("usemtl") => material = parts.next().map(String::from),
            Some("f") => {
                let corners: Vec<&str> = parts.collect();
                if corners.len() < 3 {
                    return Err(LodestarError::SceneError(format!(
                        "face with fewer than 3 corners on line {}",
                        line_no + 1
                    )));
                }
                let mut face = Vec::with_capacity(corners.len());
                for corner in corners {
                    let key = parse_corner(corner, src_positions.len(), line_no)?;
                    let next = positions.len() as u32;
                    let index = *corner_cache.entry(key).or_insert_with(|| {
                        positions.push(src_positions[key.0]);
                        if let Some(vt) = key.1 {
                            if let Some(uv) = src_uvs.get(vt) {
                                uvs.push(*uv);
                            }
                        }
                        if let Some(vn) = key.2 {
                            if let Some(n) = src_normals.get(vn) {
                                normals.push(*n);
                            }
                        }
                        next
                    });
                    face.push(index);
                }
                for i in 1..face.len() - 1 {
                    indices.extend_from_slice(&[face[0], face[i], face[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(LodestarError::SceneError(
            "OBJ file contains no geometry".to_string(),
        ));
    }

    Ok(SceneMesh {
        name,
        material,
        positions,
        normals,
        uvs,
        indices,
        joint_indices: None,
        joint_weights: None,
        skin_joint_names: Vec::new(),
    })
}

fn parse_floats<'a, const N: usize>(
    parts: impl Iterator<Item = &'a str>,
    line_no: usize,
) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for part in parts.take(N) {
        out[count] = part.parse().map_err(|_| {
            LodestarError::SceneError(format!("bad float '{}' on line {}", part, line_no + 1))
        })?;
        count += 1;
    }
    if count < N {
        return Err(LodestarError::SceneError(format!(
            "expected {} values on line {}",
            N,
            line_no + 1
        )));
    }
    Ok(out)
}

fn parse_corner(
    corner: &str,
    position_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>, Option<usize>)> {
    let mut fields = corner.split('/');
    let v = parse_obj_index(fields.next(), line_no)?.ok_or_else(|| {
        LodestarError::SceneError(format!("face corner missing position on line {}", line_no + 1))
    })?;
    if v >= position_count {
        return Err(LodestarError::SceneError(format!(
            "face references vertex {} but only {} are defined",
            v + 1,
            position_count
        )));
    }
    let vt = parse_obj_index(fields.next(), line_no)?;
    let vn = parse_obj_index(fields.next(), line_no)?;
    Ok((v, vt, vn))
}

/// OBJ indices are one-based; empty fields are allowed in `v//vn` corners
fn parse_obj_index(field: Option<&str>, line_no: usize) -> Result<Option<usize>> {
    match field {
        None | Some("") => Ok(None),
        Some(text) => {
            let value: i64 = text.parse().map_err(|_| {
                LodestarError::SceneError(format!(
                    "bad face index '{}' on line {}",
                    text,
                    line_no + 1
                ))
            })?;
            if value < 1 {
                return Err(LodestarError::SceneError(format!(
                    "unsupported face index {} on line {}",
                    value,
                    line_no + 1
                )));
            }
            Ok(Some(value as usize - 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl mat_floor
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = parse_obj(QUAD, "quad".to_string()).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.material.as_deref(), Some("mat_floor"));
        assert!(!mesh.is_skinned());
    }

    #[test]
    fn test_position_only_corners() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", "tri".to_string()).unwrap();
        assert_eq!(mesh.indices.len(), 3);
        assert!(mesh.normals.is_empty());
        assert!(mesh.uvs.is_empty());
    }

    #[test]
    fn test_out_of_range_face_index() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n", "bad".to_string()).is_err());
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(parse_obj("", "empty".to_string()).is_err());
    }
}

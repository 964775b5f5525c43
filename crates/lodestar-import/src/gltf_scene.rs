//! glTF/GLB scene reader

use crate::types::{SceneData, SceneMesh};
use lodestar_core::{LodestarError, Result};
use std::path::Path;

/// Read a glTF or GLB scene, extracting per-primitive geometry and the
/// bone names each primitive's skin binds
pub fn load_gltf_scene<P: AsRef<Path>>(path: P) -> Result<SceneData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path).map_err(|e| {
        LodestarError::SceneError(format!("failed to read {}: {}", path.display(), e))
    })?;

    let mut meshes = Vec::new();

    for node in document.nodes() {
        let mesh = match node.mesh() {
            Some(mesh) => mesh,
            None => continue,
        };

        let skin_joint_names: Vec<String> = node
            .skin()
            .map(|skin| {
                skin.joints()
                    .map(|joint| {
                        joint
                            .name()
                            .map(String::from)
                            .unwrap_or_else(|| format!("joint_{}", joint.index()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mesh_name = mesh
            .name()
            .or_else(|| node.name())
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_default();

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_default();

            let joint_indices: Option<Vec<[u16; 4]>> = reader
                .read_joints(0)
                .map(|iter| iter.into_u16().collect());

            let joint_weights: Option<Vec<[f32; 4]>> = reader
                .read_weights(0)
                .map(|iter| iter.into_f32().collect());

            let material = primitive.material().name().map(String::from);

            let name = if mesh.primitives().len() > 1 {
                format!("{}_{}", mesh_name, primitive.index())
            } else {
                mesh_name.clone()
            };

            meshes.push(SceneMesh {
                name,
                material,
                positions,
                normals,
                uvs,
                indices,
                joint_indices,
                joint_weights,
                skin_joint_names: skin_joint_names.clone(),
            });
        }
    }

    Ok(SceneData { meshes })
}

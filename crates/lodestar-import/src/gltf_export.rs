//! GLB scene writer
//!
//! Serializes one LOD's meshes plus the resolved skeleton set into a
//! self-contained binary glTF. Skinned meshes pick whichever provided
//! skeleton resolves the most of their bound joint names; with no skeleton
//! provided they are written unskinned.

use crate::types::ExportSkeleton;
use glam::{Mat4, Quat, Vec3};
use gltf::json::{self, validation::Checked::Valid, validation::USize64, Index};
use lodestar_core::{LodestarError, Result};
use lodestar_formats::ModelMesh;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

type Attributes =
    BTreeMap<json::validation::Checked<json::mesh::Semantic>, Index<json::Accessor>>;

/// Binary payload under construction: one buffer, one view per attribute
#[derive(Default)]
struct BinBuffer {
    bytes: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BinBuffer {
    fn push_view(&mut self, data: &[u8], target: Option<json::buffer::Target>) -> Index<json::buffer::View> {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(data);
        let index = Index::new(self.views.len() as u32);
        self.views.push(json::buffer::View {
            buffer: Index::new(0),
            byte_length: USize64::from(data.len()),
            byte_offset: Some(USize64::from(offset)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });
        index
    }

    fn push_accessor(
        &mut self,
        view: Index<json::buffer::View>,
        count: usize,
        component_type: json::accessor::ComponentType,
        type_: json::accessor::Type,
        min: Option<serde_json::Value>,
        max: Option<serde_json::Value>,
    ) -> Index<json::Accessor> {
        let index = Index::new(self.accessors.len() as u32);
        self.accessors.push(json::Accessor {
            buffer_view: Some(view),
            byte_offset: Some(USize64(0)),
            count: USize64::from(count),
            component_type: Valid(json::accessor::GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });
        index
    }

    fn push_vec3(&mut self, data: &[[f32; 3]], with_bounds: bool) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(json::buffer::Target::ArrayBuffer));
        let (min, max) = if with_bounds {
            let bounds = vec3_bounds(data);
            (
                Some(serde_json::Value::from(bounds.0.to_vec())),
                Some(serde_json::Value::from(bounds.1.to_vec())),
            )
        } else {
            (None, None)
        };
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec3,
            min,
            max,
        )
    }

    fn push_vec2(&mut self, data: &[[f32; 2]]) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(json::buffer::Target::ArrayBuffer));
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec2,
            None,
            None,
        )
    }

    fn push_vec4_f32(&mut self, data: &[[f32; 4]]) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(json::buffer::Target::ArrayBuffer));
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec4,
            None,
            None,
        )
    }

    fn push_vec4_u16(&mut self, data: &[[u16; 4]]) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(json::buffer::Target::ArrayBuffer));
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::U16,
            json::accessor::Type::Vec4,
            None,
            None,
        )
    }

    fn push_indices(&mut self, data: &[u32]) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes, Some(json::buffer::Target::ElementArrayBuffer));
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::U32,
            json::accessor::Type::Scalar,
            None,
            None,
        )
    }

    fn push_mat4(&mut self, data: &[[f32; 16]]) -> Index<json::Accessor> {
        let bytes: Vec<u8> = data.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes, None);
        self.push_accessor(
            view,
            data.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Mat4,
            None,
            None,
        )
    }
}

fn vec3_bounds(data: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in data {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    if data.is_empty() {
        return ([0.0; 3], [0.0; 3]);
    }
    (min, max)
}

fn empty_node() -> json::Node {
    json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: None,
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    }
}

/// A skeleton instantiated as glTF nodes plus its skin
struct SkinBinding {
    skin_index: Index<json::Skin>,
    root_node: Index<json::Node>,
    /// Joint name to position in the skin's joint list
    joint_slots: BTreeMap<String, u16>,
}

/// World-space joint matrices, parents resolved in any declaration order
fn joint_globals(skeleton: &ExportSkeleton) -> Vec<Mat4> {
    let locals: Vec<Mat4> = skeleton
        .joints
        .iter()
        .map(|j| {
            Mat4::from_scale_rotation_translation(
                Vec3::from_array(j.scale),
                Quat::from_xyzw(j.rotation[0], j.rotation[1], j.rotation[2], j.rotation[3]),
                Vec3::from_array(j.translation),
            )
        })
        .collect();

    let mut globals: Vec<Option<Mat4>> = vec![None; skeleton.joints.len()];
    for i in 0..skeleton.joints.len() {
        resolve_global(skeleton, &locals, &mut globals, i);
    }
    globals.into_iter().map(|g| g.unwrap_or(Mat4::IDENTITY)).collect()
}

fn resolve_global(
    skeleton: &ExportSkeleton,
    locals: &[Mat4],
    globals: &mut Vec<Option<Mat4>>,
    index: usize,
) -> Mat4 {
    if let Some(global) = globals[index] {
        return global;
    }
    let global = match skeleton.joints[index].parent {
        Some(parent) if parent < locals.len() && parent != index => {
            resolve_global(skeleton, locals, globals, parent) * locals[index]
        }
        _ => locals[index],
    };
    globals[index] = Some(global);
    global
}

fn instantiate_skeleton(
    skeleton: &ExportSkeleton,
    nodes: &mut Vec<json::Node>,
    skins: &mut Vec<json::Skin>,
    bin: &mut BinBuffer,
) -> SkinBinding {
    let base = nodes.len() as u32;
    let mut joint_slots = BTreeMap::new();
    let mut root_node = None;

    for (i, joint) in skeleton.joints.iter().enumerate() {
        let mut node = empty_node();
        node.name = Some(joint.name.clone());
        node.translation = Some(joint.translation);
        node.rotation = Some(json::scene::UnitQuaternion(joint.rotation));
        node.scale = Some(joint.scale);
        nodes.push(node);
        joint_slots.insert(joint.name.clone(), i as u16);
        if joint.parent.is_none() && root_node.is_none() {
            root_node = Some(Index::new(base + i as u32));
        }
    }

    // Wire up children now that every joint node exists
    for (i, joint) in skeleton.joints.iter().enumerate() {
        if let Some(parent) = joint.parent {
            let child = Index::new(base + i as u32);
            let parent_node = &mut nodes[base as usize + parent];
            parent_node.children.get_or_insert_with(Vec::new).push(child);
        }
    }

    let globals = joint_globals(skeleton);
    let ibms: Vec<[f32; 16]> = globals.iter().map(|g| g.inverse().to_cols_array()).collect();
    let ibm_accessor = bin.push_mat4(&ibms);

    let root_node = root_node.unwrap_or(Index::new(base));
    let skin_index = Index::new(skins.len() as u32);
    skins.push(json::Skin {
        extensions: Default::default(),
        extras: Default::default(),
        inverse_bind_matrices: Some(ibm_accessor),
        joints: (0..skeleton.joints.len() as u32)
            .map(|i| Index::new(base + i))
            .collect(),
        name: Some(skeleton.name.clone()),
        skeleton: Some(root_node),
    });

    SkinBinding {
        skin_index,
        root_node,
        joint_slots,
    }
}

/// Pick the provided skeleton that resolves the most of the mesh's bound
/// joint names; ties go to the earlier skeleton in the candidate set
fn best_skin<'a>(
    bindings: &'a [SkinBinding],
    bound_names: &[&str],
) -> Option<&'a SkinBinding> {
    bindings
        .iter()
        .map(|binding| {
            let hits = bound_names
                .iter()
                .filter(|name| binding.joint_slots.contains_key(**name))
                .count();
            (binding, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.skin_index.value().cmp(&a.0.skin_index.value())))
        .map(|(binding, _)| binding)
}

/// Write one LOD's meshes and the resolved skeleton set as a GLB file.
///
/// `joint_names` is the model container's joint table; each mesh's
/// influences index into it.
pub fn write_scene_glb<P: AsRef<Path>>(
    path: P,
    meshes: &[ModelMesh],
    joint_names: &[String],
    skeletons: &[ExportSkeleton],
) -> Result<()> {
    let mut bin = BinBuffer::default();
    let mut nodes: Vec<json::Node> = Vec::new();
    let mut skins: Vec<json::Skin> = Vec::new();
    let mut gltf_meshes: Vec<json::Mesh> = Vec::new();
    let mut scene_roots: Vec<Index<json::Node>> = Vec::new();

    let bindings: Vec<SkinBinding> = skeletons
        .iter()
        .map(|skeleton| instantiate_skeleton(skeleton, &mut nodes, &mut skins, &mut bin))
        .collect();
    for binding in &bindings {
        scene_roots.push(binding.root_node);
    }

    let mut materials: Vec<json::Material> = Vec::new();
    let mut material_indices: BTreeMap<String, Index<json::Material>> = BTreeMap::new();

    for mesh in meshes {
        let mut attributes: Attributes = BTreeMap::new();
        attributes.insert(
            Valid(json::mesh::Semantic::Positions),
            bin.push_vec3(&mesh.positions, true),
        );
        if !mesh.normals.is_empty() {
            attributes.insert(
                Valid(json::mesh::Semantic::Normals),
                bin.push_vec3(&mesh.normals, false),
            );
        }
        if !mesh.uvs.is_empty() {
            attributes.insert(
                Valid(json::mesh::Semantic::TexCoords(0)),
                bin.push_vec2(&mesh.uvs),
            );
        }

        let mut mesh_skin = None;
        if let Some(influences) = &mesh.influences {
            let bound_names: Vec<&str> = influences
                .joints
                .iter()
                .flatten()
                .map(|&i| joint_names[i as usize].as_str())
                .collect();
            if let Some(binding) = best_skin(&bindings, &bound_names) {
                let remapped: Vec<[u16; 4]> = influences
                    .joints
                    .iter()
                    .map(|quad| {
                        quad.map(|i| {
                            binding
                                .joint_slots
                                .get(joint_names[i as usize].as_str())
                                .copied()
                                .unwrap_or(0)
                        })
                    })
                    .collect();
                attributes.insert(
                    Valid(json::mesh::Semantic::Joints(0)),
                    bin.push_vec4_u16(&remapped),
                );
                attributes.insert(
                    Valid(json::mesh::Semantic::Weights(0)),
                    bin.push_vec4_f32(&influences.weights),
                );
                mesh_skin = Some(binding.skin_index);
            }
        }

        let material = if mesh.material.is_empty() {
            None
        } else {
            Some(
                *material_indices
                    .entry(mesh.material.clone())
                    .or_insert_with(|| {
                        let index = Index::new(materials.len() as u32);
                        materials.push(json::Material {
                            name: Some(mesh.material.clone()),
                            ..Default::default()
                        });
                        index
                    }),
            )
        };

        let indices_accessor = bin.push_indices(&mesh.indices);
        let mesh_index = Index::new(gltf_meshes.len() as u32);
        gltf_meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(mesh.name.clone()),
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(indices_accessor),
                material,
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            }],
            weights: None,
        });

        let mut node = empty_node();
        node.name = Some(mesh.name.clone());
        node.mesh = Some(mesh_index);
        node.skin = mesh_skin;
        let node_index = Index::new(nodes.len() as u32);
        nodes.push(node);
        scene_roots.push(node_index);
    }

    let buffer = json::Buffer {
        byte_length: USize64::from(bin.bytes.len()),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    };

    let root = json::Root {
        accessors: bin.accessors,
        buffers: vec![buffer],
        buffer_views: bin.views,
        materials,
        meshes: gltf_meshes,
        nodes,
        scene: Some(Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            nodes: scene_roots,
        }],
        skins,
        ..Default::default()
    };

    let json_string = json::serialize::to_string(&root)
        .map_err(|e| LodestarError::ExportError(format!("scene serialization failed: {}", e)))?;
    let mut json_bytes = json_string.into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let mut bin_bytes = bin.bytes;
    while bin_bytes.len() % 4 != 0 {
        bin_bytes.push(0);
    }

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: (12 + 8 + json_bytes.len() + 8 + bin_bytes.len()) as u32,
        },
        json: Cow::Owned(json_bytes),
        bin: Some(Cow::Owned(bin_bytes)),
    };
    let file = File::create(path)?;
    glb.to_writer(file)
        .map_err(|e| LodestarError::ExportError(format!("GLB write failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExportJoint;

    fn two_joint_skeleton() -> ExportSkeleton {
        ExportSkeleton {
            name: "body".to_string(),
            joints: vec![
                ExportJoint {
                    name: "root".to_string(),
                    parent: None,
                    translation: [0.0, 0.0, 0.0],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                    scale: [1.0, 1.0, 1.0],
                },
                ExportJoint {
                    name: "spine".to_string(),
                    parent: Some(0),
                    translation: [0.0, 2.0, 0.0],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                    scale: [1.0, 1.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn test_joint_globals_accumulate_translation() {
        let globals = joint_globals(&two_joint_skeleton());
        let spine_translation = globals[1].w_axis;
        assert!((spine_translation.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_best_skin_prefers_most_hits() {
        let bindings = vec![
            SkinBinding {
                skin_index: Index::new(0),
                root_node: Index::new(0),
                joint_slots: BTreeMap::from([("root".to_string(), 0)]),
            },
            SkinBinding {
                skin_index: Index::new(1),
                root_node: Index::new(1),
                joint_slots: BTreeMap::from([
                    ("root".to_string(), 0),
                    ("spine".to_string(), 1),
                ]),
            },
        ];
        let best = best_skin(&bindings, &["root", "spine"]).unwrap();
        assert_eq!(best.skin_index.value(), 1);
    }

    #[test]
    fn test_best_skin_none_when_nothing_resolves() {
        let bindings = vec![SkinBinding {
            skin_index: Index::new(0),
            root_node: Index::new(0),
            joint_slots: BTreeMap::new(),
        }];
        assert!(best_skin(&bindings, &["tail"]).is_none());
    }

    #[test]
    fn test_vec3_bounds() {
        let (min, max) = vec3_bounds(&[[1.0, -1.0, 0.0], [-2.0, 3.0, 0.5]]);
        assert_eq!(min, [-2.0, -1.0, 0.0]);
        assert_eq!(max, [1.0, 3.0, 0.5]);
    }
}

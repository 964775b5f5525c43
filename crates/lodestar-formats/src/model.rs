//! Model container codec
//!
//! A model container holds an ordered list of LOD models (index 0 is the
//! highest detail level), a joint-name table referenced by per-vertex skin
//! influences, and the records for joints that were generated during a
//! previous import rather than authored in a skeleton. Generated joints
//! always occupy the trailing range of the joint table.

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};
use std::fs;
use std::path::Path;

pub const MODEL_MAGIC: &[u8; 4] = b"LMDL";
const MODEL_VERSION: u16 = 1;

/// Maximum number of detail levels a model container can hold
pub const MAX_LOD_SLOTS: usize = 8;

/// Record for a joint synthesized during import, persisted so the joint
/// keeps its identity on the next load
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedJointRecord {
    pub name: String,
    /// Name of the authored joint the generated joint is attached to
    pub parent: Option<String>,
}

/// Per-vertex skin influences, four joints per vertex, indices into the
/// container's joint table
#[derive(Debug, Clone, Default)]
pub struct MeshInfluences {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// A single mesh inside a LOD model
#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub name: String,
    pub material: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub influences: Option<MeshInfluences>,
}

/// One detail level: an ordered list of meshes
#[derive(Debug, Clone, Default)]
pub struct LodModel {
    pub meshes: Vec<ModelMesh>,
}

/// In-memory view of a model container
#[derive(Debug, Clone, Default)]
pub struct ModelFile {
    /// Joint names referenced by skin influences; authored joints first,
    /// generated joints in the trailing range
    pub joint_names: Vec<String>,
    /// One record per generated joint, aligned with the trailing range of
    /// `joint_names`
    pub generated_joints: Vec<GeneratedJointRecord>,
    pub lods: Vec<LodModel>,
}

impl ModelFile {
    /// Parse a model container from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(MODEL_MAGIC)?;
        let version = r.read_u16()?;
        if version != MODEL_VERSION {
            return Err(LodestarError::FormatError(format!(
                "unsupported model container version {}",
                version
            )));
        }

        let joint_count = r.read_u16()? as usize;
        let mut joint_names = Vec::with_capacity(joint_count);
        for _ in 0..joint_count {
            joint_names.push(r.read_string()?);
        }

        let generated_count = r.read_u16()? as usize;
        if generated_count > joint_count {
            return Err(LodestarError::FormatError(format!(
                "generated joint count {} exceeds joint table size {}",
                generated_count, joint_count
            )));
        }
        let mut generated_joints = Vec::with_capacity(generated_count);
        for i in 0..generated_count {
            let name = joint_names[joint_count - generated_count + i].clone();
            let parent = match r.read_u8()? {
                0 => None,
                _ => Some(r.read_string()?),
            };
            generated_joints.push(GeneratedJointRecord { name, parent });
        }

        let lod_count = r.read_u8()? as usize;
        if lod_count > MAX_LOD_SLOTS {
            return Err(LodestarError::FormatError(format!(
                "LOD count {} exceeds the {}-slot ceiling",
                lod_count, MAX_LOD_SLOTS
            )));
        }
        let mut lods = Vec::with_capacity(lod_count);
        for _ in 0..lod_count {
            let mesh_count = r.read_u16()? as usize;
            let mut meshes = Vec::with_capacity(mesh_count);
            for _ in 0..mesh_count {
                meshes.push(read_mesh(&mut r, joint_count)?);
            }
            lods.push(LodModel { meshes });
        }

        Ok(Self {
            joint_names,
            generated_joints,
            lods,
        })
    }

    /// Serialize the container to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(MODEL_MAGIC);
        w.write_u16(MODEL_VERSION);

        w.write_u16(self.joint_names.len() as u16);
        for name in &self.joint_names {
            w.write_string(name);
        }

        w.write_u16(self.generated_joints.len() as u16);
        for record in &self.generated_joints {
            match &record.parent {
                Some(parent) => {
                    w.write_u8(1);
                    w.write_string(parent);
                }
                None => w.write_u8(0),
            }
        }

        w.write_u8(self.lods.len() as u8);
        for lod in &self.lods {
            w.write_u16(lod.meshes.len() as u16);
            for mesh in &lod.meshes {
                write_mesh(&mut w, mesh);
            }
        }

        w.into_bytes()
    }

    /// Write the container to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Number of authored (non-generated) joints in the table
    pub fn authored_joint_count(&self) -> usize {
        self.joint_names.len() - self.generated_joints.len()
    }

    /// Index of a joint name in the table
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_names.iter().position(|n| n == name)
    }

    /// Ensure an authored joint name is present in the table, inserting it
    /// at the end of the authored prefix. The generated range shifts by
    /// one, so influence indices at or past the insertion point are fixed
    /// up across every mesh. Returns the name's index.
    pub fn ensure_authored_joint(&mut self, name: &str) -> usize {
        if let Some(index) = self.joint_index(name) {
            return index;
        }
        let insert_at = self.authored_joint_count();
        self.joint_names.insert(insert_at, name.to_string());
        for lod in &mut self.lods {
            for mesh in &mut lod.meshes {
                if let Some(influences) = &mut mesh.influences {
                    for quad in &mut influences.joints {
                        for index in quad.iter_mut() {
                            if *index as usize >= insert_at {
                                *index += 1;
                            }
                        }
                    }
                }
            }
        }
        insert_at
    }

    /// Replace the trailing generated range of the joint table with the
    /// given records. Authored entries are untouched.
    pub fn set_generated_joints(&mut self, records: Vec<GeneratedJointRecord>) {
        let authored = self.authored_joint_count();
        self.joint_names.truncate(authored);
        self.joint_names
            .extend(records.iter().map(|r| r.name.clone()));
        self.generated_joints = records;
    }
}

fn read_mesh(r: &mut Reader<'_>, joint_count: usize) -> Result<ModelMesh> {
    let name = r.read_string()?;
    let material = r.read_string()?;

    let vertex_count = r.read_u32()? as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        positions.push(r.read_f32_array::<3>()?);
    }

    let normal_count = r.read_u32()? as usize;
    let mut normals = Vec::with_capacity(normal_count);
    for _ in 0..normal_count {
        normals.push(r.read_f32_array::<3>()?);
    }

    let uv_count = r.read_u32()? as usize;
    let mut uvs = Vec::with_capacity(uv_count);
    for _ in 0..uv_count {
        uvs.push(r.read_f32_array::<2>()?);
    }

    let index_count = r.read_u32()? as usize;
    let mut indices = Vec::with_capacity(index_count);
    for _ in 0..index_count {
        indices.push(r.read_u32()?);
    }

    let influences = match r.read_u8()? {
        0 => None,
        _ => {
            let mut joints = Vec::with_capacity(vertex_count);
            let mut weights = Vec::with_capacity(vertex_count);
            for _ in 0..vertex_count {
                let j = r.read_u16_array::<4>()?;
                for idx in j {
                    if idx as usize >= joint_count {
                        return Err(LodestarError::FormatError(format!(
                            "skin influence references joint {} but the table has {} joints",
                            idx, joint_count
                        )));
                    }
                }
                joints.push(j);
                weights.push(r.read_f32_array::<4>()?);
            }
            Some(MeshInfluences { joints, weights })
        }
    };

    Ok(ModelMesh {
        name,
        material,
        positions,
        normals,
        uvs,
        indices,
        influences,
    })
}

fn write_mesh(w: &mut Writer, mesh: &ModelMesh) {
    w.write_string(&mesh.name);
    w.write_string(&mesh.material);

    w.write_u32(mesh.positions.len() as u32);
    for p in &mesh.positions {
        w.write_f32_array(p);
    }
    w.write_u32(mesh.normals.len() as u32);
    for n in &mesh.normals {
        w.write_f32_array(n);
    }
    w.write_u32(mesh.uvs.len() as u32);
    for uv in &mesh.uvs {
        w.write_f32_array(uv);
    }
    w.write_u32(mesh.indices.len() as u32);
    for i in &mesh.indices {
        w.write_u32(*i);
    }

    match &mesh.influences {
        Some(influences) => {
            w.write_u8(1);
            for (j, wt) in influences.joints.iter().zip(&influences.weights) {
                for idx in j {
                    w.write_u16(*idx);
                }
                w.write_f32_array(wt);
            }
        }
        None => w.write_u8(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skinned_mesh() -> ModelMesh {
        ModelMesh {
            name: "torso".to_string(),
            material: "mat_body".to_string(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
            influences: Some(MeshInfluences {
                joints: vec![[0, 1, 0, 0]; 3],
                weights: vec![[0.75, 0.25, 0.0, 0.0]; 3],
            }),
        }
    }

    fn sample_model() -> ModelFile {
        ModelFile {
            joint_names: vec!["root".to_string(), "spine".to_string()],
            generated_joints: vec![],
            lods: vec![LodModel {
                meshes: vec![skinned_mesh()],
            }],
        }
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        assert!(ModelFile::open(b"NOPE\x01\x00").is_err());
    }

    #[test]
    fn test_roundtrip_preserves_structure() {
        let model = sample_model();
        let reopened = ModelFile::open(&model.to_bytes()).unwrap();
        assert_eq!(reopened.joint_names, model.joint_names);
        assert_eq!(reopened.lods.len(), 1);
        let mesh = &reopened.lods[0].meshes[0];
        assert_eq!(mesh.name, "torso");
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.influences.as_ref().unwrap().joints[0], [0, 1, 0, 0]);
    }

    #[test]
    fn test_open_rejects_out_of_range_influence() {
        let mut model = sample_model();
        model.lods[0].meshes[0].influences.as_mut().unwrap().joints[1] = [9, 0, 0, 0];
        assert!(ModelFile::open(&model.to_bytes()).is_err());
    }

    #[test]
    fn test_set_generated_joints_extends_trailing_range() {
        let mut model = sample_model();
        model.set_generated_joints(vec![GeneratedJointRecord {
            name: "tail_tip_03".to_string(),
            parent: Some("root".to_string()),
        }]);
        assert_eq!(model.joint_names, vec!["root", "spine", "tail_tip_03"]);
        assert_eq!(model.authored_joint_count(), 2);

        // Replacing the records again must not duplicate the trailing range
        model.set_generated_joints(vec![GeneratedJointRecord {
            name: "tail_tip_03".to_string(),
            parent: Some("root".to_string()),
        }]);
        assert_eq!(model.joint_names.len(), 3);
    }

    #[test]
    fn test_ensure_authored_joint_shifts_generated_range() {
        let mut model = sample_model();
        model.set_generated_joints(vec![GeneratedJointRecord {
            name: "cape_a".to_string(),
            parent: Some("root".to_string()),
        }]);
        // A mesh influence pointing at the generated joint (index 2)
        model.lods[0].meshes[0].influences.as_mut().unwrap().joints[0] = [2, 0, 0, 0];

        let index = model.ensure_authored_joint("l_hand");
        assert_eq!(index, 2);
        assert_eq!(model.joint_names, vec!["root", "spine", "l_hand", "cape_a"]);
        // The influence follows the shifted generated joint
        assert_eq!(
            model.lods[0].meshes[0].influences.as_ref().unwrap().joints[0],
            [3, 0, 0, 0]
        );

        // Already-present names do not grow the table
        assert_eq!(model.ensure_authored_joint("spine"), 1);
        assert_eq!(model.joint_names.len(), 4);
    }

    #[test]
    fn test_generated_records_survive_roundtrip() {
        let mut model = sample_model();
        model.set_generated_joints(vec![GeneratedJointRecord {
            name: "cape_a".to_string(),
            parent: Some("spine".to_string()),
        }]);
        let reopened = ModelFile::open(&model.to_bytes()).unwrap();
        assert_eq!(reopened.generated_joints.len(), 1);
        assert_eq!(reopened.generated_joints[0].name, "cape_a");
        assert_eq!(
            reopened.generated_joints[0].parent.as_deref(),
            Some("spine")
        );
        assert_eq!(reopened.authored_joint_count(), 2);
    }
}

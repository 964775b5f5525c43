//! Scene data extracted from interchange files

/// Interchange formats accepted as LOD sources, in the order they are
/// tried when searching for a slot's file. Richer formats first: a
/// separate-resource glTF or a binary GLB carries skin and material
/// metadata a bare OBJ cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Gltf,
    Glb,
    Obj,
}

impl SceneFormat {
    /// Fixed source-format preference order
    pub const PRIORITY: [SceneFormat; 3] = [SceneFormat::Gltf, SceneFormat::Glb, SceneFormat::Obj];

    pub fn extension(&self) -> &'static str {
        match self {
            SceneFormat::Gltf => "gltf",
            SceneFormat::Glb => "glb",
            SceneFormat::Obj => "obj",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SceneFormat::Gltf => "GLTF",
            SceneFormat::Glb => "GLB",
            SceneFormat::Obj => "OBJ",
        }
    }
}

/// A sub-mesh extracted from an interchange scene
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub name: String,
    pub material: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    /// Per-vertex joint indices into `skin_joint_names`
    pub joint_indices: Option<Vec<[u16; 4]>>,
    pub joint_weights: Option<Vec<[f32; 4]>>,
    /// Bone names this mesh's skin binds, in skin order
    pub skin_joint_names: Vec<String>,
}

impl SceneMesh {
    pub fn is_skinned(&self) -> bool {
        self.joint_indices.is_some() && !self.skin_joint_names.is_empty()
    }
}

/// Everything extracted from one interchange scene file
#[derive(Debug, Clone, Default)]
pub struct SceneData {
    pub meshes: Vec<SceneMesh>,
}

// --- Scene writer input types ---

/// A joint handed to the scene writer
#[derive(Debug, Clone)]
pub struct ExportJoint {
    pub name: String,
    pub parent: Option<usize>,
    pub translation: [f32; 3],
    /// Quaternion xyzw
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

/// A resolved skeleton handed to the scene writer
#[derive(Debug, Clone)]
pub struct ExportSkeleton {
    pub name: String,
    pub joints: Vec<ExportJoint>,
}

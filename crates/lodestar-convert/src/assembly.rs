//! Multi-LOD model assembly
//!
//! Folder assembly loads one externally authored scene per LOD slot and
//! merges it into a base model container. The assembler is an explicit
//! accumulator: it owns the container, the tracked skeleton graph and the
//! report, is threaded through each slot in increasing order, and hands
//! everything back with `finish`. Nothing is written to disk until the
//! caller saves the finished container.

use crate::skeleton::Skeleton;
use lodestar_core::{LodestarError, Result};
use lodestar_formats::{
    LodModel, MeshInfluences, ModelFile, ModelMesh, SkeletonFile, MAX_LOD_SLOTS,
};
use lodestar_import::{load_scene, SceneData, SceneFormat, SceneMesh};
use std::fs;
use std::path::{Path, PathBuf};

/// How new meshes combine with the LOD entry already at a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Drop whatever the slot held and install the new meshes
    Replace,
    /// Keep the slot's meshes and append the new ones
    Additive,
}

/// One successfully imported slot
#[derive(Debug, Clone)]
pub struct ImportedSlot {
    pub slot: usize,
    pub path: PathBuf,
    pub format: SceneFormat,
    pub mesh_count: usize,
}

/// What happened during one assembly run
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub imported: Vec<ImportedSlot>,
    pub skipped_slots: Vec<usize>,
    pub generated_joints: Vec<String>,
    pub warnings: Vec<String>,
}

impl AssemblyReport {
    pub fn summary(&self) -> String {
        format!(
            "{} LOD(s) imported, {} slot(s) skipped, {} generated joint(s)",
            self.imported.len(),
            self.skipped_slots.len(),
            self.generated_joints.len()
        )
    }
}

/// Accumulator for a single assembly run
pub struct LodAssembler {
    model: ModelFile,
    skeleton: Skeleton,
    report: AssemblyReport,
}

impl LodAssembler {
    pub fn new(model: ModelFile, skeleton: Skeleton) -> Self {
        Self {
            model,
            skeleton,
            report: AssemblyReport::default(),
        }
    }

    pub fn model(&self) -> &ModelFile {
        &self.model
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// Load the scene at `path` and merge it into `slot`
    pub fn assemble_lod<P: AsRef<Path>>(
        &mut self,
        slot: usize,
        path: P,
        mode: MergeMode,
    ) -> Result<usize> {
        let scene = load_scene(path)?;
        self.merge_scene(slot, &scene, mode)
    }

    /// Merge an already-loaded scene into `slot`.
    ///
    /// Bone names bound by the new meshes that the tracked skeleton cannot
    /// resolve are forwarded to the generated-joint extension, and every
    /// influence is remapped onto the container's joint table. Returns the
    /// number of meshes now populating the slot from this scene.
    pub fn merge_scene(&mut self, slot: usize, scene: &SceneData, mode: MergeMode) -> Result<usize> {
        if slot >= MAX_LOD_SLOTS {
            return Err(LodestarError::InvalidLodSlot {
                slot,
                max: MAX_LOD_SLOTS,
            });
        }

        // Union of bound names across the scene, first-seen order
        let mut bound_names: Vec<&str> = Vec::new();
        for mesh in &scene.meshes {
            for name in &mesh.skin_joint_names {
                if !bound_names.contains(&name.as_str()) {
                    bound_names.push(name);
                }
            }
        }

        let unresolved: Vec<&str> = bound_names
            .iter()
            .copied()
            .filter(|name| !self.skeleton.contains(name))
            .collect();
        let added = self.skeleton.extend_with_generated(unresolved);
        for index in &added {
            self.report
                .generated_joints
                .push(self.skeleton.joints()[*index].name.clone());
        }

        // Sync the container's joint table: authored names the table has
        // never seen join the authored prefix, then the generated range is
        // rebuilt from the tracked skeleton
        for name in &bound_names {
            let authored = self
                .skeleton
                .find(name)
                .map(|i| !self.skeleton.joints()[i].generated)
                .unwrap_or(false);
            if authored {
                self.model.ensure_authored_joint(name);
            }
        }
        self.model
            .set_generated_joints(self.skeleton.generated_records());

        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for mesh in &scene.meshes {
            meshes.push(self.convert_mesh(mesh)?);
        }
        let mesh_count = meshes.len();

        while self.model.lods.len() <= slot {
            self.model.lods.push(LodModel::default());
        }
        match mode {
            MergeMode::Replace => self.model.lods[slot] = LodModel { meshes },
            MergeMode::Additive => self.model.lods[slot].meshes.extend(meshes),
        }

        Ok(mesh_count)
    }

    fn convert_mesh(&self, mesh: &SceneMesh) -> Result<ModelMesh> {
        let influences = match (&mesh.joint_indices, mesh.is_skinned()) {
            (Some(joint_indices), true) => {
                // Scene-local skin slots to container joint-table indices
                let mut slot_map = Vec::with_capacity(mesh.skin_joint_names.len());
                for name in &mesh.skin_joint_names {
                    let index = self.model.joint_index(name).ok_or_else(|| {
                        LodestarError::SkeletonError(format!(
                            "bone '{}' bound by mesh '{}' missing from the joint table after reconciliation",
                            name, mesh.name
                        ))
                    })?;
                    slot_map.push(index as u16);
                }

                let joints: Vec<[u16; 4]> = joint_indices
                    .iter()
                    .map(|quad| quad.map(|slot| slot_map.get(slot as usize).copied().unwrap_or(0)))
                    .collect();
                let weights = mesh
                    .joint_weights
                    .clone()
                    .unwrap_or_else(|| vec![[1.0, 0.0, 0.0, 0.0]; joints.len()]);
                Some(MeshInfluences { joints, weights })
            }
            _ => None,
        };

        Ok(ModelMesh {
            name: mesh.name.clone(),
            material: mesh.material.clone().unwrap_or_default(),
            positions: mesh.positions.clone(),
            normals: mesh.normals.clone(),
            uvs: mesh.uvs.clone(),
            indices: mesh.indices.clone(),
            influences,
        })
    }

    /// Hand back the accumulated container, skeleton and report
    pub fn finish(self) -> (ModelFile, Skeleton, AssemblyReport) {
        (self.model, self.skeleton, self.report)
    }
}

/// Find the source file for a LOD slot, trying extensions in the fixed
/// preference order; the first existing file wins
pub fn find_slot_source(folder: &Path, name: &str, slot: usize) -> Option<(PathBuf, SceneFormat)> {
    for format in SceneFormat::PRIORITY {
        let candidate = folder.join(format!("{}_LOD{}.{}", name, slot, format.extension()));
        if candidate.is_file() {
            return Some((candidate, format));
        }
    }
    None
}

/// Result of assembling a whole folder, ready to be saved by the caller
#[derive(Debug)]
pub struct FolderAssembly {
    pub model: ModelFile,
    pub output_path: PathBuf,
    pub report: AssemblyReport,
}

/// Assemble every LOD slot from `<folder>/<name>_LOD<i>.<ext>` files into
/// the sibling base container `<name>.mdl`.
///
/// A sibling `<name>.skl` supplies the authored hierarchy for the tracked
/// skeleton when present; otherwise the skeleton derives from the model's
/// own joint table. Missing slot 0 is fatal and leaves no output; missing
/// higher slots are recorded as warnings and keep the base container's
/// data for that slot.
pub fn assemble_folder(folder: &Path) -> Result<FolderAssembly> {
    let name = folder
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            LodestarError::MissingBaseContainer(format!("invalid folder path {}", folder.display()))
        })?
        .to_string();
    let parent = folder.parent().unwrap_or_else(|| Path::new("."));

    let base_path = parent.join(format!("{}.mdl", name));
    if !base_path.is_file() {
        return Err(LodestarError::MissingBaseContainer(format!(
            "'{}' is required to assemble folder '{}'",
            base_path.display(),
            name
        )));
    }
    let model = ModelFile::open(&fs::read(&base_path)?)?;

    let skeleton_path = parent.join(format!("{}.skl", name));
    let skeleton = if skeleton_path.is_file() {
        let file = SkeletonFile::open(&fs::read(&skeleton_path)?)?;
        let mut skeleton = Skeleton::from_file(name.clone(), &file);
        skeleton.adopt_generated_records(&model.generated_joints);
        skeleton
    } else {
        Skeleton::from_model(name.clone(), &model)
    };

    let mut assembler = LodAssembler::new(model, skeleton);

    for slot in 0..MAX_LOD_SLOTS {
        match find_slot_source(folder, &name, slot) {
            Some((path, format)) => {
                let mesh_count = assembler.assemble_lod(slot, &path, MergeMode::Replace)?;
                assembler.report.imported.push(ImportedSlot {
                    slot,
                    path,
                    format,
                    mesh_count,
                });
            }
            None if slot == 0 => {
                return Err(LodestarError::MissingBaseLod(format!(
                    "attempted to load LOD0 with name {}_LOD0 but no suitable file was found (gltf/glb/obj)",
                    name
                )));
            }
            None => {
                assembler.report.skipped_slots.push(slot);
                assembler.report.warnings.push(format!(
                    "attempted to load LOD{} with name {}_LOD{} but no suitable file was found (gltf/glb/obj) - skipping",
                    slot, name, slot
                ));
            }
        }
    }

    let (model, _skeleton, report) = assembler.finish();
    let output_path = parent.join(format!("{}NEW.mdl", name));
    Ok(FolderAssembly {
        model,
        output_path,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_formats::SkeletonJoint;

    fn base_skeleton() -> Skeleton {
        let file = SkeletonFile {
            joints: vec![
                SkeletonJoint::root("root"),
                SkeletonJoint {
                    parent: Some(0),
                    ..SkeletonJoint::root("spine")
                },
            ],
        };
        Skeleton::from_file("hero", &file)
    }

    fn base_model() -> ModelFile {
        ModelFile {
            joint_names: vec!["root".to_string(), "spine".to_string()],
            generated_joints: vec![],
            lods: vec![LodModel::default()],
        }
    }

    fn skinned_scene(bones: &[&str]) -> SceneData {
        SceneData {
            meshes: vec![SceneMesh {
                name: "body".to_string(),
                material: Some("mat_body".to_string()),
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                uvs: vec![[0.0, 0.0]; 3],
                indices: vec![0, 1, 2],
                joint_indices: Some(vec![[bones.len() as u16 - 1, 0, 0, 0]; 3]),
                joint_weights: Some(vec![[1.0, 0.0, 0.0, 0.0]; 3]),
                skin_joint_names: bones.iter().map(|b| b.to_string()).collect(),
            }],
        }
    }

    #[test]
    fn test_merge_replaces_slot() {
        let mut assembler = LodAssembler::new(base_model(), base_skeleton());
        assembler
            .merge_scene(0, &skinned_scene(&["root", "spine"]), MergeMode::Replace)
            .unwrap();
        assembler
            .merge_scene(0, &skinned_scene(&["root", "spine"]), MergeMode::Replace)
            .unwrap();
        assert_eq!(assembler.model().lods[0].meshes.len(), 1);

        assembler
            .merge_scene(0, &skinned_scene(&["root", "spine"]), MergeMode::Additive)
            .unwrap();
        assert_eq!(assembler.model().lods[0].meshes.len(), 2);
    }

    #[test]
    fn test_merge_rejects_slot_past_ceiling() {
        let mut assembler = LodAssembler::new(base_model(), base_skeleton());
        let err = assembler
            .merge_scene(8, &skinned_scene(&["root"]), MergeMode::Replace)
            .unwrap_err();
        assert!(matches!(err, LodestarError::InvalidLodSlot { slot: 8, .. }));
    }

    #[test]
    fn test_unknown_bone_becomes_generated_with_valid_influence() {
        let mut assembler = LodAssembler::new(base_model(), base_skeleton());
        assembler
            .merge_scene(
                0,
                &skinned_scene(&["root", "tail_tip_03"]),
                MergeMode::Replace,
            )
            .unwrap();

        let skeleton = assembler.skeleton();
        let tail = skeleton.find("tail_tip_03").expect("generated joint");
        assert!(skeleton.joints()[tail].generated);
        assert_eq!(skeleton.joints()[tail].parent, skeleton.find("root"));

        let model = assembler.model();
        assert_eq!(model.generated_joints.len(), 1);
        let table_index = model.joint_index("tail_tip_03").unwrap();
        let influences = model.lods[0].meshes[0].influences.as_ref().unwrap();
        assert_eq!(influences.joints[0][0] as usize, table_index);
        assert!(table_index < model.joint_names.len());
        assert_eq!(assembler.report().generated_joints, vec!["tail_tip_03"]);
    }

    #[test]
    fn test_remerging_same_scene_adds_no_duplicate_joints() {
        let mut assembler = LodAssembler::new(base_model(), base_skeleton());
        let scene = skinned_scene(&["root", "cape_a"]);
        assembler.merge_scene(0, &scene, MergeMode::Replace).unwrap();
        let joints_after_first = assembler.skeleton().joint_count();
        assembler.merge_scene(0, &scene, MergeMode::Replace).unwrap();
        assert_eq!(assembler.skeleton().joint_count(), joints_after_first);
        assert_eq!(assembler.model().generated_joints.len(), 1);
    }

    #[test]
    fn test_authored_bone_missing_from_table_joins_authored_prefix() {
        // Skeleton knows "spine" and "head"; the base container table only
        // has "root". A mesh binding "head" must not produce a generated
        // joint, and the table must grow its authored prefix.
        let file = SkeletonFile {
            joints: vec![
                SkeletonJoint::root("root"),
                SkeletonJoint {
                    parent: Some(0),
                    ..SkeletonJoint::root("head")
                },
            ],
        };
        let skeleton = Skeleton::from_file("hero", &file);
        let model = ModelFile {
            joint_names: vec!["root".to_string()],
            generated_joints: vec![],
            lods: vec![],
        };

        let mut assembler = LodAssembler::new(model, skeleton);
        assembler
            .merge_scene(0, &skinned_scene(&["root", "head"]), MergeMode::Replace)
            .unwrap();

        let model = assembler.model();
        assert_eq!(model.generated_joints.len(), 0);
        assert_eq!(model.authored_joint_count(), 2);
        assert!(model.joint_index("head").is_some());
    }

    mod folder {
        use super::*;
        use std::fs;
        use std::path::PathBuf;

        fn temp_root() -> PathBuf {
            let dir = std::env::temp_dir().join(format!(
                "lodestar_assembly_test_{}",
                uuid::Uuid::new_v4()
            ));
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

        fn write_base_container(root: &Path, name: &str) {
            let mut model = base_model();
            model.lods = vec![LodModel::default(), LodModel::default()];
            model.save(root.join(format!("{}.mdl", name))).unwrap();
        }

        #[test]
        fn test_slot0_present_higher_slots_skipped() {
            let root = temp_root();
            let folder = root.join("hero");
            fs::create_dir_all(&folder).unwrap();
            write_base_container(&root, "hero");
            fs::write(folder.join("hero_LOD0.obj"), TRIANGLE_OBJ).unwrap();

            let assembly = assemble_folder(&folder).unwrap();
            assert_eq!(assembly.report.imported.len(), 1);
            assert_eq!(assembly.report.imported[0].format, SceneFormat::Obj);
            assert_eq!(assembly.report.skipped_slots.len(), 7);
            assert_eq!(assembly.model.lods[0].meshes.len(), 1);
            // Slot 1 keeps the base container's (empty) LOD untouched
            assert_eq!(assembly.model.lods[1].meshes.len(), 0);
            assert_eq!(
                assembly.output_path.file_name().unwrap().to_str().unwrap(),
                "heroNEW.mdl"
            );
        }

        #[test]
        fn test_missing_slot0_is_fatal() {
            let root = temp_root();
            let folder = root.join("hero");
            fs::create_dir_all(&folder).unwrap();
            write_base_container(&root, "hero");
            // Only LOD1 present
            fs::write(folder.join("hero_LOD1.obj"), TRIANGLE_OBJ).unwrap();

            let err = assemble_folder(&folder).unwrap_err();
            assert!(matches!(err, LodestarError::MissingBaseLod(_)));
            assert!(!root.join("heroNEW.mdl").exists());
        }

        #[test]
        fn test_missing_base_container_is_fatal() {
            let root = temp_root();
            let folder = root.join("hero");
            fs::create_dir_all(&folder).unwrap();
            fs::write(folder.join("hero_LOD0.obj"), TRIANGLE_OBJ).unwrap();

            let err = assemble_folder(&folder).unwrap_err();
            assert!(matches!(err, LodestarError::MissingBaseContainer(_)));
        }

        #[test]
        fn test_format_preference_prefers_gltf_over_obj() {
            let root = temp_root();
            let folder = root.join("hero");
            fs::create_dir_all(&folder).unwrap();
            fs::write(folder.join("hero_LOD0.obj"), TRIANGLE_OBJ).unwrap();
            fs::write(folder.join("hero_LOD0.gltf"), b"{}").unwrap();

            let (path, format) = find_slot_source(&folder, "hero", 0).unwrap();
            assert_eq!(format, SceneFormat::Gltf);
            assert!(path.ends_with("hero_LOD0.gltf"));

            assert_eq!(find_slot_source(&folder, "hero", 1), None);
        }
    }
}

//! Export binding: pairing model LODs with resolved skeletons
//!
//! Thin glue between the model container and the scene writer. The
//! candidate skeleton set handed to each scene is exactly the one archive
//! lookup resolved; matching meshes to a specific skeleton is the scene
//! writer's name-matching job.

use crate::skeleton::Skeleton;
use lodestar_core::Result;
use lodestar_formats::{ModelFile, ModelMesh};
use lodestar_import::{write_scene_glb, ExportSkeleton};
use std::path::Path;

/// One LOD's worth of export work
#[derive(Debug)]
pub struct ExportBinding {
    pub lod: usize,
    pub meshes: Vec<ModelMesh>,
    pub skeletons: Vec<ExportSkeleton>,
}

/// Produce one binding per LOD, each carrying the full resolved skeleton
/// set (possibly empty, in which case meshes export unskinned)
pub fn bind_for_export(model: &ModelFile, skeletons: &[Skeleton]) -> Vec<ExportBinding> {
    let export_skeletons: Vec<ExportSkeleton> =
        skeletons.iter().map(Skeleton::to_export).collect();
    model
        .lods
        .iter()
        .enumerate()
        .map(|(lod, lod_model)| ExportBinding {
            lod,
            meshes: lod_model.meshes.clone(),
            skeletons: export_skeletons.clone(),
        })
        .collect()
}

impl ExportBinding {
    /// Write this binding as a GLB scene
    pub fn write_glb<P: AsRef<Path>>(&self, model: &ModelFile, path: P) -> Result<()> {
        write_scene_glb(path, &self.meshes, &model.joint_names, &self.skeletons)
    }
}

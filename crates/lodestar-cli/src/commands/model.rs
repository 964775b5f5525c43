//! Model export and folder assembly

use anyhow::{Context, Result};
use lodestar_convert::{assemble_folder, bind_for_export, lookup_skeletons, SkeletonLookup};
use lodestar_formats::{ArchiveFile, ModelFile};
use std::fs;
use std::path::Path;

/// Export a model container: one GLB scene per LOD, skeletons resolved
/// from an optional archive
pub fn export_model(
    path: &Path,
    archive_path: Option<&Path>,
    skeleton_name: Option<&str>,
) -> Result<()> {
    let stem = path
        .file_stem()
        .and_then(|n| n.to_str())
        .context("model path has no file name")?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let model = ModelFile::open(&fs::read(path)?)?;

    let mut skeletons = Vec::new();
    if let Some(archive_path) = archive_path {
        let archive = ArchiveFile::open(&fs::read(archive_path)?)?;
        match lookup_skeletons(&archive, skeleton_name)? {
            SkeletonLookup::Found(found) => {
                if skeleton_name.is_some() {
                    for skeleton in &found {
                        println!("Using specified skeleton: {}", skeleton.name);
                    }
                }
                skeletons = found;
            }
            SkeletonLookup::NotFound {
                requested,
                available,
            } => {
                eprintln!(
                    "WARNING: Specified skeleton '{}' not found in archive.",
                    requested
                );
                eprintln!("Available skeletons:");
                for name in available {
                    eprintln!("  - {}", name);
                }
            }
        }
    }

    let out_dir = dir.join(stem);
    fs::create_dir_all(&out_dir)?;

    for binding in bind_for_export(&model, &skeletons) {
        let out_path = out_dir.join(format!("{}_LOD{}.glb", stem, binding.lod));
        binding.write_glb(&model, &out_path)?;
        println!("Exported '{}'", out_path.display());
    }

    Ok(())
}

/// Assemble a folder of per-LOD scenes into the sibling base container
pub fn assemble_folder_input(folder: &Path) -> Result<()> {
    println!("Input Type: Model Folder");

    let assembly = assemble_folder(folder)?;

    for slot in &assembly.report.imported {
        println!(
            "Imported LOD{} ({}) with {} mesh(es)",
            slot.slot,
            slot.format.label(),
            slot.mesh_count
        );
    }
    for warning in &assembly.report.warnings {
        eprintln!("{}", warning);
    }
    if !assembly.report.generated_joints.is_empty() {
        println!(
            "Generated joints for bones missing from the base skeleton: {}",
            assembly.report.generated_joints.join(", ")
        );
    }

    println!("Saving model file...");
    assembly.model.save(&assembly.output_path)?;
    println!("File saved as '{}'", assembly.output_path.display());
    println!("{}", assembly.report.summary());

    Ok(())
}

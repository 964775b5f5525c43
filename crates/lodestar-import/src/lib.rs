//! Lodestar Import - Interchange scene reader and writer
//!
//! Reads externally authored mesh scenes (glTF/GLB, plus mesh-only OBJ)
//! into a uniform `SceneData` form, and writes model LODs back out as
//! self-contained GLB scenes.

mod gltf_export;
mod gltf_scene;
mod obj_scene;
mod types;

pub use gltf_export::write_scene_glb;
pub use gltf_scene::load_gltf_scene;
pub use obj_scene::load_obj_scene;
pub use types::{ExportJoint, ExportSkeleton, SceneData, SceneFormat, SceneMesh};

use lodestar_core::{LodestarError, Result};
use std::path::Path;

/// Load an interchange scene, dispatching on the file extension
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneData> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "gltf" | "glb" => load_gltf_scene(path),
        "obj" => load_obj_scene(path),
        other => Err(LodestarError::SceneError(format!(
            "unsupported scene format '.{}' for {}",
            other,
            path.display()
        ))),
    }
}

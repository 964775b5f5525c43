//! Material container to editable JSON and back

use anyhow::Result;
use lodestar_formats::MtlFile;
use std::fs;
use std::path::{Path, PathBuf};

pub fn export_json(path: &Path) -> Result<()> {
    let mtl = MtlFile::open(&fs::read(path)?)?;
    let out_path = PathBuf::from(format!("{}.json", path.display()));
    fs::write(&out_path, mtl.to_json()?)?;
    println!("Exported '{}'", out_path.display());
    Ok(())
}

pub fn import_json(path: &Path) -> Result<()> {
    let mtl = MtlFile::from_json(&fs::read_to_string(path)?)?;
    let out_path = strip_json_suffix(path);
    mtl.save(&out_path)?;
    println!("Imported '{}'", out_path.display());
    Ok(())
}

fn strip_json_suffix(path: &Path) -> PathBuf {
    PathBuf::from(
        path.to_string_lossy()
            .trim_end_matches(".json")
            .to_string(),
    )
}

//! Texture container to PNG and back

use anyhow::{bail, Result};
use lodestar_formats::TexFile;
use std::fs;
use std::path::{Path, PathBuf};

pub fn export_png(path: &Path) -> Result<()> {
    let tex = TexFile::open(&fs::read(path)?)?;
    if tex.images.is_empty() {
        bail!("texture container '{}' holds no images", path.display());
    }
    for index in 0..tex.images.len() {
        let out_path = if tex.images.len() == 1 {
            PathBuf::from(format!("{}.png", path.display()))
        } else {
            PathBuf::from(format!("{}.{}.png", path.display(), index))
        };
        tex.export_png(index, &out_path)?;
        println!("Exported '{}'", out_path.display());
    }
    Ok(())
}

/// Replace the first image of `<name>.tex` with the pixels of
/// `<name>.tex.png` and write the container back in place
pub fn import_png(path: &Path) -> Result<()> {
    let container_path = PathBuf::from(
        path.to_string_lossy()
            .trim_end_matches(".png")
            .to_string(),
    );
    if !container_path.is_file() {
        bail!(
            "replacing '{}' requires the original container '{}'",
            path.display(),
            container_path.display()
        );
    }
    let mut tex = TexFile::open(&fs::read(&container_path)?)?;
    tex.replace_from_png(0, path)?;
    tex.save(&container_path)?;
    println!("Replaced image 0 of '{}'", container_path.display());
    Ok(())
}

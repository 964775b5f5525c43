//! Text-bank container to editable JSON and back

use anyhow::Result;
use lodestar_formats::TextBankFile;
use std::fs;
use std::path::{Path, PathBuf};

pub fn export_json(path: &Path) -> Result<()> {
    let bank = TextBankFile::open(&fs::read(path)?)?;
    let out_path = PathBuf::from(format!("{}.json", path.display()));
    fs::write(&out_path, bank.to_json()?)?;
    println!("Exported '{}' ({} entries)", out_path.display(), bank.entries.len());
    Ok(())
}

pub fn import_json(path: &Path) -> Result<()> {
    let bank = TextBankFile::from_json(&fs::read_to_string(path)?)?;
    let out_path = PathBuf::from(
        path.to_string_lossy()
            .trim_end_matches(".json")
            .to_string(),
    );
    bank.save(&out_path)?;
    println!("Imported '{}' ({} entries)", out_path.display(), bank.entries.len());
    Ok(())
}

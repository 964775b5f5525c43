//! Lodestar CLI - Converter between game asset containers and interchange formats

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::Path;

#[derive(Parser)]
#[command(name = "lodestar")]
#[command(about = "Converter between game asset containers and interchange formats", long_about = None)]
#[command(version)]
#[command(after_help = "\
Inputs are classified by extension:
  model.mdl           Export one GLB per LOD (add a .pac input for skeletons,
                      --skeleton to pick a specific entry)
  <folder>            Assemble <folder>/<name>_LOD<i>.(gltf|glb|obj) into the
                      sibling <name>.mdl, written as <name>NEW.mdl
  material.mtl        Export to material.mtl.json
  material.mtl.json   Import back to material.mtl (overwrites)
  texture.tex         Export to texture.tex.png
  texture.tex.png     Import back into texture.tex (overwrites)
  strings.txb         Export to strings.txb.json
  strings.txb.json    Import back to strings.txb (overwrites)")]
struct Cli {
    /// Input files or folders, classified by extension
    inputs: Vec<String>,

    /// Specific skeleton entry to load from the archive (e.g. body_base.skl)
    #[arg(long)]
    skeleton: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.inputs.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    // A .pac input is not processed on its own; it supplies skeletons to
    // any .mdl export in the same invocation
    let archive_input = cli.inputs.iter().find(|i| i.ends_with(".pac")).cloned();

    for input in &cli.inputs {
        let path = Path::new(input);
        let result = if input.ends_with(".tex.png") {
            commands::texture::import_png(path)
        } else if input.ends_with(".tex") {
            commands::texture::export_png(path)
        } else if input.ends_with(".mtl.json") {
            commands::material::import_json(path)
        } else if input.ends_with(".mtl") {
            commands::material::export_json(path)
        } else if input.ends_with(".txb.json") {
            commands::textbank::import_json(path)
        } else if input.ends_with(".txb") {
            commands::textbank::export_json(path)
        } else if input.ends_with(".mdl") {
            commands::model::export_model(
                path,
                archive_input.as_deref().map(Path::new),
                cli.skeleton.as_deref(),
            )
        } else if input.ends_with(".pac") {
            Ok(())
        } else if path.is_dir() {
            commands::model::assemble_folder_input(path)
        } else {
            eprintln!("Unrecognized input/file/folder: {}", input);
            Ok(())
        };

        // Fatal conditions abort this input only; the batch continues
        if let Err(e) = result {
            eprintln!("ERROR: {}", e);
        }
    }

    Ok(())
}

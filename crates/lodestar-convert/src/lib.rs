//! Lodestar Convert - Multi-LOD model assembly and skeleton reconciliation
//!
//! The decision core of the pipeline:
//! - `Skeleton` - joint graph with generated-joint extension
//! - `archive_lookup` - resolving skeleton definitions from archives
//! - `LodAssembler` / `assemble_folder` - merging authored LOD scenes into
//!   a model container
//! - `bind_for_export` - pairing model LODs with resolved skeletons for
//!   scene export

mod archive_lookup;
mod assembly;
mod export;
mod skeleton;

pub use archive_lookup::{
    lookup_skeletons, lookup_skeletons_with, matches_requested, primary_body_first,
    SkeletonLookup, PRIMARY_BODY_MARKER, SKELETON_SUFFIX,
};
pub use assembly::{
    assemble_folder, find_slot_source, AssemblyReport, FolderAssembly, ImportedSlot, LodAssembler,
    MergeMode,
};
pub use export::{bind_for_export, ExportBinding};
pub use skeleton::{Joint, Skeleton};

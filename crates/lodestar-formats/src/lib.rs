//! Lodestar Formats - Binary container codecs
//!
//! Each container format gets a codec pair: `open(bytes)` into a structured
//! in-memory form and `to_bytes`/`save` back out. The model, skeleton and
//! archive containers feed the LOD assembly and export pipeline; material,
//! texture and text-bank containers round-trip through editable interchange
//! forms (JSON, PNG).

mod archive;
mod binio;
mod material;
mod model;
mod skeleton;
mod texture;
mod textbank;

pub use archive::{ArchiveEntry, ArchiveFile, ARCHIVE_MAGIC};
pub use material::{MaterialConstant, MtlFile, TextureSlot, MATERIAL_MAGIC};
pub use model::{
    GeneratedJointRecord, LodModel, MeshInfluences, ModelFile, ModelMesh, MAX_LOD_SLOTS,
    MODEL_MAGIC,
};
pub use skeleton::{SkeletonFile, SkeletonJoint, SKELETON_MAGIC};
pub use textbank::{TextBankFile, TextEntry, TEXTBANK_MAGIC};
pub use texture::{TexFile, TexImage, TEXTURE_MAGIC};

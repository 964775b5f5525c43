//! Error types for Lodestar

use thiserror::Error;

/// The main error type for Lodestar operations
#[derive(Debug, Error)]
pub enum LodestarError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Skeleton error: {0}")]
    SkeletonError(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Text bank error: {0}")]
    TextBankError(String),

    #[error("Material error: {0}")]
    MaterialError(String),

    #[error("Invalid LOD slot {slot}: model containers support at most {max} detail levels")]
    InvalidLodSlot { slot: usize, max: usize },

    #[error("No base geometry: {0}")]
    MissingBaseLod(String),

    #[error("Missing base container: {0}")]
    MissingBaseContainer(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("JSON error: {0}")]
    JsonError(String),
}

/// Result type alias for Lodestar operations
pub type Result<T> = std::result::Result<T, LodestarError>;

//! Lodestar Core - Foundational types for the asset pipeline
//!
//! This crate provides the error taxonomy and `Result` alias that all
//! other Lodestar crates depend on.

mod error;

pub use error::{LodestarError, Result};

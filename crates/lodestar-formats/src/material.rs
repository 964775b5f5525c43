//! Material container codec and its JSON round trip

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MATERIAL_MAGIC: &[u8; 4] = b"LMTL";
const MATERIAL_VERSION: u16 = 1;

/// A texture bound to a named shader slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    pub slot: String,
    pub path: String,
}

/// A named block of shader constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConstant {
    pub name: String,
    pub values: Vec<f32>,
}

/// Parsed material container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtlFile {
    pub name: String,
    pub shader: String,
    #[serde(default)]
    pub textures: Vec<TextureSlot>,
    #[serde(default)]
    pub constants: Vec<MaterialConstant>,
}

impl MtlFile {
    /// Parse a material container from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(MATERIAL_MAGIC)?;
        let version = r.read_u16()?;
        if version != MATERIAL_VERSION {
            return Err(LodestarError::MaterialError(format!(
                "unsupported material container version {}",
                version
            )));
        }

        let name = r.read_string()?;
        let shader = r.read_string()?;

        let texture_count = r.read_u16()? as usize;
        let mut textures = Vec::with_capacity(texture_count);
        for _ in 0..texture_count {
            textures.push(TextureSlot {
                slot: r.read_string()?,
                path: r.read_string()?,
            });
        }

        let constant_count = r.read_u16()? as usize;
        let mut constants = Vec::with_capacity(constant_count);
        for _ in 0..constant_count {
            let name = r.read_string()?;
            let value_count = r.read_u16()? as usize;
            let mut values = Vec::with_capacity(value_count);
            for _ in 0..value_count {
                values.push(r.read_f32()?);
            }
            constants.push(MaterialConstant { name, values });
        }

        Ok(Self {
            name,
            shader,
            textures,
            constants,
        })
    }

    /// Serialize to container bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(MATERIAL_MAGIC);
        w.write_u16(MATERIAL_VERSION);
        w.write_string(&self.name);
        w.write_string(&self.shader);
        w.write_u16(self.textures.len() as u16);
        for texture in &self.textures {
            w.write_string(&texture.slot);
            w.write_string(&texture.path);
        }
        w.write_u16(self.constants.len() as u16);
        for constant in &self.constants {
            w.write_string(&constant.name);
            w.write_u16(constant.values.len() as u16);
            for v in &constant.values {
                w.write_f32(*v);
            }
        }
        w.into_bytes()
    }

    /// Write the container to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Pretty-printed JSON form for hand editing
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LodestarError::JsonError(e.to_string()))
    }

    /// Parse the JSON form back into a material
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LodestarError::JsonError(e.to_string()))
    }
}

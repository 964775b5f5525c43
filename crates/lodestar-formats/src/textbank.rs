//! Text-bank container codec and its JSON round trip

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const TEXTBANK_MAGIC: &[u8; 4] = b"LTXB";
const TEXTBANK_VERSION: u16 = 1;

/// A single localized string entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    pub id: u32,
    pub key: String,
    pub value: String,
}

/// Parsed text-bank container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBankFile {
    pub entries: Vec<TextEntry>,
}

impl TextBankFile {
    /// Parse a text bank from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(TEXTBANK_MAGIC)?;
        let version = r.read_u16()?;
        if version != TEXTBANK_VERSION {
            return Err(LodestarError::TextBankError(format!(
                "unsupported text bank version {}",
                version
            )));
        }

        let entry_count = r.read_u32()? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            entries.push(TextEntry {
                id: r.read_u32()?,
                key: r.read_string()?,
                value: r.read_string()?,
            });
        }

        Ok(Self { entries })
    }

    /// Serialize to container bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(TEXTBANK_MAGIC);
        w.write_u16(TEXTBANK_VERSION);
        w.write_u32(self.entries.len() as u32);
        for entry in &self.entries {
            w.write_u32(entry.id);
            w.write_string(&entry.key);
            w.write_string(&entry.value);
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

    /// Parse the JSON form back into a text bank
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LodestarError::JsonError(e.to_string()))
    }
}

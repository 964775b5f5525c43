//! Archive container codec
//!
//! An archive packs multiple named sub-files; for the model pipeline the
//! interesting entries are the `.skl` skeleton definitions. Archives are
//! only ever read, never written back.

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};

pub const ARCHIVE_MAGIC: &[u8; 4] = b"LPAK";
const ARCHIVE_VERSION: u16 = 1;

/// A named payload inside an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Parsed archive container
#[derive(Debug, Clone, Default)]
pub struct ArchiveFile {
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveFile {
    /// Parse an archive from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(ARCHIVE_MAGIC)?;
        let version = r.read_u16()?;
        if version != ARCHIVE_VERSION {
            return Err(LodestarError::ArchiveError(format!(
                "unsupported archive version {}",
                version
            )));
        }

        let entry_count = r.read_u32()? as usize;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let name = r.read_string()?;
            let size = r.read_u32()? as usize;
            let data = r.read_bytes(size)?;
            entries.push(ArchiveEntry { name, data });
        }

        Ok(Self { entries })
    }

    /// Serialize to archive bytes (used by packing tools and tests)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(ARCHIVE_MAGIC);
        w.write_u16(ARCHIVE_VERSION);
        w.write_u32(self.entries.len() as u32);
        for entry in &self.entries {
            w.write_string(&entry.name);
            w.write_u32(entry.data.len() as u32);
            w.write_bytes(&entry.data);
        }
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let archive = ArchiveFile {
            entries: vec![
                ArchiveEntry {
                    name: "chara/body.skl".to_string(),
                    data: vec![1, 2, 3],
                },
                ArchiveEntry {
                    name: "chara/face.tex".to_string(),
                    data: vec![],
                },
            ],
        };
        let reopened = ArchiveFile::open(&archive.to_bytes()).unwrap();
        assert_eq!(reopened.entries.len(), 2);
        assert_eq!(reopened.entries[0].name, "chara/body.skl");
        assert_eq!(reopened.entries[0].data, vec![1, 2, 3]);
        assert!(reopened.entries[1].data.is_empty());
    }

    #[test]
    fn test_open_rejects_truncated_entry() {
        let archive = ArchiveFile {
            entries: vec![ArchiveEntry {
                name: "body.skl".to_string(),
                data: vec![9; 64],
            }],
        };
        let mut bytes = archive.to_bytes();
        bytes.truncate(bytes.len() - 10);
        assert!(ArchiveFile::open(&bytes).is_err());
    }
}

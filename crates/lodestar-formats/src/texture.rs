//! Texture container codec and its PNG round trip
//!
//! Pixel data is stored as raw RGBA8 with an optional precomputed mip
//! chain. Replacing an image from a PNG drops the stale mip chain rather
//! than regenerating it; downsampling is outside this tool.

use crate::binio::{Reader, Writer};
use lodestar_core::{LodestarError, Result};
use std::fs;
use std::path::Path;

pub const TEXTURE_MAGIC: &[u8; 4] = b"LTEX";
const TEXTURE_VERSION: u16 = 1;

/// A single image inside a texture container: RGBA8, mip 0 first
#[derive(Debug, Clone)]
pub struct TexImage {
    pub width: u32,
    pub height: u32,
    pub mips: Vec<Vec<u8>>,
}

impl TexImage {
    fn expected_mip_len(&self, level: usize) -> usize {
        let w = (self.width >> level).max(1) as usize;
        let h = (self.height >> level).max(1) as usize;
        w * h * 4
    }
}

/// Parsed texture container
#[derive(Debug, Clone, Default)]
pub struct TexFile {
    pub images: Vec<TexImage>,
}

impl TexFile {
    /// Parse a texture container from bytes
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        r.expect_magic(TEXTURE_MAGIC)?;
        let version = r.read_u16()?;
        if version != TEXTURE_VERSION {
            return Err(LodestarError::FormatError(format!(
                "unsupported texture container version {}",
                version
            )));
        }

        let image_count = r.read_u16()? as usize;
        let mut images = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            let width = r.read_u32()?;
            let height = r.read_u32()?;
            let mip_count = r.read_u8()? as usize;
            let mut image = TexImage {
                width,
                height,
                mips: Vec::with_capacity(mip_count),
            };
            for level in 0..mip_count {
                let size = r.read_u32()? as usize;
                if size != image.expected_mip_len(level) {
                    return Err(LodestarError::FormatError(format!(
                        "mip {} payload is {} bytes, expected {} for {}x{} RGBA8",
                        level,
                        size,
                        image.expected_mip_len(level),
                        width,
                        height
                    )));
                }
                image.mips.push(r.read_bytes(size)?);
            }
            images.push(image);
        }

        Ok(Self { images })
    }

    /// Serialize to container bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_magic(TEXTURE_MAGIC);
        w.write_u16(TEXTURE_VERSION);
        w.write_u16(self.images.len() as u16);
        for image in &self.images {
            w.write_u32(image.width);
            w.write_u32(image.height);
            w.write_u8(image.mips.len() as u8);
            for mip in &image.mips {
                w.write_u32(mip.len() as u32);
                w.write_bytes(mip);
            }
        }
        w.into_bytes()
    }

    /// Write the container to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Export one image's top mip as a PNG file
    pub fn export_png<P: AsRef<Path>>(&self, index: usize, path: P) -> Result<()> {
        let image = self.images.get(index).ok_or_else(|| {
            LodestarError::ImageError(format!("texture container has no image {}", index))
        })?;
        let mip0 = image
            .mips
            .first()
            .ok_or_else(|| LodestarError::ImageError("image has no mip data".to_string()))?;
        let rgba =
            image::RgbaImage::from_raw(image.width, image.height, mip0.clone()).ok_or_else(
                || LodestarError::ImageError("mip 0 payload does not match dimensions".to_string()),
            )?;
        rgba.save(path)
            .map_err(|e| LodestarError::ImageError(e.to_string()))
    }

    /// Replace one image's pixels from a PNG file. The stale mip chain is
    /// dropped; only mip 0 remains.
    pub fn replace_from_png<P: AsRef<Path>>(&mut self, index: usize, path: P) -> Result<()> {
        if index >= self.images.len() {
            return Err(LodestarError::ImageError(format!(
                "texture container has no image {}",
                index
            )));
        }
        let rgba = image::open(path)
            .map_err(|e| LodestarError::ImageError(e.to_string()))?
            .to_rgba8();
        let image = &mut self.images[index];
        image.width = rgba.width();
        image.height = rgba.height();
        image.mips = vec![rgba.into_raw()];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32) -> TexImage {
        TexImage {
            width,
            height,
            mips: vec![vec![128; (width * height * 4) as usize]],
        }
    }

    #[test]
    fn test_roundtrip() {
        let tex = TexFile {
            images: vec![flat_image(4, 2)],
        };
        let reopened = TexFile::open(&tex.to_bytes()).unwrap();
        assert_eq!(reopened.images.len(), 1);
        assert_eq!(reopened.images[0].width, 4);
        assert_eq!(reopened.images[0].mips[0].len(), 32);
    }

    #[test]
    fn test_open_rejects_mip_size_mismatch() {
        let mut tex = TexFile {
            images: vec![flat_image(4, 4)],
        };
        tex.images[0].mips[0].pop();
        assert!(TexFile::open(&tex.to_bytes()).is_err());
    }

    #[test]
    fn test_export_missing_image_index() {
        let tex = TexFile::default();
        assert!(tex.export_png(0, "unused.png").is_err());
    }
}

//! Replacement texture loading

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

/// Supplies 4 bpp texture data to the texture patch
pub trait AssetSource {
    /// Pixel data for entry `index` of table `name`, `width * height / 2` bytes
    fn texture(&self, name: &str, index: u32, width: u32, height: u32) -> Result<Vec<u8>>;
}

/// Pack gray+alpha pixel pairs into 4 bpp, keeping the top nibble of gray.
///
/// Even pixels land in the high nibble.
pub fn pack_gray_alpha(raw: &[u8], pixels: usize) -> Vec<u8> {
    let mut packed = vec![0u8; pixels.div_ceil(2)];
    for (i, pixel) in raw.chunks_exact(2).take(pixels).enumerate() {
        packed[i / 2] |= (pixel[0] & 0xF0) >> ((i % 2) * 4);
    }
    packed
}

/// Raw GIMP exports in a directory, named `{name}_{index}_test.data`
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn texture_path(&self, name: &str, index: u32) -> PathBuf {
        self.root.join(format!("{}_{}_test.data", name, index))
    }
}

impl AssetSource for DirectoryAssets {
    fn texture(&self, name: &str, index: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        let path = self.texture_path(name, index);
        let raw = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::AssetMissing { path: path.clone() },
            _ => Error::Io(e),
        })?;

        let pixels = width as usize * height as usize;
        let expected = pixels * 2;
        if raw.len() < expected {
            return Err(Error::AssetTruncated {
                path,
                expected,
                actual: raw.len(),
            });
        }

        debug!("Loaded {}", path.display());
        Ok(pack_gray_alpha(&raw, pixels))
    }
}

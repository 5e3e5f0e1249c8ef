//! Texture asset loading.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{RendererError, Result};

pub const DIFFUSE_MAP: &str = "diffuse.png";
pub const NORMAL_MAP: &str = "normal.png";

/// Turns an asset name into decoded RGBA texels.
pub trait TextureLoader {
    fn load(&self, name: &str) -> Result<image::RgbaImage>;
}

/// Reads and decodes image files from a directory on disk.
#[derive(Debug, Clone)]
pub struct AssetTextureLoader {
    dir: PathBuf,
}

impl AssetTextureLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn decode(&self, name: &str) -> anyhow::Result<image::RgbaImage> {
        let path = self.dir.join(name);
        let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let img = image::load_from_memory(&data).with_context(|| format!("decoding {}", path.display()))?;
        Ok(img.to_rgba8())
    }
}

impl Default for AssetTextureLoader {
    fn default() -> Self {
        Self::new(Path::new("./").join("assets"))
    }
}

impl TextureLoader for AssetTextureLoader {
    fn load(&self, name: &str) -> Result<image::RgbaImage> {
        let img = self.decode(name).map_err(|e| RendererError::TextureLoadFailed {
            name: name.to_string(),
            reason: format!("{e:#}"),
        })?;
        log::debug!("loaded texture {name} ({}x{})", img.width(), img.height());
        Ok(img)
    }
}

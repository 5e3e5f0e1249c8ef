//! Renderer and window configuration.

use std::path::PathBuf;

use crate::gpu::{Extent, PresentInterval};
use crate::uniforms::RenderMode;

/// Environment variable overriding [`RendererConfig::asset_dir`].
pub const ASSETS_ENV: &str = "ORBIT_NGIN_ASSETS";

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub title: String,
    /// Initial client area of the window.
    pub window_size: Extent,
    pub clear_colour: wgpu::Color,
    /// `0` presents without waiting for vertical blank.
    pub present_interval: PresentInterval,
    pub render_mode: RenderMode,
    /// Directory holding `diffuse.png` and `normal.png`.
    pub asset_dir: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "orbit-ngin".to_string(),
            window_size: Extent::new(800, 600),
            clear_colour: wgpu::Color {
                r: 0.0,
                g: 0.5,
                b: 0.0,
                a: 1.0,
            },
            present_interval: 0,
            render_mode: RenderMode::Lit,
            asset_dir: PathBuf::from("./").join("assets"),
        }
    }
}

impl RendererConfig {
    /// Defaults with the asset directory taken from `ORBIT_NGIN_ASSETS` when set.
    pub fn from_env() -> Self {
        Self::default().with_asset_override(std::env::var_os(ASSETS_ENV).map(PathBuf::from))
    }

    fn with_asset_override(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            log::info!("assets from {}", dir.display());
            self.asset_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.window_size, Extent::new(800, 600));
        assert_eq!(config.clear_colour.g, 0.5);
        assert_eq!(config.present_interval, 0);
        assert_eq!(config.render_mode, RenderMode::Lit);
        assert!(config.asset_dir.ends_with("assets"));
    }

    #[test]
    fn asset_override_replaces_directory() {
        let config = RendererConfig::default().with_asset_override(Some(PathBuf::from("/srv/textures")));
        assert_eq!(config.asset_dir, PathBuf::from("/srv/textures"));

        let config = RendererConfig::default().with_asset_override(Some(PathBuf::new()));
        assert!(config.asset_dir.ends_with("assets"));
    }
}

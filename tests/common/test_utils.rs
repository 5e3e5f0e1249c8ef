#![allow(dead_code)]

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use orbit_ngin::config::RendererConfig;
use orbit_ngin::error::{RendererError, Result};
use orbit_ngin::gpu::headless::{HeadlessApi, HeadlessConfig, Ledger};
use orbit_ngin::gpu::{AdapterInfo, Extent};
use orbit_ngin::renderer::SceneRenderer;
use orbit_ngin::resources::texture::{DIFFUSE_MAP, NORMAL_MAP, TextureLoader};
use orbit_ngin::shader::BuiltinShaders;

/// Textures served from memory instead of the asset directory.
pub struct MemoryTextures {
    images: HashMap<String, RgbaImage>,
}

impl MemoryTextures {
    pub fn new() -> Self {
        let mut images = HashMap::new();
        images.insert(
            DIFFUSE_MAP.to_string(),
            RgbaImage::from_pixel(4, 4, Rgba([200, 90, 60, 255])),
        );
        images.insert(
            NORMAL_MAP.to_string(),
            RgbaImage::from_pixel(2, 2, Rgba([128, 128, 255, 255])),
        );
        Self { images }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.images.remove(name);
        self
    }
}

impl TextureLoader for MemoryTextures {
    fn load(&self, name: &str) -> Result<RgbaImage> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| RendererError::TextureLoadFailed {
                name: name.to_string(),
                reason: "not in memory".to_string(),
            })
    }
}

pub fn hardware_adapter(name: &str) -> AdapterInfo {
    AdapterInfo {
        name: name.to_string(),
        is_software: false,
    }
}

pub fn software_adapter(name: &str) -> AdapterInfo {
    AdapterInfo {
        name: name.to_string(),
        is_software: true,
    }
}

pub fn headless(config: HeadlessConfig) -> (HeadlessApi, Ledger) {
    let api = HeadlessApi::new(config);
    let ledger = api.ledger();
    (api, ledger)
}

pub const WINDOW: Extent = Extent {
    width: 800,
    height: 600,
};

/// A renderer on the default headless API with the default scene.
pub fn init_renderer(config: &RendererConfig) -> (SceneRenderer<HeadlessApi>, Ledger) {
    let (api, ledger) = headless(HeadlessConfig::default());
    let renderer = SceneRenderer::init(api, WINDOW, config, &BuiltinShaders, &MemoryTextures::new())
        .expect("renderer init");
    (renderer, ledger)
}

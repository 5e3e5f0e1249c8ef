//! Per-frame scene orchestration.
//!
//! A [`SceneRenderer`] exists only between a successful [`init`](SceneRenderer::init)
//! and [`term`](SceneRenderer::term), which consumes it. Each frame runs
//! [`update`](SceneRenderer::update) (constant buffer writes) and then
//! [`render_frame`](SceneRenderer::render_frame) (clear, opaque pass,
//! back-to-front transparency pass, present).

use crate::camera::OrbitCamera;
use crate::clock::FrameClock;
use crate::config::RendererConfig;
use crate::device::GraphicsDevice;
use crate::error::Result;
use crate::gpu::{DrawCall, Extent, FramePlan, FrameStatus, GraphicsApi};
use crate::resources::texture::TextureLoader;
use crate::resources::{ResourceSet, SceneDesc};
use crate::shader::ShaderSources;
use crate::transparency;
use crate::uniforms::{RenderMode, SceneUniform};

/// Depth every frame starts from.
pub const CLEAR_DEPTH: f32 = 1.0;

pub struct SceneRenderer<B: GraphicsApi> {
    // scene resources are released before the device that created them
    resources: ResourceSet<B>,
    gpu: GraphicsDevice<B>,
    camera: OrbitCamera,
    clock: FrameClock,
    clear_colour: wgpu::Color,
    render_mode: RenderMode,
}

impl<B: GraphicsApi> SceneRenderer<B> {
    /// Brings up the device for a `size` client area and loads the default scene.
    pub fn init(
        api: B,
        size: Extent,
        config: &RendererConfig,
        shaders: &dyn ShaderSources,
        textures: &dyn TextureLoader,
    ) -> Result<Self> {
        Self::init_with_scene(api, size, config, shaders, textures, SceneDesc::default())
    }

    pub fn init_with_scene(
        api: B,
        size: Extent,
        config: &RendererConfig,
        shaders: &dyn ShaderSources,
        textures: &dyn TextureLoader,
        scene: SceneDesc,
    ) -> Result<Self> {
        let gpu = GraphicsDevice::init(api, size, config.present_interval)?;
        let resources = ResourceSet::load(&gpu, shaders, textures, scene)?;
        Ok(Self {
            resources,
            gpu,
            camera: OrbitCamera::default(),
            clock: FrameClock::new(),
            clear_colour: config.clear_colour,
            render_mode: config.render_mode,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.gpu.resize(width, height)
    }

    /// Writes every constant buffer for time `elapsed` and the current camera.
    ///
    /// Only buffer contents change; calling it twice with the same inputs
    /// writes the same bytes.
    pub fn update(&self, elapsed: f64) {
        let api = self.gpu.api();
        let device = self.gpu.device();

        for drawable in self.resources.opaque().iter().chain(self.resources.transparent()) {
            let constants = drawable.desc.constants(elapsed);
            api.write_buffer(device, &drawable.constants, bytemuck::bytes_of(&constants));
        }

        let size = self.gpu.size();
        let (view, projection) = self.camera.view_projection(size.width, size.height);
        let scene = SceneUniform::new(
            view,
            projection,
            self.camera.eye(),
            self.resources.lights(),
            self.render_mode,
        );
        api.write_buffer(device, self.resources.scene_constants(), bytemuck::bytes_of(&scene));
    }

    /// Draws and presents one frame from the constants written by the last update.
    pub fn render_frame(&self) -> Result<FrameStatus> {
        let targets = self.gpu.targets()?;
        let resources = &self.resources;

        let mut draws: Vec<DrawCall<'_, B>> = resources
            .opaque()
            .iter()
            .map(|drawable| resources.draw_call(drawable))
            .collect();

        let transparent = resources.transparent();
        let order = transparency::back_to_front(
            transparent,
            |drawable| drawable.desc.placement.origin(),
            self.camera.eye(),
            self.camera.forward(),
        );
        draws.extend(order.into_iter().map(|i| resources.draw_call(&transparent[i])));

        let plan = FramePlan {
            clear_colour: self.clear_colour,
            clear_depth: CLEAR_DEPTH,
            viewport: self.gpu.size(),
            draws,
        };
        let status = self.gpu.api().submit_frame(
            self.gpu.device(),
            self.gpu.swap_chain(),
            &targets.back_buffer,
            &targets.depth_buffer,
            &plan,
        )?;
        if status == FrameStatus::Skipped {
            log::warn!("frame skipped");
        }
        Ok(status)
    }

    /// Ticks the clock, updates and renders.
    pub fn advance(&mut self) -> Result<FrameStatus> {
        let elapsed = self.clock.tick();
        self.update(elapsed);
        self.render_frame()
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        log::info!("render mode: {mode:?}");
        self.render_mode = mode;
    }

    pub fn device(&self) -> &GraphicsDevice<B> {
        &self.gpu
    }

    pub fn resources(&self) -> &ResourceSet<B> {
        &self.resources
    }

    /// Releases the scene, then the device.
    pub fn term(self) {
        let Self { resources, gpu, .. } = self;
        drop(resources);
        log::info!("scene resources released");
        drop(gpu);
        log::info!("device released");
    }
}

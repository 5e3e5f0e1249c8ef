//! Graphics API seam.
//!
//! [`GraphicsApi`] is the narrow set of GPU calls the renderer needs: adapter
//! discovery, device and swap-chain creation, buffers, textures, pipelines,
//! bindings and frame submission. Every resource comes back as an owned handle;
//! dropping the handle releases the resource.
//!
//! Two implementations ship with the crate:
//! - [`native::WgpuApi`] renders with wgpu into a winit window,
//! - [`headless::HeadlessApi`] records every call and renders nothing. It backs
//!   offscreen runs and the test suite.
//!
//! The descriptors borrow wgpu's vocabulary types (blend states, vertex
//! layouts, compare functions) so both implementations agree on pipeline state
//! without a parallel set of enums.

pub mod headless;
pub mod native;

use crate::error::Result;
use crate::shader::CompiledShader;

/// Capability tier a device exposes.
///
/// `Core` is a device that meets the full WebGPU baseline. `Downlevel` is
/// anything less, e.g. a GL ES context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureLevel {
    Downlevel,
    Core,
}

/// Size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Extent {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// What an adapter reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    /// The adapter reports itself as a CPU rasteriser.
    pub is_software: bool,
}

/// Adapter names of well-known software rasterisers.
pub const FALLBACK_ADAPTER_NAMES: &[&str] = &[
    "Microsoft Basic Render Driver",
    "llvmpipe",
    "SwiftShader",
    "softpipe",
];

impl AdapterInfo {
    /// True for software/fallback adapters, which are never selected.
    pub fn is_fallback(&self) -> bool {
        self.is_software
            || FALLBACK_ADAPTER_NAMES
                .iter()
                .any(|fallback| self.name.contains(fallback))
    }
}

/// Number of vertical blanks to wait before presenting; `0` presents immediately.
pub type PresentInterval = u32;

/// Swap chains are double buffered.
pub const SWAP_CHAIN_BUFFERS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Uniform data rewritten by the CPU every frame.
    Constant,
}

pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub contents: &'a [u8],
}

pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub image: &'a image::RgbaImage,
    /// Colour data is sRGB encoded; normal maps are linear.
    pub srgb: bool,
}

/// Blend state of the transparency pass: straight alpha over the target.
pub const ALPHA_OVER: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Fixed-function state plus shaders for one kind of draw.
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub shader: &'a CompiledShader,
    pub vertex_layout: wgpu::VertexBufferLayout<'static>,
    /// Binds a diffuse + normal texture pair as group 2.
    pub textured: bool,
    /// `None` writes colour without blending.
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
}

/// Resources bound to one bind group slot.
pub enum BindingDesc<'a, B: GraphicsApi> {
    Uniform {
        label: &'a str,
        buffer: &'a B::Buffer,
    },
    Material {
        label: &'a str,
        diffuse: &'a B::Texture,
        normal: &'a B::Texture,
    },
}

/// One indexed draw. `bindings[i]` is bound to group `i`.
pub struct DrawCall<'a, B: GraphicsApi> {
    pub label: &'a str,
    pub pipeline: &'a B::Pipeline,
    pub bindings: Vec<&'a B::Binding>,
    pub vertices: &'a B::Buffer,
    pub indices: &'a B::Buffer,
    pub index_count: u32,
}

/// Everything submitted for one frame, in submission order.
pub struct FramePlan<'a, B: GraphicsApi> {
    pub clear_colour: wgpu::Color,
    pub clear_depth: f32,
    /// Viewport and scissor rectangle, anchored at the origin.
    pub viewport: Extent,
    pub draws: Vec<DrawCall<'a, B>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The surface was out of date or busy; nothing was drawn this frame.
    Skipped,
}

/// The graphics API collaborator.
///
/// Calls take `&self`: implementations keep any bookkeeping behind interior
/// mutability, so the renderer can hold resource borrows while it submits.
pub trait GraphicsApi: Sized {
    type Adapter;
    type Device;
    type SwapChain;
    type BackBuffer;
    type DepthBuffer;
    type Buffer;
    type Texture;
    type Pipeline;
    type Binding;

    fn enumerate_adapters(&self) -> Vec<(AdapterInfo, Self::Adapter)>;

    /// Creates a device requesting `required`; reports the level actually obtained.
    fn create_device(
        &self,
        adapter: Self::Adapter,
        required: FeatureLevel,
    ) -> Result<(Self::Device, FeatureLevel)>;

    fn create_swap_chain(
        &self,
        device: &Self::Device,
        size: Extent,
        present_interval: PresentInterval,
    ) -> Result<Self::SwapChain>;

    /// Resizes every buffer of the swap chain. No view of the old buffers may be alive.
    fn resize_buffers(
        &self,
        device: &Self::Device,
        swap_chain: &mut Self::SwapChain,
        size: Extent,
    ) -> Result<()>;

    fn create_back_buffer(
        &self,
        device: &Self::Device,
        swap_chain: &Self::SwapChain,
    ) -> Result<Self::BackBuffer>;

    fn create_depth_buffer(&self, device: &Self::Device, size: Extent) -> Result<Self::DepthBuffer>;

    fn create_buffer(&self, device: &Self::Device, desc: &BufferDesc<'_>) -> Result<Self::Buffer>;

    /// Overwrites `buffer` from offset zero.
    fn write_buffer(&self, device: &Self::Device, buffer: &Self::Buffer, data: &[u8]);

    fn create_texture(&self, device: &Self::Device, desc: &TextureDesc<'_>) -> Result<Self::Texture>;

    fn create_pipeline(
        &self,
        device: &Self::Device,
        swap_chain: &Self::SwapChain,
        desc: &PipelineDesc<'_>,
    ) -> Result<Self::Pipeline>;

    fn create_binding(
        &self,
        device: &Self::Device,
        desc: &BindingDesc<'_, Self>,
    ) -> Result<Self::Binding>;

    /// Clears the targets, records `plan.draws` in order and presents.
    fn submit_frame(
        &self,
        device: &Self::Device,
        swap_chain: &Self::SwapChain,
        back_buffer: &Self::BackBuffer,
        depth_buffer: &Self::DepthBuffer,
        plan: &FramePlan<'_, Self>,
    ) -> Result<FrameStatus>;
}

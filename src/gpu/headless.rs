//! Recording graphics API.
//!
//! [`HeadlessApi`] renders nothing. It hands out handles that register
//! themselves in a shared [`Ledger`] when created and when dropped, stores
//! buffer contents and pipeline state, and records every submitted frame. The
//! ledger can be inspected (and told to fail specific calls) while a renderer
//! built on the API is running.
//!
//! Bookkeeping sits behind `Rc<RefCell<..>>`: the API lives on the render
//! thread only.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{RendererError, Result};
use crate::gpu::{
    AdapterInfo, BindingDesc, BufferDesc, Extent, FeatureLevel, FramePlan, FrameStatus,
    GraphicsApi, PipelineDesc, PresentInterval, SWAP_CHAIN_BUFFERS, TextureDesc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Adapter,
    Device,
    SwapChain,
    BackBuffer,
    DepthBuffer,
    Buffer,
    Texture,
    Pipeline,
    Binding,
}

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Adapters reported by enumeration, in order.
    pub adapters: Vec<AdapterInfo>,
    /// Level every created device reports.
    pub feature_level: FeatureLevel,
    pub fail_device: bool,
    pub fail_swap_chain: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            adapters: vec![
                AdapterInfo {
                    name: "Microsoft Basic Render Driver".to_string(),
                    is_software: true,
                },
                AdapterInfo {
                    name: "Headless Adapter".to_string(),
                    is_software: false,
                },
            ],
            feature_level: FeatureLevel::Core,
            fail_device: false,
            fail_swap_chain: false,
        }
    }
}

/// A resource event: which resource, of what kind, under which label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: u64,
    pub kind: ResourceKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRecord {
    pub label: String,
    pub shader: String,
    pub textured: bool,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub vertex_stride: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub srgb: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub label: String,
    pub pipeline: PipelineRecord,
    /// Binding labels by group index.
    pub bindings: Vec<String>,
    pub index_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub clear_colour: wgpu::Color,
    pub clear_depth: f32,
    pub viewport: Extent,
    pub target_size: Extent,
    pub back_buffer: u64,
    pub depth_buffer: u64,
    pub present_interval: PresentInterval,
    pub draws: Vec<DrawRecord>,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    live: BTreeMap<u64, ResourceRecord>,
    created: Vec<ResourceRecord>,
    released: Vec<ResourceRecord>,
    buffers: BTreeMap<u64, Vec<u8>>,
    pipelines: BTreeMap<u64, PipelineRecord>,
    textures: Vec<TextureRecord>,
    frames: Vec<FrameRecord>,
    resizes: Vec<Extent>,
    fail_next_resize: bool,
    fail_depth_buffers: bool,
    fail_next_frame: bool,
    skip_next_frame: bool,
}

/// Shared view of everything the headless API has done.
#[derive(Clone, Default)]
pub struct Ledger(Rc<RefCell<LedgerState>>);

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Ledger")
            .field("live", &state.live.len())
            .field("frames", &state.frames.len())
            .finish()
    }
}

impl Ledger {
    fn track(&self, kind: ResourceKind, label: &str) -> Handle {
        let mut state = self.0.borrow_mut();
        state.next_id += 1;
        let record = ResourceRecord {
            id: state.next_id,
            kind,
            label: label.to_string(),
        };
        state.live.insert(record.id, record.clone());
        state.created.push(record.clone());
        Handle {
            record,
            ledger: self.clone(),
        }
    }

    fn release(&self, id: u64) {
        let mut state = self.0.borrow_mut();
        if let Some(record) = state.live.remove(&id) {
            state.buffers.remove(&id);
            state.released.push(record);
        }
    }

    pub fn live(&self, kind: ResourceKind) -> Vec<ResourceRecord> {
        let state = self.0.borrow();
        state
            .live
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.0.borrow().live.len()
    }

    pub fn created(&self, kind: ResourceKind) -> Vec<ResourceRecord> {
        let state = self.0.borrow();
        state
            .created
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Releases in the order they happened.
    pub fn released(&self) -> Vec<ResourceRecord> {
        self.0.borrow().released.clone()
    }

    /// Contents of every live buffer, ordered by creation.
    pub fn buffer_contents(&self) -> Vec<(String, Vec<u8>)> {
        let state = self.0.borrow();
        state
            .buffers
            .iter()
            .filter_map(|(id, bytes)| state.live.get(id).map(|r| (r.label.clone(), bytes.clone())))
            .collect()
    }

    /// Contents of the first live buffer labelled `label`.
    pub fn buffer(&self, label: &str) -> Option<Vec<u8>> {
        self.buffer_contents()
            .into_iter()
            .find(|(l, _)| l == label)
            .map(|(_, bytes)| bytes)
    }

    pub fn pipelines(&self) -> Vec<PipelineRecord> {
        self.0.borrow().pipelines.values().cloned().collect()
    }

    pub fn textures(&self) -> Vec<TextureRecord> {
        self.0.borrow().textures.clone()
    }

    pub fn frames(&self) -> Vec<FrameRecord> {
        self.0.borrow().frames.clone()
    }

    pub fn last_frame(&self) -> Option<FrameRecord> {
        self.0.borrow().frames.last().cloned()
    }

    /// Sizes passed to successful swap-chain resizes.
    pub fn resizes(&self) -> Vec<Extent> {
        self.0.borrow().resizes.clone()
    }

    pub fn fail_next_resize(&self) {
        self.0.borrow_mut().fail_next_resize = true;
    }

    pub fn fail_depth_buffers(&self, fail: bool) {
        self.0.borrow_mut().fail_depth_buffers = fail;
    }

    pub fn fail_next_frame(&self) {
        self.0.borrow_mut().fail_next_frame = true;
    }

    /// Makes the next submission report an out-of-date surface.
    pub fn skip_next_frame(&self) {
        self.0.borrow_mut().skip_next_frame = true;
    }
}

/// An owned headless resource. Dropping it records the release.
pub struct Handle {
    record: ResourceRecord,
    ledger: Ledger,
}

impl Handle {
    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.record.kind
    }

    pub fn label(&self) -> &str {
        &self.record.label
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.record).finish()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.ledger.release(self.record.id);
    }
}

#[derive(Debug)]
pub struct HeadlessSwapChain {
    handle: Handle,
    size: Extent,
    present_interval: PresentInterval,
    buffer_count: u32,
}

impl HeadlessSwapChain {
    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }
}

/// A back-buffer or depth view, sized when it was created.
#[derive(Debug)]
pub struct HeadlessTarget {
    handle: Handle,
    size: Extent,
}

impl HeadlessTarget {
    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn size(&self) -> Extent {
        self.size
    }
}

#[derive(Debug, Default)]
pub struct HeadlessApi {
    config: HeadlessConfig,
    ledger: Ledger,
}

impl HeadlessApi {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            ledger: Ledger::default(),
        }
    }

    pub fn ledger(&self) -> Ledger {
        self.ledger.clone()
    }
}

impl GraphicsApi for HeadlessApi {
    type Adapter = Handle;
    type Device = Handle;
    type SwapChain = HeadlessSwapChain;
    type BackBuffer = HeadlessTarget;
    type DepthBuffer = HeadlessTarget;
    type Buffer = Handle;
    type Texture = Handle;
    type Pipeline = Handle;
    type Binding = Handle;

    fn enumerate_adapters(&self) -> Vec<(AdapterInfo, Handle)> {
        self.config
            .adapters
            .iter()
            .map(|info| (info.clone(), self.ledger.track(ResourceKind::Adapter, &info.name)))
            .collect()
    }

    fn create_device(&self, adapter: Handle, _required: FeatureLevel) -> Result<(Handle, FeatureLevel)> {
        if self.config.fail_device {
            return Err(RendererError::DeviceCreationFailed(format!(
                "adapter `{}` refused to create a device",
                adapter.label()
            )));
        }
        let device = self
            .ledger
            .track(ResourceKind::Device, &format!("{} device", adapter.label()));
        Ok((device, self.config.feature_level))
    }

    fn create_swap_chain(
        &self,
        _device: &Handle,
        size: Extent,
        present_interval: PresentInterval,
    ) -> Result<HeadlessSwapChain> {
        if self.config.fail_swap_chain {
            return Err(RendererError::SwapChainCreationFailed(
                "headless surface unavailable".to_string(),
            ));
        }
        if size.is_empty() {
            return Err(RendererError::SwapChainCreationFailed(format!(
                "cannot create a {}x{} swap chain",
                size.width, size.height
            )));
        }
        Ok(HeadlessSwapChain {
            handle: self.ledger.track(ResourceKind::SwapChain, "swap chain"),
            size,
            present_interval,
            buffer_count: SWAP_CHAIN_BUFFERS,
        })
    }

    fn resize_buffers(&self, _device: &Handle, swap_chain: &mut HeadlessSwapChain, size: Extent) -> Result<()> {
        let mut state = self.ledger.0.borrow_mut();
        if std::mem::take(&mut state.fail_next_resize) {
            return Err(RendererError::SwapChainCreationFailed(format!(
                "resizing swap chain to {}x{} failed",
                size.width, size.height
            )));
        }
        // the swap chain refuses to resize while views of its buffers are alive
        if state.live.values().any(|r| r.kind == ResourceKind::BackBuffer) {
            return Err(RendererError::SwapChainCreationFailed(
                "back buffer view still alive during resize".to_string(),
            ));
        }
        state.resizes.push(size);
        swap_chain.size = size;
        Ok(())
    }

    fn create_back_buffer(&self, _device: &Handle, swap_chain: &HeadlessSwapChain) -> Result<HeadlessTarget> {
        Ok(HeadlessTarget {
            handle: self.ledger.track(ResourceKind::BackBuffer, "back buffer view"),
            size: swap_chain.size,
        })
    }

    fn create_depth_buffer(&self, _device: &Handle, size: Extent) -> Result<HeadlessTarget> {
        if self.ledger.0.borrow().fail_depth_buffers {
            return Err(RendererError::ResourceCreationFailed(format!(
                "depth buffer {}x{}",
                size.width, size.height
            )));
        }
        Ok(HeadlessTarget {
            handle: self.ledger.track(ResourceKind::DepthBuffer, "depth view"),
            size,
        })
    }

    fn create_buffer(&self, _device: &Handle, desc: &BufferDesc<'_>) -> Result<Handle> {
        let handle = self.ledger.track(ResourceKind::Buffer, desc.label);
        self.ledger
            .0
            .borrow_mut()
            .buffers
            .insert(handle.id(), desc.contents.to_vec());
        Ok(handle)
    }

    fn write_buffer(&self, _device: &Handle, buffer: &Handle, data: &[u8]) {
        let mut state = self.ledger.0.borrow_mut();
        match state.buffers.get_mut(&buffer.id()) {
            Some(contents) if data.len() <= contents.len() => {
                contents[..data.len()].copy_from_slice(data);
            }
            Some(contents) => log::error!(
                "write of {} bytes overflows buffer `{}` ({} bytes)",
                data.len(),
                buffer.label(),
                contents.len()
            ),
            None => log::error!("write to released buffer `{}`", buffer.label()),
        }
    }

    fn create_texture(&self, _device: &Handle, desc: &TextureDesc<'_>) -> Result<Handle> {
        let (width, height) = desc.image.dimensions();
        if width == 0 || height == 0 {
            return Err(RendererError::ResourceCreationFailed(format!(
                "texture `{}` has no texels",
                desc.label
            )));
        }
        let handle = self.ledger.track(ResourceKind::Texture, desc.label);
        self.ledger.0.borrow_mut().textures.push(TextureRecord {
            label: desc.label.to_string(),
            width,
            height,
            srgb: desc.srgb,
        });
        Ok(handle)
    }

    fn create_pipeline(
        &self,
        _device: &Handle,
        _swap_chain: &HeadlessSwapChain,
        desc: &PipelineDesc<'_>,
    ) -> Result<Handle> {
        let handle = self.ledger.track(ResourceKind::Pipeline, desc.label);
        let record = PipelineRecord {
            label: desc.label.to_string(),
            shader: desc.shader.name().to_string(),
            textured: desc.textured,
            blend: desc.blend,
            cull_mode: desc.cull_mode,
            depth_write: desc.depth_write,
            depth_compare: desc.depth_compare,
            vertex_stride: desc.vertex_layout.array_stride,
        };
        self.ledger.0.borrow_mut().pipelines.insert(handle.id(), record);
        Ok(handle)
    }

    fn create_binding(&self, _device: &Handle, desc: &BindingDesc<'_, Self>) -> Result<Handle> {
        let label = match desc {
            BindingDesc::Uniform { label, .. } | BindingDesc::Material { label, .. } => *label,
        };
        Ok(self.ledger.track(ResourceKind::Binding, label))
    }

    fn submit_frame(
        &self,
        _device: &Handle,
        swap_chain: &HeadlessSwapChain,
        back_buffer: &HeadlessTarget,
        depth_buffer: &HeadlessTarget,
        plan: &FramePlan<'_, Self>,
    ) -> Result<FrameStatus> {
        let mut state = self.ledger.0.borrow_mut();
        if std::mem::take(&mut state.fail_next_frame) {
            return Err(RendererError::FrameSubmissionFailed(
                "headless device lost".to_string(),
            ));
        }
        if std::mem::take(&mut state.skip_next_frame) {
            return Ok(FrameStatus::Skipped);
        }
        if back_buffer.size != swap_chain.size || depth_buffer.size != swap_chain.size {
            return Err(RendererError::FrameSubmissionFailed(format!(
                "targets {:?}/{:?} do not match the {:?} swap chain",
                back_buffer.size, depth_buffer.size, swap_chain.size
            )));
        }

        let mut draws = Vec::with_capacity(plan.draws.len());
        for draw in &plan.draws {
            let pipeline = state.pipelines.get(&draw.pipeline.id()).cloned().ok_or_else(|| {
                RendererError::FrameSubmissionFailed(format!("draw `{}` uses a released pipeline", draw.label))
            })?;
            draws.push(DrawRecord {
                label: draw.label.to_string(),
                pipeline,
                bindings: draw.bindings.iter().map(|b| b.label().to_string()).collect(),
                index_count: draw.index_count,
            });
        }

        state.frames.push(FrameRecord {
            clear_colour: plan.clear_colour,
            clear_depth: plan.clear_depth,
            viewport: plan.viewport,
            target_size: back_buffer.size,
            back_buffer: back_buffer.id(),
            depth_buffer: depth_buffer.id(),
            present_interval: swap_chain.present_interval,
            draws,
        });
        Ok(FrameStatus::Presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::BufferUsage;

    #[test]
    fn dropping_a_handle_records_its_release() {
        let api = HeadlessApi::default();
        let ledger = api.ledger();
        let adapters = api.enumerate_adapters();
        assert_eq!(adapters.len(), 2);
        assert_eq!(ledger.live(ResourceKind::Adapter).len(), 2);

        drop(adapters);
        assert_eq!(ledger.live_count(), 0);
        let released: Vec<String> = ledger.released().into_iter().map(|r| r.label).collect();
        assert_eq!(released, ["Microsoft Basic Render Driver", "Headless Adapter"]);
    }

    #[test]
    fn writes_replace_buffer_contents() {
        let api = HeadlessApi::new(HeadlessConfig {
            adapters: vec![AdapterInfo {
                name: "gpu".to_string(),
                is_software: false,
            }],
            ..Default::default()
        });
        let ledger = api.ledger();
        let (_, adapter) = api.enumerate_adapters().remove(0);
        let (device, _) = api.create_device(adapter, FeatureLevel::Core).unwrap();
        let buffer = api
            .create_buffer(
                &device,
                &BufferDesc {
                    label: "constants",
                    usage: BufferUsage::Constant,
                    contents: &[0; 8],
                },
            )
            .unwrap();

        api.write_buffer(&device, &buffer, &[1, 2, 3, 4]);
        assert_eq!(ledger.buffer("constants").unwrap(), [1, 2, 3, 4, 0, 0, 0, 0]);

        // oversized writes are rejected
        api.write_buffer(&device, &buffer, &[9; 16]);
        assert_eq!(ledger.buffer("constants").unwrap(), [1, 2, 3, 4, 0, 0, 0, 0]);

        drop(buffer);
        assert!(ledger.buffer("constants").is_none());
    }

    #[test]
    fn resize_is_refused_while_a_back_buffer_view_is_alive() {
        let api = HeadlessApi::default();
        let (_, adapter) = api.enumerate_adapters().pop().unwrap();
        let (device, _) = api.create_device(adapter, FeatureLevel::Core).unwrap();
        let mut swap_chain = api.create_swap_chain(&device, Extent::new(64, 64), 0).unwrap();
        assert_eq!(swap_chain.buffer_count(), 2);

        let view = api.create_back_buffer(&device, &swap_chain).unwrap();
        assert!(api.resize_buffers(&device, &mut swap_chain, Extent::new(32, 32)).is_err());

        drop(view);
        api.resize_buffers(&device, &mut swap_chain, Extent::new(32, 32)).unwrap();
        assert_eq!(swap_chain.size(), Extent::new(32, 32));
        assert_eq!(api.ledger().resizes(), [Extent::new(32, 32)]);
    }

    #[test]
    fn failure_switches_are_one_shot() {
        let api = HeadlessApi::default();
        let ledger = api.ledger();
        let (_, adapter) = api.enumerate_adapters().pop().unwrap();
        let (device, _) = api.create_device(adapter, FeatureLevel::Core).unwrap();
        let mut swap_chain = api.create_swap_chain(&device, Extent::new(8, 8), 1).unwrap();

        ledger.fail_next_resize();
        assert!(api.resize_buffers(&device, &mut swap_chain, Extent::new(4, 4)).is_err());
        assert!(api.resize_buffers(&device, &mut swap_chain, Extent::new(4, 4)).is_ok());
    }
}

//! wgpu implementation of [`GraphicsApi`], presenting into a winit window.

pub mod pipeline;
pub mod texture;

use std::cell::RefCell;
use std::iter;
use std::sync::Arc;

use futures::executor::block_on;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::{RendererError, Result};
use crate::gpu::{
    AdapterInfo, BindingDesc, BufferDesc, BufferUsage, Extent, FeatureLevel, FramePlan,
    FrameStatus, GraphicsApi, PipelineDesc, PresentInterval, SWAP_CHAIN_BUFFERS, TextureDesc,
};

pub struct WgpuApi {
    instance: wgpu::Instance,
    // handed to the swap chain when it is created
    surface: RefCell<Option<wgpu::Surface<'static>>>,
}

impl WgpuApi {
    /// Creates the instance and the window's surface.
    ///
    /// The surface exists before adapter selection so only adapters able to
    /// present to the window are offered.
    pub fn new(window: Arc<Window>) -> Result<Self> {
        // PRIMARY: Vulkan, Metal, DX12 or browser WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RendererError::SwapChainCreationFailed(e.to_string()))?;
        Ok(Self {
            instance,
            surface: RefCell::new(Some(surface)),
        })
    }
}

pub struct WgpuDevice {
    uniform_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    queue: wgpu::Queue,
    device: wgpu::Device,
    adapter: wgpu::Adapter,
}

pub struct WgpuSwapChain {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// The window surface at its configured size. The drawable texture itself is
/// acquired per frame.
#[derive(Debug)]
pub struct SurfaceTarget {
    pub format: wgpu::TextureFormat,
    pub size: Extent,
}

/// Identifies one physical adapter on one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AdapterKey {
    name: String,
    vendor: u32,
    device: u32,
    backend: wgpu::Backend,
}

impl From<&wgpu::AdapterInfo> for AdapterKey {
    fn from(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            vendor: info.vendor,
            device: info.device,
            backend: info.backend,
        }
    }
}

fn present_mode(present_interval: PresentInterval) -> wgpu::PresentMode {
    if present_interval == 0 {
        wgpu::PresentMode::AutoNoVsync
    } else {
        wgpu::PresentMode::AutoVsync
    }
}

impl GraphicsApi for WgpuApi {
    type Adapter = wgpu::Adapter;
    type Device = WgpuDevice;
    type SwapChain = WgpuSwapChain;
    type BackBuffer = SurfaceTarget;
    type DepthBuffer = texture::DepthTexture;
    type Buffer = wgpu::Buffer;
    type Texture = texture::Texture;
    type Pipeline = wgpu::RenderPipeline;
    type Binding = wgpu::BindGroup;

    /// Asks wgpu for an adapter under each power preference, then for its
    /// fallback adapter. This yields at most one adapter per request, so of
    /// several identical GPUs only the preferred one is offered.
    fn enumerate_adapters(&self) -> Vec<(AdapterInfo, wgpu::Adapter)> {
        let surface = self.surface.borrow();
        let requests = [
            (wgpu::PowerPreference::HighPerformance, false),
            (wgpu::PowerPreference::LowPower, false),
            (wgpu::PowerPreference::None, true),
        ];
        let mut found: Vec<(AdapterInfo, wgpu::Adapter)> = Vec::new();
        for (power_preference, force_fallback_adapter) in requests {
            let adapter = match block_on(self.instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter,
            })) {
                Ok(adapter) => adapter,
                Err(e) => {
                    log::debug!("no adapter for {power_preference:?} (fallback: {force_fallback_adapter}): {e}");
                    continue;
                }
            };
            let info = adapter.get_info();
            // the same adapter answers several preferences
            let key = AdapterKey::from(&info);
            if found.iter().any(|(_, known)| AdapterKey::from(&known.get_info()) == key) {
                continue;
            }
            log::debug!("found adapter {} ({:?}, {:?})", info.name, info.device_type, info.backend);
            found.push((
                AdapterInfo {
                    name: info.name,
                    is_software: info.device_type == wgpu::DeviceType::Cpu,
                },
                adapter,
            ));
        }
        found
    }

    fn create_device(
        &self,
        adapter: wgpu::Adapter,
        required: FeatureLevel,
    ) -> Result<(WgpuDevice, FeatureLevel)> {
        let actual = if adapter.get_downlevel_capabilities().is_webgpu_compliant()
            && wgpu::Limits::default().check_limits(&adapter.limits())
        {
            FeatureLevel::Core
        } else {
            FeatureLevel::Downlevel
        };
        if actual != required {
            log::debug!("adapter offers {actual:?}, {required:?} was requested");
        }
        // request what the adapter can actually give; the caller judges the level
        let required_limits = match actual {
            FeatureLevel::Core => wgpu::Limits::default(),
            FeatureLevel::Downlevel => wgpu::Limits::downlevel_defaults(),
        };

        let (device, queue) = block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("orbit-ngin device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RendererError::DeviceCreationFailed(e.to_string()))?;

        let uniform_layout = pipeline::uniform_layout(&device);
        let material_layout = pipeline::diffuse_normal_layout(&device);
        let sampler = texture::create_default_sampler(&device);

        Ok((
            WgpuDevice {
                uniform_layout,
                material_layout,
                sampler,
                queue,
                device,
                adapter,
            },
            actual,
        ))
    }

    fn create_swap_chain(
        &self,
        device: &WgpuDevice,
        size: Extent,
        present_interval: PresentInterval,
    ) -> Result<WgpuSwapChain> {
        let Some(surface) = self.surface.borrow_mut().take() else {
            return Err(RendererError::SwapChainCreationFailed(
                "the window surface already belongs to a swap chain".to_string(),
            ));
        };

        let surface_caps = surface.get_capabilities(&device.adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(RendererError::SwapChainCreationFailed(
                "the adapter cannot present to this window".to_string(),
            ));
        };
        // Shaders output linear colour, so prefer an sRGB surface.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(first_format);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(present_interval),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: SWAP_CHAIN_BUFFERS,
        };
        surface.configure(&device.device, &config);
        log::info!(
            "swap chain {}x{} {:?}, {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(WgpuSwapChain { surface, config })
    }

    fn resize_buffers(&self, device: &WgpuDevice, swap_chain: &mut WgpuSwapChain, size: Extent) -> Result<()> {
        if size.is_empty() {
            return Err(RendererError::SwapChainCreationFailed(format!(
                "cannot configure a {}x{} surface",
                size.width, size.height
            )));
        }
        swap_chain.config.width = size.width;
        swap_chain.config.height = size.height;
        swap_chain.surface.configure(&device.device, &swap_chain.config);
        Ok(())
    }

    fn create_back_buffer(&self, _device: &WgpuDevice, swap_chain: &WgpuSwapChain) -> Result<SurfaceTarget> {
        Ok(SurfaceTarget {
            format: swap_chain.config.format,
            size: Extent::new(swap_chain.config.width, swap_chain.config.height),
        })
    }

    fn create_depth_buffer(&self, device: &WgpuDevice, size: Extent) -> Result<texture::DepthTexture> {
        Ok(texture::create_depth_texture(&device.device, size, "depth_texture"))
    }

    fn create_buffer(&self, device: &WgpuDevice, desc: &BufferDesc<'_>) -> Result<wgpu::Buffer> {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Constant => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };
        Ok(device.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: desc.contents,
            usage,
        }))
    }

    fn write_buffer(&self, device: &WgpuDevice, buffer: &wgpu::Buffer, data: &[u8]) {
        device.queue.write_buffer(buffer, 0, data);
    }

    fn create_texture(&self, device: &WgpuDevice, desc: &TextureDesc<'_>) -> Result<texture::Texture> {
        let (width, height) = desc.image.dimensions();
        if width == 0 || height == 0 {
            return Err(RendererError::ResourceCreationFailed(format!(
                "texture `{}` has no texels",
                desc.label
            )));
        }
        Ok(texture::from_image(
            &device.device,
            &device.queue,
            desc.image,
            desc.label,
            desc.srgb,
        ))
    }

    fn create_pipeline(
        &self,
        device: &WgpuDevice,
        swap_chain: &WgpuSwapChain,
        desc: &PipelineDesc<'_>,
    ) -> Result<wgpu::RenderPipeline> {
        Ok(pipeline::mk_render_pipeline(
            &device.device,
            &device.uniform_layout,
            &device.material_layout,
            swap_chain.config.format,
            desc,
        ))
    }

    fn create_binding(&self, device: &WgpuDevice, desc: &BindingDesc<'_, Self>) -> Result<wgpu::BindGroup> {
        let bind_group = match desc {
            BindingDesc::Uniform { label, buffer } => device.device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &device.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
                label: Some(*label),
            }),
            BindingDesc::Material { label, diffuse, normal } => {
                device.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout: &device.material_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&diffuse.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&device.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&normal.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::Sampler(&device.sampler),
                        },
                    ],
                    label: Some(*label),
                })
            }
        };
        Ok(bind_group)
    }

    fn submit_frame(
        &self,
        device: &WgpuDevice,
        swap_chain: &WgpuSwapChain,
        _back_buffer: &SurfaceTarget,
        depth_buffer: &texture::DepthTexture,
        plan: &FramePlan<'_, Self>,
    ) -> Result<FrameStatus> {
        let output = match swap_chain.surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                swap_chain.surface.configure(&device.device, &swap_chain.config);
                return Ok(FrameStatus::Skipped);
            }
            Err(e @ (wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other)) => {
                log::warn!("skipping frame: {e}");
                return Ok(FrameStatus::Skipped);
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                return Err(RendererError::FrameSubmissionFailed(e.to_string()));
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let width = plan.viewport.width.min(output.texture.width());
        let height = plan.viewport.height.min(output.texture.height());

        let mut encoder = device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(plan.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_buffer.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(plan.clear_depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            render_pass.set_scissor_rect(0, 0, width, height);

            for draw in &plan.draws {
                render_pass.set_pipeline(draw.pipeline);
                for (group, binding) in draw.bindings.iter().enumerate() {
                    render_pass.set_bind_group(group as u32, *binding, &[]);
                }
                render_pass.set_vertex_buffer(0, draw.vertices.slice(..));
                render_pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        device.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(FrameStatus::Presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, device: u32, backend: wgpu::Backend) -> AdapterKey {
        AdapterKey {
            name: name.to_string(),
            vendor: 0x10de,
            device,
            backend,
        }
    }

    #[test]
    fn adapters_differ_by_device_and_backend_not_only_name() {
        let vulkan = key("GeForce RTX 4070", 0x2786, wgpu::Backend::Vulkan);
        assert_eq!(vulkan, key("GeForce RTX 4070", 0x2786, wgpu::Backend::Vulkan));
        assert_ne!(vulkan, key("GeForce RTX 4070", 0x2709, wgpu::Backend::Vulkan));
        assert_ne!(vulkan, key("GeForce RTX 4070", 0x2786, wgpu::Backend::Dx12));
    }

    #[test]
    fn present_interval_zero_does_not_wait_for_vblank() {
        assert_eq!(present_mode(0), wgpu::PresentMode::AutoNoVsync);
        assert_eq!(present_mode(1), wgpu::PresentMode::AutoVsync);
    }
}

//! Device, swap chain and render-target ownership.
//!
//! [`GraphicsDevice`] picks a hardware adapter, creates the device at the
//! required feature level and keeps a double-buffered swap chain plus a
//! back-buffer view and depth view sized to the window's client area.
//!
//! Field order is teardown order: views go first, then the swap chain, then
//! the device.

use crate::error::{RendererError, Result};
use crate::gpu::{AdapterInfo, Extent, FeatureLevel, GraphicsApi, PresentInterval};

/// Every device is created at this level; anything else is rejected.
pub const REQUIRED_FEATURE_LEVEL: FeatureLevel = FeatureLevel::Core;

/// The back-buffer view and its depth view. They always share one size.
pub struct RenderTargets<B: GraphicsApi> {
    pub back_buffer: B::BackBuffer,
    pub depth_buffer: B::DepthBuffer,
}

pub struct GraphicsDevice<B: GraphicsApi> {
    targets: Option<RenderTargets<B>>,
    swap_chain: B::SwapChain,
    device: B::Device,
    api: B,
    adapter: AdapterInfo,
    feature_level: FeatureLevel,
    size: Extent,
    present_interval: PresentInterval,
}

impl<B: GraphicsApi> GraphicsDevice<B> {
    /// Creates the device, swap chain and both views for a `size` client area.
    ///
    /// Software adapters are skipped. Nothing is retried: the first failing
    /// step decides the error.
    pub fn init(api: B, size: Extent, present_interval: PresentInterval) -> Result<Self> {
        let (adapter_info, adapter) = api
            .enumerate_adapters()
            .into_iter()
            .find(|(info, _)| {
                if info.is_fallback() {
                    log::info!("skipping software adapter `{}`", info.name);
                    return false;
                }
                true
            })
            .ok_or(RendererError::AdapterNotFound)?;
        log::info!("using adapter `{}`", adapter_info.name);

        let (device, feature_level) = api.create_device(adapter, REQUIRED_FEATURE_LEVEL)?;
        if feature_level != REQUIRED_FEATURE_LEVEL {
            return Err(RendererError::FeatureLevelMismatch {
                required: REQUIRED_FEATURE_LEVEL,
                actual: feature_level,
            });
        }
        log::info!("device created at {feature_level:?} level");

        if size.is_empty() {
            return Err(RendererError::SwapChainCreationFailed(format!(
                "client area is {}x{}",
                size.width, size.height
            )));
        }
        let swap_chain = api.create_swap_chain(&device, size, present_interval)?;
        let targets = Self::create_back_buffer_and_depth_views(&api, &device, &swap_chain, size)?;

        Ok(Self {
            targets: Some(targets),
            swap_chain,
            device,
            api,
            adapter: adapter_info,
            feature_level,
            size,
            present_interval,
        })
    }

    /// Matches the swap chain and both views to a new client area.
    ///
    /// Resizing to the current size keeps the existing views. A zero-sized
    /// client area (minimised window) is ignored. If any step fails, both
    /// views are gone and the device stays non-renderable until a later
    /// resize succeeds.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let size = Extent::new(width, height);
        if size.is_empty() {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        if size == self.size && self.targets.is_some() {
            log::debug!("resize to the current {width}x{height} is a no-op");
            return Ok(());
        }

        // the swap chain cannot resize while views of its buffers exist
        self.targets = None;
        self.api.resize_buffers(&self.device, &mut self.swap_chain, size)?;
        self.size = size;
        let targets =
            Self::create_back_buffer_and_depth_views(&self.api, &self.device, &self.swap_chain, size)?;
        self.targets = Some(targets);
        log::debug!("render targets recreated at {width}x{height}");
        Ok(())
    }

    fn create_back_buffer_and_depth_views(
        api: &B,
        device: &B::Device,
        swap_chain: &B::SwapChain,
        size: Extent,
    ) -> Result<RenderTargets<B>> {
        let back_buffer = api.create_back_buffer(device, swap_chain)?;
        let depth_buffer = api.create_depth_buffer(device, size)?;
        Ok(RenderTargets {
            back_buffer,
            depth_buffer,
        })
    }

    pub fn api(&self) -> &B {
        &self.api
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn swap_chain(&self) -> &B::SwapChain {
        &self.swap_chain
    }

    /// Both views, or `TargetsUnavailable` after a failed resize.
    pub fn targets(&self) -> Result<&RenderTargets<B>> {
        self.targets.as_ref().ok_or(RendererError::TargetsUnavailable)
    }

    pub fn back_buffer(&self) -> Option<&B::BackBuffer> {
        self.targets.as_ref().map(|t| &t.back_buffer)
    }

    pub fn depth_buffer(&self) -> Option<&B::DepthBuffer> {
        self.targets.as_ref().map(|t| &t.depth_buffer)
    }

    pub fn is_renderable(&self) -> bool {
        self.targets.is_some()
    }

    /// Client area the swap chain and views were last sized to.
    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.feature_level
    }

    pub fn present_interval(&self) -> PresentInterval {
        self.present_interval
    }
}

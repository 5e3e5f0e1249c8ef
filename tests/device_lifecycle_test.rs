use orbit_ngin::config::RendererConfig;
use orbit_ngin::device::GraphicsDevice;
use orbit_ngin::error::RendererError;
use orbit_ngin::gpu::headless::{HeadlessConfig, ResourceKind};
use orbit_ngin::gpu::{Extent, FeatureLevel, SWAP_CHAIN_BUFFERS};

use crate::common::test_utils::{WINDOW, hardware_adapter, headless, init_renderer, software_adapter};

mod common;

#[test]
fn software_adapters_are_skipped() {
    let (api, ledger) = headless(HeadlessConfig {
        adapters: vec![
            software_adapter("Microsoft Basic Render Driver"),
            hardware_adapter("llvmpipe (LLVM 17.0.6, 256 bits)"),
            hardware_adapter("Discrete GPU"),
        ],
        ..Default::default()
    });

    let gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();
    assert_eq!(gpu.adapter().name, "Discrete GPU");
    assert_eq!(gpu.feature_level(), FeatureLevel::Core);
    assert_eq!(gpu.size(), WINDOW);
    assert!(gpu.is_renderable());
    assert_eq!(gpu.swap_chain().buffer_count(), SWAP_CHAIN_BUFFERS);
    assert_eq!(ledger.live(ResourceKind::BackBuffer).len(), 1);
    assert_eq!(ledger.live(ResourceKind::DepthBuffer).len(), 1);
}

#[test]
fn only_software_adapters_means_no_adapter() {
    let (api, ledger) = headless(HeadlessConfig {
        adapters: vec![software_adapter("Microsoft Basic Render Driver"), hardware_adapter("SwiftShader Device")],
        ..Default::default()
    });

    let err = GraphicsDevice::init(api, WINDOW, 0).err().unwrap();
    assert!(matches!(err, RendererError::AdapterNotFound));
    assert!(ledger.created(ResourceKind::Device).is_empty());
    assert_eq!(ledger.live_count(), 0);
}

#[test]
fn downlevel_devices_are_rejected() {
    let (api, ledger) = headless(HeadlessConfig {
        feature_level: FeatureLevel::Downlevel,
        ..Default::default()
    });

    let err = GraphicsDevice::init(api, WINDOW, 0).err().unwrap();
    match err {
        RendererError::FeatureLevelMismatch { required, actual } => {
            assert_eq!(required, FeatureLevel::Core);
            assert_eq!(actual, FeatureLevel::Downlevel);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(ledger.created(ResourceKind::SwapChain).is_empty());
    assert_eq!(ledger.live_count(), 0);
}

#[test]
fn device_creation_failure_is_reported() {
    let (api, _) = headless(HeadlessConfig {
        fail_device: true,
        ..Default::default()
    });
    let err = GraphicsDevice::init(api, WINDOW, 0).err().unwrap();
    assert!(matches!(err, RendererError::DeviceCreationFailed(_)));
}

#[test]
fn swap_chain_needs_a_client_area() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let err = GraphicsDevice::init(api, Extent::new(0, 600), 0).err().unwrap();
    assert!(matches!(err, RendererError::SwapChainCreationFailed(_)));
    assert_eq!(ledger.live_count(), 0);

    let (api, _) = headless(HeadlessConfig {
        fail_swap_chain: true,
        ..Default::default()
    });
    let err = GraphicsDevice::init(api, WINDOW, 0).err().unwrap();
    assert!(matches!(err, RendererError::SwapChainCreationFailed(_)));
}

#[test]
fn resize_to_the_current_size_keeps_the_views() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let mut gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();
    let back = gpu.back_buffer().unwrap().id();
    let depth = gpu.depth_buffer().unwrap().id();

    gpu.resize(800, 600).unwrap();

    assert_eq!(gpu.back_buffer().unwrap().id(), back);
    assert_eq!(gpu.depth_buffer().unwrap().id(), depth);
    assert!(ledger.resizes().is_empty());
    assert_eq!(ledger.created(ResourceKind::BackBuffer).len(), 1);
}

#[test]
fn resize_recreates_both_views_at_the_new_size() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let mut gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();
    let back = gpu.back_buffer().unwrap().id();
    let depth = gpu.depth_buffer().unwrap().id();

    gpu.resize(1024, 768).unwrap();

    let size = Extent::new(1024, 768);
    assert_eq!(gpu.size(), size);
    assert_eq!(gpu.swap_chain().size(), size);
    assert_eq!(ledger.resizes(), [size]);
    assert_ne!(gpu.back_buffer().unwrap().id(), back);
    assert_ne!(gpu.depth_buffer().unwrap().id(), depth);
    assert_eq!(gpu.back_buffer().unwrap().size(), size);
    assert_eq!(gpu.depth_buffer().unwrap().size(), size);
    // the old views went away
    assert_eq!(ledger.live(ResourceKind::BackBuffer).len(), 1);
    assert_eq!(ledger.live(ResourceKind::DepthBuffer).len(), 1);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let mut gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();

    gpu.resize(0, 0).unwrap();

    assert!(gpu.is_renderable());
    assert_eq!(gpu.size(), WINDOW);
    assert!(ledger.resizes().is_empty());
}

#[test]
fn failed_resize_leaves_no_targets_until_the_next_one_succeeds() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let mut gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();

    ledger.fail_next_resize();
    let err = gpu.resize(640, 480).err().unwrap();
    assert!(matches!(err, RendererError::SwapChainCreationFailed(_)));
    assert!(!gpu.is_renderable());
    assert!(matches!(gpu.targets(), Err(RendererError::TargetsUnavailable)));
    assert!(ledger.live(ResourceKind::BackBuffer).is_empty());
    assert!(ledger.live(ResourceKind::DepthBuffer).is_empty());

    // same size as before, but the views are gone so it is not a no-op
    gpu.resize(800, 600).unwrap();
    assert!(gpu.is_renderable());
    assert_eq!(ledger.resizes(), [WINDOW]);
}

#[test]
fn failed_depth_view_also_leaves_no_targets() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let mut gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();

    ledger.fail_depth_buffers(true);
    let err = gpu.resize(640, 480).err().unwrap();
    assert!(matches!(err, RendererError::ResourceCreationFailed(_)));
    assert!(!gpu.is_renderable());
    assert!(ledger.live(ResourceKind::BackBuffer).is_empty());

    ledger.fail_depth_buffers(false);
    gpu.resize(640, 480).unwrap();
    assert_eq!(gpu.depth_buffer().unwrap().size(), Extent::new(640, 480));
}

#[test]
fn teardown_releases_views_then_swap_chain_then_device() {
    let (api, ledger) = headless(HeadlessConfig::default());
    let gpu = GraphicsDevice::init(api, WINDOW, 0).unwrap();
    let released_before = ledger.released().len();

    drop(gpu);

    let kinds: Vec<ResourceKind> = ledger.released()[released_before..]
        .iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(
        kinds,
        [
            ResourceKind::BackBuffer,
            ResourceKind::DepthBuffer,
            ResourceKind::SwapChain,
            ResourceKind::Device
        ]
    );
    assert_eq!(ledger.live_count(), 0);
}

#[test]
fn renderer_term_releases_the_scene_before_the_device() {
    let (renderer, ledger) = init_renderer(&RendererConfig::default());
    assert!(ledger.live_count() > 0);

    renderer.term();

    let released = ledger.released();
    let position = |kind: ResourceKind| released.iter().rposition(|r| r.kind == kind).unwrap();
    let swap_chain = position(ResourceKind::SwapChain);
    for kind in [
        ResourceKind::Buffer,
        ResourceKind::Texture,
        ResourceKind::Pipeline,
        ResourceKind::Binding,
    ] {
        assert!(position(kind) < swap_chain, "{kind:?} released after the swap chain");
    }
    assert_eq!(released.last().unwrap().kind, ResourceKind::Device);
    assert_eq!(ledger.live_count(), 0);
}

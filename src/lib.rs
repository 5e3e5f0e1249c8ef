//! orbit-ngin
//!
//! A small wgpu scene renderer: a textured, normal-mapped cube spinning in the
//! middle of the scene, two alpha-blended quads drawn back to front, and a camera
//! that orbits the origin under mouse control.
//!
//! High-level modules
//! - `app`: window, event loop and per-frame driving
//! - `device`: adapter selection, swap chain and render target lifecycle
//! - `gpu`: the graphics backend seam, with a wgpu and a headless implementation
//! - `renderer`: per-frame update and the opaque then transparent draw order
//! - `resources`: meshes, textures and the scene's GPU resources
//! - `camera` / `input`: orbit camera and the mouse handling that drives it
//! - `shader`: WGSL sources and their validation
//!

pub mod app;
pub mod camera;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod gpu;
pub mod input;
pub mod renderer;
pub mod resources;
pub mod shader;
pub mod transparency;
pub mod uniforms;

pub use camera::OrbitCamera;
pub use config::RendererConfig;
pub use device::GraphicsDevice;
pub use error::{RendererError, Result};
pub use gpu::{Extent, FeatureLevel, FrameStatus, GraphicsApi};
pub use renderer::SceneRenderer;
pub use uniforms::RenderMode;

//! Window and event loop.
//!
//! The window is created on the first `resumed` event, and the renderer is
//! brought up for its client area. After that every `RedrawRequested` advances one
//! frame and requests the next one, so the scene animates continuously.
//! Closing the window, or any renderer error, tears the renderer down and exits.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::config::RendererConfig;
use crate::gpu::native::WgpuApi;
use crate::gpu::Extent;
use crate::input::{InputAction, InputController};
use crate::renderer::SceneRenderer;
use crate::resources::texture::AssetTextureLoader;
use crate::shader::BuiltinShaders;

struct App {
    config: RendererConfig,
    input: InputController,
    // dropped before the window it draws into
    renderer: Option<SceneRenderer<WgpuApi>>,
    window: Option<Arc<Window>>,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            input: InputController::new(),
            renderer: None,
            window: None,
        }
    }

    fn init_renderer(&self, window: Arc<Window>) -> crate::error::Result<SceneRenderer<WgpuApi>> {
        let size = Extent::from(window.inner_size());
        let api = WgpuApi::new(window)?;
        let textures = AssetTextureLoader::new(self.config.asset_dir.clone());
        SceneRenderer::init(api, size, &self.config, &BuiltinShaders, &textures)
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.take() {
            renderer.term();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = self.config.window_size;
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(size.width, size.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match self.init_renderer(window.clone()) {
            Ok(renderer) => {
                log::info!(
                    "renderer ready on {} ({:?})",
                    renderer.device().adapter().name,
                    renderer.device().feature_level()
                );
                self.renderer = Some(renderer);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("renderer init failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let renderer = match &mut self.renderer {
            Some(renderer) => renderer,
            None => return,
        };

        let viewport = renderer.device().size();
        if self.input.handle_window_event(&event, renderer.camera_mut(), viewport)
            == InputAction::CycleRenderMode
        {
            let mode = renderer.render_mode().next();
            renderer.set_render_mode(mode);
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                match renderer.resize(size.width, size.height) {
                    Ok(()) => {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Err(e) => log::error!("resize to {}x{} failed: {e}", size.width, size.height),
                }
            }
            WindowEvent::RedrawRequested => {
                // only a failed resize leaves the device without targets; wait for the next one
                if !renderer.device().is_renderable() {
                    return;
                }
                match renderer.advance() {
                    Ok(_) => {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Err(e) => {
                        log::error!("frame failed: {e}");
                        self.shutdown(event_loop);
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(RendererConfig::from_env());
    event_loop.run_app(&mut app)?;

    Ok(())
}

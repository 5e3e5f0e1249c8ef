//! Mouse and keyboard input for the orbit camera.
//!
//! Dragging with the left button orbits the camera by the cursor's pixel delta;
//! the wheel moves it in and out. `M` cycles the render mode.

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::OrbitCamera;
use crate::gpu::Extent;

/// Wheel units reported per notch (line) of scrolling.
pub const WHEEL_DELTA: f32 = 120.0;

/// What the application should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    CycleRenderMode,
}

#[derive(Debug, Default)]
pub struct InputController {
    cursor: Option<(f64, f64)>,
    dragging: bool,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn on_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    /// Tracks the cursor; while dragging, the delta since the last position orbits the camera.
    pub fn on_cursor_moved(&mut self, camera: &mut OrbitCamera, x: f64, y: f64, viewport: Extent) {
        if let Some((last_x, last_y)) = self.cursor.replace((x, y)) {
            if self.dragging {
                camera.on_mouse_move(
                    (x - last_x) as f32,
                    (y - last_y) as f32,
                    viewport.width,
                    viewport.height,
                );
            }
        }
    }

    pub fn on_cursor_left(&mut self) {
        self.cursor = None;
    }

    pub fn on_wheel(&mut self, camera: &mut OrbitCamera, delta: MouseScrollDelta) {
        camera.on_mouse_wheel(wheel_units(delta));
    }

    pub fn handle_window_event(
        &mut self,
        event: &WindowEvent,
        camera: &mut OrbitCamera,
        viewport: Extent,
    ) -> InputAction {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.on_button(state.is_pressed()),
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(camera, position.x, position.y, viewport)
            }
            WindowEvent::CursorLeft { .. } => self.on_cursor_left(),
            WindowEvent::MouseWheel { delta, .. } => self.on_wheel(camera, *delta),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyM) =>
            {
                return InputAction::CycleRenderMode;
            }
            _ => {}
        }
        InputAction::None
    }
}

/// Converts a scroll delta to wheel units (120 per line).
pub fn wheel_units(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, lines) => lines * WHEEL_DELTA,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
    }
}

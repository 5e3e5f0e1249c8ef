//! Orbit camera.
//!
//! The camera circles the world origin. Its state is three numbers: `longitude`
//! (rotation about Y), `latitude` (rotation about X, clamped to ±π/2) and
//! `distance` from the origin. Mouse input moves it through
//! [`OrbitCamera::on_mouse_move`] and [`OrbitCamera::on_mouse_wheel`].
//!
//! The projection is a left-handed perspective with a `[0, 1]` depth range, which
//! is what wgpu expects after the perspective divide.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3, Vector4};

/// Near clipping plane.
pub const NEAR: f32 = 0.001;
/// Far clipping plane.
pub const FAR: f32 = 100.0;
/// Horizontal field of view.
pub const FOV: Deg<f32> = Deg(120.0);

/// Radians of orbit per viewport width (or height) of mouse travel.
const MOUSE_SENSITIVITY: f32 = 5.0;
/// Wheel units per unit of distance.
const WHEEL_STEP: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    longitude: f32,
    latitude: f32,
    distance: f32,
}

impl OrbitCamera {
    /// Creates a camera, clamping `latitude` and `distance` into their valid ranges.
    pub fn new(longitude: f32, latitude: f32, distance: f32) -> Self {
        Self {
            longitude,
            latitude: latitude.clamp(-FRAC_PI_2, FRAC_PI_2),
            distance: distance.max(0.0),
        }
    }

    pub fn longitude(&self) -> f32 {
        self.longitude
    }

    pub fn latitude(&self) -> f32 {
        self.latitude
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Orbits the camera by a cursor delta measured in viewport pixels.
    pub fn on_mouse_move(&mut self, dx: f32, dy: f32, viewport_width: u32, viewport_height: u32) {
        if viewport_width == 0 || viewport_height == 0 {
            log::warn!("mouse move ignored: viewport has zero size");
            return;
        }
        self.longitude += -dx / viewport_width as f32 * MOUSE_SENSITIVITY;
        self.latitude += -dy / viewport_height as f32 * MOUSE_SENSITIVITY;
        self.latitude = self.latitude.clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Moves the camera along its view axis; `dz` is in wheel units (120 per notch).
    pub fn on_mouse_wheel(&mut self, dz: f32) {
        self.distance = (self.distance + dz / WHEEL_STEP).max(0.0);
    }

    /// Rotation part of the camera's world transform.
    fn orientation(&self) -> Matrix4<f32> {
        Matrix4::from_angle_y(Rad(self.longitude)) * Matrix4::from_angle_x(Rad(self.latitude))
    }

    /// Camera-to-world transform: push the camera back along -Z, tilt it by the
    /// latitude, then swing it around Y by the longitude.
    pub fn world_transform(&self) -> Matrix4<f32> {
        self.orientation() * Matrix4::from_translation(Vector3::new(0.0, 0.0, -self.distance))
    }

    /// World-to-camera transform, the inverse of [`world_transform`](Self::world_transform).
    ///
    /// The camera transform is rigid, so the inverse is built directly from the
    /// inverted factors in reverse order.
    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(0.0, 0.0, self.distance))
            * Matrix4::from_angle_x(Rad(-self.latitude))
            * Matrix4::from_angle_y(Rad(-self.longitude))
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Point3<f32> {
        let p = self.world_transform() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        Point3::new(p.x, p.y, p.z)
    }

    /// Unit vector the camera looks along, in world space.
    pub fn forward(&self) -> Vector3<f32> {
        (self.orientation() * Vector4::new(0.0, 0.0, 1.0, 0.0)).truncate()
    }

    pub fn view_projection(&self, viewport_width: u32, viewport_height: u32) -> (Matrix4<f32>, Matrix4<f32>) {
        (self.view(), projection(viewport_width, viewport_height))
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 5.0)
    }
}

/// Left-handed perspective projection mapping depth to `[0, 1]`.
///
/// The near-plane half height is `half_width * height / width`. That is the
/// reciprocal of the usual aspect ratio and stretches the image on wide windows.
/// TODO: compare against screenshots of the scene and switch to `width / height` if the stretch is unwanted.
pub fn projection(viewport_width: u32, viewport_height: u32) -> Matrix4<f32> {
    let half_width = NEAR / (Rad::from(FOV).0 / 2.0).tan();
    let ratio = if viewport_width == 0 {
        1.0
    } else {
        viewport_height as f32 / viewport_width as f32
    };
    let half_height = half_width * ratio;
    perspective_off_center_lh(half_width, half_height, NEAR, FAR)
}

/// Symmetric left-handed frustum given the near-plane half extents.
fn perspective_off_center_lh(half_width: f32, half_height: f32, near: f32, far: f32) -> Matrix4<f32> {
    let depth = far / (far - near);
    #[rustfmt::skip]
    let m = Matrix4::new(
        near / half_width, 0.0,                0.0,            0.0,
        0.0,               near / half_height, 0.0,            0.0,
        0.0,               0.0,                depth,          1.0,
        0.0,               0.0,                -near * depth,  0.0,
    );
    m
}

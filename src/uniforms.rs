//! Constant-buffer layouts shared with the WGSL shaders.
//!
//! Each struct here is copied byte for byte into a uniform buffer, so field order
//! and padding follow WGSL's uniform layout rules (vec3/mat3 columns occupy 16
//! bytes, structs round up to 16).

use bytemuck::Zeroable;
use cgmath::{Matrix, Matrix3, Matrix4, Point3, SquareMatrix};

/// Maximum number of point lights the scene buffer carries.
pub const MAX_LIGHTS: usize = 4;

/// How the fragment shaders shade the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Diffuse texture, normal map and point lights.
    #[default]
    Lit,
    /// World-space normals as colours.
    Normals,
    /// Unlit diffuse texture.
    Albedo,
}

impl RenderMode {
    pub fn next(self) -> Self {
        match self {
            RenderMode::Lit => RenderMode::Normals,
            RenderMode::Normals => RenderMode::Albedo,
            RenderMode::Albedo => RenderMode::Lit,
        }
    }

    /// Value of the `render_mode` flag read by the shaders.
    pub fn flag(self) -> u32 {
        match self {
            RenderMode::Lit => 0,
            RenderMode::Normals => 1,
            RenderMode::Albedo => 2,
        }
    }
}

/// Per-drawable constants: transform, normal transform and colour.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    // mat3x3 columns are padded to vec4 in uniform buffers
    pub normal: [[f32; 4]; 3],
    pub color: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Matrix4<f32>, color: [f32; 4]) -> Self {
        let normal = normal_matrix(&model);
        Self {
            model: model.into(),
            normal: [
                [normal.x.x, normal.x.y, normal.x.z, 0.0],
                [normal.y.x, normal.y.y, normal.y.z, 0.0],
                [normal.z.x, normal.z.y, normal.z.z, 0.0],
            ],
            color,
        }
    }
}

/// Inverse-transpose of the upper 3x3 block of `model`.
///
/// Keeps normals perpendicular to surfaces under non-uniform scale. For a pure
/// rotation it is the rotation itself. A singular block (zero scale) yields the
/// identity.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate());
    upper
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: u32,
    pub color: [f32; 3],
    pub _padding2: u32,
}

/// A static point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub color: [f32; 3],
}

impl From<&PointLight> for LightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.into(),
            _padding: 0,
            color: light.color,
            _padding2: 0,
        }
    }
}

/// Per-frame constants shared by every draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
    pub light_count: u32,
    pub render_mode: u32,
    pub _padding: [u32; 2],
}

impl SceneUniform {
    /// Builds the scene constants; lights beyond [`MAX_LIGHTS`] are dropped.
    pub fn new(
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        eye: Point3<f32>,
        lights: &[PointLight],
        mode: RenderMode,
    ) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "scene declares {} lights, only the first {} are uploaded",
                lights.len(),
                MAX_LIGHTS
            );
        }
        let mut packed = [LightUniform::zeroed(); MAX_LIGHTS];
        for (slot, light) in packed.iter_mut().zip(lights) {
            *slot = light.into();
        }
        Self {
            view_proj: (projection * view).into(),
            eye: [eye.x, eye.y, eye.z, 1.0],
            lights: packed,
            light_count: lights.len().min(MAX_LIGHTS) as u32,
            render_mode: mode.flag(),
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Rad, Vector3};

    use super::*;

    #[test]
    fn layouts_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 128);
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
        assert_eq!(std::mem::size_of::<SceneUniform>(), 224);
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let rotation = Matrix4::from_angle_y(Rad(0.8));
        let normal = normal_matrix(&rotation);
        let expected = Matrix3::from_angle_y(Rad(0.8));
        let a: [[f32; 3]; 3] = normal.into();
        let b: [[f32; 3]; 3] = expected.into();
        for c in 0..3 {
            for r in 0..3 {
                assert_relative_eq!(a[c][r], b[c][r], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let normal = normal_matrix(&model);
        // a surface tilted 45 degrees in XY keeps a normal perpendicular to it
        let tangent = Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate())
            * Vector3::new(1.0, -1.0, 0.0);
        let n = normal * Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(cgmath::dot(tangent, n), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn singular_model_falls_back_to_identity() {
        let model = Matrix4::from_scale(0.0);
        assert_eq!(normal_matrix(&model), Matrix3::identity());
    }

    #[test]
    fn scene_uniform_caps_lights() {
        let light = PointLight {
            position: Point3::new(1.0, 2.0, 3.0),
            color: [1.0, 0.5, 0.25],
        };
        let lights = [light; 6];
        let scene = SceneUniform::new(
            Matrix4::identity(),
            Matrix4::identity(),
            Point3::new(0.0, 0.0, -5.0),
            &lights,
            RenderMode::Normals,
        );
        assert_eq!(scene.light_count, MAX_LIGHTS as u32);
        assert_eq!(scene.render_mode, 1);
        assert_eq!(scene.lights[3].position, [1.0, 2.0, 3.0]);
        assert_eq!(scene.eye, [0.0, 0.0, -5.0, 1.0]);
    }

    #[test]
    fn render_mode_cycles_through_all_modes() {
        let mode = RenderMode::default();
        assert_eq!(mode, RenderMode::Lit);
        assert_eq!(mode.next().next().next(), RenderMode::Lit);
        assert_ne!(mode.next(), mode);
    }
}

//! Scene content and the GPU resources that draw it.
//!
//! [`SceneDesc`] says what is in the scene: opaque drawables, transparent
//! drawables and point lights. [`ResourceSet::load`] turns it into geometry,
//! textures, pipelines and one constant buffer per drawable. The set is built
//! once per scene load and never reallocated; only constant buffer contents
//! change from frame to frame.

pub mod mesh;
pub mod texture;

use std::f64::consts::TAU;

use bytemuck::Zeroable;
use cgmath::{Matrix4, One, Point3, Quaternion, Rad, Rotation3, Vector3};

use crate::device::GraphicsDevice;
use crate::error::Result;
use crate::gpu::{
    ALPHA_OVER, BindingDesc, BufferDesc, BufferUsage, DrawCall, GraphicsApi, PipelineDesc, TextureDesc,
};
use crate::shader::{self, ShaderCompiler, ShaderSources};
use crate::uniforms::{ObjectUniform, PointLight, SceneUniform};

use self::mesh::{Mesh, ModelVertex};
use self::texture::{DIFFUSE_MAP, NORMAL_MAP, TextureLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Cube,
    Quad,
}

/// Which pipeline draws a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// Diffuse + normal mapped, lit.
    Textured,
    /// Flat colour, opaque.
    Color,
    /// Flat colour with alpha, drawn in the transparency pass.
    TransparentColor,
}

/// Continuous rotation about Y, with a slower tumble about X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    /// Radians per second.
    pub rate: f64,
    /// Tumble speed relative to `rate`.
    pub tumble: f64,
}

impl Spin {
    pub fn at(&self, elapsed: f64) -> Quaternion<f32> {
        let yaw = (elapsed * self.rate).rem_euclid(TAU) as f32;
        let pitch = (elapsed * self.rate * self.tumble).rem_euclid(TAU) as f32;
        Quaternion::from_angle_y(Rad(yaw)) * Quaternion::from_angle_x(Rad(pitch))
    }
}

/// Where a drawable sits: translation, rotation and uniform scale, plus an
/// optional time-based spin applied after the fixed rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: f32,
    pub spin: Option<Spin>,
}

impl Placement {
    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: Quaternion::one(),
            scale: 1.0,
            spin: None,
        }
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn spinning(mut self, spin: Spin) -> Self {
        self.spin = Some(spin);
        self
    }

    /// World position of the drawable's origin.
    pub fn origin(&self) -> Point3<f32> {
        Point3::new(self.position.x, self.position.y, self.position.z)
    }

    pub fn to_matrix(&self, elapsed: f64) -> Matrix4<f32> {
        let rotation = match self.spin {
            Some(spin) => self.rotation * spin.at(elapsed),
            None => self.rotation,
        };
        Matrix4::from_translation(self.position)
            * Matrix4::from(rotation)
            * Matrix4::from_scale(self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawableDesc {
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub placement: Placement,
    /// Tint; alpha is used by the transparency pass.
    pub color: [f32; 4],
}

impl DrawableDesc {
    pub fn constants(&self, elapsed: f64) -> ObjectUniform {
        ObjectUniform::new(self.placement.to_matrix(elapsed), self.color)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneDesc {
    /// Drawn first, in this order.
    pub opaque: Vec<DrawableDesc>,
    /// Drawn after the opaque pass, farthest first.
    pub transparent: Vec<DrawableDesc>,
    pub lights: Vec<PointLight>,
}

impl SceneDesc {
    /// Opaque drawables plus one small marker cube per light.
    pub fn with_light_markers(mut self) -> Self {
        for (i, light) in self.lights.iter().enumerate() {
            self.opaque.push(DrawableDesc {
                name: format!("light marker {i}"),
                geometry: Geometry::Cube,
                material: Material::Color,
                placement: Placement::at(light.position - Point3::new(0.0, 0.0, 0.0)).scaled(0.1),
                color: [light.color[0], light.color[1], light.color[2], 1.0],
            });
        }
        self
    }
}

impl Default for SceneDesc {
    /// A spinning textured cube between two translucent panes, lit by two lights.
    fn default() -> Self {
        SceneDesc {
            opaque: vec![DrawableDesc {
                name: "cube".to_string(),
                geometry: Geometry::Cube,
                material: Material::Textured,
                placement: Placement::at(Vector3::new(0.0, 0.0, 0.0)).spinning(Spin {
                    rate: 1.0,
                    tumble: 0.5,
                }),
                color: [1.0, 1.0, 1.0, 1.0],
            }],
            transparent: vec![
                DrawableDesc {
                    name: "near pane".to_string(),
                    geometry: Geometry::Quad,
                    material: Material::TransparentColor,
                    placement: Placement::at(Vector3::new(0.0, 0.0, -1.0)).scaled(1.5),
                    color: [1.0, 0.2, 0.2, 0.5],
                },
                DrawableDesc {
                    name: "far pane".to_string(),
                    geometry: Geometry::Quad,
                    material: Material::TransparentColor,
                    placement: Placement::at(Vector3::new(0.0, 0.0, 1.0)).scaled(1.5),
                    color: [0.2, 0.4, 1.0, 0.5],
                },
            ],
            lights: vec![
                PointLight {
                    position: Point3::new(2.0, 2.0, -2.0),
                    color: [1.0, 0.9, 0.8],
                },
                PointLight {
                    position: Point3::new(-2.5, 1.0, 1.5),
                    color: [0.3, 0.5, 1.0],
                },
            ],
        }
        .with_light_markers()
    }
}

/// Vertex + index buffers of one mesh.
pub struct GeometryBatch<B: GraphicsApi> {
    pub vertices: B::Buffer,
    pub indices: B::Buffer,
    pub index_count: u32,
    pub stride: u64,
}

impl<B: GraphicsApi> GeometryBatch<B> {
    fn upload(gpu: &GraphicsDevice<B>, name: &str, mesh: &Mesh) -> Result<Self> {
        let api = gpu.api();
        let vertices = api.create_buffer(
            gpu.device(),
            &BufferDesc {
                label: &format!("{name} vertices"),
                usage: BufferUsage::Vertex,
                contents: bytemuck::cast_slice(&mesh.vertices),
            },
        )?;
        let indices = api.create_buffer(
            gpu.device(),
            &BufferDesc {
                label: &format!("{name} indices"),
                usage: BufferUsage::Index,
                contents: bytemuck::cast_slice(&mesh.indices),
            },
        )?;
        Ok(Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
            stride: std::mem::size_of::<ModelVertex>() as u64,
        })
    }
}

/// A drawable's constant buffer and the binding that exposes it.
pub struct Drawable<B: GraphicsApi> {
    pub binding: B::Binding,
    pub constants: B::Buffer,
    pub desc: DrawableDesc,
}

pub struct ResourceSet<B: GraphicsApi> {
    // per-drawable resources are released before the shared ones
    opaque: Vec<Drawable<B>>,
    transparent: Vec<Drawable<B>>,
    scene_binding: B::Binding,
    scene_constants: B::Buffer,
    material: B::Binding,
    diffuse: B::Texture,
    normal: B::Texture,
    textured_pipeline: B::Pipeline,
    color_pipeline: B::Pipeline,
    transparent_pipeline: B::Pipeline,
    cube: GeometryBatch<B>,
    quad: GeometryBatch<B>,
    lights: Vec<PointLight>,
}

impl<B: GraphicsApi> ResourceSet<B> {
    /// Compiles shaders, loads textures and creates every GPU resource `scene` needs.
    ///
    /// Shaders and textures are resolved before anything is allocated on the
    /// device. Any failure drops what was already created.
    pub fn load(
        gpu: &GraphicsDevice<B>,
        shaders: &dyn ShaderSources,
        textures: &dyn TextureLoader,
        scene: SceneDesc,
    ) -> Result<Self> {
        let compiler = ShaderCompiler::new();
        let textured_shader = compiler.compile_named(shaders, shader::TEXTURED)?;
        let color_shader = compiler.compile_named(shaders, shader::COLOR)?;
        let transparent_shader = compiler.compile_named(shaders, shader::TRANSPARENT_COLOR)?;

        let diffuse_image = textures.load(DIFFUSE_MAP)?;
        let normal_image = textures.load(NORMAL_MAP)?;

        let api = gpu.api();
        let device = gpu.device();

        let cube = GeometryBatch::upload(gpu, "cube", &mesh::cube())?;
        let quad = GeometryBatch::upload(gpu, "quad", &mesh::quad())?;

        let diffuse = api.create_texture(
            device,
            &TextureDesc {
                label: DIFFUSE_MAP,
                image: &diffuse_image,
                srgb: true,
            },
        )?;
        let normal = api.create_texture(
            device,
            &TextureDesc {
                label: NORMAL_MAP,
                image: &normal_image,
                srgb: false,
            },
        )?;
        let material = api.create_binding(
            device,
            &BindingDesc::Material {
                label: "material",
                diffuse: &diffuse,
                normal: &normal,
            },
        )?;

        let opaque_state = |label, shader, textured| PipelineDesc {
            label,
            shader,
            vertex_layout: ModelVertex::desc(),
            textured,
            blend: Some(wgpu::BlendState::REPLACE),
            cull_mode: Some(wgpu::Face::Back),
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        };
        let textured_pipeline = api.create_pipeline(
            device,
            gpu.swap_chain(),
            &opaque_state("textured pipeline", &textured_shader, true),
        )?;
        let color_pipeline = api.create_pipeline(
            device,
            gpu.swap_chain(),
            &opaque_state("color pipeline", &color_shader, false),
        )?;
        let transparent_pipeline = api.create_pipeline(
            device,
            gpu.swap_chain(),
            &PipelineDesc {
                label: "transparent pipeline",
                shader: &transparent_shader,
                vertex_layout: ModelVertex::desc(),
                textured: false,
                blend: Some(ALPHA_OVER),
                cull_mode: None,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
            },
        )?;

        let scene_constants = api.create_buffer(
            device,
            &BufferDesc {
                label: "scene constants",
                usage: BufferUsage::Constant,
                contents: bytemuck::bytes_of(&SceneUniform::zeroed()),
            },
        )?;
        let scene_binding = api.create_binding(
            device,
            &BindingDesc::Uniform {
                label: "scene constants",
                buffer: &scene_constants,
            },
        )?;

        let opaque = scene
            .opaque
            .into_iter()
            .map(|desc| Self::create_drawable(gpu, desc))
            .collect::<Result<Vec<_>>>()?;
        let transparent = scene
            .transparent
            .into_iter()
            .map(|desc| Self::create_drawable(gpu, desc))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "scene loaded: {} opaque, {} transparent drawables, {} lights",
            opaque.len(),
            transparent.len(),
            scene.lights.len()
        );

        Ok(Self {
            opaque,
            transparent,
            scene_binding,
            scene_constants,
            material,
            diffuse,
            normal,
            textured_pipeline,
            color_pipeline,
            transparent_pipeline,
            cube,
            quad,
            lights: scene.lights,
        })
    }

    fn create_drawable(gpu: &GraphicsDevice<B>, desc: DrawableDesc) -> Result<Drawable<B>> {
        let label = format!("{} constants", desc.name);
        let constants = gpu.api().create_buffer(
            gpu.device(),
            &BufferDesc {
                label: &label,
                usage: BufferUsage::Constant,
                contents: bytemuck::bytes_of(&ObjectUniform::zeroed()),
            },
        )?;
        let binding = gpu.api().create_binding(
            gpu.device(),
            &BindingDesc::Uniform {
                label: &label,
                buffer: &constants,
            },
        )?;
        Ok(Drawable {
            binding,
            constants,
            desc,
        })
    }

    pub fn opaque(&self) -> &[Drawable<B>] {
        &self.opaque
    }

    pub fn transparent(&self) -> &[Drawable<B>] {
        &self.transparent
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn scene_constants(&self) -> &B::Buffer {
        &self.scene_constants
    }

    pub fn diffuse(&self) -> &B::Texture {
        &self.diffuse
    }

    pub fn normal(&self) -> &B::Texture {
        &self.normal
    }

    /// The draw for `drawable` with its pipeline, bindings and geometry.
    pub fn draw_call<'a>(&'a self, drawable: &'a Drawable<B>) -> DrawCall<'a, B> {
        let geometry = match drawable.desc.geometry {
            Geometry::Cube => &self.cube,
            Geometry::Quad => &self.quad,
        };
        let (pipeline, bindings) = match drawable.desc.material {
            Material::Textured => (
                &self.textured_pipeline,
                vec![&self.scene_binding, &drawable.binding, &self.material],
            ),
            Material::Color => (&self.color_pipeline, vec![&self.scene_binding, &drawable.binding]),
            Material::TransparentColor => (
                &self.transparent_pipeline,
                vec![&self.scene_binding, &drawable.binding],
            ),
        };
        DrawCall {
            label: &drawable.desc.name,
            pipeline,
            bindings,
            vertices: &geometry.vertices,
            indices: &geometry.indices,
            index_count: geometry.index_count,
        }
    }
}

//! Named WGSL sources and their validation.
//!
//! Shaders are validated with naga (the translator inside wgpu) before any
//! pipeline is built, so a broken shader fails scene construction with a
//! readable diagnostic instead of a device-side panic.

use std::borrow::Cow;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{RendererError, Result};

pub const TEXTURED: &str = "textured";
pub const COLOR: &str = "color";
pub const TRANSPARENT_COLOR: &str = "transparent_color";

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Looks up shader source text by name.
pub trait ShaderSources {
    fn source(&self, name: &str) -> Option<Cow<'static, str>>;
}

/// The shaders compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinShaders;

impl ShaderSources for BuiltinShaders {
    fn source(&self, name: &str) -> Option<Cow<'static, str>> {
        let src = match name {
            TEXTURED => include_str!("shaders/textured.wgsl"),
            COLOR => include_str!("shaders/color.wgsl"),
            TRANSPARENT_COLOR => include_str!("shaders/transparent_color.wgsl"),
            _ => return None,
        };
        Some(Cow::Borrowed(src))
    }
}

/// A validated vertex + fragment shader pair.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    name: String,
    source: String,
    vertex_entry: String,
    fragment_entry: String,
}

impl CompiledShader {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}

#[derive(Debug, Default)]
pub struct ShaderCompiler;

impl ShaderCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Parses and validates `source`, checking that both entry points exist.
    pub fn compile(
        &self,
        name: &str,
        source: &str,
        vertex_entry: &str,
        fragment_entry: &str,
    ) -> Result<CompiledShader> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| failed(name, e.emit_to_string(source)))?;

        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|e| failed(name, e.emit_to_string(source)))?;

        for (entry, stage) in [
            (vertex_entry, naga::ShaderStage::Vertex),
            (fragment_entry, naga::ShaderStage::Fragment),
        ] {
            let found = module
                .entry_points
                .iter()
                .any(|ep| ep.name == entry && ep.stage == stage);
            if !found {
                return Err(failed(
                    name,
                    format!("missing {stage:?} entry point `{entry}`"),
                ));
            }
        }

        log::debug!("shader `{name}` validated");
        Ok(CompiledShader {
            name: name.to_string(),
            source: source.to_string(),
            vertex_entry: vertex_entry.to_string(),
            fragment_entry: fragment_entry.to_string(),
        })
    }

    /// Compiles the shader registered as `name` using the default entry points.
    pub fn compile_named(&self, sources: &dyn ShaderSources, name: &str) -> Result<CompiledShader> {
        let source = sources
            .source(name)
            .ok_or_else(|| failed(name, "no source registered under this name".to_string()))?;
        self.compile(name, &source, VERTEX_ENTRY, FRAGMENT_ENTRY)
    }
}

fn failed(name: &str, diagnostic: String) -> RendererError {
    log::error!("shader `{name}` failed to compile:\n{diagnostic}");
    RendererError::ShaderCompileFailed {
        name: name.to_string(),
        diagnostic,
    }
}

//! Renderer error taxonomy.
//!
//! Every fallible lifecycle call (device init, resize, scene load) reports one of
//! these variants. None of them is retried internally: the caller decides whether
//! to abort. Once a renderer is running, only `TargetsUnavailable` and
//! `FrameSubmissionFailed` can come out of a frame, and both are fatal.

use thiserror::Error;

use crate::gpu::FeatureLevel;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("no hardware adapter available (software fallback adapters are skipped)")]
    AdapterNotFound,

    #[error("device creation failed: {0}")]
    DeviceCreationFailed(String),

    #[error("feature level mismatch: required {required:?}, device offers {actual:?}")]
    FeatureLevelMismatch {
        required: FeatureLevel,
        actual: FeatureLevel,
    },

    #[error("swap chain creation failed: {0}")]
    SwapChainCreationFailed(String),

    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    #[error("shader `{name}` failed to compile:\n{diagnostic}")]
    ShaderCompileFailed { name: String, diagnostic: String },

    #[error("texture `{name}` failed to load: {reason}")]
    TextureLoadFailed { name: String, reason: String },

    #[error("render targets are unavailable; the last resize did not complete")]
    TargetsUnavailable,

    #[error("frame submission failed: {0}")]
    FrameSubmissionFailed(String),
}

pub type Result<T> = std::result::Result<T, RendererError>;

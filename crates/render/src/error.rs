use crate::backend::BackendError;
use prism_assets::AssetError;
use prism_common::WrongThread;
use std::fmt;

/// Which step of building a shader program failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderPhase {
    Vertex,
    Fragment,
    Link,
    Validate,
}

impl fmt::Display for ShaderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderPhase::Vertex => f.write_str("vertex compile"),
            ShaderPhase::Fragment => f.write_str("fragment compile"),
            ShaderPhase::Link => f.write_str("link"),
            ShaderPhase::Validate => f.write_str("validate"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer already initialized")]
    AlreadyInitialized,
    #[error("renderer not initialized")]
    NotInitialized,
    #[error(transparent)]
    WrongThread(#[from] WrongThread),
    #[error("shader {phase} failed: {log}")]
    ShaderCompile { phase: ShaderPhase, log: String },
    #[error("graphics backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("invalid render data: {0}")]
    Asset(#[from] AssetError),
}

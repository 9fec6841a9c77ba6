use crate::error::AssetError;
use prism_common::ResourceId;
use std::path::Path;

/// Vertex and fragment source pair.
///
/// Sources are not checked here; the graphics backend compiles them when a
/// renderer first uses the shader.
#[derive(Debug)]
pub struct Shader {
    id: ResourceId,
    vertex: String,
    fragment: String,
}

impl Shader {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            id: ResourceId::next(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn load(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, AssetError> {
        let read = |path: &Path| std::fs::read_to_string(path).map_err(|e| AssetError::io(path, e));
        let vertex = read(vertex_path.as_ref())?;
        let fragment = read(fragment_path.as_ref())?;
        tracing::debug!(
            vertex = %vertex_path.as_ref().display(),
            fragment = %fragment_path.as_ref().display(),
            "shader sources loaded"
        );
        Ok(Self::new(vertex, fragment))
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment
    }
}

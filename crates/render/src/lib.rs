//! Backend-agnostic renderer.
//!
//! [`Renderer`] turns a [`Scene`](prism_scene::Scene) into draw calls against a
//! [`GraphicsBackend`]. It uploads meshes, textures and shader programs the
//! first time they are drawn and keeps them for its whole life.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - A resource is uploaded at most once per renderer.
//! - Backend calls only happen on the renderer's owning thread.

mod backend;
mod error;
pub mod headless;
mod renderer;
mod skybox;

pub use backend::{
    ATTRIB_UV, ATTRIB_VERTEX, ATTRIBUTE_BINDINGS, BackendError, BufferId, BufferTarget, Capability,
    GraphicsBackend, ProgramId, ShaderId, ShaderStage, TextureId, UNIFORM_COLOR,
    UNIFORM_HAS_SAMPLER, UNIFORM_PROJECTION, UNIFORM_SAMPLER, UniformValue,
};
pub use error::{RenderError, ShaderPhase};
pub use renderer::Renderer;
pub use skybox::{Face, Skybox};

pub fn crate_info() -> &'static str {
    "prism-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}

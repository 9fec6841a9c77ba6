//! CPU-side resource descriptors: meshes, textures and shader sources.
//!
//! Descriptors never touch the GPU. Each one receives a process-unique
//! [`ResourceId`](prism_common::ResourceId) at construction, which renderers
//! use as the key of their upload caches.
//!
//! # Invariants
//! - Descriptors are not `Clone`; one instance is one cache identity.
//! - A constructed `Mesh` or `Texture2D` has already passed its shape checks.

mod error;
mod mesh;
mod obj;
mod shader;
mod texture;

pub use error::AssetError;
pub use mesh::Mesh;
pub use obj::load_obj;
pub use shader::Shader;
pub use texture::Texture2D;

pub fn crate_info() -> &'static str {
    "prism-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}

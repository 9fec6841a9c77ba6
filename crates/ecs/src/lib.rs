//! Component model: game objects holding at most one component per type.
//!
//! Components are stored in a map keyed by [`ComponentKind`] (the concrete
//! component type), so "exactly one instance per kind" is a property of the
//! map, not of any type hierarchy.
//!
//! # Invariants
//! - Adding a component of a kind already present replaces it.
//! - Every game object carries a `Transform`.
//! - Camera projection matrices are recomputed on every setter call.

mod camera;
mod component;
mod object;

pub use camera::{Camera, Projection};
pub use component::{AsAny, Component, ComponentKind};
pub use object::GameObject;

pub fn crate_info() -> &'static str {
    "prism-ecs v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("ecs"));
    }
}

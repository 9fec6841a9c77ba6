//! Scene container: an ordered collection of game objects.
//!
//! # Invariants
//! - A game object belongs to at most one scene at a time.
//! - Iteration order is insertion order and stable across frames.

mod scene;

pub use scene::{Scene, SceneError};

pub fn crate_info() -> &'static str {
    "prism-scene v0.1.0"
}

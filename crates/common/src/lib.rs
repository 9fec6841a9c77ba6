//! Shared types used across the prism crates.
//!
//! # Invariants
//! - `ResourceId` values are never reused within a process.
//! - `ThreadAffinity` is captured on the thread it guards.

mod affinity;
mod types;

pub use affinity::{ThreadAffinity, WrongThread};
pub use types::{Color, ObjectId, ResourceId, SceneId, Transform};

pub fn crate_info() -> &'static str {
    "prism-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}

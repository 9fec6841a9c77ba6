//! Input codes and pressed-state tracking.
//!
//! Keys, mouse buttons and actions are closed enumerations; their mapping to
//! native numeric codes is a static table generated alongside each enum.
//!
//! # Invariants
//! - Every variant has exactly one native code, and codes are unique per enum.
//! - Mouse and scroll deltas only reset when the owner asks.

mod codes;
mod manager;

pub use codes::{Action, Key, Modifiers, MouseButton};
pub use manager::InputManager;

pub fn crate_info() -> &'static str {
    "prism-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}

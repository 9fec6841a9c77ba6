//! Engine events and the synchronous event manager.
//!
//! # Invariants
//! - `emit` invokes each listener registered for the event's kind exactly once.
//! - Event ids are random debug tags, not unique keys.

mod event;
mod manager;

pub use event::{
    Event, EventId, EventKind, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseScrollEvent,
    RenderEvent, TickEvent, TypedEvent,
};
pub use manager::{EventManager, ListenerId, bind_input};

pub fn crate_info() -> &'static str {
    "prism-events v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("events"));
    }
}

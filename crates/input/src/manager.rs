use crate::codes::{Action, Key, Modifiers, MouseButton};
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct InputState {
    keys: HashSet<Key>,
    buttons: HashSet<MouseButton>,
    modifiers: Modifiers,
    cursor: Option<(i32, i32)>,
    mouse_delta: (i32, i32),
    scroll_delta: (f64, f64),
}

/// Tracks held keys and buttons plus per-frame mouse and scroll deltas.
///
/// Shared between the window thread (which feeds it) and any reader. Deltas
/// accumulate until the owner calls [`InputManager::reset_deltas`], once per
/// frame.
#[derive(Debug, Default)]
pub struct InputManager {
    state: Mutex<InputState>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key transition. Repeats count as held.
    pub fn key(&self, key: Key, action: Action, modifiers: Modifiers) {
        let mut state = self.state.lock();
        state.modifiers = modifiers;
        match action {
            Action::Down | Action::Repeat => {
                state.keys.insert(key);
            }
            Action::Up => {
                state.keys.remove(&key);
            }
        }
    }

    /// Record a mouse button transition.
    pub fn button(&self, button: MouseButton, action: Action, modifiers: Modifiers) {
        let mut state = self.state.lock();
        state.modifiers = modifiers;
        match action {
            Action::Down | Action::Repeat => {
                state.buttons.insert(button);
            }
            Action::Up => {
                state.buttons.remove(&button);
            }
        }
    }

    /// Record a cursor position. The first position seen produces no delta.
    pub fn mouse_moved(&self, x: i32, y: i32) {
        let mut state = self.state.lock();
        if let Some((px, py)) = state.cursor {
            state.mouse_delta.0 += x - px;
            state.mouse_delta.1 += y - py;
        }
        state.cursor = Some((x, y));
    }

    /// Accumulate a scroll offset.
    pub fn scrolled(&self, x: f64, y: f64) {
        let mut state = self.state.lock();
        state.scroll_delta.0 += x;
        state.scroll_delta.1 += y;
    }

    /// True while `key` is held.
    pub fn is_key_down(&self, key: Key) -> bool {
        self.state.lock().keys.contains(&key)
    }

    /// True while `button` is held.
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.state.lock().buttons.contains(&button)
    }

    /// Modifiers reported with the most recent key or button.
    pub fn modifiers(&self) -> Modifiers {
        self.state.lock().modifiers
    }

    /// Last cursor position, `None` before the first move.
    pub fn mouse_position(&self) -> Option<(i32, i32)> {
        self.state.lock().cursor
    }

    /// Cursor movement accumulated since the last reset.
    pub fn mouse_delta(&self) -> (i32, i32) {
        self.state.lock().mouse_delta
    }

    /// Scroll accumulated since the last reset.
    pub fn scroll_delta(&self) -> (f64, f64) {
        self.state.lock().scroll_delta
    }

    /// Zero the mouse and scroll deltas. Call once per frame.
    pub fn reset_deltas(&self) {
        let mut state = self.state.lock();
        state.mouse_delta = (0, 0);
        state.scroll_delta = (0.0, 0.0);
    }

    /// Forget every held key and button, e.g. after focus loss.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.keys.clear();
        state.buttons.clear();
        tracing::trace!("input state cleared");
    }
}

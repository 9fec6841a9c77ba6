//! Window run loop.
//!
//! A [`Window`] owns one native window on a dedicated thread. That thread
//! creates the native window and the [`Renderer`](prism_render::Renderer),
//! then renders, presents and polls until the window closes; a second thread
//! ticks the scene at a fixed rate. Native input is translated into
//! [`prism_events`] events and fed to the window's
//! [`InputManager`](prism_input::InputManager).
//!
//! The OS window itself sits behind [`NativeWindow`], so the loop can run
//! against a real window or the scripted [`headless::HeadlessWindow`].
//!
//! # Invariants
//! - `Window::new` returns only after the native window exists.
//! - Renderer and native-window calls happen on the window thread.
//! - Loop exit stops the ticker and releases GPU objects before the native
//!   window is dropped.

mod config;
mod error;
pub mod headless;
mod native;
mod ticker;
mod translate;
mod window;

pub use config::WindowConfig;
pub use error::WindowError;
pub use native::{NativeEvent, NativeWindow};
pub use window::{Window, WindowHandle, WindowId};

pub fn crate_info() -> &'static str {
    "prism-window v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("window"));
    }
}

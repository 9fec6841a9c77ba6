//! wgpu graphics backend and winit native window.
//!
//! [`WgpuBackend`] implements [`prism_render::GraphicsBackend`] over a wgpu
//! device; [`WinitWindow`] implements [`prism_window::NativeWindow`] over a
//! winit window whose event loop is pumped from the window thread.
//! [`open_window`] wires both into a running [`prism_window::Window`].
//!
//! Shader programs are WGSL; see [`shaders`] for the interface they follow.
//!
//! # Invariants
//! - Renderer never mutates the scene.
//! - GPU work for a frame is encoded once, when the window presents.
//! - The event loop, surface and device stay on the thread that opened them.

mod backend;
mod keymap;
pub mod shaders;
mod window;

pub use backend::WgpuBackend;
pub use window::WinitWindow;

use parking_lot::Mutex;
use prism_events::EventManager;
use prism_scene::Scene;
use prism_window::{Window, WindowConfig, WindowError};
use std::sync::Arc;

/// Open a winit window rendering `scene` on its own thread.
pub fn open_window(
    config: WindowConfig,
    scene: Arc<Mutex<Scene>>,
    events: Arc<EventManager>,
) -> Result<Window, WindowError> {
    Window::new(config, scene, events, WinitWindow::open)
}

pub fn crate_info() -> &'static str {
    "prism-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render-wgpu"));
    }
}

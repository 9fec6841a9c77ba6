use prism_input::{Action, Key, Modifiers, MouseButton};
use prism_render::{BackendError, GraphicsBackend};

/// Raw events a native window delivers while polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeEvent {
    Key {
        key: Key,
        action: Action,
        modifiers: Modifiers,
    },
    MouseButton {
        button: MouseButton,
        action: Action,
        modifiers: Modifiers,
    },
    /// Cursor position in window pixels.
    CursorMoved { x: f64, y: f64 },
    Scroll { x: f64, y: f64 },
    Resized { width: u32, height: u32 },
    Maximized(bool),
    CloseRequested,
}

/// An OS window with its graphics context.
///
/// Created and used only on the window thread; implementations need not be
/// `Send`.
pub trait NativeWindow {
    type Graphics: GraphicsBackend;

    /// Current framebuffer size in pixels.
    fn size(&self) -> (u32, u32);

    fn graphics(&mut self) -> &mut Self::Graphics;

    fn should_close(&self) -> bool;

    /// Present the frame drawn since the last swap.
    fn swap_buffers(&mut self) -> Result<(), BackendError>;

    /// Deliver every pending native event to `sink`, in arrival order.
    fn poll_events(&mut self, sink: &mut dyn FnMut(NativeEvent));

    fn set_title(&mut self, title: &str);

    fn set_size(&mut self, width: u32, height: u32);
}

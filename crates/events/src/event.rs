use prism_input::{Action, Key, Modifiers, MouseButton};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A random 63-bit tag attached to every event instance.
///
/// Collisions are possible; use it to correlate log lines, never to
/// deduplicate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    /// Folds both halves of a v4 UUID together so its fixed version and
    /// variant bits are masked by random ones.
    pub fn random() -> Self {
        let (high, low) = Uuid::new_v4().as_u64_pair();
        Self((high ^ low) >> 1)
    }

    /// The raw 63-bit value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Discriminant of [`Event`], used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Key,
    MouseButton,
    MouseMove,
    MouseScroll,
    Tick,
    Render,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub id: EventId,
    pub key: Key,
    pub action: Action,
    pub modifiers: Modifiers,
    cancelled: bool,
}

impl KeyEvent {
    /// A fresh, uncancelled key event with a random id.
    pub fn new(key: Key, action: Action, modifiers: Modifiers) -> Self {
        Self {
            id: EventId::random(),
            key,
            action,
            modifiers,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseButtonEvent {
    pub id: EventId,
    pub button: MouseButton,
    pub action: Action,
    pub modifiers: Modifiers,
    cancelled: bool,
}

impl MouseButtonEvent {
    /// A fresh, uncancelled button event with a random id.
    pub fn new(button: MouseButton, action: Action, modifiers: Modifiers) -> Self {
        Self {
            id: EventId::random(),
            button,
            action,
            modifiers,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Cursor moved to window-relative `(x, y)`; `(dx, dy)` is the movement since
/// the previous cursor event of the same window.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseMoveEvent {
    pub id: EventId,
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
}

impl MouseMoveEvent {
    /// Cursor at `(x, y)`, moved by `(dx, dy)` since the previous report.
    pub fn new(x: i32, y: i32, dx: i32, dy: i32) -> Self {
        Self {
            id: EventId::random(),
            x,
            y,
            dx,
            dy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseScrollEvent {
    pub id: EventId,
    pub x: f64,
    pub y: f64,
    cancelled: bool,
}

impl MouseScrollEvent {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: EventId::random(),
            x,
            y,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Fixed-rate logic tick; `tick` counts from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub id: EventId,
    pub tick: u64,
}

impl TickEvent {
    /// Tick number `tick`, counted from 1 per ticker.
    pub fn new(tick: u64) -> Self {
        Self {
            id: EventId::random(),
            tick,
        }
    }
}

/// A frame was rendered; `delta` is the wall-clock time since the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEvent {
    pub id: EventId,
    pub delta: Duration,
}

impl RenderEvent {
    /// A frame drawn `delta` after the previous one.
    pub fn new(delta: Duration) -> Self {
        Self {
            id: EventId::random(),
            delta,
        }
    }
}

/// Everything the engine can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Key(KeyEvent),
    MouseButton(MouseButtonEvent),
    MouseMove(MouseMoveEvent),
    MouseScroll(MouseScrollEvent),
    Tick(TickEvent),
    Render(RenderEvent),
}

impl Event {
    /// The discriminant listeners are registered under.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Key(_) => EventKind::Key,
            Event::MouseButton(_) => EventKind::MouseButton,
            Event::MouseMove(_) => EventKind::MouseMove,
            Event::MouseScroll(_) => EventKind::MouseScroll,
            Event::Tick(_) => EventKind::Tick,
            Event::Render(_) => EventKind::Render,
        }
    }

    /// Debug tag of the wrapped event.
    pub fn id(&self) -> EventId {
        match self {
            Event::Key(e) => e.id,
            Event::MouseButton(e) => e.id,
            Event::MouseMove(e) => e.id,
            Event::MouseScroll(e) => e.id,
            Event::Tick(e) => e.id,
            Event::Render(e) => e.id,
        }
    }

    /// Only input events can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Event::Key(_) | Event::MouseButton(_) | Event::MouseScroll(_)
        )
    }

    /// Mark a cancellable event as cancelled. Returns false for events that
    /// cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        match self {
            Event::Key(e) => e.cancel(),
            Event::MouseButton(e) => e.cancel(),
            Event::MouseScroll(e) => e.cancel(),
            _ => return false,
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Event::Key(e) => e.is_cancelled(),
            Event::MouseButton(e) => e.is_cancelled(),
            Event::MouseScroll(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// A concrete event struct that listeners can subscribe to by type.
pub trait TypedEvent: Sized + 'static {
    const KIND: EventKind;

    fn from_event_mut(event: &mut Event) -> Option<&mut Self>;
}

macro_rules! typed_event {
    ($ty:ident, $variant:ident) => {
        impl TypedEvent for $ty {
            const KIND: EventKind = EventKind::$variant;

            fn from_event_mut(event: &mut Event) -> Option<&mut Self> {
                match event {
                    Event::$variant(e) => Some(e),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Event {
            fn from(e: $ty) -> Self {
                Event::$variant(e)
            }
        }
    };
}

typed_event!(KeyEvent, Key);
typed_event!(MouseButtonEvent, MouseButton);
typed_event!(MouseMoveEvent, MouseMove);
typed_event!(MouseScrollEvent, MouseScroll);
typed_event!(TickEvent, Tick);
typed_event!(RenderEvent, Render);

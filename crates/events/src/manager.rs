use crate::event::{
    Event, EventKind, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseScrollEvent, TypedEvent,
};
use parking_lot::Mutex;
use prism_input::InputManager;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by listener registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback = Arc<Mutex<Box<dyn FnMut(&mut Event) + Send>>>;

struct Listener {
    kind: EventKind,
    callback: Callback,
}

/// Maps listener ids to typed callbacks and fans events out synchronously.
///
/// `emit` invokes every listener registered for the event's kind exactly
/// once, on the emitting thread. The listener set is snapshotted at the start
/// of `emit`: listeners may register or remove listeners (or emit other
/// events) from inside a callback, and those changes apply to later emits.
/// A listener must not emit an event that would re-enter itself.
pub struct EventManager {
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
    next_id: AtomicU64,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an untyped listener for one event kind.
    pub fn add_event_listener(
        &self,
        kind: EventKind,
        callback: impl FnMut(&mut Event) + Send + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(
            id,
            Listener {
                kind,
                callback: Arc::new(Mutex::new(Box::new(callback))),
            },
        );
        tracing::trace!(?id, ?kind, "listener added");
        id
    }

    /// Register a listener for a concrete event type.
    pub fn on<E: TypedEvent>(
        &self,
        mut callback: impl FnMut(&mut E) + Send + 'static,
    ) -> ListenerId {
        self.add_event_listener(E::KIND, move |event| {
            if let Some(typed) = E::from_event_mut(event) {
                callback(typed);
            }
        })
    }

    /// Unregister a listener. Returns false if the id was unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.listeners.lock().remove(&id).is_some();
        tracing::trace!(?id, removed, "listener removed");
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `event` to every listener of its kind, then hand it back so the
    /// caller can inspect cancellation.
    pub fn emit(&self, event: impl Into<Event>) -> Event {
        let mut event = event.into();
        let kind = event.kind();
        let targets: Vec<Callback> = self
            .listeners
            .lock()
            .values()
            .filter(|l| l.kind == kind)
            .map(|l| Arc::clone(&l.callback))
            .collect();

        tracing::trace!(id = %event.id(), ?kind, listeners = targets.len(), "emit");
        for callback in targets {
            let mut callback = callback.lock();
            (*callback)(&mut event);
        }
        event
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Feed key, button, move and scroll events into `input`. Cancelled events are
/// still recorded; cancellation only concerns later listeners' policy.
pub fn bind_input(events: &EventManager, input: Arc<InputManager>) -> [ListenerId; 4] {
    let keys = Arc::clone(&input);
    let buttons = Arc::clone(&input);
    let moves = Arc::clone(&input);
    let scrolls = input;
    [
        events.on(move |e: &mut KeyEvent| keys.key(e.key, e.action, e.modifiers)),
        events.on(move |e: &mut MouseButtonEvent| buttons.button(e.button, e.action, e.modifiers)),
        events.on(move |e: &mut MouseMoveEvent| moves.mouse_moved(e.x, e.y)),
        events.on(move |e: &mut MouseScrollEvent| scrolls.scrolled(e.x, e.y)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RenderEvent, TickEvent};
    use prism_input::{Action, Key, Modifiers, MouseButton};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn listener_ignores_other_kinds() {
        let events = EventManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        events.on(move |_: &mut MouseMoveEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(MouseScrollEvent::new(0.0, 1.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_sees_emitted_fields_once() {
        let events = EventManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        events.on(move |e: &mut MouseMoveEvent| s.lock().push(e.clone()));

        let sent = MouseMoveEvent::new(120, 45, 3, -2);
        events.emit(sent.clone());

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], sent);
    }

    #[test]
    fn every_matching_listener_runs_once() {
        let events = EventManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = calls.clone();
            events.add_event_listener(EventKind::Tick, move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        events.emit(TickEvent::new(1));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let events = EventManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = events.on(move |_: &mut RenderEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(events.listener_count(), 1);
        assert!(events.remove_listener(id));
        assert!(!events.remove_listener(id));
        events.emit(RenderEvent::new(Duration::from_millis(16)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events.listener_count(), 0);
    }

    #[test]
    fn cancellation_is_visible_to_emitter() {
        let events = EventManager::new();
        events.on(|e: &mut KeyEvent| {
            if e.key == Key::Escape {
                e.cancel();
            }
        });
        let out = events.emit(KeyEvent::new(Key::Escape, Action::Down, Modifiers::NONE));
        assert!(out.is_cancelled());
        let out = events.emit(KeyEvent::new(Key::A, Action::Down, Modifiers::NONE));
        assert!(!out.is_cancelled());
    }

    #[test]
    fn listener_may_register_during_emit() {
        let events = Arc::new(EventManager::new());
        let inner = events.clone();
        events.on(move |_: &mut TickEvent| {
            inner.on(|_: &mut RenderEvent| {});
        });
        events.emit(TickEvent::new(1));
        assert_eq!(events.listener_count(), 2);
    }

    #[test]
    fn emit_from_another_thread() {
        let events = Arc::new(EventManager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        events.on(move |_: &mut TickEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let remote = events.clone();
        std::thread::spawn(move || remote.emit(TickEvent::new(1)))
            .join()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bound_input_tracks_events() {
        let events = EventManager::new();
        let input = Arc::new(InputManager::new());
        let ids = bind_input(&events, input.clone());
        assert_eq!(ids.len(), 4);

        events.emit(KeyEvent::new(Key::W, Action::Down, Modifiers::NONE));
        events.emit(MouseButtonEvent::new(MouseButton::Left, Action::Down, Modifiers::CONTROL));
        events.emit(MouseMoveEvent::new(10, 10, 0, 0));
        events.emit(MouseMoveEvent::new(14, 7, 4, -3));
        events.emit(MouseScrollEvent::new(0.0, 2.0));

        assert!(input.is_key_down(Key::W));
        assert!(input.is_button_down(MouseButton::Left));
        assert_eq!(input.modifiers(), Modifiers::CONTROL);
        assert_eq!(input.mouse_delta(), (4, -3));
        assert_eq!(input.scroll_delta(), (0.0, 2.0));
    }
}

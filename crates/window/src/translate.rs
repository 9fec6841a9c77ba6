use crate::native::NativeEvent;
use prism_events::{Event, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseScrollEvent};

/// Turns native input into engine events. Window-state changes (resize,
/// maximize, close) are not events and yield `None`.
#[derive(Debug, Default)]
pub(crate) struct InputTranslator {
    cursor: Option<(i32, i32)>,
}

impl InputTranslator {
    pub(crate) fn translate(&mut self, event: NativeEvent) -> Option<Event> {
        match event {
            NativeEvent::Key {
                key,
                action,
                modifiers,
            } => Some(KeyEvent::new(key, action, modifiers).into()),
            NativeEvent::MouseButton {
                button,
                action,
                modifiers,
            } => Some(MouseButtonEvent::new(button, action, modifiers).into()),
            NativeEvent::CursorMoved { x, y } => {
                let (x, y) = (x.floor() as i32, y.floor() as i32);
                let (dx, dy) = match self.cursor {
                    Some((px, py)) => (x - px, y - py),
                    None => (0, 0),
                };
                self.cursor = Some((x, y));
                Some(MouseMoveEvent::new(x, y, dx, dy).into())
            }
            NativeEvent::Scroll { x, y } => Some(MouseScrollEvent::new(x, y).into()),
            NativeEvent::Resized { .. }
            | NativeEvent::Maximized(_)
            | NativeEvent::CloseRequested => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_input::{Action, Key, Modifiers, MouseButton};

    #[test]
    fn key_carries_action_and_modifiers() {
        let mut t = InputTranslator::default();
        let event = t
            .translate(NativeEvent::Key {
                key: Key::Space,
                action: Action::Repeat,
                modifiers: Modifiers::SHIFT | Modifiers::ALT,
            })
            .unwrap();
        match event {
            Event::Key(k) => {
                assert_eq!(k.key, Key::Space);
                assert_eq!(k.action, Action::Repeat);
                assert!(k.modifiers.contains(Modifiers::ALT));
                assert!(!k.is_cancelled());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn buttons_translate() {
        let mut t = InputTranslator::default();
        let event = t.translate(NativeEvent::MouseButton {
            button: MouseButton::Right,
            action: Action::Up,
            modifiers: Modifiers::NONE,
        });
        let Some(Event::MouseButton(event)) = event else {
            panic!("expected a mouse button event, got {event:?}");
        };
        assert_eq!((event.button, event.action), (MouseButton::Right, Action::Up));
    }

    #[test]
    fn cursor_deltas_follow_previous_position() {
        let mut t = InputTranslator::default();
        let first = t.translate(NativeEvent::CursorMoved { x: 10.7, y: 20.2 });
        let second = t.translate(NativeEvent::CursorMoved { x: 4.0, y: 25.0 });
        match (first, second) {
            (Some(Event::MouseMove(a)), Some(Event::MouseMove(b))) => {
                assert_eq!((a.x, a.y, a.dx, a.dy), (10, 20, 0, 0));
                assert_eq!((b.x, b.y, b.dx, b.dy), (4, 25, -6, 5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn window_state_is_not_an_event() {
        let mut t = InputTranslator::default();
        let resized = NativeEvent::Resized {
            width: 1,
            height: 1,
        };
        assert!(t.translate(resized).is_none());
        assert!(t.translate(NativeEvent::Maximized(true)).is_none());
        assert!(t.translate(NativeEvent::CloseRequested).is_none());
        assert!(matches!(
            t.translate(NativeEvent::Scroll { x: 0.0, y: -1.5 }),
            Some(Event::MouseScroll(_))
        ));
    }
}

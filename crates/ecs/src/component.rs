use prism_common::Transform;
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Upcast helper so boxed components can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A typed behavior/data unit attached to a game object.
///
/// A game object holds at most one component per concrete type. Hooks default
/// to no-ops; the window calls `on_tick` at the fixed tick rate (from the tick
/// thread) and `on_render` once per frame (from the window thread).
pub trait Component: AsAny + Send {
    fn on_tick(&mut self) {}

    fn on_render(&mut self, _delta: Duration) {}
}

/// Key of the component map: the component's concrete type.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKind {}

impl PartialOrd for ComponentKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Component for Transform {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;
    impl Component for Marker {}

    #[test]
    fn kinds_compare_by_type() {
        assert_eq!(ComponentKind::of::<Marker>(), ComponentKind::of::<Marker>());
        assert_ne!(ComponentKind::of::<Marker>(), ComponentKind::of::<Transform>());
    }

    #[test]
    fn kind_name_is_type_name() {
        assert!(ComponentKind::of::<Transform>().name().ends_with("Transform"));
    }

    #[test]
    fn boxed_component_downcasts() {
        let boxed: Box<dyn Component> = Box::new(Transform::default());
        assert!(boxed.as_ref().as_any().downcast_ref::<Transform>().is_some());
        assert!(boxed.as_ref().as_any().downcast_ref::<Marker>().is_none());
    }
}

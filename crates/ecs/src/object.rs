use crate::component::{Component, ComponentKind};
use prism_common::{ObjectId, SceneId, Transform};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A named container owning at most one component per component type.
///
/// Every game object carries a [`Transform`]; it is inserted on construction
/// and cannot be removed, only replaced.
///
/// # Invariants
/// - At most one component per [`ComponentKind`] (map semantics, last add wins).
/// - A component instance belongs to exactly one game object (components are
///   moved in and owned).
pub struct GameObject {
    id: ObjectId,
    name: String,
    components: BTreeMap<ComponentKind, Box<dyn Component>>,
    scene: Option<SceneId>,
}

impl GameObject {
    /// Create a game object with a default transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ObjectId::new(), name)
    }

    /// Create a game object with a specific id.
    pub fn with_id(id: ObjectId, name: impl Into<String>) -> Self {
        let mut object = Self {
            id,
            name: name.into(),
            components: BTreeMap::new(),
            scene: None,
        };
        object.add(Transform::default());
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The scene this object currently belongs to.
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Record scene membership. Only the scene container should call this.
    #[doc(hidden)]
    pub fn set_scene(&mut self, scene: Option<SceneId>) {
        self.scene = scene;
    }

    /// Attach a component, replacing any existing component of the same type.
    /// Returns the replaced component.
    pub fn add<T: Component>(&mut self, component: T) -> Option<Box<dyn Component>> {
        let kind = ComponentKind::of::<T>();
        let replaced = self.components.insert(kind, Box::new(component));
        if replaced.is_some() {
            tracing::trace!(object = %self.name, kind = kind.name(), "component replaced");
        }
        replaced
    }

    /// Builder-style [`GameObject::add`].
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.add(component);
        self
    }

    /// The instance of `T` held by this object, if any.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components
            .get(&ComponentKind::of::<T>())
            .and_then(|c| (**c).as_any().downcast_ref::<T>())
    }

    /// Mutable [`GameObject::get`].
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&ComponentKind::of::<T>())
            .and_then(|c| (**c).as_any_mut().downcast_mut::<T>())
    }

    /// Whether a `T` is attached.
    pub fn has<T: Component>(&self) -> bool {
        self.components.contains_key(&ComponentKind::of::<T>())
    }

    /// Detach a component. The transform cannot be removed.
    pub fn remove<T: Component>(&mut self) -> Option<Box<dyn Component>> {
        let kind = ComponentKind::of::<T>();
        if kind == ComponentKind::of::<Transform>() {
            tracing::warn!(object = %self.name, "refusing to remove the transform component");
            return None;
        }
        self.components.remove(&kind)
    }

    /// Every object carries a transform from construction.
    pub fn transform(&self) -> &Transform {
        self.get::<Transform>().unwrap_or(&Transform::IDENTITY)
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        if !self.has::<Transform>() {
            self.add(Transform::default());
        }
        match self.get_mut::<Transform>() {
            Some(t) => t,
            None => unreachable!("transform inserted above"),
        }
    }

    /// Attached components, the transform included.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component_kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    /// Invoke the tick hook of every component.
    pub fn tick_components(&mut self) {
        for component in self.components.values_mut() {
            component.on_tick();
        }
    }

    /// Invoke the render hook of every component.
    pub fn render_components(&mut self, delta: Duration) {
        for component in self.components.values_mut() {
            component.on_render(delta);
        }
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("scene", &self.scene)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    struct Counter {
        ticks: Arc<AtomicUsize>,
        frames: Arc<AtomicUsize>,
    }

    impl Component for Counter {
        fn on_tick(&mut self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_render(&mut self, _delta: Duration) {
            self.frames.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn new_object_has_transform() {
        let obj = GameObject::new("cube");
        assert!(obj.has::<Transform>());
        assert_eq!(*obj.transform(), Transform::default());
        assert_eq!(obj.component_count(), 1);
        assert_eq!(obj.name(), "cube");
    }

    #[test]
    fn get_returns_added_instance() {
        let mut obj = GameObject::new("player");
        obj.add(Health(10));
        let added: *const Health = obj.get::<Health>().unwrap();

        obj.add(Counter {
            ticks: Arc::default(),
            frames: Arc::default(),
        });
        obj.get_mut::<Health>().unwrap().0 = 11;

        let found = obj.get::<Health>().unwrap();
        assert!(std::ptr::eq(found, added));
        assert_eq!(found, &Health(11));
    }

    #[test]
    fn second_add_replaces_first() {
        let mut obj = GameObject::new("player");
        assert!(obj.add(Health(10)).is_none());
        let replaced = obj.add(Health(20)).unwrap();
        assert_eq!(
            (*replaced).as_any().downcast_ref::<Health>(),
            Some(&Health(10))
        );
        assert_eq!(obj.get::<Health>(), Some(&Health(20)));
        assert_eq!(obj.component_count(), 2);
    }

    #[test]
    fn transform_cannot_be_removed() {
        let mut obj = GameObject::new("a").with(Health(1));
        assert!(obj.remove::<Transform>().is_none());
        assert!(obj.has::<Transform>());
        assert!(obj.remove::<Health>().is_some());
        assert!(!obj.has::<Health>());
    }

    #[test]
    fn transform_mut_writes_through() {
        let mut obj = GameObject::new("a");
        obj.transform_mut().position = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(obj.transform().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(obj.get::<Transform>().unwrap().position.z, 3.0);
    }

    #[test]
    fn hooks_reach_every_component() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let frames = Arc::new(AtomicUsize::new(0));
        let mut obj = GameObject::new("a").with(Counter {
            ticks: ticks.clone(),
            frames: frames.clone(),
        });
        obj.tick_components();
        obj.tick_components();
        obj.render_components(Duration::from_millis(16));
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(frames.load(Ordering::SeqCst), 1);
    }
}

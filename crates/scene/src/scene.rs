use prism_common::{ObjectId, SceneId};
use prism_ecs::{Component, GameObject};
use std::time::Duration;

/// Errors from scene membership operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("object {object:?} already belongs to scene {scene:?}")]
    AlreadyInScene { object: ObjectId, scene: SceneId },
    #[error("object {0:?} is already part of this scene")]
    DuplicateObject(ObjectId),
}

/// An ordered collection of game objects; the unit handed to the renderer.
///
/// Iteration follows insertion order. Objects are owned by the scene; removing
/// one hands it back untagged, and dropping it destroys it with its components.
#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    name: String,
    objects: Vec<GameObject>,
}

impl Scene {
    /// An empty scene with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(),
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of objects in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append an object. Fails if the object is already tagged with a scene or
    /// if an object with the same id is already present.
    pub fn add(&mut self, mut object: GameObject) -> Result<ObjectId, SceneError> {
        if let Some(scene) = object.scene() {
            return Err(SceneError::AlreadyInScene {
                object: object.id(),
                scene,
            });
        }
        let id = object.id();
        if self.contains(id) {
            return Err(SceneError::DuplicateObject(id));
        }
        object.set_scene(Some(self.id));
        tracing::debug!(scene = %self.name, object = object.name(), "object added");
        self.objects.push(object);
        Ok(id)
    }

    /// Detach an object, preserving the order of the rest.
    pub fn remove(&mut self, id: ObjectId) -> Option<GameObject> {
        let index = self.objects.iter().position(|o| o.id() == id)?;
        let mut object = self.objects.remove(index);
        object.set_scene(None);
        tracing::debug!(scene = %self.name, object = object.name(), "object removed");
        Some(object)
    }

    /// Whether `id` was added and not yet removed.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.iter().any(|o| o.id() == id)
    }

    /// Look up an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    /// First object with the given name, in scene order.
    pub fn find_by_name(&self, name: &str) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.name() == name)
    }

    /// Objects in stable insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.iter()
    }

    /// Mutable objects in insertion order.
    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.objects.iter_mut()
    }

    /// Objects carrying a component of type `T`, with that component.
    pub fn with_component<T: Component>(&self) -> impl Iterator<Item = (&GameObject, &T)> {
        self.objects
            .iter()
            .filter_map(|o| o.get::<T>().map(|c| (o, c)))
    }

    /// Fan the tick hook out to every component of every object.
    pub fn tick_components(&mut self) {
        for object in &mut self.objects {
            object.tick_components();
        }
    }

    /// Fan the render hook out to every component of every object.
    pub fn render_components(&mut self, delta: Duration) {
        for object in &mut self.objects {
            object.render_components(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use prism_common::Transform;
    use prism_ecs::Camera;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Spinner(Arc<AtomicUsize>);
    impl Component for Spinner {
        fn on_tick(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn scene_starts_empty() {
        let s = Scene::new("main");
        assert!(s.is_empty());
        assert_eq!(s.name(), "main");
    }

    #[test]
    fn add_tags_object_with_scene() {
        let mut s = Scene::new("main");
        let id = s.add(GameObject::new("a")).unwrap();
        assert_eq!(s.get(id).unwrap().scene(), Some(s.id()));
        assert!(s.contains(id));
    }

    #[test]
    fn object_in_one_scene_cannot_join_another() {
        let mut a = Scene::new("a");
        let mut b = Scene::new("b");
        let id = a.add(GameObject::new("obj")).unwrap();

        // Simulate a second handle to the same scened object.
        let mut stray = GameObject::with_id(id, "obj");
        stray.set_scene(Some(a.id()));

        match b.add(stray) {
            Err(SceneError::AlreadyInScene { object, scene }) => {
                assert_eq!(object, id);
                assert_eq!(scene, a.id());
            }
            other => panic!("expected AlreadyInScene, got {other:?}"),
        }
        assert!(b.is_empty());
    }

    #[test]
    fn removed_object_can_move_to_another_scene() {
        let mut a = Scene::new("a");
        let mut b = Scene::new("b");
        let id = a.add(GameObject::new("obj")).unwrap();

        let obj = a.remove(id).unwrap();
        assert_eq!(obj.scene(), None);
        b.add(obj).unwrap();
        assert!(!a.contains(id));
        assert_eq!(b.get(id).unwrap().scene(), Some(b.id()));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut s = Scene::new("main");
        let id = s.add(GameObject::new("a")).unwrap();
        assert!(matches!(
            s.add(GameObject::with_id(id, "copy")),
            Err(SceneError::DuplicateObject(_))
        ));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut s = Scene::new("main");
        for name in ["c", "a", "b"] {
            s.add(GameObject::new(name)).unwrap();
        }
        let names: Vec<&str> = s.objects().map(|o| o.name()).collect();
        assert_eq!(names, ["c", "a", "b"]);

        let middle = s.find_by_name("a").unwrap().id();
        s.remove(middle);
        let names: Vec<&str> = s.objects().map(|o| o.name()).collect();
        assert_eq!(names, ["c", "b"]);
    }

    #[test]
    fn with_component_filters() {
        let mut s = Scene::new("main");
        s.add(GameObject::new("plain")).unwrap();
        let eye = GameObject::new("eye").with(Camera::default());
        s.add(eye).unwrap();
        let cams: Vec<&str> = s
            .with_component::<Camera>()
            .map(|(o, _)| o.name())
            .collect();
        assert_eq!(cams, ["eye"]);
    }

    #[test]
    fn get_mut_edits_transform() {
        let mut s = Scene::new("main");
        let id = s.add(GameObject::new("a")).unwrap();
        s.get_mut(id).unwrap().transform_mut().translate(Vec3::X);
        assert_eq!(
            *s.get(id).unwrap().transform(),
            Transform::from_position(Vec3::X)
        );
    }

    #[test]
    fn tick_reaches_all_objects() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut s = Scene::new("main");
        for i in 0..3 {
            s.add(GameObject::new(format!("o{i}")).with(Spinner(count.clone())))
                .unwrap();
        }
        s.tick_components();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}

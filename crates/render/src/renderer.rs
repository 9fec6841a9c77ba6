use crate::backend::{
    ATTRIB_UV, ATTRIB_VERTEX, ATTRIBUTE_BINDINGS, BackendError, BufferId, BufferTarget, Capability,
    GraphicsBackend, ProgramId, ShaderId, ShaderStage, TextureId, UNIFORM_COLOR,
    UNIFORM_HAS_SAMPLER, UNIFORM_PROJECTION, UNIFORM_SAMPLER, UniformValue,
};
use crate::error::{RenderError, ShaderPhase};
use crate::skybox::Skybox;
use glam::{Mat4, Vec3};
use prism_assets::{Mesh, Shader, Texture2D};
use prism_common::{Color, ObjectId, ResourceId, ThreadAffinity, Transform};
use prism_ecs::Camera;
use prism_scene::Scene;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Copy)]
struct MeshBuffers {
    vertices: BufferId,
    uvs: Option<BufferId>,
    indices: Option<(BufferId, u32)>,
}

#[derive(Debug, Clone, Copy)]
struct ProgramIds {
    program: ProgramId,
    vertex: ShaderId,
    fragment: ShaderId,
}

/// Face meshes synthesized for one skybox at one scale.
#[derive(Debug)]
struct SkyboxFaces {
    skybox: ResourceId,
    scale: f32,
    meshes: Vec<Mesh>,
}

/// Draws a scene through a [`GraphicsBackend`], uploading what it needs on
/// first use.
///
/// Buffers, textures and shader programs are cached under the `ResourceId`
/// of the mesh, texture or shader that produced them. Entries are never
/// invalidated while the renderer lives, so data must not change after its
/// first draw; [`Renderer::dispose`] releases everything at once.
///
/// Every method that touches the backend must run on the thread the renderer
/// was created on. Setters only change CPU-side state and may be called from
/// anywhere the renderer is reachable.
#[derive(Debug)]
pub struct Renderer {
    affinity: ThreadAffinity,
    state: State,
    shader: Option<Arc<Shader>>,
    camera: Option<ObjectId>,
    skybox: Option<Arc<Skybox>>,
    clear_color: Color,
    meshes: HashMap<ResourceId, MeshBuffers>,
    textures: HashMap<ResourceId, TextureId>,
    programs: HashMap<ResourceId, ProgramIds>,
    skybox_faces: Option<SkyboxFaces>,
}

impl Renderer {
    /// Create a renderer owned by the calling thread.
    pub fn new() -> Self {
        Self::with_affinity(ThreadAffinity::current())
    }

    pub fn with_affinity(affinity: ThreadAffinity) -> Self {
        Self {
            affinity,
            state: State::Uninitialized,
            shader: None,
            camera: None,
            skybox: None,
            clear_color: Color::BLACK,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            skybox_faces: None,
        }
    }

    /// The thread allowed to call `init`, `render` and `dispose`.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// True between a successful `init` and `dispose`.
    pub fn is_initialized(&self) -> bool {
        self.state == State::Ready
    }

    /// Enable depth testing and 2D texturing on the current context.
    pub fn init(&mut self, gfx: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
        self.affinity.check("Renderer::init")?;
        if self.state == State::Ready {
            return Err(RenderError::AlreadyInitialized);
        }
        gfx.enable(Capability::DepthTest);
        gfx.enable(Capability::Texture2D);
        self.state = State::Ready;
        tracing::info!("renderer initialized");
        Ok(())
    }

    /// The program source drawn with, if any.
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    /// Replace the active shader. A new shader is compiled on the next frame.
    pub fn set_shader(&mut self, shader: Option<Arc<Shader>>) {
        self.shader = shader;
    }

    /// The scene object whose `Camera` component views the scene.
    pub fn camera(&self) -> Option<ObjectId> {
        self.camera
    }

    /// Point the renderer at a scene object carrying a `Camera`.
    pub fn set_camera(&mut self, camera: Option<ObjectId>) {
        self.camera = camera;
    }

    /// The background drawn before the scene, if any.
    pub fn skybox(&self) -> Option<&Arc<Skybox>> {
        self.skybox.as_ref()
    }

    /// Replace the background. Faces are rebuilt on the next frame.
    pub fn set_skybox(&mut self, skybox: Option<Arc<Skybox>>) {
        self.skybox = skybox;
    }

    /// Color the frame is cleared to; alpha is always 1.
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Set the frame clear color.
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Meshes with uploaded GPU buffers.
    pub fn cached_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Textures with uploaded GPU handles.
    pub fn cached_textures(&self) -> usize {
        self.textures.len()
    }

    /// Shaders with a linked program.
    pub fn cached_programs(&self) -> usize {
        self.programs.len()
    }

    /// Draw one frame of `scene`.
    ///
    /// Clears, realizes and activates the shader, draws the skybox (if any)
    /// with depth testing off, then draws every object carrying a [`Mesh`] in
    /// scene order. Without a shader or a camera the frame is only cleared.
    pub fn render(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        scene: &Scene,
    ) -> Result<(), RenderError> {
        self.affinity.check("Renderer::render")?;
        if self.state != State::Ready {
            return Err(RenderError::NotInitialized);
        }

        gfx.clear(self.clear_color.to_normalized_rgba());

        let Some(shader) = self.shader.clone() else {
            return Ok(());
        };
        let program = self.realize_program(gfx, &shader)?;
        gfx.use_program(program)?;

        let Some((camera, eye)) = self.find_camera(scene) else {
            return Ok(());
        };

        if self.skybox.is_some() {
            self.draw_skybox(gfx, camera, eye)?;
        }

        let view_projection = camera.view_projection(eye);
        for object in scene.objects() {
            if let Some(mesh) = object.get::<Mesh>() {
                self.draw_mesh(gfx, mesh, view_projection * object.transform().matrix())?;
            }
        }
        Ok(())
    }

    /// Release every cached GPU object and return to the uninitialized state.
    pub fn dispose(&mut self, gfx: &mut dyn GraphicsBackend) -> Result<(), RenderError> {
        self.affinity.check("Renderer::dispose")?;
        for (_, buffers) in self.meshes.drain() {
            release_buffers(gfx, buffers);
        }
        for (_, texture) in self.textures.drain() {
            gfx.delete_texture(texture);
        }
        for (_, ids) in self.programs.drain() {
            gfx.delete_program(ids.program);
            gfx.delete_shader(ids.vertex);
            gfx.delete_shader(ids.fragment);
        }
        self.skybox_faces = None;
        self.state = State::Uninitialized;
        tracing::info!("renderer disposed");
        Ok(())
    }

    fn find_camera<'s>(&self, scene: &'s Scene) -> Option<(&'s Camera, &'s Transform)> {
        let id = self.camera?;
        let Some(object) = scene.get(id) else {
            tracing::trace!(camera = %id.0, "camera object not in scene");
            return None;
        };
        let camera = object.get::<Camera>()?;
        Some((camera, object.transform()))
    }

    fn realize_program(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        shader: &Shader,
    ) -> Result<ProgramId, RenderError> {
        if let Some(ids) = self.programs.get(&shader.id()) {
            return Ok(ids.program);
        }

        let vertex = gfx
            .compile_shader(ShaderStage::Vertex, shader.vertex_source())
            .map_err(|e| shader_failure(ShaderPhase::Vertex, e))?;
        let fragment = match gfx.compile_shader(ShaderStage::Fragment, shader.fragment_source()) {
            Ok(id) => id,
            Err(e) => {
                gfx.delete_shader(vertex);
                return Err(shader_failure(ShaderPhase::Fragment, e));
            }
        };
        let program = match gfx.link_program(vertex, fragment, &ATTRIBUTE_BINDINGS) {
            Ok(id) => id,
            Err(e) => {
                gfx.delete_shader(vertex);
                gfx.delete_shader(fragment);
                return Err(shader_failure(ShaderPhase::Link, e));
            }
        };
        if let Err(e) = gfx.validate_program(program) {
            gfx.delete_program(program);
            gfx.delete_shader(vertex);
            gfx.delete_shader(fragment);
            return Err(shader_failure(ShaderPhase::Validate, e));
        }

        self.programs.insert(
            shader.id(),
            ProgramIds {
                program,
                vertex,
                fragment,
            },
        );
        tracing::info!(shader = shader.id().get(), %program, "shader program ready");
        Ok(program)
    }

    fn draw_skybox(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        camera: &Camera,
        eye: &Transform,
    ) -> Result<(), RenderError> {
        let Some(skybox) = self.skybox.clone() else {
            return Ok(());
        };
        let Some(near) = camera.near() else {
            tracing::debug!("skybox skipped for orthographic camera");
            return Ok(());
        };
        let scale = 2.0 * near;

        let faces = match self.skybox_faces.take() {
            Some(faces) if faces.skybox == skybox.id() && faces.scale == scale => faces,
            stale => {
                if let Some(old) = stale {
                    for mesh in &old.meshes {
                        if let Some(buffers) = self.meshes.remove(&mesh.id()) {
                            release_buffers(gfx, buffers);
                        }
                    }
                }
                tracing::debug!(skybox = skybox.id().get(), scale, "skybox faces built");
                SkyboxFaces {
                    skybox: skybox.id(),
                    scale,
                    meshes: skybox.face_meshes(scale)?,
                }
            }
        };

        let projection = camera.rotation_projection(eye);
        gfx.disable(Capability::DepthTest);
        let drawn = faces
            .meshes
            .iter()
            .try_for_each(|mesh| self.draw_mesh(gfx, mesh, projection));
        gfx.enable(Capability::DepthTest);
        self.skybox_faces = Some(faces);
        drawn
    }

    fn draw_mesh(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        mesh: &Mesh,
        projection: Mat4,
    ) -> Result<(), RenderError> {
        if mesh.vertex_count() == 0 {
            return Ok(());
        }
        let buffers = self.mesh_buffers(gfx, mesh)?;

        match mesh.texture() {
            Some(texture) => {
                let id = self.texture_handle(gfx, texture)?;
                gfx.bind_texture(0, Some(id))?;
                gfx.set_uniform(UNIFORM_SAMPLER, UniformValue::Int(0))?;
                gfx.set_uniform(UNIFORM_HAS_SAMPLER, UniformValue::Int(1))?;
            }
            None => {
                gfx.set_uniform(UNIFORM_SAMPLER, UniformValue::Int(-1))?;
                gfx.bind_texture(0, None)?;
                let color = mesh.color().unwrap_or(Color::WHITE).to_byte_scale();
                gfx.set_uniform(UNIFORM_COLOR, UniformValue::Vec3(Vec3::from_array(color)))?;
                gfx.set_uniform(UNIFORM_HAS_SAMPLER, UniformValue::Int(0))?;
            }
        }
        gfx.set_uniform(UNIFORM_PROJECTION, UniformValue::Mat4(projection))?;

        gfx.enable_attribute(ATTRIB_VERTEX);
        gfx.enable_attribute(ATTRIB_UV);
        let drawn = bind_and_draw(gfx, mesh, buffers);
        gfx.disable_attribute(ATTRIB_VERTEX);
        gfx.disable_attribute(ATTRIB_UV);
        gfx.unbind_buffers();
        Ok(drawn?)
    }

    fn mesh_buffers(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        mesh: &Mesh,
    ) -> Result<MeshBuffers, RenderError> {
        if let Some(buffers) = self.meshes.get(&mesh.id()) {
            return Ok(*buffers);
        }

        let vertices =
            gfx.create_buffer(BufferTarget::Array, bytemuck::cast_slice(mesh.vertices()))?;
        let uvs = mesh
            .uvs()
            .map(|uvs| gfx.create_buffer(BufferTarget::Array, bytemuck::cast_slice(uvs)))
            .transpose()?;
        let indices = mesh
            .indices()
            .map(|indices| {
                gfx.create_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(indices))
                    .map(|id| (id, indices.len() as u32))
            })
            .transpose()?;

        let buffers = MeshBuffers {
            vertices,
            uvs,
            indices,
        };
        self.meshes.insert(mesh.id(), buffers);
        tracing::debug!(
            mesh = mesh.id().get(),
            vertices = mesh.vertex_count(),
            indexed = indices.is_some(),
            "mesh uploaded"
        );
        Ok(buffers)
    }

    fn texture_handle(
        &mut self,
        gfx: &mut dyn GraphicsBackend,
        texture: &Texture2D,
    ) -> Result<TextureId, RenderError> {
        if let Some(id) = self.textures.get(&texture.id()) {
            return Ok(*id);
        }
        let id = gfx.create_texture_rgba8(texture.width(), texture.height(), texture.pixels())?;
        self.textures.insert(texture.id(), id);
        tracing::debug!(
            texture = texture.id().get(),
            width = texture.width(),
            height = texture.height(),
            "texture uploaded"
        );
        Ok(id)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// UVs bind with the mesh's declared component count, two for ordinary
/// texture coordinates.
fn bind_and_draw(
    gfx: &mut dyn GraphicsBackend,
    mesh: &Mesh,
    buffers: MeshBuffers,
) -> Result<(), BackendError> {
    gfx.bind_attribute(ATTRIB_VERTEX, buffers.vertices, mesh.vertex_size() as u32)?;
    if let Some(uvs) = buffers.uvs {
        gfx.bind_attribute(ATTRIB_UV, uvs, mesh.uv_size() as u32)?;
    }
    match buffers.indices {
        Some((indices, count)) => gfx.draw_indexed(indices, count),
        None => gfx.draw_arrays(mesh.vertex_count() as u32),
    }
}

fn release_buffers(gfx: &mut dyn GraphicsBackend, buffers: MeshBuffers) {
    gfx.delete_buffer(buffers.vertices);
    if let Some(uvs) = buffers.uvs {
        gfx.delete_buffer(uvs);
    }
    if let Some((indices, _)) = buffers.indices {
        gfx.delete_buffer(indices);
    }
}

/// Surface the backend's diagnostic log, then turn it into the caller's error.
fn shader_failure(phase: ShaderPhase, err: BackendError) -> RenderError {
    match err {
        BackendError::Compile { log, .. }
        | BackendError::Link(log)
        | BackendError::Validate(log) => {
            tracing::error!(%phase, log = %log, "shader program build failed");
            RenderError::ShaderCompile { phase, log }
        }
        other => RenderError::Backend(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{Call, RecordingBackend};
    use glam::Quat;
    use prism_ecs::GameObject;

    const VS: &str = "void main() {\n  gl_Position = projection * vec4(vertex, 1.0);\n}";
    const FS: &str = "void main() {\n  out_color = vec4(color / 255.0, 1.0);\n}";

    fn shader() -> Arc<Shader> {
        Arc::new(Shader::new(VS, FS))
    }

    fn triangle() -> Mesh {
        Mesh::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 3).unwrap()
    }

    fn quad() -> Mesh {
        Mesh::new(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2)
            .unwrap()
            .with_uvs(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2)
            .unwrap()
            .with_indices(vec![0, 1, 2, 2, 3, 0])
            .unwrap()
    }

    fn texture() -> Arc<Texture2D> {
        Arc::new(Texture2D::solid(2, 2, [255, 0, 0, 255]).unwrap())
    }

    fn skybox() -> Arc<Skybox> {
        Arc::new(Skybox::new(std::array::from_fn(|_| texture())))
    }

    /// A scene with a perspective camera and the given meshes.
    fn scene_with(meshes: Vec<Mesh>) -> (Scene, ObjectId) {
        let mut scene = Scene::new("test");
        let camera = scene
            .add(GameObject::new("camera").with(Camera::perspective(60.0, 4.0 / 3.0, 0.1, 100.0)))
            .unwrap();
        for (i, mesh) in meshes.into_iter().enumerate() {
            let object = GameObject::new(format!("mesh{i}")).with(mesh);
            scene.add(object).unwrap();
        }
        (scene, camera)
    }

    fn ready(camera: ObjectId) -> (Renderer, RecordingBackend) {
        let mut gfx = RecordingBackend::new();
        let mut renderer = Renderer::new();
        renderer.init(&mut gfx).unwrap();
        renderer.set_shader(Some(shader()));
        renderer.set_camera(Some(camera));
        gfx.take_calls();
        (renderer, gfx)
    }

    #[test]
    fn init_enables_depth_and_texturing_once() {
        let mut gfx = RecordingBackend::new();
        let mut renderer = Renderer::new();
        assert!(!renderer.is_initialized());
        renderer.init(&mut gfx).unwrap();
        assert!(gfx.is_enabled(Capability::DepthTest));
        assert!(gfx.is_enabled(Capability::Texture2D));
        assert!(matches!(renderer.init(&mut gfx), Err(RenderError::AlreadyInitialized)));
    }

    #[test]
    fn render_before_init_fails() {
        let mut gfx = RecordingBackend::new();
        let mut renderer = Renderer::new();
        let (scene, _) = scene_with(vec![]);
        assert!(matches!(
            renderer.render(&mut gfx, &scene),
            Err(RenderError::NotInitialized)
        ));
        assert!(gfx.calls().is_empty());
    }

    #[test]
    fn calls_from_other_threads_are_rejected() {
        let mut renderer = Renderer::new();
        let handle = std::thread::spawn(move || {
            let mut gfx = RecordingBackend::new();
            let init = renderer.init(&mut gfx);
            let (scene, _) = scene_with(vec![]);
            let render = renderer.render(&mut gfx, &scene);
            (init, render, gfx.calls().len())
        });
        let (init, render, calls) = handle.join().unwrap();
        match init {
            Err(RenderError::WrongThread(e)) => assert_eq!(e.operation, "Renderer::init"),
            other => panic!("expected WrongThread, got {other:?}"),
        }
        assert!(matches!(render, Err(RenderError::WrongThread(_))));
        assert_eq!(calls, 0);
    }

    #[test]
    fn clears_with_normalized_color() {
        let (scene, camera) = scene_with(vec![]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_clear_color(Color::rgb(255, 0, 51));
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.calls()[0], Call::Clear([1.0, 0.0, 0.2, 1.0]));
    }

    #[test]
    fn without_shader_only_clears() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_shader(None);
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.calls().len(), 1);
        assert!(matches!(gfx.calls()[0], Call::Clear(_)));
    }

    #[test]
    fn without_camera_only_activates_program() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_camera(None);
        renderer.render(&mut gfx, &scene).unwrap();
        assert!(matches!(gfx.calls().last(), Some(Call::UseProgram(_))));
        assert_eq!(gfx.draw_calls().count(), 0);
    }

    #[test]
    fn program_builds_in_order_and_once() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();
        renderer.render(&mut gfx, &scene).unwrap();

        let build: Vec<&Call> = gfx
            .calls()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::CompileShader { .. } | Call::LinkProgram { .. } | Call::ValidateProgram(_)
                )
            })
            .collect();
        assert_eq!(build.len(), 4);
        assert!(matches!(build[0], Call::CompileShader { stage: ShaderStage::Vertex, .. }));
        assert!(matches!(build[1], Call::CompileShader { stage: ShaderStage::Fragment, .. }));
        assert!(matches!(build[2], Call::LinkProgram { .. }));
        assert!(matches!(build[3], Call::ValidateProgram(_)));
        assert_eq!(gfx.calls().iter().filter(|c| matches!(c, Call::UseProgram(_))).count(), 2);
        assert_eq!(renderer.cached_programs(), 1);
    }

    #[test]
    fn second_render_hits_every_cache() {
        let textured = quad().with_texture(texture());
        let (scene, camera) = scene_with(vec![textured, triangle()]);
        let (mut renderer, mut gfx) = ready(camera);

        renderer.render(&mut gfx, &scene).unwrap();
        let buffers = gfx.buffer_allocations();
        let textures = gfx.texture_allocations();
        let compiles = gfx.shader_compilations();
        assert_eq!(buffers, 4);
        assert_eq!(textures, 1);

        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.buffer_allocations(), buffers);
        assert_eq!(gfx.texture_allocations(), textures);
        assert_eq!(gfx.shader_compilations(), compiles);
        assert_eq!(gfx.draw_calls().count(), 4);
    }

    #[test]
    fn shared_texture_uploads_once() {
        let shared = texture();
        let (scene, camera) = scene_with(vec![
            quad().with_texture(shared.clone()),
            quad().with_texture(shared),
        ]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.texture_allocations(), 1);
        assert_eq!(renderer.cached_meshes(), 2);
    }

    #[test]
    fn invalid_vertex_source_is_a_compile_error() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        let broken = Shader::new("void main() {\n  gl_Position = vec4(0.0;\n", FS);
        renderer.set_shader(Some(Arc::new(broken)));

        match renderer.render(&mut gfx, &scene) {
            Err(RenderError::ShaderCompile { phase, log }) => {
                assert_eq!(phase, ShaderPhase::Vertex);
                assert!(log.starts_with("0:2:"), "log was {log}");
            }
            other => panic!("expected ShaderCompile, got {other:?}"),
        }
        assert_eq!(renderer.cached_programs(), 0);
        assert_eq!(gfx.draw_calls().count(), 0);
        assert_eq!(gfx.live_shaders(), 0);
    }

    #[test]
    fn invalid_fragment_source_releases_vertex_stage() {
        let (scene, camera) = scene_with(vec![]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_shader(Some(Arc::new(Shader::new(VS, ""))));
        assert!(matches!(
            renderer.render(&mut gfx, &scene),
            Err(RenderError::ShaderCompile { phase: ShaderPhase::Fragment, .. })
        ));
        assert_eq!(gfx.live_shaders(), 0);
    }

    #[test]
    fn link_and_validate_failures_are_compile_errors() {
        let (scene, camera) = scene_with(vec![]);

        let mut renderer = Renderer::new();
        let mut gfx = RecordingBackend::new().fail_link_with("undefined reference to main");
        renderer.init(&mut gfx).unwrap();
        renderer.set_shader(Some(shader()));
        renderer.set_camera(Some(camera));
        match renderer.render(&mut gfx, &scene) {
            Err(RenderError::ShaderCompile { phase, log }) => {
                assert_eq!(phase, ShaderPhase::Link);
                assert_eq!(log, "undefined reference to main");
            }
            other => panic!("expected link failure, got {other:?}"),
        }
        assert_eq!(gfx.live_shaders(), 0);

        let mut renderer = Renderer::new();
        let mut gfx = RecordingBackend::new().fail_validate_with("sampler mismatch");
        renderer.init(&mut gfx).unwrap();
        renderer.set_shader(Some(shader()));
        assert!(matches!(
            renderer.render(&mut gfx, &scene),
            Err(RenderError::ShaderCompile { phase: ShaderPhase::Validate, .. })
        ));
        assert_eq!(gfx.live_programs(), 0);
    }

    #[test]
    fn untextured_mesh_uses_flat_color() {
        let tinted = triangle().with_color(Color::rgb(10, 20, 30));
        let (scene, camera) = scene_with(vec![triangle(), tinted]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();

        let colors: Vec<UniformValue> = gfx.uniform_values(UNIFORM_COLOR).collect();
        assert_eq!(
            colors,
            vec![
                UniformValue::Vec3(Vec3::new(255.0, 255.0, 255.0)),
                UniformValue::Vec3(Vec3::new(10.0, 20.0, 30.0)),
            ]
        );
        assert!(gfx.uniform_values(UNIFORM_SAMPLER).all(|v| v == UniformValue::Int(-1)));
        assert!(gfx.uniform_values(UNIFORM_HAS_SAMPLER).all(|v| v == UniformValue::Int(0)));
        let unbind = Call::BindTexture {
            unit: 0,
            texture: None,
        };
        assert!(gfx.calls().contains(&unbind));
    }

    #[test]
    fn textured_mesh_binds_sampler() {
        let (scene, camera) = scene_with(vec![quad().with_texture(texture())]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();

        let samplers: Vec<_> = gfx.uniform_values(UNIFORM_SAMPLER).collect();
        assert_eq!(samplers, vec![UniformValue::Int(0)]);
        assert_eq!(
            gfx.uniform_values(UNIFORM_HAS_SAMPLER).collect::<Vec<_>>(),
            vec![UniformValue::Int(1)]
        );
        assert_eq!(gfx.uniform_values(UNIFORM_COLOR).count(), 0);
        let bound = gfx.calls().iter().any(|c| match c {
            Call::BindTexture { unit, texture } => *unit == 0 && texture.is_some(),
            _ => false,
        });
        assert!(bound);
    }

    #[test]
    fn projection_combines_camera_and_model() {
        let (mut scene, camera) = scene_with(vec![triangle()]);
        scene.get_mut(camera).unwrap().transform_mut().position = Vec3::new(0.0, 0.0, 5.0);
        let mesh_id = scene.find_by_name("mesh0").unwrap().id();
        scene.get_mut(mesh_id).unwrap().transform_mut().position = Vec3::new(1.0, 2.0, 0.0);

        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();

        let cam = scene.get(camera).unwrap();
        let expected = cam.get::<Camera>().unwrap().view_projection(cam.transform())
            * scene.get(mesh_id).unwrap().transform().matrix();
        assert_eq!(
            gfx.uniform_values(UNIFORM_PROJECTION).collect::<Vec<_>>(),
            vec![UniformValue::Mat4(expected)]
        );
    }

    #[test]
    fn draw_sequence_binds_attributes_and_cleans_up() {
        let (scene, camera) = scene_with(vec![quad()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();

        let calls = gfx.calls();
        let draw = calls.iter().position(Call::is_draw).unwrap();
        assert!(matches!(calls[draw], Call::DrawIndexed { index_count: 6, .. }));
        assert!(calls[..draw].contains(&Call::EnableAttribute(ATTRIB_VERTEX)));
        assert!(calls[..draw].contains(&Call::EnableAttribute(ATTRIB_UV)));
        assert!(calls[..draw].iter().any(|c| matches!(
            c,
            Call::BindAttribute { location: ATTRIB_VERTEX, components: 2, .. }
        )));
        assert!(calls[..draw].iter().any(|c| matches!(
            c,
            Call::BindAttribute { location: ATTRIB_UV, components: 2, .. }
        )));
        assert_eq!(
            &calls[draw + 1..],
            &[
                Call::DisableAttribute(ATTRIB_VERTEX),
                Call::DisableAttribute(ATTRIB_UV),
                Call::UnbindBuffers,
            ]
        );
    }

    #[test]
    fn non_indexed_mesh_draws_arrays() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(
            gfx.draw_calls().collect::<Vec<_>>(),
            vec![&Call::DrawArrays { vertex_count: 3 }]
        );
        assert!(!gfx.calls().iter().any(|c| matches!(
            c,
            Call::BindAttribute { location: ATTRIB_UV, .. }
        )));
    }

    #[test]
    fn uvs_bind_with_declared_width() {
        let volume = triangle().with_uvs(vec![0.0; 9], 3).unwrap();
        let (scene, camera) = scene_with(vec![volume]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();
        let uv_widths: Vec<u32> = gfx
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::BindAttribute {
                    location: ATTRIB_UV,
                    components,
                    ..
                } => Some(*components),
                _ => None,
            })
            .collect();
        assert_eq!(uv_widths, vec![3]);
    }

    #[test]
    fn objects_draw_in_scene_order() {
        let (scene, camera) = scene_with(vec![quad(), triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.render(&mut gfx, &scene).unwrap();
        let draws: Vec<&Call> = gfx.draw_calls().collect();
        assert!(matches!(draws[0], Call::DrawIndexed { .. }));
        assert!(matches!(draws[1], Call::DrawArrays { .. }));
    }

    #[test]
    fn skybox_draws_first_without_depth_test() {
        let (scene, camera) = scene_with(vec![triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_skybox(Some(skybox()));
        renderer.render(&mut gfx, &scene).unwrap();

        let calls = gfx.calls();
        let position = |call: Call| calls.iter().position(|c| *c == call).unwrap();
        let off = position(Call::Disable(Capability::DepthTest));
        let on = position(Call::Enable(Capability::DepthTest));
        assert!(off < on);
        let sky_draws = calls[off..on].iter().filter(|c| c.is_draw()).count();
        assert_eq!(sky_draws, 6);
        assert!(calls[off..on].iter().filter(|c| c.is_draw()).all(|c| matches!(
            c,
            Call::DrawIndexed { index_count: 6, .. }
        )));
        let main_draws = calls[on..].iter().filter(|c| c.is_draw()).count();
        assert_eq!(main_draws, 1);
        assert!(gfx.is_enabled(Capability::DepthTest));
    }

    #[test]
    fn skybox_ignores_camera_position() {
        let (mut scene, camera) = scene_with(vec![]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_skybox(Some(skybox()));

        scene.get_mut(camera).unwrap().transform_mut().rotation = Quat::from_rotation_y(0.5);
        renderer.render(&mut gfx, &scene).unwrap();
        let first: Vec<UniformValue> = gfx.uniform_values(UNIFORM_PROJECTION).collect();

        gfx.take_calls();
        scene.get_mut(camera).unwrap().transform_mut().position = Vec3::new(100.0, -3.0, 7.0);
        renderer.render(&mut gfx, &scene).unwrap();
        let second: Vec<UniformValue> = gfx.uniform_values(UNIFORM_PROJECTION).collect();

        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    #[test]
    fn skybox_faces_are_cached_until_near_changes() {
        let (mut scene, camera) = scene_with(vec![]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_skybox(Some(skybox()));

        renderer.render(&mut gfx, &scene).unwrap();
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.buffer_allocations(), 18);
        assert_eq!(gfx.texture_allocations(), 6);

        let object = scene.get_mut(camera).unwrap();
        object.get_mut::<Camera>().unwrap().set_near(0.5);
        renderer.render(&mut gfx, &scene).unwrap();
        assert_eq!(gfx.buffer_allocations(), 36);
        assert_eq!(gfx.live_buffers(), 18);
        assert_eq!(gfx.texture_allocations(), 6);
    }

    #[test]
    fn skybox_skipped_for_orthographic_camera() {
        let mut scene = Scene::new("ortho");
        let camera = scene
            .add(GameObject::new("camera").with(Camera::orthographic(800.0, 600.0, 512.0)))
            .unwrap();
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_skybox(Some(skybox()));
        renderer.render(&mut gfx, &scene).unwrap();
        assert!(!gfx.calls().contains(&Call::Disable(Capability::DepthTest)));
        assert_eq!(gfx.buffer_allocations(), 0);
    }

    #[test]
    fn dispose_releases_everything() {
        let (scene, camera) = scene_with(vec![quad().with_texture(texture()), triangle()]);
        let (mut renderer, mut gfx) = ready(camera);
        renderer.set_skybox(Some(skybox()));
        renderer.render(&mut gfx, &scene).unwrap();
        assert!(gfx.live_buffers() > 0);

        renderer.dispose(&mut gfx).unwrap();
        assert_eq!(gfx.live_buffers(), 0);
        assert_eq!(gfx.live_textures(), 0);
        assert_eq!(gfx.live_programs(), 0);
        assert_eq!(gfx.live_shaders(), 0);
        assert!(!renderer.is_initialized());
        assert!(matches!(
            renderer.render(&mut gfx, &scene),
            Err(RenderError::NotInitialized)
        ));
    }
}

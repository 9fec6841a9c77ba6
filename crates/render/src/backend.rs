use glam::{Mat4, Vec3};
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Backend buffer object.
    BufferId
);
handle!(
    /// Backend 2D texture object.
    TextureId
);
handle!(
    /// A compiled shader stage.
    ShaderId
);
handle!(
    /// A linked shader program.
    ProgramId
);

/// Attribute location of the vertex position stream.
pub const ATTRIB_VERTEX: u32 = 0;
/// Attribute location of the texture coordinate stream.
pub const ATTRIB_UV: u32 = 1;
/// Attribute bindings applied when linking every program.
pub const ATTRIBUTE_BINDINGS: [(u32, &str); 2] = [(ATTRIB_VERTEX, "vertex"), (ATTRIB_UV, "uv")];

pub const UNIFORM_PROJECTION: &str = "projection";
pub const UNIFORM_SAMPLER: &str = "sampler";
pub const UNIFORM_HAS_SAMPLER: &str = "hasSampler";
pub const UNIFORM_COLOR: &str = "color";

/// Context state toggled with [`GraphicsBackend::enable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    DepthTest,
    Texture2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data (`f32`).
    Array,
    /// Triangle-list indices (`u32`).
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Int(i32),
    Vec3(Vec3),
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program failed to link: {0}")]
    Link(String),
    #[error("program failed validation: {0}")]
    Validate(String),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("no program in use")]
    NoProgram,
    #[error("device error: {0}")]
    Device(String),
}

/// An immediate-mode graphics context, shaped after the classic bind-and-draw
/// model: resources are created once and referenced by handle, state is set
/// with enable/disable and uniform calls, and draws consume the currently
/// bound program, attributes and textures.
///
/// Implementations are bound to the thread that created their context; the
/// renderer checks affinity before calling in.
pub trait GraphicsBackend {
    fn enable(&mut self, capability: Capability);

    fn disable(&mut self, capability: Capability);

    /// Clear color and depth.
    fn clear(&mut self, rgba: [f32; 4]);

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, BackendError>;

    fn delete_buffer(&mut self, buffer: BufferId);

    /// Allocate a 2D texture with linear min/mag filtering and upload RGBA8
    /// pixels once.
    fn create_texture_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, BackendError>;

    fn delete_texture(&mut self, texture: TextureId);

    /// Compile one stage. Failures carry the native compiler log in
    /// [`BackendError::Compile`].
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, BackendError>;

    fn delete_shader(&mut self, shader: ShaderId);

    /// Link two stages, binding each `(location, name)` attribute first.
    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        attributes: &[(u32, &str)],
    ) -> Result<ProgramId, BackendError>;

    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    fn delete_program(&mut self, program: ProgramId);

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    /// Set a uniform on the program in use. Names the program does not
    /// declare are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BackendError>;

    /// Bind `texture` to `unit`, or unbind the unit with `None`.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError>;

    fn enable_attribute(&mut self, location: u32);

    fn disable_attribute(&mut self, location: u32);

    /// Source attribute `location` from `buffer`, `components` floats per vertex.
    fn bind_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        components: u32,
    ) -> Result<(), BackendError>;

    /// Non-indexed triangle list over `vertex_count` vertices.
    fn draw_arrays(&mut self, vertex_count: u32) -> Result<(), BackendError>;

    /// Indexed triangle list with 32-bit indices.
    fn draw_indexed(&mut self, indices: BufferId, index_count: u32) -> Result<(), BackendError>;

    fn unbind_buffers(&mut self);
}

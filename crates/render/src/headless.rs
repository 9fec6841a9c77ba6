//! An in-memory [`GraphicsBackend`] that records every call.
//!
//! Used to drive the renderer without a GPU: tests inspect the call log and
//! the allocation counters. Shader sources get a minimal syntax check
//! (non-empty, balanced brackets) so compile failures can be provoked, and
//! link or validate failures can be scripted.

use crate::backend::{
    BackendError, BufferId, BufferTarget, Capability, GraphicsBackend, ProgramId, ShaderId,
    ShaderStage, TextureId, UniformValue,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Enable(Capability),
    Disable(Capability),
    Clear([f32; 4]),
    CreateBuffer {
        id: BufferId,
        target: BufferTarget,
        bytes: usize,
    },
    DeleteBuffer(BufferId),
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
    },
    DeleteTexture(TextureId),
    CompileShader {
        id: ShaderId,
        stage: ShaderStage,
    },
    DeleteShader(ShaderId),
    LinkProgram {
        id: ProgramId,
        vertex: ShaderId,
        fragment: ShaderId,
    },
    ValidateProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    SetUniform {
        name: String,
        value: UniformValue,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    EnableAttribute(u32),
    DisableAttribute(u32),
    BindAttribute {
        location: u32,
        buffer: BufferId,
        components: u32,
    },
    DrawArrays {
        vertex_count: u32,
    },
    DrawIndexed {
        indices: BufferId,
        index_count: u32,
    },
    UnbindBuffers,
}

impl Call {
    pub fn is_draw(&self) -> bool {
        matches!(self, Call::DrawArrays { .. } | Call::DrawIndexed { .. })
    }
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_handle: u32,
    capabilities: BTreeSet<Capability>,
    buffers: BTreeMap<BufferId, BufferTarget>,
    textures: BTreeSet<TextureId>,
    shaders: BTreeMap<ShaderId, ShaderStage>,
    programs: BTreeSet<ProgramId>,
    current_program: Option<ProgramId>,
    buffer_allocations: usize,
    texture_allocations: usize,
    shader_compilations: usize,
    link_failure: Option<String>,
    validate_failure: Option<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent link fail with `log`.
    pub fn fail_link_with(mut self, log: impl Into<String>) -> Self {
        self.link_failure = Some(log.into());
        self
    }

    /// Make every subsequent validation fail with `log`.
    pub fn fail_validate_with(mut self, log: impl Into<String>) -> Self {
        self.validate_failure = Some(log.into());
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Drain the call log, keeping resources and counters.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Buffers created over the backend's lifetime.
    pub fn buffer_allocations(&self) -> usize {
        self.buffer_allocations
    }

    /// Textures created over the backend's lifetime.
    pub fn texture_allocations(&self) -> usize {
        self.texture_allocations
    }

    /// Successful shader-stage compilations over the backend's lifetime.
    pub fn shader_compilations(&self) -> usize {
        self.shader_compilations
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter().filter(|c| c.is_draw())
    }

    /// Values set for uniform `name`, in call order.
    pub fn uniform_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = UniformValue> + 'a {
        self.calls.iter().filter_map(move |c| match c {
            Call::SetUniform { name: n, value } if n == name => Some(*value),
            _ => None,
        })
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn program_in_use(&self) -> Result<ProgramId, BackendError> {
        self.current_program.ok_or(BackendError::NoProgram)
    }

    fn known_buffer(&self, buffer: BufferId) -> Result<(), BackendError> {
        if self.buffers.contains_key(&buffer) {
            Ok(())
        } else {
            Err(BackendError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            })
        }
    }
}

/// Reject empty sources and unbalanced brackets, reporting `0:LINE: message`
/// like a GLSL compiler log.
fn check_source(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("0:0: empty shader source".into());
    }
    let mut open: Vec<(char, usize)> = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let line_no = number + 1;
        for c in line.chars() {
            match c {
                '{' | '(' | '[' => open.push((c, line_no)),
                '}' | ')' | ']' => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match open.pop() {
                        Some((o, _)) if o == expected => {}
                        _ => return Err(format!("0:{line_no}: unexpected '{c}'")),
                    }
                }
                _ => {}
            }
        }
    }
    match open.pop() {
        Some((c, line_no)) => Err(format!("0:{line_no}: unbalanced '{c}'")),
        None => Ok(()),
    }
}

impl GraphicsBackend for RecordingBackend {
    fn enable(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
        self.calls.push(Call::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.capabilities.remove(&capability);
        self.calls.push(Call::Disable(capability));
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        self.calls.push(Call::Clear(rgba));
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, BackendError> {
        let id = BufferId(self.handle());
        self.buffers.insert(id, target);
        self.buffer_allocations += 1;
        self.calls.push(Call::CreateBuffer {
            id,
            target,
            bytes: data.len(),
        });
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.calls.push(Call::DeleteBuffer(buffer));
    }

    fn create_texture_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, BackendError> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(BackendError::Device(format!(
                "{} bytes for a {width}x{height} RGBA8 texture",
                pixels.len()
            )));
        }
        let id = TextureId(self.handle());
        self.textures.insert(id);
        self.texture_allocations += 1;
        self.calls.push(Call::CreateTexture { id, width, height });
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, BackendError> {
        check_source(source).map_err(|log| BackendError::Compile { stage, log })?;
        let id = ShaderId(self.handle());
        self.shaders.insert(id, stage);
        self.shader_compilations += 1;
        self.calls.push(Call::CompileShader { id, stage });
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.calls.push(Call::DeleteShader(shader));
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        _attributes: &[(u32, &str)],
    ) -> Result<ProgramId, BackendError> {
        if self.shaders.get(&vertex) != Some(&ShaderStage::Vertex)
            || self.shaders.get(&fragment) != Some(&ShaderStage::Fragment)
        {
            return Err(BackendError::Link("stage handles do not match".into()));
        }
        if let Some(log) = &self.link_failure {
            return Err(BackendError::Link(log.clone()));
        }
        let id = ProgramId(self.handle());
        self.programs.insert(id);
        self.calls.push(Call::LinkProgram {
            id,
            vertex,
            fragment,
        });
        Ok(id)
    }

    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.calls.push(Call::ValidateProgram(program));
        match &self.validate_failure {
            Some(log) => Err(BackendError::Validate(log.clone())),
            None => Ok(()),
        }
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(Call::DeleteProgram(program));
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        if !self.programs.contains(&program) {
            return Err(BackendError::UnknownHandle {
                kind: "program",
                id: program.0,
            });
        }
        self.current_program = Some(program);
        self.calls.push(Call::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BackendError> {
        self.program_in_use()?;
        self.calls.push(Call::SetUniform {
            name: name.to_owned(),
            value,
        });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError> {
        if let Some(t) = texture.filter(|t| !self.textures.contains(t)) {
            return Err(BackendError::UnknownHandle {
                kind: "texture",
                id: t.0,
            });
        }
        self.calls.push(Call::BindTexture { unit, texture });
        Ok(())
    }

    fn enable_attribute(&mut self, location: u32) {
        self.calls.push(Call::EnableAttribute(location));
    }

    fn disable_attribute(&mut self, location: u32) {
        self.calls.push(Call::DisableAttribute(location));
    }

    fn bind_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        components: u32,
    ) -> Result<(), BackendError> {
        self.known_buffer(buffer)?;
        self.calls.push(Call::BindAttribute {
            location,
            buffer,
            components,
        });
        Ok(())
    }

    fn draw_arrays(&mut self, vertex_count: u32) -> Result<(), BackendError> {
        self.program_in_use()?;
        self.calls.push(Call::DrawArrays { vertex_count });
        Ok(())
    }

    fn draw_indexed(&mut self, indices: BufferId, index_count: u32) -> Result<(), BackendError> {
        self.program_in_use()?;
        self.known_buffer(indices)?;
        self.calls.push(Call::DrawIndexed {
            indices,
            index_count,
        });
        Ok(())
    }

    fn unbind_buffers(&mut self) {
        self.calls.push(Call::UnbindBuffers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_source_compiles() {
        let mut gfx = RecordingBackend::new();
        let id = gfx
            .compile_shader(ShaderStage::Vertex, "void main() {\n  gl_Position = vec4(0.0);\n}")
            .unwrap();
        assert_eq!(gfx.live_shaders(), 1);
        let compiled = Call::CompileShader {
            id,
            stage: ShaderStage::Vertex,
        };
        assert_eq!(gfx.calls()[0], compiled);
    }

    #[test]
    fn unbalanced_source_reports_line() {
        let mut gfx = RecordingBackend::new();
        let err = gfx
            .compile_shader(ShaderStage::Fragment, "void main() {\n  color = vec4(1.0;\n}")
            .unwrap_err();
        match err {
            BackendError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, "0:3: unexpected '}'");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gfx.shader_compilations(), 0);
    }

    #[test]
    fn unclosed_brace_reports_opening_line() {
        assert_eq!(
            check_source("void main()\n{\n"),
            Err("0:2: unbalanced '{'".into())
        );
        assert!(check_source("   ").is_err());
    }

    #[test]
    fn draw_requires_program() {
        let mut gfx = RecordingBackend::new();
        assert!(matches!(gfx.draw_arrays(3), Err(BackendError::NoProgram)));
    }

    #[test]
    fn scripted_link_failure() {
        let mut gfx = RecordingBackend::new().fail_link_with("missing main");
        let vs = gfx.compile_shader(ShaderStage::Vertex, "a").unwrap();
        let fs = gfx.compile_shader(ShaderStage::Fragment, "b").unwrap();
        assert!(matches!(
            gfx.link_program(vs, fs, &[]),
            Err(BackendError::Link(log)) if log == "missing main"
        ));
    }

    #[test]
    fn counters_survive_deletes() {
        let mut gfx = RecordingBackend::new();
        let b = gfx.create_buffer(BufferTarget::Array, &[0; 12]).unwrap();
        gfx.delete_buffer(b);
        assert_eq!(gfx.buffer_allocations(), 1);
        assert_eq!(gfx.live_buffers(), 0);
    }
}

//! [`GraphicsBackend`] on top of wgpu.
//!
//! wgpu records whole passes rather than immediate draws, so this backend
//! keeps the bind-and-draw state the renderer drives, snapshots it on every
//! draw call, and replays the snapshots in a single render pass when the
//! window presents. Pipelines are derived lazily from a linked program plus
//! the vertex layout and depth state in effect at draw time.

use bytemuck::{Pod, Zeroable};
use prism_render::{
    ATTRIB_UV, ATTRIB_VERTEX, BackendError, BufferId, BufferTarget, Capability, GraphicsBackend,
    ProgramId, ShaderId, ShaderStage, TextureId, UNIFORM_COLOR, UNIFORM_HAS_SAMPLER,
    UNIFORM_PROJECTION, UNIFORM_SAMPLER, UniformValue,
};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;
const VERTEX_ENTRY: &str = "vs_main";
const FRAGMENT_ENTRY: &str = "fs_main";

/// Mirror of `DrawUniforms` in [`crate::shaders::DRAW_UNIFORMS`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct DrawUniforms {
    projection: [[f32; 4]; 4],
    color: [f32; 4],
    has_sampler: i32,
    sampler_unit: i32,
    _pad: [i32; 2],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            projection: glam::Mat4::IDENTITY.to_cols_array_2d(),
            color: [255.0, 255.0, 255.0, 1.0],
            has_sampler: 0,
            sampler_unit: -1,
            _pad: [0; 2],
        }
    }
}

impl DrawUniforms {
    /// Returns false when the name or value type is not part of the block.
    fn apply(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            (UNIFORM_PROJECTION, UniformValue::Mat4(m)) => self.projection = m.to_cols_array_2d(),
            (UNIFORM_COLOR, UniformValue::Vec3(c)) => self.color = [c.x, c.y, c.z, 1.0],
            (UNIFORM_HAS_SAMPLER, UniformValue::Int(v)) => self.has_sampler = v,
            (UNIFORM_SAMPLER, UniformValue::Int(v)) => self.sampler_unit = v,
            _ => return false,
        }
        true
    }
}

/// Everything that makes two draws of one program need different pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    depth_test: bool,
    vertex_components: u32,
    /// `None` when the UV attribute is disabled and the zero fallback is fed.
    uv_components: Option<u32>,
}

impl PipelineKey {
    /// Layout the default program is validated against.
    const VALIDATION: Self = Self {
        depth_test: true,
        vertex_components: 3,
        uv_components: Some(2),
    };
}

#[derive(Debug, Clone, Copy)]
enum DrawKind {
    Arrays(u32),
    Indexed { indices: BufferId, count: u32 },
}

#[derive(Debug, Clone, Copy)]
struct DrawCommand {
    program: ProgramId,
    key: PipelineKey,
    uniform_slot: u32,
    texture: Option<TextureId>,
    vertices: BufferId,
    uvs: Option<BufferId>,
    kind: DrawKind,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    target: BufferTarget,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuShader {
    stage: ShaderStage,
    module: Arc<wgpu::ShaderModule>,
    has_entry_point: bool,
}

struct GpuProgram {
    vertex: Arc<wgpu::ShaderModule>,
    fragment: Arc<wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

/// Frame-scoped GL-style state.
#[derive(Debug, Default)]
struct BindState {
    program: Option<ProgramId>,
    depth_test: bool,
    attributes: [Option<(BufferId, u32)>; 2],
    enabled: [bool; 2],
    texture: Option<TextureId>,
    uniforms: DrawUniforms,
}

impl BindState {
    fn attribute(&self, location: u32) -> Option<(BufferId, u32)> {
        let slot = location as usize;
        if *self.enabled.get(slot)? { self.attributes[slot] } else { None }
    }
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    pipeline_layout: wgpu::PipelineLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    zero_uv: wgpu::Buffer,

    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_capacity: u64,

    buffers: HashMap<BufferId, GpuBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
    shaders: HashMap<ShaderId, GpuShader>,
    programs: HashMap<ProgramId, GpuProgram>,
    next_handle: u32,

    state: BindState,
    clear_color: wgpu::Color,
    draws: Vec<DrawCommand>,
    frame_uniforms: Vec<DrawUniforms>,
}

impl WgpuBackend {
    /// Wrap a device whose frames target `color_format` at `width`×`height`.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            tracing::error!(%error, "uncaptured wgpu error");
        }));

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism draw uniforms"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism texture"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("prism pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism linear sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = upload_rgba8(&device, &queue, &texture_layout, &sampler, 1, 1, &[255; 4]);
        let zero_uv = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("prism zero uv"),
            contents: bytemuck::cast_slice(&[0.0f32; 2]),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = aligned_stride(UNIFORM_SIZE, alignment);
        let uniform_capacity = 64;
        let (uniform_buffer, uniform_bind_group) =
            create_uniform_ring(&device, &uniform_layout, uniform_stride, uniform_capacity);
        let depth_view = create_depth_view(&device, width, height);

        Self {
            device,
            queue,
            color_format,
            depth_view,
            pipeline_layout,
            texture_layout,
            uniform_layout,
            sampler,
            white,
            zero_uv,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_capacity,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            next_handle: 1,
            state: BindState::default(),
            clear_color: wgpu::Color::BLACK,
            draws: Vec::new(),
            frame_uniforms: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Match the depth attachment to a new framebuffer size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Number of draws recorded since the last clear.
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Drop the draws recorded for a frame that will not be presented.
    pub fn discard_frame(&mut self) {
        self.draws.clear();
        self.frame_uniforms.clear();
    }

    /// Encode the recorded frame into `target` and submit it.
    pub fn present(&mut self, target: &wgpu::TextureView) {
        let draws = std::mem::take(&mut self.draws);
        let blocks = std::mem::take(&mut self.frame_uniforms);
        self.upload_uniforms(&blocks);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism frame encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism frame"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &draws {
                // Resources deleted after the draw was recorded drop the draw.
                let entry = self.programs.get(&draw.program);
                let Some(pipeline) = entry.and_then(|p| p.pipelines.get(&draw.key)) else {
                    continue;
                };
                let Some(vertices) = self.buffers.get(&draw.vertices) else {
                    continue;
                };
                let uvs = match draw.uvs {
                    Some(id) => match self.buffers.get(&id) {
                        Some(b) => &b.buffer,
                        None => continue,
                    },
                    None => &self.zero_uv,
                };
                let texture = draw
                    .texture
                    .and_then(|t| self.textures.get(&t))
                    .map_or(&self.white.bind_group, |t| &t.bind_group);
                let offset =
                    (draw.uniform_slot as u64 * self.uniform_stride) as wgpu::DynamicOffset;

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                pass.set_bind_group(1, texture, &[]);
                pass.set_vertex_buffer(0, vertices.buffer.slice(..));
                pass.set_vertex_buffer(1, uvs.slice(..));
                match draw.kind {
                    DrawKind::Arrays(count) => pass.draw(0..count, 0..1),
                    DrawKind::Indexed { indices, count } => {
                        let Some(indices) = self.buffers.get(&indices) else {
                            continue;
                        };
                        pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..count, 0, 0..1);
                    }
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn handle(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn upload_uniforms(&mut self, blocks: &[DrawUniforms]) {
        if blocks.is_empty() {
            return;
        }
        let needed = blocks.len() as u64;
        if needed > self.uniform_capacity {
            let capacity = needed.next_power_of_two();
            let (buffer, bind_group) = create_uniform_ring(
                &self.device,
                &self.uniform_layout,
                self.uniform_stride,
                capacity,
            );
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            self.uniform_capacity = capacity;
            tracing::debug!(capacity, "grew draw uniform buffer");
        }
        let bytes = pack_uniforms(blocks, self.uniform_stride);
        self.queue.write_buffer(&self.uniform_buffer, 0, &bytes);
    }

    fn record_draw(&mut self, kind: DrawKind) -> Result<(), BackendError> {
        let program = self.state.program.ok_or(BackendError::NoProgram)?;
        let Some((vertices, vertex_components)) = self.state.attribute(ATTRIB_VERTEX) else {
            return Err(BackendError::Device(
                "draw without an enabled vertex attribute".into(),
            ));
        };
        let uvs = self.state.attribute(ATTRIB_UV);
        let key = PipelineKey {
            depth_test: self.state.depth_test,
            vertex_components,
            uv_components: uvs.map(|(_, components)| components),
        };
        self.ensure_pipeline(program, key)
            .map_err(BackendError::Device)?;

        let uniform_slot = self.frame_uniforms.len() as u32;
        self.frame_uniforms.push(self.state.uniforms);
        self.draws.push(DrawCommand {
            program,
            key,
            uniform_slot,
            texture: self.state.texture,
            vertices,
            uvs: uvs.map(|(buffer, _)| buffer),
            kind,
        });
        Ok(())
    }

    /// Look up a compiled stage for linking, checking its kind and entry point.
    fn linkable_stage(
        &self,
        id: ShaderId,
        expected: ShaderStage,
    ) -> Result<Arc<wgpu::ShaderModule>, BackendError> {
        let Some(shader) = self.shaders.get(&id) else {
            return Err(BackendError::UnknownHandle {
                kind: "shader",
                id: id.0,
            });
        };
        if shader.stage != expected {
            return Err(BackendError::Link(format!(
                "shader {id} is a {} stage, expected {expected}",
                shader.stage
            )));
        }
        if !shader.has_entry_point {
            let entry = match expected {
                ShaderStage::Vertex => VERTEX_ENTRY,
                ShaderStage::Fragment => FRAGMENT_ENTRY,
            };
            return Err(BackendError::Link(format!(
                "{expected} stage has no `{entry}` entry point"
            )));
        }
        Ok(Arc::clone(&shader.module))
    }

    fn expect_buffer(&self, buffer: BufferId, target: BufferTarget) -> Result<(), BackendError> {
        match self.buffers.get(&buffer) {
            Some(gpu) if gpu.target == target => Ok(()),
            Some(_) => Err(BackendError::Device(format!(
                "buffer {buffer} is not a {} buffer",
                match target {
                    BufferTarget::Array => "vertex",
                    BufferTarget::ElementArray => "index",
                }
            ))),
            None => Err(BackendError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            }),
        }
    }

    fn ensure_pipeline(&mut self, program: ProgramId, key: PipelineKey) -> Result<(), String> {
        let Some(entry) = self.programs.get(&program) else {
            return Err(unknown_program(program).to_string());
        };
        if entry.pipelines.contains_key(&key) {
            return Ok(());
        }
        let pipeline = self.build_pipeline(&entry.vertex, &entry.fragment, key)?;
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.pipelines.insert(key, pipeline);
        }
        Ok(())
    }

    /// Build a pipeline inside a validation scope; the error text comes back
    /// on failure.
    fn build_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        key: PipelineKey,
    ) -> Result<wgpu::RenderPipeline, String> {
        let vertex_format = float_format(key.vertex_components)
            .ok_or_else(|| format!("unsupported vertex size {}", key.vertex_components))?;
        let (uv_format, uv_stride, uv_step) = match key.uv_components {
            Some(n) => (
                float_format(n).ok_or_else(|| format!("unsupported uv size {n}"))?,
                n as u64 * 4,
                wgpu::VertexStepMode::Vertex,
            ),
            None => (wgpu::VertexFormat::Float32x2, 8, wgpu::VertexStepMode::Instance),
        };
        let vertex_attributes = [wgpu::VertexAttribute {
            format: vertex_format,
            offset: 0,
            shader_location: ATTRIB_VERTEX,
        }];
        let uv_attributes = [wgpu::VertexAttribute {
            format: uv_format,
            offset: 0,
            shader_location: ATTRIB_UV,
        }];
        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: key.vertex_components as u64 * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attributes,
            },
            wgpu::VertexBufferLayout {
                array_stride: uv_stride,
                step_mode: uv_step,
                attributes: &uv_attributes,
            },
        ];

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("prism program pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: key.depth_test,
                depth_compare: if key.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(pipeline),
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn enable(&mut self, capability: Capability) {
        if capability == Capability::DepthTest {
            self.state.depth_test = true;
        }
    }

    fn disable(&mut self, capability: Capability) {
        if capability == Capability::DepthTest {
            self.state.depth_test = false;
        }
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
        self.discard_frame();
    }

    fn create_buffer(
        &mut self,
        target: BufferTarget,
        data: &[u8],
    ) -> Result<BufferId, BackendError> {
        let usage = match target {
            BufferTarget::Array => wgpu::BufferUsages::VERTEX,
            BufferTarget::ElementArray => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("prism mesh buffer"),
            contents: data,
            usage,
        });
        let id = BufferId(self.handle());
        self.buffers.insert(id, GpuBuffer { buffer, target });
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(gpu) = self.buffers.remove(&buffer) {
            gpu.buffer.destroy();
        }
    }

    fn create_texture_rgba8(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, BackendError> {
        if width == 0 || height == 0 || pixels.len() as u64 != width as u64 * height as u64 * 4 {
            return Err(BackendError::Device(format!(
                "{} bytes do not fill a {width}x{height} RGBA8 texture",
                pixels.len()
            )));
        }
        let texture = upload_rgba8(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            width,
            height,
            pixels,
        );
        let id = TextureId(self.handle());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        if self.state.texture == Some(texture) {
            self.state.texture = None;
        }
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderId, BackendError> {
        if source.trim().is_empty() {
            return Err(BackendError::Compile {
                stage,
                log: "empty shader source".into(),
            });
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "prism vertex stage",
                ShaderStage::Fragment => "prism fragment stage",
            }),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::Compile {
                stage,
                log: error.to_string(),
            });
        }
        let id = ShaderId(self.handle());
        self.shaders.insert(
            id,
            GpuShader {
                stage,
                module: Arc::new(module),
                has_entry_point: declares_entry_point(stage, source),
            },
        );
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn link_program(
        &mut self,
        vertex: ShaderId,
        fragment: ShaderId,
        attributes: &[(u32, &str)],
    ) -> Result<ProgramId, BackendError> {
        let vertex = self.linkable_stage(vertex, ShaderStage::Vertex)?;
        let fragment = self.linkable_stage(fragment, ShaderStage::Fragment)?;
        for (location, name) in attributes {
            tracing::trace!(location, name, "attribute binding");
        }

        let id = ProgramId(self.handle());
        self.programs.insert(
            id,
            GpuProgram {
                vertex,
                fragment,
                pipelines: HashMap::new(),
            },
        );
        Ok(id)
    }

    fn validate_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        if !self.programs.contains_key(&program) {
            return Err(unknown_program(program));
        }
        self.ensure_pipeline(program, PipelineKey::VALIDATION)
            .map_err(BackendError::Validate)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        if !self.programs.contains_key(&program) {
            return Err(unknown_program(program));
        }
        self.state.program = Some(program);
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BackendError> {
        if self.state.program.is_none() {
            return Err(BackendError::NoProgram);
        }
        if !self.state.uniforms.apply(name, value) {
            tracing::trace!(name, "ignored uniform");
        }
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) -> Result<(), BackendError> {
        if let Some(t) = texture.filter(|t| !self.textures.contains_key(t)) {
            return Err(BackendError::UnknownHandle {
                kind: "texture",
                id: t.0,
            });
        }
        // The program interface exposes one texture unit.
        if unit == 0 {
            self.state.texture = texture;
        }
        Ok(())
    }

    fn enable_attribute(&mut self, location: u32) {
        if let Some(slot) = self.state.enabled.get_mut(location as usize) {
            *slot = true;
        }
    }

    fn disable_attribute(&mut self, location: u32) {
        if let Some(slot) = self.state.enabled.get_mut(location as usize) {
            *slot = false;
        }
    }

    fn bind_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        components: u32,
    ) -> Result<(), BackendError> {
        self.expect_buffer(buffer, BufferTarget::Array)?;
        let Some(slot) = self.state.attributes.get_mut(location as usize) else {
            return Err(BackendError::Device(format!(
                "attribute location {location} out of range"
            )));
        };
        *slot = Some((buffer, components));
        Ok(())
    }

    fn draw_arrays(&mut self, vertex_count: u32) -> Result<(), BackendError> {
        self.record_draw(DrawKind::Arrays(vertex_count))
    }

    fn draw_indexed(&mut self, indices: BufferId, index_count: u32) -> Result<(), BackendError> {
        self.expect_buffer(indices, BufferTarget::ElementArray)?;
        self.record_draw(DrawKind::Indexed {
            indices,
            count: index_count,
        })
    }

    fn unbind_buffers(&mut self) {
        self.state.attributes = [None; 2];
    }
}

fn unknown_program(program: ProgramId) -> BackendError {
    BackendError::UnknownHandle {
        kind: "program",
        id: program.0,
    }
}

fn float_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// Lay each block out at its own `stride`-aligned slot.
fn pack_uniforms(blocks: &[DrawUniforms], stride: u64) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; blocks.len() * stride];
    for (slot, block) in bytes.chunks_exact_mut(stride).zip(blocks) {
        slot[..UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(block));
    }
    bytes
}

fn declares_entry_point(stage: ShaderStage, source: &str) -> bool {
    let (attribute, entry) = match stage {
        ShaderStage::Vertex => ("@vertex", VERTEX_ENTRY),
        ShaderStage::Fragment => ("@fragment", FRAGMENT_ENTRY),
    };
    source.contains(attribute) && source.contains(&format!("fn {entry}"))
}

fn create_uniform_ring(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("prism draw uniforms"),
        size: stride * capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("prism draw uniforms"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(UNIFORM_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("prism depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("prism texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("prism texture"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    GpuTexture {
        _texture: texture,
        bind_group,
    }
}

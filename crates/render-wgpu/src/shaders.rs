//! Default WGSL program for [`WgpuBackend`](crate::WgpuBackend).
//!
//! Programs linked by the backend follow a fixed interface:
//! - vertex entry `vs_main`, fragment entry `fs_main`;
//! - `@location(0)` the vertex position, `@location(1)` the UV;
//! - group 0 binding 0: the per-draw uniform block below (dynamic offset);
//! - group 1: `texture_2d<f32>` at binding 0 and its sampler at binding 1.
//!
//! `color` arrives in 0..255 per channel, as the renderer uploads it.

/// Uniform block shared by both stages.
pub const DRAW_UNIFORMS: &str = r#"
struct DrawUniforms {
    projection: mat4x4<f32>,
    color: vec4<f32>,
    has_sampler: i32,
    sampler_unit: i32,
};

@group(0) @binding(0)
var<uniform> draw: DrawUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};
"#;

const VERTEX_BODY: &str = r#"
@vertex
fn vs_main(@location(0) vertex: vec4<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = draw.projection * vertex;
    out.uv = uv;
    return out;
}
"#;

const FRAGMENT_BODY: &str = r#"
@group(1) @binding(0)
var base_texture: texture_2d<f32>;
@group(1) @binding(1)
var base_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let sampled = textureSample(base_texture, base_sampler, in.uv);
    let flat = vec4<f32>(draw.color.rgb / 255.0, 1.0);
    return select(flat, sampled, draw.has_sampler != 0);
}
"#;

/// Vertex stage: transforms by `projection` and forwards the UV.
pub fn default_vertex() -> String {
    format!("{DRAW_UNIFORMS}{VERTEX_BODY}")
}

/// Fragment stage: samples the bound texture or falls back to the flat color.
pub fn default_fragment() -> String {
    format!("{DRAW_UNIFORMS}{FRAGMENT_BODY}")
}

/// The default program as an asset the renderer can be handed directly.
pub fn default_shader() -> prism_assets::Shader {
    prism_assets::Shader::new(default_vertex(), default_fragment())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_carry_their_entry_points() {
        assert!(default_vertex().contains("fn vs_main"));
        assert!(default_fragment().contains("fn fs_main"));
        assert!(!default_vertex().contains("fn fs_main"));
    }

    #[test]
    fn both_stages_declare_the_uniform_block() {
        for source in [default_vertex(), default_fragment()] {
            assert!(source.contains("var<uniform> draw: DrawUniforms"));
        }
    }

    #[test]
    fn default_shader_wraps_both_stages() {
        let shader = default_shader();
        assert_eq!(shader.vertex_source(), default_vertex());
        assert_eq!(shader.fragment_source(), default_fragment());
    }
}

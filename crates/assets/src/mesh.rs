use crate::error::AssetError;
use crate::texture::Texture2D;
use prism_common::{Color, ResourceId};
use prism_ecs::Component;
use std::sync::Arc;

/// CPU-side geometry attached to a game object.
///
/// Vertices are flat floats with `vertex_size` components each; UVs, when
/// present, carry one `uv_size`-wide entry per vertex. Indices describe a
/// triangle list. The mesh has no GPU identity of its own: renderers cache
/// uploaded buffers under [`Mesh::id`], so geometry is fixed at construction.
#[derive(Debug)]
pub struct Mesh {
    id: ResourceId,
    vertices: Vec<f32>,
    vertex_size: usize,
    uvs: Option<Vec<f32>>,
    uv_size: usize,
    indices: Option<Vec<u32>>,
    texture: Option<Arc<Texture2D>>,
    color: Option<Color>,
}

impl Mesh {
    /// UV width until [`Mesh::with_uvs`] says otherwise.
    pub const DEFAULT_UV_SIZE: usize = 2;

    /// Wrap flat vertex floats, `vertex_size` (1 to 4) per vertex.
    pub fn new(vertices: Vec<f32>, vertex_size: usize) -> Result<Self, AssetError> {
        if !(1..=4).contains(&vertex_size) {
            return Err(AssetError::invalid(format!(
                "vertex size must be 1..=4, got {vertex_size}"
            )));
        }
        if vertices.len() % vertex_size != 0 {
            return Err(AssetError::invalid(format!(
                "{} vertex floats is not a multiple of vertex size {vertex_size}",
                vertices.len()
            )));
        }
        Ok(Self {
            id: ResourceId::next(),
            vertices,
            vertex_size,
            uvs: None,
            uv_size: Self::DEFAULT_UV_SIZE,
            indices: None,
            texture: None,
            color: None,
        })
    }

    /// Attach texture coordinates, one `uv_size`-wide entry per vertex.
    pub fn with_uvs(mut self, uvs: Vec<f32>, uv_size: usize) -> Result<Self, AssetError> {
        if !(1..=4).contains(&uv_size) || uvs.len() % uv_size != 0 {
            return Err(AssetError::invalid(format!(
                "{} uv floats do not form entries of size {uv_size}",
                uvs.len()
            )));
        }
        if uvs.len() / uv_size != self.vertex_count() {
            return Err(AssetError::invalid(format!(
                "{} uv entries for {} vertices",
                uvs.len() / uv_size,
                self.vertex_count()
            )));
        }
        self.uvs = Some(uvs);
        self.uv_size = uv_size;
        Ok(self)
    }

    /// Attach a triangle-list index buffer.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self, AssetError> {
        if indices.len() % 3 != 0 {
            return Err(AssetError::invalid(format!(
                "{} indices do not form whole triangles",
                indices.len()
            )));
        }
        let count = self.vertex_count();
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= count) {
            return Err(AssetError::invalid(format!(
                "index {bad} out of range for {count} vertices"
            )));
        }
        self.indices = Some(indices);
        Ok(self)
    }

    /// Builder-style [`Mesh::set_texture`].
    pub fn with_texture(mut self, texture: Arc<Texture2D>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Builder-style [`Mesh::set_color`].
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Identity renderers cache this mesh's GPU buffers under.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Flat vertex positions.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Components per vertex.
    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    /// Whole vertices in [`Mesh::vertices`].
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.vertex_size
    }

    /// Flat texture coordinates, if attached.
    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    /// Components per UV entry.
    pub fn uv_size(&self) -> usize {
        self.uv_size
    }

    /// Triangle-list indices, if attached.
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Texture sampled when drawing, if any.
    pub fn texture(&self) -> Option<&Arc<Texture2D>> {
        self.texture.as_ref()
    }

    /// Attach or clear the texture. Takes effect on the next draw.
    pub fn set_texture(&mut self, texture: Option<Arc<Texture2D>>) {
        self.texture = texture;
    }

    /// Flat color used when the mesh has no texture.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Attach or clear the flat color.
    pub fn set_color(&mut self, color: Option<Color>) {
        self.color = color;
    }
}

impl Component for Mesh {}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::new(
            vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
            3,
        )
        .unwrap()
    }

    #[test]
    fn vertex_count_follows_stride() {
        assert_eq!(quad().vertex_count(), 4);
        let flat = Mesh::new(vec![0.0; 6], 2).unwrap();
        assert_eq!(flat.vertex_count(), 3);
    }

    #[test]
    fn rejects_ragged_vertices() {
        assert!(matches!(
            Mesh::new(vec![0.0; 7], 3),
            Err(AssetError::InvalidData(_))
        ));
        assert!(Mesh::new(vec![0.0; 5], 5).is_err());
        assert!(Mesh::new(Vec::new(), 0).is_err());
    }

    #[test]
    fn uvs_must_match_vertex_count() {
        assert!(quad().with_uvs(vec![0.0; 6], 2).is_err());
        let mesh = quad().with_uvs(vec![0.0; 8], 2).unwrap();
        assert_eq!(mesh.uvs().map(<[f32]>::len), Some(8));
        assert_eq!(mesh.uv_size(), 2);
    }

    #[test]
    fn indices_must_be_in_range_triangles() {
        assert!(quad().with_indices(vec![0, 1, 2, 2, 3, 4]).is_err());
        assert!(quad().with_indices(vec![0, 1]).is_err());
        let mesh = quad().with_indices(vec![0, 1, 2, 2, 3, 0]).unwrap();
        assert_eq!(mesh.indices().map(<[u32]>::len), Some(6));
    }

    #[test]
    fn texture_and_color_are_optional() {
        let texture = Arc::new(Texture2D::solid(1, 1, [255; 4]).unwrap());
        let mesh = quad()
            .with_texture(texture.clone())
            .with_color(Color::rgb(1, 2, 3));
        assert!(Arc::ptr_eq(mesh.texture().unwrap(), &texture));
        assert_eq!(mesh.color(), Some(Color::rgb(1, 2, 3)));
        assert!(quad().texture().is_none());
    }

    #[test]
    fn mesh_is_a_component() {
        let mut object = prism_ecs::GameObject::new("quad");
        object.add(quad());
        assert_eq!(object.get::<Mesh>().unwrap().vertex_count(), 4);
    }
}

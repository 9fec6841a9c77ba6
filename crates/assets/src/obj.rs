use crate::error::AssetError;
use crate::mesh::Mesh;
use std::path::Path;

/// Load every model in a Wavefront OBJ file as a triangulated, single-index
/// mesh. Materials are ignored.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<Mesh>, AssetError> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options)?;

    let mut meshes = Vec::with_capacity(models.len());
    for model in models {
        let data = model.mesh;
        let mut mesh = Mesh::new(data.positions, 3)?;
        if !data.texcoords.is_empty() {
            mesh = mesh.with_uvs(data.texcoords, 2)?;
        }
        if !data.indices.is_empty() {
            mesh = mesh.with_indices(data.indices)?;
        }
        tracing::debug!(
            model = %model.name,
            vertices = mesh.vertex_count(),
            "obj model loaded"
        );
        meshes.push(mesh);
    }
    Ok(meshes)
}

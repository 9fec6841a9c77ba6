use glam::Vec3;
use prism_assets::{AssetError, Mesh, Texture2D};
use prism_common::ResourceId;
use std::sync::Arc;

/// One side of the skybox cube, named by the axis it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl Face {
    /// Face order used by [`Skybox::new`] and the draw pass.
    pub const ALL: [Face; 6] = [
        Face::PositiveX,
        Face::NegativeX,
        Face::PositiveY,
        Face::NegativeY,
        Face::PositiveZ,
        Face::NegativeZ,
    ];

    /// Outward normal plus the right and up directions of the face as seen
    /// from the cube's center.
    fn basis(self) -> (Vec3, Vec3, Vec3) {
        match self {
            Face::PositiveX => (Vec3::X, Vec3::Z, Vec3::Y),
            Face::NegativeX => (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
            Face::PositiveY => (Vec3::Y, Vec3::X, Vec3::Z),
            Face::NegativeY => (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
            Face::PositiveZ => (Vec3::Z, Vec3::NEG_X, Vec3::Y),
            Face::NegativeZ => (Vec3::NEG_Z, Vec3::X, Vec3::Y),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Six face textures drawn as a camera-centered cube behind everything else.
#[derive(Debug)]
pub struct Skybox {
    id: ResourceId,
    faces: [Arc<Texture2D>; 6],
}

impl Skybox {
    /// `faces` follow [`Face::ALL`]: +X, -X, +Y, -Y, +Z, -Z.
    pub fn new(faces: [Arc<Texture2D>; 6]) -> Self {
        Self {
            id: ResourceId::next(),
            faces,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn face(&self, face: Face) -> &Arc<Texture2D> {
        &self.faces[face.index()]
    }

    /// Build the six textured quads of a cube with corners at `±scale`.
    pub fn face_meshes(&self, scale: f32) -> Result<Vec<Mesh>, AssetError> {
        Face::ALL
            .iter()
            .map(|&face| {
                let (normal, right, up) = face.basis();
                let corners = [
                    normal - right - up,
                    normal + right - up,
                    normal + right + up,
                    normal - right + up,
                ];
                let vertices = corners
                    .iter()
                    .flat_map(|c| (*c * scale).to_array())
                    .collect();
                // Texture rows run top to bottom.
                let uvs = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
                Ok(Mesh::new(vertices, 3)?
                    .with_uvs(uvs, 2)?
                    .with_indices(vec![0, 1, 2, 2, 3, 0])?
                    .with_texture(Arc::clone(self.face(face))))
            })
            .collect()
    }
}

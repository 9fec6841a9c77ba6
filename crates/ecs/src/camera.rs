use crate::component::Component;
use glam::{Mat4, Vec3};
use prism_common::Transform;
use serde::{Deserialize, Serialize};

/// Projection parameters. Perspective `fov` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Orthographic {
        width: f32,
        height: f32,
        far: f32,
    },
    Perspective {
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Orthographic { width, height, far } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                Mat4::orthographic_rh(-hw, hw, -hh, hh, -far, far)
            }
            Projection::Perspective {
                fov,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov.to_radians(), aspect, near, far),
        }
    }
}

/// Camera component. The projection matrix is recomputed eagerly whenever a
/// defining field changes.
///
/// The camera's view comes from the [`Transform`] of the game object it is
/// attached to, passed in by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Projection,
    matrix: Mat4,
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        Self {
            matrix: projection.matrix(),
            projection,
        }
    }

    /// Centered box `width` by `height`, spanning `-far..far` in depth.
    pub fn orthographic(width: f32, height: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic { width, height, far })
    }

    /// Vertical `fov` in degrees.
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective {
            fov,
            aspect,
            near,
            far,
        })
    }

    /// The parameters the matrix was last computed from.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.recalculate();
    }

    /// The projection matrix alone.
    pub fn projection_matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Projection × view, where the view is the inverse of `transform`.
    pub fn view_projection(&self, transform: &Transform) -> Mat4 {
        let view =
            Mat4::from_rotation_translation(transform.rotation, transform.position).inverse();
        self.matrix * view
    }

    /// Projection × rotation-only view. Used for backgrounds that must not
    /// translate with the camera.
    pub fn rotation_projection(&self, transform: &Transform) -> Mat4 {
        self.matrix * Mat4::from_quat(transform.rotation.conjugate())
    }

    /// Near clip distance. `None` for orthographic cameras.
    pub fn near(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { near, .. } => Some(near),
            Projection::Orthographic { .. } => None,
        }
    }

    pub fn far(&self) -> f32 {
        match self.projection {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }

    /// Follow a viewport resize: orthographic cameras take the new extent,
    /// perspective cameras the new aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        match &mut self.projection {
            Projection::Orthographic {
                width: w,
                height: h,
                ..
            } => {
                *w = width as f32;
                *h = height as f32;
            }
            Projection::Perspective { aspect, .. } => {
                *aspect = width as f32 / height.max(1) as f32;
            }
        }
        self.recalculate();
    }

    /// Sets the far plane of either variant.
    pub fn set_far(&mut self, value: f32) {
        match &mut self.projection {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => {
                *far = value
            }
        }
        self.recalculate();
    }

    /// No-op for orthographic cameras.
    pub fn set_near(&mut self, value: f32) {
        if let Projection::Perspective { near, .. } = &mut self.projection {
            *near = value;
            self.recalculate();
        }
    }

    /// No-op for orthographic cameras.
    pub fn set_fov(&mut self, value: f32) {
        if let Projection::Perspective { fov, .. } = &mut self.projection {
            *fov = value;
            self.recalculate();
        }
    }

    /// No-op for orthographic cameras.
    pub fn set_aspect(&mut self, value: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = value;
            self.recalculate();
        }
    }

    /// No-op for perspective cameras.
    pub fn set_width(&mut self, value: f32) {
        if let Projection::Orthographic { width, .. } = &mut self.projection {
            *width = value;
            self.recalculate();
        }
    }

    /// No-op for perspective cameras.
    pub fn set_height(&mut self, value: f32) {
        if let Projection::Orthographic { height, .. } = &mut self.projection {
            *height = value;
            self.recalculate();
        }
    }

    fn recalculate(&mut self) {
        self.matrix = self.projection.matrix();
    }

    /// Project a camera-local point into normalized device coordinates.
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.matrix.project_point3(point)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Component for Camera {}

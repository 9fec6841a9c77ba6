use crate::error::AssetError;
use prism_common::ResourceId;
use std::fmt;
use std::path::Path;

/// An RGBA8 image held in memory.
///
/// Each instance gets a fresh [`ResourceId`]; renderers key their GPU texture
/// cache by it, so the pixel data is treated as immutable once drawn.
pub struct Texture2D {
    id: ResourceId,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Texture2D {
    /// Wrap raw RGBA8 pixels, rows top to bottom.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, AssetError> {
        if width == 0 || height == 0 {
            return Err(AssetError::invalid(format!(
                "texture dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(AssetError::invalid(format!(
                "{width}x{height} RGBA texture needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            id: ResourceId::next(),
            width,
            height,
            rgba,
        })
    }

    /// A texture filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, AssetError> {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::new(width, height, pixels)
    }

    /// Decode an encoded image (PNG or JPEG) and convert it to RGBA8.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;
        let texture = Self::from_image_bytes(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            width = texture.width,
            height = texture.height,
            "texture loaded"
        );
        Ok(texture)
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }
}

impl fmt::Debug for Texture2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture2D")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

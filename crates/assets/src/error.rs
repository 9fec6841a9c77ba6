use std::path::PathBuf;

/// Errors from building or loading CPU-side resources.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}

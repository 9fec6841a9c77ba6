use prism_common::WrongThread;
use prism_render::{BackendError, RenderError};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error(transparent)]
    WrongThread(#[from] WrongThread),
    #[error("window thread did not signal readiness within {0:?}")]
    StartupTimeout(Duration),
    #[error("window startup failed: {0}")]
    StartupFailed(String),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("graphics backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("invalid window config: {0}")]
    Config(String),
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("window thread panicked")]
    Panicked,
}

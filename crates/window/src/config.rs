use crate::error::WindowError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Window creation and loop parameters.
///
/// Every field has a default, so a YAML file only needs the keys it changes:
///
/// ```yaml
/// title: demo
/// width: 1280
/// height: 720
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub vsync: bool,
    /// Fixed tick period; 20 ms is 50 Hz.
    pub tick_interval_ms: u64,
    /// How long `Window::new` waits for the window thread to come up.
    pub startup_timeout_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "prism".into(),
            width: 800,
            height: 600,
            resizable: true,
            vsync: true,
            tick_interval_ms: 20,
            startup_timeout_ms: 5000,
        }
    }
}

impl WindowConfig {
    /// Defaults with the given title and size.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse YAML; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, WindowError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WindowError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Reject zero sizes and a zero tick interval.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.width == 0 || self.height == 0 {
            return Err(WindowError::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(WindowError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_tick_at_50hz() {
        let config = WindowConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "title: demo\nwidth: 1280\nheight: 720\n";
        let config = WindowConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.title, "demo");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.startup_timeout_ms, 5000);
        assert!(config.vsync);
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = WindowConfig::from_yaml_str("width: 0").unwrap_err();
        assert!(matches!(err, WindowError::Config(_)));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = WindowConfig::from_yaml_str("width: [").unwrap_err();
        assert!(matches!(err, WindowError::Yaml(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.yaml");
        std::fs::write(&path, "tick_interval_ms: 10\nvsync: false\n").unwrap();
        let config = WindowConfig::load(&path).unwrap();
        assert_eq!(config.tick_interval_ms, 10);
        assert!(!config.vsync);
    }

    #[test]
    fn yaml_round_trip() {
        let config = WindowConfig::new("round", 320, 200);
        let text = serde_yaml::to_string(&config).unwrap();
        assert_eq!(WindowConfig::from_yaml_str(&text).unwrap(), config);
    }
}

use crate::driver::PictureFormat;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    pub camera: CameraConfig,
    pub session: ControllerConfig,
    pub ui: UiConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Camera device index to open
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Still picture format committed on every configure (JPEG, NV21, YUY2)
    #[serde(default)]
    pub picture_format: PictureFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Pending commands buffered in front of the session task
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,

    /// Whether the host is in the foreground when the controller is created
    #[serde(default = "default_host_starts_active")]
    pub host_starts_active: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UiConfig {
    /// UI message bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Log every published UI message at debug level
    #[serde(default)]
    pub debug_logging: bool,
}

/// Timing and results of the simulated camera used by the demo binary
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulatorConfig {
    #[serde(default = "default_focus_latency_ms")]
    pub focus_latency_ms: u64,

    #[serde(default = "default_shutter_latency_ms")]
    pub shutter_latency_ms: u64,

    #[serde(default = "default_picture_latency_ms")]
    pub picture_latency_ms: u64,

    #[serde(default = "default_focus_succeeds")]
    pub focus_succeeds: bool,

    /// Size of each simulated picture; 0 simulates a capture with no data
    #[serde(default = "default_picture_bytes")]
    pub picture_bytes: usize,

    /// Preview size reported by the simulated device (width, height)
    #[serde(default = "default_preview_size")]
    pub preview_size: (u32, u32),
}

impl SessionConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camsession.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index() as i64)?
            .set_default("camera.picture_format", PictureFormat::default().to_string())?
            .set_default(
                "session.command_queue_capacity",
                default_command_queue_capacity() as i64,
            )?
            .set_default("session.host_starts_active", default_host_starts_active())?
            .set_default("ui.event_bus_capacity", default_event_bus_capacity() as i64)?
            .set_default("ui.debug_logging", false)?
            .set_default("simulator.focus_latency_ms", default_focus_latency_ms() as i64)?
            .set_default("simulator.shutter_latency_ms", default_shutter_latency_ms() as i64)?
            .set_default("simulator.picture_latency_ms", default_picture_latency_ms() as i64)?
            .set_default("simulator.focus_succeeds", default_focus_succeeds())?
            .set_default("simulator.picture_bytes", default_picture_bytes() as i64)?
            .set_default(
                "simulator.preview_size",
                vec![default_preview_size().0 as i64, default_preview_size().1 as i64],
            )?
            .add_source(File::with_name(&path_str).required(false))
            // CAMSESSION_CAMERA__PICTURE_FORMAT=NV21 style overrides
            .add_source(
                Environment::with_prefix("CAMSESSION")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: SessionConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.command_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Command queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.ui.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "UI event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.simulator.preview_size.0 == 0 || self.simulator.preview_size.1 == 0 {
            return Err(ConfigError::Message(
                "Simulator preview size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                picture_format: PictureFormat::default(),
            },
            session: ControllerConfig {
                command_queue_capacity: default_command_queue_capacity(),
                host_starts_active: default_host_starts_active(),
            },
            ui: UiConfig {
                event_bus_capacity: default_event_bus_capacity(),
                debug_logging: false,
            },
            simulator: SimulatorConfig {
                focus_latency_ms: default_focus_latency_ms(),
                shutter_latency_ms: default_shutter_latency_ms(),
                picture_latency_ms: default_picture_latency_ms(),
                focus_succeeds: default_focus_succeeds(),
                picture_bytes: default_picture_bytes(),
                preview_size: default_preview_size(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}

fn default_command_queue_capacity() -> usize {
    32
}
fn default_host_starts_active() -> bool {
    true
}

fn default_event_bus_capacity() -> usize {
    64
}

fn default_focus_latency_ms() -> u64 {
    150
}
fn default_shutter_latency_ms() -> u64 {
    50
}
fn default_picture_latency_ms() -> u64 {
    200
}
fn default_focus_succeeds() -> bool {
    true
}
fn default_picture_bytes() -> usize {
    4096
}
fn default_preview_size() -> (u32, u32) {
    (640, 480)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.picture_format, PictureFormat::Jpeg);
        assert!(config.session.host_starts_active);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SessionConfig::default();
        config.ui.event_bus_capacity = 0;
        assert!(config.validate().is_err());

        config.ui.event_bus_capacity = 16;
        config.session.command_queue_capacity = 0;
        assert!(config.validate().is_err());

        config.session.command_queue_capacity = 8;
        config.simulator.picture_bytes = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[camera]
index = 2
picture_format = "NV21"

[simulator]
focus_succeeds = false
preview_size = [320, 240]
"#
        )
        .unwrap();

        let config = SessionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.picture_format, PictureFormat::Nv21);
        assert!(!config.simulator.focus_succeeds);
        assert_eq!(config.simulator.preview_size, (320, 240));
        // Untouched sections fall back to defaults
        assert_eq!(config.simulator.focus_latency_ms, default_focus_latency_ms());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SessionConfig::load_from_file("/nonexistent/camsession").unwrap();
        assert_eq!(config.simulator, SessionConfig::default().simulator);
    }

    #[test]
    fn test_environment_variable_override() {
        env::set_var("CAMSESSION_UI__EVENT_BUS_CAPACITY", "128");

        let config = SessionConfig::load_from_file("/nonexistent/camsession").unwrap();
        assert_eq!(config.ui.event_bus_capacity, 128);

        env::remove_var("CAMSESSION_UI__EVENT_BUS_CAPACITY");
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = SessionConfig::default().to_toml().unwrap();
        assert!(rendered.contains("picture_format = \"JPEG\""));

        let parsed: SessionConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, SessionConfig::default());
    }
}

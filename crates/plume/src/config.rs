//! Configuration file for the `plume` binary.
//!
//! One TOML file with `[pipeline]`, `[paper]`, `[robot]`,
//! `[robot.registers]` and `[logging]` sections. Every key has a default,
//! so an empty file (or none at all) gives a working setup.

use std::fs;
use std::path::Path;
use std::time::Duration;

use plume_pipeline::{PaperConfig, PipelineConfig};
use plume_robot::{RegisterMap, SessionConfig, StreamConfig, dashboard, rtde};
use serde::{Deserialize, Serialize};

/// Errors loading or saving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub paper: PaperConfig,
    pub robot: RobotConfig,
    pub logging: LoggingConfig,
}

/// Where the robot is and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Controller address.
    pub host: String,
    /// Real-time data exchange port.
    pub rtde_port: u16,
    /// Dashboard server port.
    pub dashboard_port: u16,
    /// State update rate requested from the controller.
    pub frequency_hz: f64,
    /// Program loaded through the dashboard before streaming.
    pub program: String,
    /// Wait between starting the stream and loading the program.
    pub settle_delay_ms: u64,
    /// Send the first waypoint early while the robot reports a zero pose.
    pub prime_on_zero_pose: bool,
    pub registers: RegisterMap,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            rtde_port: rtde::DEFAULT_PORT,
            dashboard_port: dashboard::DEFAULT_PORT,
            frequency_hz: 125.0,
            program: "rtde_control_loop.urp".into(),
            settle_delay_ms: 2000,
            prime_on_zero_pose: true,
            registers: RegisterMap::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`].
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if a value has no TOML form.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Session settings for the robot section.
    #[must_use]
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            program: self.robot.program.clone(),
            settle_delay: Duration::from_millis(self.robot.settle_delay_ms),
            stream: StreamConfig {
                prime_on_zero_pose: self.robot.prime_on_zero_pose,
                park: self.paper.park,
            },
        }
    }
}

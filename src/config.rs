// Timeouts, topics, board connection and robot constants
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::board::units::{DEFAULT_WHEEL_BASE_WIDTH, DEFAULT_WHEEL_DIAMETER};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for the velocity watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Telemetry publish rate (every N loop ticks)
pub const TELEMETRY_DIVIDER: u64 = 5;

// Zenoh topics
pub const TOPIC_CMD: &str = "gopigo3/cmd"; // commands
pub const TOPIC_TELEMETRY: &str = "gopigo3/state/telemetry"; // encoders, battery
pub const TOPIC_HEALTH: &str = "gopigo3/state/health"; // health status

// Board connection
// USB-serial bridge to the GoPiGo3
pub const BOARD_PORT: &str = "/dev/ttyUSB0";

// Robot constants file
pub const DEFAULT_CONFIG_PATH: &str = "/home/pi/Dexter/gpg3_config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid robot constants in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Robot constants file {} does not hold a JSON object", .path.display())]
    NotAnObject { path: PathBuf },
}

/// Wheel geometry persisted between runs (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotConstants {
    #[serde(rename = "wheel-diameter")]
    pub wheel_diameter: f64,
    #[serde(rename = "wheel-base-width")]
    pub wheel_base_width: f64,
}

impl Default for RobotConstants {
    fn default() -> Self {
        Self {
            wheel_diameter: DEFAULT_WHEEL_DIAMETER,
            wheel_base_width: DEFAULT_WHEEL_BASE_WIDTH,
        }
    }
}

impl RobotConstants {
    /// Read constants from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let constants: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Loaded robot constants from {}: {:?}",
            path.display(),
            constants
        );
        Ok(constants)
    }

    /// Read constants, falling back to the defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No robot constants at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write the two constants into the JSON file, keeping any other keys it holds
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let parse_error = |source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };

        let mut document = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<Value>(&text).map_err(parse_error)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Value::Object(Map::new()),
            Err(e) => return Err(io_error(e)),
        };
        let Value::Object(entries) = &mut document else {
            return Err(ConfigError::NotAnObject {
                path: path.to_path_buf(),
            });
        };
        if let Value::Object(constants) = serde_json::to_value(self).map_err(parse_error)? {
            entries.extend(constants);
        }

        let text = serde_json::to_string(&document).map_err(parse_error)?;
        fs::write(path, text).map_err(io_error)?;
        info!("Saved robot constants to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gopigo3-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("constants");
        let constants = RobotConstants {
            wheel_diameter: 70.0,
            wheel_base_width: 120.5,
        };
        constants.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"wheel-diameter\""));
        assert!(text.contains("\"wheel-base-width\""));

        assert_eq!(RobotConstants::load(&path).unwrap(), constants);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_path("missing");
        assert_eq!(
            RobotConstants::load_or_default(&path).unwrap(),
            RobotConstants::default()
        );
        assert!(matches!(RobotConstants::load(&path), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let path = temp_path("merge");
        fs::write(
            &path,
            r#"{"wheel-diameter": 66.5, "wheel-base-width": 117.0, "ticks": 6}"#,
        )
        .unwrap();

        let constants = RobotConstants {
            wheel_diameter: 70.0,
            wheel_base_width: 120.0,
        };
        constants.save(&path).unwrap();

        let document: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document["ticks"], 6);
        assert_eq!(document["wheel-diameter"], 70.0);
        assert_eq!(document["wheel-base-width"], 120.0);
        assert_eq!(RobotConstants::load(&path).unwrap(), constants);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_refuses_non_object_file() {
        let path = temp_path("array");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            RobotConstants::default().save(&path),
            Err(ConfigError::NotAnObject { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2]");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_json_rejected() {
        let path = temp_path("bad");
        fs::write(&path, "{\"wheel-diameter\": 66.5}").unwrap();
        assert!(matches!(
            RobotConstants::load(&path),
            Err(ConfigError::Parse { .. })
        ));
        fs::remove_file(&path).unwrap();
    }
}

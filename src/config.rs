use crate::error::Result;
use crate::grade::battery::BatteryGradingCriteria;
use crate::grade::disk::DiskGradingCriteria;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level hwgrade configuration: the grading thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub battery: BatteryGradingCriteria,
    pub disk: DiskGradingCriteria,
}

impl GradingConfig {
    /// Every band must be ordered so that A is the strictest.
    pub fn validate(&self) -> Result<()> {
        self.battery.validate()?;
        self.disk.validate()
    }
}

const SYSTEM_CONFIG: &str = "/etc/hwgrade/config.toml";

fn read_value(path: &Path) -> Option<toml::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config");
            None
        }
    }
}

/// Load the system config file if it exists.
fn load_system() -> Option<toml::Value> {
    read_value(Path::new(SYSTEM_CONFIG))
}

/// Load the user config file (~/.config/hwgrade/config.toml) if it exists.
fn load_user() -> Option<toml::Value> {
    let dir = dirs::config_dir()?;
    read_value(&dir.join("hwgrade").join("config.toml"))
}

/// Recursively merge two TOML values. Tables are merged key-by-key;
/// all other types in `overlay` replace `base`.
fn merge_values(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Keep a config only if its bands are ordered.
fn checked(config: GradingConfig, origin: &str) -> GradingConfig {
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            tracing::warn!(origin, error = %e, "invalid grading thresholds, using defaults");
            GradingConfig::default()
        }
    }
}

/// Load config from a specific path, ignoring system/user files.
fn load_from_path(path: &Path) -> GradingConfig {
    let origin = path.display().to_string();
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => checked(config, &origin),
            Err(e) => {
                tracing::warn!(path = %origin, error = %e, "failed to parse config");
                GradingConfig::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %origin, error = %e, "failed to read config");
            GradingConfig::default()
        }
    }
}

/// Load the merged config: system defaults, then user overrides.
/// If `override_path` is provided, use only that file instead.
pub fn load(override_path: Option<&PathBuf>) -> GradingConfig {
    if let Some(path) = override_path {
        return load_from_path(path);
    }

    let merged = match (load_system(), load_user()) {
        (Some(s), Some(u)) => Some(merge_values(s, u)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    };

    match merged {
        Some(value) => match value.try_into() {
            Ok(config) => checked(config, "merged config"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to deserialize config");
                GradingConfig::default()
            }
        },
        None => GradingConfig::default(),
    }
}

//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the user
//! config directory, then `DEALERSHIP_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::store::KindResolution;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "dealership";

/// Prefix of environment variable overrides, e.g. `DEALERSHIP_INVENTORY_PATH`.
pub const ENV_PREFIX: &str = "DEALERSHIP";

const DEFAULT_CONFIG: &str = r#"# Dealership inventory configuration.
#
# Every key may also be set through an environment variable prefixed with
# DEALERSHIP_, e.g. DEALERSHIP_INVENTORY_PATH=/srv/inventory.json

# Canonical inventory document, rewritten after every change.
# inventory_path = "inventory.json"

# Destination of the export command. Must differ from inventory_path.
# export_path = "export.json"

# Directory receiving dealerctl.log.
# log_dir = "logs"

# How vehicle kinds are recovered when reading the inventory document:
#   "infer_from_model" derives the kind from the model name (default)
#   "trust_type_tag"   uses the stored vehicle_type tag when it is known
# kind_resolution = "infer_from_model"
"#;

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Canonical inventory document.
    pub inventory_path: PathBuf,
    /// Export document written by `export`.
    pub export_path: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// Kind resolution applied when reading inventory documents.
    pub kind_resolution: KindResolution,
}

impl Default for AppConfig {
    fn default() -> Self {
        let root = default_data_root();
        Self {
            inventory_path: root.join("inventory.json"),
            export_path: root.join("export.json"),
            log_dir: root.join("logs"),
            kind_resolution: KindResolution::default(),
        }
    }
}

impl AppConfig {
    /// Load using the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load with `path` as the config file; a missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(
                Config::try_from(&AppConfig::default())
                    .context("failed to build default configuration")?,
            )
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }
}

/// Platform config file location, e.g. `~/.config/dealership/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Platform data directory holding the inventory and export documents.
pub fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    write_default_config(&path)?;
    Ok(path)
}

/// Write the commented default config to `path` unless it already exists.
pub fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.kind_resolution, KindResolution::InferFromModel);
        assert!(config.inventory_path.ends_with("inventory.json"));
        assert_ne!(config.inventory_path, config.export_path);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
inventory_path = "/srv/dealers/inventory.json"
kind_resolution = "trust_type_tag"
"#,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(
            config.inventory_path,
            PathBuf::from("/srv/dealers/inventory.json")
        );
        assert_eq!(config.kind_resolution, KindResolution::TrustTypeTag);
        assert!(config.export_path.ends_with("export.json"));
        Ok(())
    }

    #[test]
    fn default_file_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");

        write_default_config(&path)?;
        assert!(fs::read_to_string(&path)?.contains("kind_resolution"));

        fs::write(&path, "log_dir = \"/tmp/dealer-logs\"\n")?;
        write_default_config(&path)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.log_dir, PathBuf::from("/tmp/dealer-logs"));
        Ok(())
    }
}

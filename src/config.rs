use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::fs_utils::{ensure_parent_dirs, get_home_dir};

/// Manifest describing where dotfiles live, where they go, and which app owns which file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub root: PathBuf,
    pub dest: PathBuf,
    #[serde(default)]
    pub apps: BTreeMap<String, AppSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    /// Filenames relative to `root`, linked in this order.
    #[serde(default)]
    pub files: Vec<String>,
    /// Per-file destination overrides; values may reference environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dest: BTreeMap<String, String>,
}

impl AppSpec {
    pub fn dest_override(&self, filename: &str) -> Option<&str> {
        self.dest.get(filename).map(String::as_str)
    }
}

impl Config {
    pub fn app(&self, name: &str) -> Option<&AppSpec> {
        self.apps.get(name)
    }

    pub fn app_names(&self) -> Vec<String> {
        self.apps.keys().cloned().collect()
    }

    /// Checks that `root` and `dest` are existing directories.
    ///
    /// Override entries for files the app does not list are only reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in [("root", &self.root), ("dest", &self.dest)] {
            if !path.is_dir() {
                return Err(ConfigError::MissingDirectory { field, path: path.clone() });
            }
        }

        for (name, app) in &self.apps {
            for filename in app.dest.keys() {
                if !app.files.contains(filename) {
                    warn!(app = %name, file = %filename, "destination override for unlisted file is ignored");
                }
            }
        }

        Ok(())
    }
}

pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home_dir = get_home_dir()?;
    Ok(home_dir.join(".dotfiles-linkerrc.yaml"))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Parses a config file without validating it. `.json` files are read as JSON, anything else as YAML.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

    let parsed = if is_json(path) {
        serde_json::from_str::<Config>(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str::<Config>(&content).map_err(|e| e.to_string())
    };

    let config = parsed.map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })?;
    debug!(path = %path.display(), apps = config.apps.len(), "loaded config");
    Ok(config)
}

/// Reads and validates the config file at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

pub fn write_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    ensure_parent_dirs(path)
        .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;

    let serialized = if is_json(path) {
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
    } else {
        serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
    };

    fs::write(path, serialized)
        .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
}

/// Writes a starter config with no apps.
pub fn initialize_config(path: &Path, root: &Path, dest: Option<&Path>) -> anyhow::Result<Config> {
    let dest = match dest {
        Some(dest) => dest.to_path_buf(),
        None => get_home_dir()?,
    };

    let config = Config { root: root.to_path_buf(), dest, apps: BTreeMap::new() };
    write_config(&config, path)?;
    Ok(config)
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::cli::OutputFormat;

const DEFAULT_ESTIMATE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub estimate_timeout_secs: Option<u64>,
    pub estimate: Option<bool>,
    pub catalog: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

impl Config {
    pub fn estimate_timeout(&self) -> Duration {
        Duration::from_secs(
            self.estimate_timeout_secs
                .unwrap_or(DEFAULT_ESTIMATE_TIMEOUT_SECS),
        )
    }

    pub fn estimate_enabled(&self) -> bool {
        self.estimate.unwrap_or(true)
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "costtree").map(|d| d.config_dir().join("config.toml"))
}

/// Load `path`, or `config.toml` in the user's config directory.
///
/// A missing file gives defaults. An invalid one is reported and ignored.
pub fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        return Config::default();
    };

    let Ok(data) = fs::read_to_string(&path) else {
        return Config::default();
    };

    match toml::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Invalid config at {}: {}", path.display(), e);
            Config::default()
        }
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime settings, read from an optional TOML file and overridden by CLI flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    pub database: String,
    /// Absolute prefix used when building redirect locations.
    pub site_url: String,
    pub cors_origin: Option<String>,
    /// Where accepted uploads are kept. Uploads land in a fresh temp dir when unset.
    pub upload_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            database: "geolayers.db".to_string(),
            site_url: "http://localhost:3000".to_string(),
            cors_origin: None,
            upload_dir: None,
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid settings file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when given, otherwise starts from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Location of the layer listing, e.g. `http://localhost:3000/layers/`.
    pub fn layers_url(&self) -> String {
        format!("{}/layers/", self.site_url.trim_end_matches('/'))
    }
}

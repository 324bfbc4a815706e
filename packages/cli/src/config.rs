use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vellum_dom::EngineConfig;

pub const DEFAULT_CONFIG_NAME: &str = "vellum.config.json";

/// Vellum configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Reconciliation engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Print every mutation record after each redraw
    #[serde(default)]
    pub show_records: bool,
}

impl Config {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

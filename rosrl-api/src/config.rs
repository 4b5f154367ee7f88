use anyhow::{Context, Result};
use rosrl_core::ddpg::DdpgConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Stdout,
    Csv,
}

/// A DDPG run as read from a JSON file: the loop shape plus where its progress goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub ddpg: DdpgConfig,
    pub log_dir: Option<PathBuf>,
    pub output_formats: Vec<OutputFormat>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ddpg: DdpgConfig::default(),
            log_dir: None,
            output_formats: vec![OutputFormat::Stdout, OutputFormat::Csv],
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("malformed run config")?;
        config.ddpg.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("could not read run config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

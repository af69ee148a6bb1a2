use super::SupervisorConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "gell";
const CONFIG_FILE_NAME: &str = "supervisor.yaml";

#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// `$XDG_CONFIG_HOME/gell/supervisor.yaml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE_NAME))
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// when present, otherwise built-in defaults apply. Returns the config and
    /// the file it came from, if any.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<(SupervisorConfig, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = self.load_config(path)?;
            return Ok((config, Some(path.to_path_buf())));
        }

        if let Some(path) = Self::default_config_path() {
            if path.is_file() {
                let config = self.load_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        tracing::debug!("No supervisor.yaml found, using built-in defaults");
        let config = SupervisorConfig::default();
        config.validate()?;
        Ok((config, None))
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<SupervisorConfig> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        self.parse_config(&content)
    }

    /// Parse YAML, expand `~/` paths and validate.
    pub fn parse_config(&self, content: &str) -> Result<SupervisorConfig> {
        let mut config: SupervisorConfig = if content.trim().is_empty() {
            SupervisorConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Write a config snapshot atomically (temp file + rename).
    pub fn write_config(&self, path: &Path, config: &SupervisorConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(config)?;
        crate::state::atomic_write(path, yaml.as_bytes())
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML, JSON or TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let format = Format::from_path(path)
            .with_context(|| format!("unsupported config format: {}", path.display()))?;

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config = match format {
            Format::Yaml => Self::from_yaml(&contents),
            Format::Json => Self::from_json(&contents),
            Format::Toml => Self::from_toml(&contents),
        };

        config.with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("failed to parse JSON configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source).context("failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.reload.max_attempts == 0 {
            anyhow::bail!("reload.max_attempts must be at least 1");
        }

        if self.reload.verify_attempts == 0 {
            anyhow::bail!("reload.verify_attempts must be at least 1");
        }

        if self.monitor.tick.is_zero() {
            anyhow::bail!("monitor.tick must be greater than zero");
        }

        if let Some(platform) = &self.connection.platform {
            if platform.core_name().is_err() {
                anyhow::bail!("connection.platform.core must not be empty");
            }
        }

        if !(0.0..=1.0).contains(&self.telemetry.trace_sample_rate) {
            anyhow::bail!("telemetry.trace_sample_rate must be between 0.0 and 1.0");
        }

        info!("configuration validated successfully");
        Ok(())
    }
}

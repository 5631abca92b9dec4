//! Platform-discovered connection parameters.
//!
//! The hosting platform exposes the search endpoint through `PANTHEON_INDEX_*`
//! environment variables. They are read once at startup into an immutable
//! [`PlatformConfig`] and composed with the file-sourced
//! [`ConnectionConfig`](super::ConnectionConfig) into [`ConnectionSettings`].

use std::time::Duration;

use serde::Deserialize;

use super::ConnectionConfig;
use crate::identity::{CoreName, InvalidCoreName};

pub const ENV_SCHEME: &str = "PANTHEON_INDEX_SCHEME";
pub const ENV_HOST: &str = "PANTHEON_INDEX_HOST";
pub const ENV_PORT: &str = "PANTHEON_INDEX_PORT";
pub const ENV_PATH: &str = "PANTHEON_INDEX_PATH";
pub const ENV_CORE: &str = "PANTHEON_INDEX_CORE";
pub const ENV_SCHEMA: &str = "PANTHEON_INDEX_SCHEMA";
pub const ENV_ENVIRONMENT: &str = "PANTHEON_ENVIRONMENT";

/// Search endpoint parameters supplied by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub schema: String,
}

impl PlatformConfig {
    /// Read the platform variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            scheme: get(ENV_SCHEME),
            host: get(ENV_HOST),
            port: get(ENV_PORT),
            path: get(ENV_PATH),
            core: get(ENV_CORE),
            schema: get(ENV_SCHEMA),
        }
    }

    /// True when every platform value is non-empty.
    pub fn is_present(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the variables that are empty or unset.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ENV_SCHEME, &self.scheme),
            (ENV_HOST, &self.host),
            (ENV_PORT, &self.port),
            (ENV_PATH, &self.path),
            (ENV_CORE, &self.core),
            (ENV_SCHEMA, &self.schema),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn core_name(&self) -> Result<CoreName, InvalidCoreName> {
        CoreName::new(self.core.clone())
    }

    /// Base URL of the admin API, always ending with `/`.
    pub fn base_url(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!("{}://{}:{}/", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}/{}/", self.scheme, self.host, self.port, path)
        }
    }
}

/// Platform and user settings composed at the point of use.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub platform: PlatformConfig,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ConnectionSettings {
    pub fn compose(platform: &PlatformConfig, user: &ConnectionConfig) -> Self {
        Self {
            platform: platform.clone(),
            timeout: user.timeout,
            connect_timeout: user.connect_timeout,
        }
    }

    pub fn base_url(&self) -> String {
        self.platform.base_url()
    }
}

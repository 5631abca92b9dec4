//! Core identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected core name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid core name: {0:?}")]
pub struct InvalidCoreName(pub String);

/// Name of a search core on the admin API.
///
/// Never empty. Leading and trailing slashes are stripped, since platform
/// variables carry the core as a path segment (`/core`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoreName(String);

impl CoreName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidCoreName> {
        let raw = name.into();
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(InvalidCoreName(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CoreName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CoreName {
    type Error = InvalidCoreName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoreName> for String {
    fn from(value: CoreName) -> Self {
        value.0
    }
}

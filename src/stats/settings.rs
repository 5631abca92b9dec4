use serde::Serialize;
use serde_json::Value;

use crate::client::{AdminClient, ClientError};
use crate::config::PlatformConfig;
use crate::schema::extract_schema_version;

/// One row of the settings view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub label: String,
    pub info: String,
}

impl Setting {
    fn new(label: impl Into<String>, info: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            info: info.into(),
        }
    }
}

/// Connection details plus every string entry the server reports under
/// `core` in `admin/system`.
pub async fn view_settings(
    client: &dyn AdminClient,
    platform: &PlatformConfig,
    environment: Option<&str>,
) -> Result<Vec<Setting>, ClientError> {
    let schema = client.view_file(Some("schema.xml")).await?;

    let mut settings = vec![
        Setting::new("Pantheon Sitename", platform.core.as_str()),
        Setting::new("Pantheon Environment", environment.unwrap_or_default()),
        Setting::new(
            "Schema Version",
            extract_schema_version(&schema).unwrap_or_default(),
        ),
    ];

    let core = platform
        .core_name()
        .map_err(|e| ClientError::Endpoint(e.to_string()))?;
    let info = client.server_info(&core).await?;

    if let Some(entries) = info.get("core").and_then(Value::as_object) {
        for (key, value) in entries {
            if let Value::String(text) = value {
                settings.push(Setting::new(capitalize_words(key), text.as_str()));
            }
        }
    }

    Ok(settings)
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

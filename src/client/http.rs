//! reqwest-backed admin client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, trace};

use super::{error_message, AdminClient, ClientError};
use crate::config::ConnectionSettings;
use crate::identity::CoreName;

/// Admin client talking to the platform search endpoint over HTTP.
pub struct HttpAdminClient {
    base: Url,
    client: Client,
}

impl std::fmt::Debug for HttpAdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdminClient")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl HttpAdminClient {
    /// Create a client for the composed connection settings.
    pub fn new(settings: &ConnectionSettings) -> Result<Self, ClientError> {
        let base = Url::parse(&settings.base_url())
            .map_err(|e| ClientError::Endpoint(format!("{}: {}", settings.base_url(), e)))?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to create HTTP client: {}", e)))?;

        debug!(base = %base, timeout_ms = settings.timeout.as_millis() as u64, "created admin client");

        Ok(Self { base, client })
    }

    /// Base URL every handler path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, handler: &str) -> Result<Url, ClientError> {
        self.base
            .join(handler)
            .map_err(|e| ClientError::Endpoint(format!("{}: {}", handler, e)))
    }

    /// GET a JSON handler and apply the admin error contract.
    async fn get_json(&self, handler: &str, query: &[(&str, &str)]) -> Result<Value, ClientError> {
        let url = self.url(handler)?;
        trace!(url = %url, ?query, "admin request");

        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&body);

        if status != StatusCode::OK {
            let message = parsed
                .ok()
                .and_then(|value| error_message(&value))
                .unwrap_or_else(|| "Unknown error".to_string());
            debug!(handler, status = status.as_u16(), message = %message, "admin request failed");
            return Err(ClientError::AdminOperation {
                status: status.as_u16(),
                message,
            });
        }

        let value = parsed?;
        if let Some(message) = error_message(&value) {
            return Err(ClientError::AdminOperation {
                status: status.as_u16(),
                message,
            });
        }

        Ok(value)
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn reload(&self, core: &CoreName) -> Result<Value, ClientError> {
        self.get_json(
            "admin/cores",
            &[("action", "RELOAD"), ("core", core.as_str()), ("wt", "json")],
        )
        .await
    }

    async fn core_status(&self, core: &CoreName) -> Result<Value, ClientError> {
        self.get_json(
            "admin/cores",
            &[("action", "STATUS"), ("core", core.as_str()), ("wt", "json")],
        )
        .await
    }

    async fn mbeans_stats(&self) -> Result<Value, ClientError> {
        self.get_json(
            "admin/mbeans",
            &[("stats", "true"), ("wt", "json"), ("json.nl", "flat")],
        )
        .await
    }

    async fn luke_stats(&self) -> Result<Value, ClientError> {
        self.get_json("admin/luke", &[("stats", "true"), ("wt", "json")])
            .await
    }

    async fn view_file(&self, name: Option<&str>) -> Result<String, ClientError> {
        let url = self.url("admin/file")?;
        let mut query = vec![("action", "VIEW")];
        if let Some(name) = name {
            query.push(("file", name));
        }

        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| error_message(&value))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ClientError::AdminOperation {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn server_info(&self, core: &CoreName) -> Result<Value, ClientError> {
        let handler = format!("{}/admin/system", core.as_str());
        self.get_json(&handler, &[("wt", "json")]).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;
    use std::time::Duration;

    fn settings(path: &str) -> ConnectionSettings {
        ConnectionSettings {
            platform: PlatformConfig {
                scheme: "http".to_string(),
                host: "localhost".to_string(),
                port: "8983".to_string(),
                path: path.to_string(),
                core: "main".to_string(),
                schema: "/schema".to_string(),
            },
            timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_handler_urls() {
        let client = HttpAdminClient::new(&settings("/solr")).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8983/solr/");
        assert_eq!(
            client.url("admin/cores").unwrap().as_str(),
            "http://localhost:8983/solr/admin/cores"
        );
        assert_eq!(
            client.url("main/admin/system").unwrap().as_str(),
            "http://localhost:8983/solr/main/admin/system"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut bad = settings("/solr");
        bad.platform.port = "not-a-port".to_string();
        let result = HttpAdminClient::new(&bad);
        assert!(matches!(result, Err(ClientError::Endpoint(_))));
    }
}

//! Point-in-time view of a core, built from a STATUS response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{AdminClient, ClientError};
use crate::identity::CoreName;
use crate::schema::extract_schema_version;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Milliseconds since the core was loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSection {
    #[serde(
        rename = "numDocs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub num_docs: Option<u64>,
}

/// Core status as seen by one check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreStatusSnapshot {
    #[serde(default)]
    pub core: CoreSection,

    #[serde(default)]
    pub schema: SchemaSection,

    #[serde(default)]
    pub index: IndexSection,

    /// STATUS response as received
    #[serde(default)]
    pub raw: Value,
}

impl CoreStatusSnapshot {
    /// Build a snapshot from a STATUS body and the schema version read
    /// separately from `schema.xml`.
    pub fn from_status(body: Value, core: &CoreName, schema_version: Option<String>) -> Self {
        let entry = body.get("status").and_then(|status| status.get(core.as_str()));

        let field = |name: &str| entry.and_then(|e| e.get(name));

        let snapshot_core = CoreSection {
            name: field("name").and_then(Value::as_str).map(str::to_string),
            uptime: field("uptime").and_then(as_u64),
        };
        let index = IndexSection {
            num_docs: field("index")
                .and_then(|index| index.get("numDocs"))
                .and_then(as_u64),
        };

        Self {
            core: snapshot_core,
            schema: SchemaSection {
                version: schema_version,
            },
            index,
            raw: body,
        }
    }

    /// Fetch STATUS and `schema.xml` for `core`.
    pub async fn fetch(client: &dyn AdminClient, core: &CoreName) -> Result<Self, ClientError> {
        let status = client.core_status(core).await?;
        let schema = client.view_file(Some("schema.xml")).await?;
        Ok(Self::from_status(status, core, extract_schema_version(&schema)))
    }

    /// True when the core reports a non-zero uptime.
    pub fn is_responding(&self) -> bool {
        self.core.uptime.unwrap_or(0) >= 1
    }
}

/// Uptime and counts may come back as floats or strings from older servers.
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AdminAction, MockAdminClient, MockReply};
    use serde_json::json;

    fn core() -> CoreName {
        CoreName::new("main").unwrap()
    }

    #[test]
    fn test_from_status() {
        let body = json!({
            "status": {
                "main": {"name": "main", "uptime": 12345, "index": {"numDocs": 42}}
            }
        });
        let snapshot = CoreStatusSnapshot::from_status(body, &core(), Some("1.6".to_string()));

        assert_eq!(snapshot.core.name.as_deref(), Some("main"));
        assert_eq!(snapshot.core.uptime, Some(12345));
        assert_eq!(snapshot.index.num_docs, Some(42));
        assert_eq!(snapshot.schema.version.as_deref(), Some("1.6"));
        assert!(snapshot.is_responding());
    }

    #[test]
    fn test_missing_core_entry() {
        let snapshot = CoreStatusSnapshot::from_status(json!({"status": {}}), &core(), None);
        assert_eq!(snapshot.core, CoreSection::default());
        assert!(!snapshot.is_responding());
    }

    #[test]
    fn test_serialized_shape_omits_absent_members() {
        let snapshot = CoreStatusSnapshot::from_status(
            json!({"status": {"main": {"name": "main", "uptime": 0}}}),
            &core(),
            None,
        );
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["core"], json!({"name": "main", "uptime": 0}));
        assert_eq!(value["schema"], json!({}));
        assert_eq!(value["index"], json!({}));

        let back: CoreStatusSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_numeric_leniency() {
        assert_eq!(as_u64(&json!(5)), Some(5));
        assert_eq!(as_u64(&json!(5.9)), Some(5));
        assert_eq!(as_u64(&json!("17")), Some(17));
        assert_eq!(as_u64(&json!(-1)), None);
        assert_eq!(as_u64(&json!(null)), None);
    }

    #[tokio::test]
    async fn test_fetch_reads_schema_version() {
        let mock = MockAdminClient::healthy("main");
        let snapshot = CoreStatusSnapshot::fetch(&mock, &core()).await.unwrap();

        assert_eq!(snapshot.schema.version.as_deref(), Some("1.6"));
        assert_eq!(snapshot.core.uptime, Some(60_000));
        assert_eq!(mock.calls(AdminAction::File), 1);
    }

    #[tokio::test]
    async fn test_fetch_propagates_errors() {
        let mock = MockAdminClient::healthy("main")
            .with_fallback(AdminAction::Status, MockReply::transport("refused"));
        assert!(CoreStatusSnapshot::fetch(&mock, &core()).await.is_err());
        assert_eq!(mock.calls(AdminAction::File), 0);
    }
}

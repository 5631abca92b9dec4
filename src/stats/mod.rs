//! Operator-facing summaries built from the admin API.

mod settings;

pub use settings::{view_settings, Setting};

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::client::{AdminClient, ClientError};
use crate::notify::{Notifier, UserMessage};
use crate::schema::extract_schema_version;

const UPDATE_PREFIX: &str = "UPDATE.updateHandler.";

/// Index and update handler statistics. Every field is absent when the
/// server could not be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub pending_docs: Option<i64>,
    pub autocommit_time_seconds: Option<f64>,
    /// Humanised soft autocommit interval
    pub autocommit_time: Option<String>,
    pub deletes_by_id: Option<i64>,
    pub deletes_by_query: Option<i64>,
    pub deletes_total: Option<i64>,
    pub schema_version: Option<String>,
    pub core_name: Option<String>,
    pub index_size: Option<u64>,
}

impl StatsSummary {
    /// Fetch mbeans and luke statistics and summarise them.
    ///
    /// A fetch failure queues one error message and yields the empty summary.
    pub async fn collect(client: &dyn AdminClient, notifier: &dyn Notifier) -> Self {
        let fetched = async {
            let mbeans = client.mbeans_stats().await?;
            let luke = client.luke_stats().await?;
            Ok::<_, ClientError>((mbeans, luke))
        }
        .await;

        let (mbeans, luke) = match fetched {
            Ok(bodies) => bodies,
            Err(e) => {
                warn!(error = %e, "stats fetch failed");
                notifier.message(UserMessage::error("Unable to get stats from server!"));
                return Self::default();
            }
        };

        let schema_version = match client.view_file(Some("schema.xml")).await {
            Ok(schema) => extract_schema_version(&schema),
            Err(e) => {
                warn!(error = %e, "schema.xml unavailable for stats");
                None
            }
        };

        Self::from_responses(&mbeans, &luke, schema_version)
    }

    /// Summarise already fetched `admin/mbeans` (flat) and `admin/luke` bodies.
    pub fn from_responses(mbeans: &Value, luke: &Value, schema_version: Option<String>) -> Self {
        let beans = parse_mbeans(mbeans);
        let index = luke.get("index").and_then(Value::as_object);

        let Some(index) = index.filter(|index| !index.is_empty()) else {
            return Self::default();
        };
        if beans.is_empty() {
            return Self::default();
        }

        let update = beans
            .get("UPDATE")
            .and_then(|u| u.get("updateHandler"))
            .and_then(|h| h.get("stats"));
        let stat = |name: &str| {
            update
                .and_then(|stats| stats.get(format!("{UPDATE_PREFIX}{name}")))
                .and_then(as_i64)
        };

        let max_time = stat("softAutoCommitMaxTime").unwrap_or(-1);
        let deletes_by_id = stat("deletesById").unwrap_or(-1);
        let deletes_by_query = stat("deletesByQuery").unwrap_or(-1);

        Self {
            pending_docs: Some(stat("docsPending").unwrap_or(-1)),
            autocommit_time_seconds: Some(max_time as f64 / 1000.0),
            autocommit_time: Some(format_interval(max_time)),
            deletes_by_id: Some(deletes_by_id),
            deletes_by_query: Some(deletes_by_query),
            deletes_total: Some(deletes_by_id + deletes_by_query),
            schema_version,
            core_name: beans
                .get("CORE")
                .and_then(|c| c.get("core"))
                .and_then(|c| c.get("class"))
                .and_then(Value::as_str)
                .map(str::to_string),
            index_size: index.get("numDocs").and_then(as_i64).map(|n| n.max(0) as u64),
        }
    }
}

/// Fold the flat `solr-mbeans` list (`["CORE", {...}, "UPDATE", {...}]`) into
/// a map. A trailing name without a value is dropped.
pub fn parse_mbeans(body: &Value) -> Map<String, Value> {
    let mut beans = Map::new();
    let Some(list) = body.get("solr-mbeans").and_then(Value::as_array) else {
        return beans;
    };

    for pair in list.chunks(2) {
        if let [Value::String(name), value] = pair {
            beans.insert(name.clone(), value.clone());
        }
    }
    beans
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn format_interval(millis: i64) -> String {
    if millis < 0 {
        return "disabled".to_string();
    }
    let secs = u64::try_from(millis / 1000).unwrap_or(0);
    if secs == 0 {
        return "0s".to_string();
    }
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

//! Admin API client for a search-engine core.
//!
//! Every component that talks to the search server goes through the
//! [`AdminClient`] trait:
//!
//! - [`HttpAdminClient`]: reqwest-backed client for the real admin API
//! - [`MockAdminClient`]: scripted responses and call counters, for tests
//!   and dry runs

mod error;
mod http;
mod mock;

pub use error::ClientError;
pub use http::HttpAdminClient;
pub use mock::{AdminAction, MockAdminClient, MockReply};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::identity::CoreName;

/// Administrative operations against a search server.
///
/// JSON handlers return the decoded body. Implementations turn a non-200
/// status, or a body carrying an `error` member, into
/// [`ClientError::AdminOperation`].
#[async_trait]
pub trait AdminClient: Send + Sync {
    /// `admin/cores?action=RELOAD&core=<core>`
    async fn reload(&self, core: &CoreName) -> Result<Value, ClientError>;

    /// `admin/cores?action=STATUS&core=<core>`
    async fn core_status(&self, core: &CoreName) -> Result<Value, ClientError>;

    /// `admin/mbeans?stats=true&json.nl=flat`
    async fn mbeans_stats(&self) -> Result<Value, ClientError>;

    /// `admin/luke?stats=true`
    async fn luke_stats(&self) -> Result<Value, ClientError>;

    /// `admin/file?action=VIEW[&file=<name>]`, raw contents.
    async fn view_file(&self, name: Option<&str>) -> Result<String, ClientError>;

    /// `<core>/admin/system`
    async fn server_info(&self, core: &CoreName) -> Result<Value, ClientError>;

    /// Client name for logging.
    fn name(&self) -> &'static str;
}

/// A shared admin client.
pub type SharedAdminClient = Arc<dyn AdminClient>;

/// Server-reported error message (`error.msg`), if the body carries one.
pub fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    if error.is_null() {
        return None;
    }
    Some(
        error
            .get("msg")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown error".to_string()),
    )
}

/// True when a STATUS response lists `core` under its own name.
pub fn status_confirms(body: &Value, core: &CoreName) -> bool {
    body.get("status")
        .and_then(|status| status.get(core.as_str()))
        .and_then(|entry| entry.get("name"))
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty() && name == core.as_str())
}

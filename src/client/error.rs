use thiserror::Error;

/// Errors raised by the admin API client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The admin API could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered but reported a failure.
    #[error("admin request failed with status code {status}: {message}")]
    AdminOperation { status: u16, message: String },

    /// The response body was not what the handler returns.
    #[error("invalid response: {0}")]
    Parse(String),

    /// The base URL or handler path is malformed.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl ClientError {
    /// Failure reported by the server rather than the network.
    pub fn is_admin_operation(&self) -> bool {
        matches!(self, Self::AdminOperation { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_operation_display() {
        let err = ClientError::AdminOperation {
            status: 500,
            message: "Error handling 'reload' action".to_string(),
        };
        assert!(err.is_admin_operation());
        assert_eq!(
            err.to_string(),
            "admin request failed with status code 500: Error handling 'reload' action"
        );
    }

    #[test]
    fn test_parse_from_json_error() {
        let err: ClientError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ClientError::Parse(_)));
        assert!(!err.is_admin_operation());
    }
}

//! Error taxonomy for node calls and configuration.
//!
//! Per-call failures never escape as panics or `Err` values past the safe call
//! boundary: they are captured as a [`FetchError`] and carried alongside the
//! (defaulted) record they belong to, so a renderer can show per-panel failure
//! state while the rest of the snapshot stays usable.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed node call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The call (or the whole fetch batch) ran past its deadline.
    Timeout,
    /// TCP connect failed or the connect phase timed out.
    ConnectionFailed,
    /// The node answered with a non-200 status.
    HttpError { status: u16 },
    /// The body was not a JSON object.
    InvalidJson,
    /// The node id is not in the endpoint registry.
    InvalidNodeId,
    /// The node's role does not offer the requested capability.
    InvalidRoleForCapability,
    /// Anything else, including faults caught at the orchestrator boundary.
    Unknown,
}

impl FetchErrorKind {
    /// Stable snake_case code, suitable for logs and JSON consumers.
    pub fn code(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::HttpError { .. } => "http_error",
            Self::InvalidJson => "invalid_json",
            Self::InvalidNodeId => "invalid_node_id",
            Self::InvalidRoleForCapability => "invalid_role_for_capability",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailed)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpError { status } => write!(f, "http_error({status})"),
            other => f.write_str(other.code()),
        }
    }
}

/// A structured failure record for one node call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<u32>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            node_id: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_node(mut self, node_id: u32) -> Self {
        self.node_id = Some(node_id);
        self
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Unknown, message)
    }

    pub fn invalid_node(node_id: u32) -> Self {
        Self::new(
            FetchErrorKind::InvalidNodeId,
            format!("node {node_id} is not configured"),
        )
        .with_node(node_id)
    }

    pub fn invalid_role(node_id: u32, capability: &str) -> Self {
        Self::new(
            FetchErrorKind::InvalidRoleForCapability,
            format!("node {node_id} does not serve {capability}"),
        )
        .with_node(node_id)
    }

    /// Human-readable description for a failure panel.
    pub fn describe(&self) -> String {
        match self.kind {
            FetchErrorKind::ConnectionFailed => "Node is offline or unreachable".to_string(),
            FetchErrorKind::Timeout => "Request timed out - node may be overloaded".to_string(),
            FetchErrorKind::HttpError { status } => format!("HTTP error: {status}"),
            FetchErrorKind::InvalidJson => "Node returned a malformed response".to_string(),
            FetchErrorKind::InvalidNodeId => "Invalid node configuration".to_string(),
            FetchErrorKind::InvalidRoleForCapability => {
                "Node does not provide this data".to_string()
            }
            FetchErrorKind::Unknown => format!("Unexpected error: {}", self.message),
        }
    }
}

/// Errors raised while loading or validating [`crate::WatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid node entry {entry:?}: {reason}")]
    InvalidNode { entry: String, reason: String },

    #[error("duplicate node id {0}")]
    DuplicateNode(u32),

    #[error("no nodes configured")]
    NoNodes,

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_snake_case() {
        assert_eq!(FetchErrorKind::ConnectionFailed.code(), "connection_failed");
        assert_eq!(FetchErrorKind::HttpError { status: 503 }.code(), "http_error");
        assert_eq!(
            FetchErrorKind::InvalidRoleForCapability.code(),
            "invalid_role_for_capability"
        );
    }

    #[test]
    fn test_display_includes_status() {
        let kind = FetchErrorKind::HttpError { status: 404 };
        assert_eq!(kind.to_string(), "http_error(404)");
        assert_eq!(FetchErrorKind::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_transient_kinds() {
        assert!(FetchErrorKind::Timeout.is_transient());
        assert!(FetchErrorKind::ConnectionFailed.is_transient());
        assert!(!FetchErrorKind::InvalidJson.is_transient());
        assert!(!FetchErrorKind::HttpError { status: 500 }.is_transient());
    }

    #[test]
    fn test_builders_attach_context() {
        let err = FetchError::timeout("slow")
            .with_url("http://localhost:8100/health")
            .with_node(1);
        assert_eq!(err.kind, FetchErrorKind::Timeout);
        assert_eq!(err.url.as_deref(), Some("http://localhost:8100/health"));
        assert_eq!(err.node_id, Some(1));
        assert_eq!(err.to_string(), "timeout: slow");
    }

    #[test]
    fn test_describe_unknown_keeps_message() {
        let err = FetchError::unknown("task panicked");
        assert_eq!(err.describe(), "Unexpected error: task panicked");
    }

    #[test]
    fn test_serializes_with_code_tag() {
        let err = FetchError::new(FetchErrorKind::HttpError { status: 500 }, "HTTP 500");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"]["code"], "http_error");
        assert_eq!(json["kind"]["status"], 500);
        assert!(json.get("url").is_none());
    }
}

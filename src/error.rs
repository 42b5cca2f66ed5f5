//! Error types for fetch, retry and boundary operations.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Message used when a structured failure carries no message of its own.
pub const DEFAULT_API_ERROR_MESSAGE: &str = "An error occurred";

/// Message used when a producer fault has an empty description.
pub const DEFAULT_NETWORK_ERROR_MESSAGE: &str = "Network error occurred";

/// Message used when a contained panic carries no readable payload.
pub const DEFAULT_RENDER_ERROR_MESSAGE: &str = "Rendering failed";

/// Result type for crate-level operations.
pub type FetchResult<T> = Result<T, BuildError>;

/// Category tag carried by every [`ErrorInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A panic was contained by an [`ErrorBoundary`](crate::ErrorBoundary).
    Render,

    /// The producer returned a structured `success: false` response.
    Api,

    /// The producer failed outright.
    Network,

    /// A caller-defined category.
    Custom(String),
}

impl ErrorCode {
    /// Returns the wire tag for this code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Render => "REACT_ERROR",
            ErrorCode::Api => "API_ERROR",
            ErrorCode::Network => "NETWORK_ERROR",
            ErrorCode::Custom(tag) => tag.as_str(),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(tag: &str) -> Self {
        match tag {
            "REACT_ERROR" => ErrorCode::Render,
            "API_ERROR" => ErrorCode::Api,
            "NETWORK_ERROR" => ErrorCode::Network,
            other => ErrorCode::Custom(other.to_string()),
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ErrorCode::from(tag.as_str()))
    }
}

/// Normalized failure record surfaced through fetch state and boundaries.
///
/// Fields are private; an `ErrorInfo` cannot change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    details: Value,
    #[serde(with = "iso_millis")]
    timestamp: DateTime<Utc>,
}

impl ErrorInfo {
    /// Creates a record stamped with the current time.
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }

    /// Creates an `API_ERROR` record.
    pub fn api(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::Api, message, details)
    }

    /// Creates a `NETWORK_ERROR` record.
    pub fn network(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::Network, message, details)
    }

    /// Creates a `REACT_ERROR` record.
    pub fn render(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::Render, message, details)
    }

    /// The category tag.
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Opaque structured context, `Value::Null` when absent.
    pub fn details(&self) -> &Value {
        &self.details
    }

    /// The instant this record was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The creation instant as ISO-8601 with millisecond precision.
    pub fn timestamp_iso(&self) -> String {
        iso_millis::format(&self.timestamp)
    }
}

/// `timestamp` on the wire: RFC 3339, UTC, millisecond precision.
mod iso_millis {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(super) fn format(timestamp: &DateTime<Utc>) -> String {
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub(super) fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(timestamp))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for ErrorInfo {}

/// Errors raised while assembling a fetch handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// No Tokio runtime is active on the calling thread.
    NoRuntime,
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoRuntime => write!(f, "Fetch handles must be built inside a Tokio runtime"),
        }
    }
}

impl Error for BuildError {}

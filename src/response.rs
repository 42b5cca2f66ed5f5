//! Structured producer results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ErrorInfo, DEFAULT_API_ERROR_MESSAGE};

/// Message used when a response claims success but carries no payload.
pub const MISSING_DATA_MESSAGE: &str = "Response reported success without data";

/// The envelope a producer resolves with.
///
/// Matches the JSON shape `{ "success": bool, "data": ..., "message": ..., "error": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the remote operation succeeded.
    pub success: bool,

    /// The payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// A human-readable explanation, usually present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// A machine-oriented error string some endpoints return instead of `message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// A structured failure with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Splits the envelope into its payload or an `API_ERROR` record.
    pub(crate) fn into_payload(self) -> Result<T, ErrorInfo> {
        let envelope = json!({
            "success": self.success,
            "message": self.message,
            "error": self.error,
        });

        match self {
            ApiResponse {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            ApiResponse { success: true, .. } => {
                Err(ErrorInfo::api(MISSING_DATA_MESSAGE, details(envelope)))
            }
            ApiResponse { message, error, .. } => {
                let message = message
                    .or(error)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_API_ERROR_MESSAGE.to_string());
                Err(ErrorInfo::api(message, details(envelope)))
            }
        }
    }
}

fn details(envelope: Value) -> Value {
    json!({ "response": envelope })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn deserializes_failure_without_data() {
        let response: ApiResponse<Vec<u32>> =
            serde_json::from_str(r#"{"success":false,"message":"Out of stock"}"#).unwrap();

        assert!(!response.success);
        assert_eq!(response.data, None);
        assert_eq!(response.message.as_deref(), Some("Out of stock"));
    }

    #[test]
    fn failure_message_falls_back_to_error_then_default() {
        let from_error = ApiResponse::<u8> {
            success: false,
            data: None,
            message: None,
            error: Some("rate limited".to_string()),
        };
        assert_eq!(from_error.into_payload().unwrap_err().message(), "rate limited");

        let bare = ApiResponse::<u8> {
            success: false,
            data: None,
            message: None,
            error: None,
        };
        let err = bare.into_payload().unwrap_err();
        assert_eq!(err.code(), &ErrorCode::Api);
        assert_eq!(err.message(), DEFAULT_API_ERROR_MESSAGE);
        assert_eq!(err.details()["response"]["success"], false);
    }

    #[test]
    fn success_without_data_is_an_api_error() {
        let response: ApiResponse<u8> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        let err = response.into_payload().unwrap_err();
        assert_eq!(err.code(), &ErrorCode::Api);
        assert_eq!(err.message(), MISSING_DATA_MESSAGE);
    }
}

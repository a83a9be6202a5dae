//! The REST seam between the stores and the server.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One call against the API, path relative to [`crate::config::API_PREFIX`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Full `Authorization` header value, e.g. `Bearer abc`.
    pub authorization: Option<String>,
}

/// Anything that can answer API requests with JSON.
#[async_trait]
pub trait RestSource: Send + Sync {
    /// Perform the request; a non-2xx answer or transport failure is an error.
    async fn send(&self, request: ApiRequest) -> Result<Value, RemoteError>;
}

/// Structured error body returned by the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    #[serde(rename = "Messages", default)]
    pub messages: Vec<String>,
}

/// A failed remote call.
///
/// `status` is 0 when the server could not be reached. The display form is
/// what a failed record shows: `(<status>): <messages>` when the server sent
/// a structured body, the bare status otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RemoteError {
    pub status: u16,
    pub messages: Option<Vec<String>>,
}

impl RemoteError {
    pub fn new(status: u16, messages: &[&str]) -> RemoteError {
        RemoteError {
            status,
            messages: Some(messages.iter().map(|m| m.to_string()).collect()),
        }
    }

    /// Failure without a structured body.
    pub fn status_only(status: u16) -> RemoteError {
        RemoteError {
            status,
            messages: None,
        }
    }

    /// The server could not be reached.
    pub fn unreachable() -> RemoteError {
        RemoteError::status_only(0)
    }

    /// A response that arrived but could not be understood.
    pub fn malformed(status: u16, detail: &str) -> RemoteError {
        RemoteError {
            status,
            messages: Some(vec![format!("malformed response: {detail}")]),
        }
    }

    /// Build from a non-2xx response body.
    pub fn from_body(status: u16, body: &str) -> RemoteError {
        if body.trim().is_empty() {
            return RemoteError::status_only(status);
        }
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if parsed.messages.is_empty() => RemoteError::status_only(status),
            Ok(parsed) => RemoteError {
                status,
                messages: Some(parsed.messages),
            },
            Err(e) => {
                log::debug!("error body for status {status} is not structured: {e}");
                RemoteError::status_only(status)
            }
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.messages {
            Some(messages) => write!(f, "({}): {}", self.status, messages.join(", ")),
            None => write!(f, "{}", self.status),
        }
    }
}

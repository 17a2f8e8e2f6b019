//! Client Error Types
//!
//! Centralized error handling for the realtime client, the transport layer and
//! the REST provisioning services.

use serde::Serialize;

/// Fallback message when the server reports a failure without an error string.
const GENERIC_ERROR: &str = "Generic error.";

/// Error returned by every public realtime client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Operation timed out.")]
    Timeout,

    #[error("Operation cancelled.")]
    Cancelled,

    #[error("{message}")]
    Protocol { message: String, transient: bool },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to connect. {0}")]
    Connect(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Build a protocol error from the server's `error` field.
    ///
    /// The string has the shape `<code>:<retry-seconds>:<message>`; transience is
    /// derived from the code.
    pub fn protocol(error: Option<&str>) -> Self {
        match error {
            Some(message) => Self::Protocol {
                message: message.to_string(),
                transient: is_transient(Some(message)),
            },
            None => Self::Protocol {
                message: GENERIC_ERROR.to_string(),
                transient: false,
            },
        }
    }

    /// Whether the caller may retry the operation.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Protocol { transient, .. } => *transient,
            Self::Cancelled
            | Self::InvalidResponse(_)
            | Self::Socket(_)
            | Self::InvalidState(_)
            | Self::Serialization(_) => false,
        }
    }
}

/// Parse a Bayeux error string and decide whether it is transient.
///
/// Transient iff there are at least three colon-delimited fields and the
/// numeric code is 408 or at least 500.
pub fn is_transient(error: Option<&str>) -> bool {
    let Some(message) = error.filter(|m| !m.trim().is_empty()) else {
        return false;
    };

    let items: Vec<&str> = message.split(':').collect();
    if items.len() < 3 {
        return false;
    }

    match items[0].trim().parse::<i32>() {
        Ok(code) => code == 408 || code >= 500,
        Err(_) => false,
    }
}

/// Errors raised at the socket boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Socket is not connected")]
    NotConnected,

    #[error("{0}")]
    Faulted(String),

    #[error("{0}")]
    Fatal(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => ClientError::Connect(err.to_string()),
            TransportError::Faulted(msg) => ClientError::Connect(msg),
            TransportError::Fatal(msg) => ClientError::Socket(msg),
        }
    }
}

/// Errors raised while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty envelope array")]
    Empty,
}

/// Error returned by the REST provisioning services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    /// A successful call whose body lacked the expected value.
    pub fn null_result() -> Self {
        Self::new("Null result.", None)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        tracing::debug!(error = %err, "Provisioning request failed");
        Self::new(err.to_string(), status_code)
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::new(err.to_string(), None)
    }
}

//! Error types for the HTTP layer.

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, DNS...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, as text (may be empty).
        body: String,
    },

    /// The identity provider could not produce a token; the session has
    /// been cleared and logged out.
    #[error("session is no longer authenticated")]
    Unauthenticated,

    /// The response body didn't match the expected type.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The client was built or used with invalid settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ApiError {
    /// The HTTP status, when the server responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` for status ≥ 500, the only class the client redirects on.
    pub fn is_server_fault(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }

    /// `true` for 4xx responses.
    pub fn is_client_fault(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }
}

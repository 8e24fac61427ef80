use pan_xml::ResponseError;

/// Errors returned by the management API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The device could not be reached at all.
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not a usable `<response>` envelope.
    #[error("unreadable API response (HTTP {status}): {source}")]
    Response {
        status: u16,
        #[source]
        source: ResponseError,
    },

    /// The device answered with a non-success status.
    #[error("request rejected: {message}")]
    Rejected { request: String, message: String },
}

impl ApiError {
    /// True when retrying is pointless because the device is unreachable.
    pub fn is_connect(&self) -> bool {
        matches!(self, ApiError::Connect { .. })
    }
}

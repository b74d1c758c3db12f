use std::time::Duration;

/// Failure of one HTTP exchange.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("invalid URL `{url}`: {reason}")]
    Url { url: String, reason: String },

    #[error("URL scheme `{0}` is not allowed")]
    Scheme(String),

    #[error("invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Connection refused or reset, protocol error, broken body stream.
    #[error("connection failed: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("HTTP {status}: {preview}")]
    Status {
        status: http::StatusCode,
        preview: String,
    },
}

impl HttpError {
    /// No usable HTTP exchange took place.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_) | Self::Tls(_))
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        Self::Connect(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        Self::Connect(Box::new(err))
    }
}

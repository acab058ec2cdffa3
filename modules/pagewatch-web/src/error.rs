/// Result type alias for fetch and extraction operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered with an error status other than 403.
    #[error("HTTP {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Timeout, connection reset, DNS failure, or a body that could not be read.
    #[error("Request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failure outside the HTTP transport, e.g. from a non-network fetcher.
    #[error("Fetch failed: {0}")]
    Failed(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

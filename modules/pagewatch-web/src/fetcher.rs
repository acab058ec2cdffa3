use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::{FetchError, Result};

/// Desktop Chrome identity. Some boards refuse obvious bot agents outright.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page and return its body.
    ///
    /// A 403 is not an error: it yields `Ok(None)` so the caller can move on.
    /// Any other 4xx/5xx status, and every network failure, is an `Err`.
    async fn fetch(&self, url: &str) -> Result<Option<String>>;
}

/// reqwest-backed fetcher with a browser user agent and a bounded timeout.
/// No retries: a failed request fails the surrounding check cycle.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        debug!(url, "HTTP fetch starting");

        let target = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            warn!(url, "403 Forbidden, treating page as unavailable");
            return Ok(None);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        debug!(url, bytes = body.len(), "HTTP fetch complete");
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::response::Html;
    use axum::routing::get;
    use axum::Router;

    async fn serve() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { Html("<p>hello</p>") }))
            .route("/forbidden", get(|| async { StatusCode::FORBIDDEN }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route(
                "/ua",
                get(|headers: HeaderMap| async move {
                    headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn success_returns_body() {
        let base = serve().await;
        let body = fetcher().fetch(&format!("{base}/ok")).await.unwrap();
        assert_eq!(body.as_deref(), Some("<p>hello</p>"));
    }

    #[tokio::test]
    async fn forbidden_is_absent_not_error() {
        let base = serve().await;
        let body = fetcher().fetch(&format!("{base}/forbidden")).await.unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn other_error_statuses_fail() {
        let base = serve().await;

        let err = fetcher().fetch(&format!("{base}/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::NOT_FOUND));

        let err = fetcher().fetch(&format!("{base}/broken")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status.is_server_error()));
    }

    #[tokio::test]
    async fn sends_browser_user_agent() {
        let base = serve().await;
        let body = fetcher().fetch(&format!("{base}/ua")).await.unwrap();
        assert_eq!(body.as_deref(), Some(BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn timeout_is_a_request_failure() {
        let base = serve().await;
        let fast = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let err = fast.fetch(&format!("{base}/slow")).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }

    #[tokio::test]
    async fn unparseable_url_is_rejected_before_sending() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher().fetch(&format!("http://{addr}/")).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}

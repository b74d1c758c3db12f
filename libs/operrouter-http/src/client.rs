use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderValue, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HttpError;
use crate::policy::{self, RootStore};

pub const DEFAULT_USER_AGENT: &str = concat!("operrouter-http/", env!("CARGO_PKG_VERSION"));

const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Characters of a failed response body kept in [`HttpError::Status`].
const PREVIEW_CHARS: usize = 256;

type Pool = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Pooled JSON-over-HTTP client. Clones share the pool.
#[derive(Clone)]
pub struct JsonClient {
    pool: Pool,
    timeout: Duration,
    body_limit: usize,
    user_agent: HeaderValue,
    plain_http: bool,
}

impl std::fmt::Debug for JsonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonClient")
            .field("timeout", &self.timeout)
            .field("body_limit", &self.body_limit)
            .field("plain_http", &self.plain_http)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct JsonClientBuilder {
    timeout: Duration,
    user_agent: String,
    body_limit: usize,
    plain_http: bool,
    roots: RootStore,
    idle_per_host: usize,
}

impl Default for JsonClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            body_limit: DEFAULT_BODY_LIMIT,
            plain_http: false,
            roots: RootStore::default(),
            idle_per_host: 8,
        }
    }
}

impl JsonClientBuilder {
    /// Bound on the whole exchange: connect, send and body read.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Largest response body accepted, in bytes.
    #[must_use]
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Permit `http://` URLs. Off by default.
    #[must_use]
    pub fn plain_http(mut self, allow: bool) -> Self {
        self.plain_http = allow;
        self
    }

    #[must_use]
    pub fn roots(mut self, roots: RootStore) -> Self {
        self.roots = roots;
        self
    }

    /// # Errors
    /// Fails when the user agent is not a valid header value or TLS cannot
    /// be set up.
    pub fn build(self) -> Result<JsonClient, HttpError> {
        let user_agent = HeaderValue::from_str(&self.user_agent)?;
        let connector = policy::connector(self.roots, self.plain_http)?;

        let pool = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(self.idle_per_host)
            .build(connector);

        Ok(JsonClient {
            pool,
            timeout: self.timeout,
            body_limit: self.body_limit,
            user_agent,
            plain_http: self.plain_http,
        })
    }
}

/// Status and fully read body of one response.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: Bytes,
}

impl Reply {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Keep 2xx replies, turn anything else into [`HttpError::Status`].
    ///
    /// # Errors
    /// Non-2xx status.
    pub fn ensure_success(self) -> Result<Self, HttpError> {
        if self.status.is_success() {
            return Ok(self);
        }
        let preview: String = String::from_utf8_lossy(&self.body)
            .chars()
            .take(PREVIEW_CHARS)
            .collect();
        Err(HttpError::Status {
            status: self.status,
            preview,
        })
    }

    /// # Errors
    /// The body is not JSON of shape `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice(&self.body).map_err(HttpError::Decode)
    }
}

impl JsonClient {
    #[must_use]
    pub fn builder() -> JsonClientBuilder {
        JsonClientBuilder::default()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` as JSON and read the whole response, whatever its status.
    ///
    /// # Errors
    /// Rejected URL, unserializable body, connection failure, timeout, or a
    /// body over the size limit.
    pub async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Reply, HttpError> {
        let uri = policy::check_url(url, self.plain_http)?;
        let payload = serde_json::to_vec(body).map_err(HttpError::Encode)?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.clone())
            .body(Full::new(Bytes::from(payload)))?;

        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| HttpError::Timeout(self.timeout))?
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> Result<Reply, HttpError> {
        let response = self.pool.request(request).await?;
        let status = response.status();
        let body = read_limited(response.into_body(), self.body_limit).await?;
        tracing::trace!(status = status.as_u16(), bytes = body.len(), "response read");
        Ok(Reply { status, body })
    }
}

async fn read_limited(body: Incoming, limit: usize) -> Result<Bytes, HttpError> {
    let mut body = std::pin::pin!(body);
    let mut buf = Vec::new();

    while let Some(frame) = body.frame().await {
        if let Some(chunk) = frame?.data_ref() {
            if buf.len() + chunk.len() > limit {
                return Err(HttpError::TooLarge { limit });
            }
            buf.extend_from_slice(chunk);
        }
    }
    Ok(Bytes::from(buf))
}

//! Network fetches for the cache worker.
//!
//! ### Semantics
//! - Any HTTP status is a completed fetch; only transport failures are errors
//! - Timeouts map to `FETCH_TIMEOUT`, other transport failures to `NETWORK_ERROR`
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! The dispatcher only sees the [`Fetcher`] trait, so tests substitute
//! scripted fakes for [`HttpFetcher`].

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, header};

pub use url::{UrlError, resolve};

use sp1sh_core::{AppConfig, Error, Request, Response};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sp1sh-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "sp1sh-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Something that can put a request on the network.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Resolves for every HTTP status; errors only when
    /// no response arrived.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Whether a body of `len` bytes breaks the size cap. Lengths that do not
    /// fit in `usize` always do.
    fn over_limit(&self, len: u64) -> bool {
        usize::try_from(len).unwrap_or(usize::MAX) > self.config.max_bytes
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(err: reqwest::Error, url: &reqwest::Url) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, &request.url))?;

        if let Some(len) = response.content_length()
            && self.over_limit(len)
        {
            return Err(self.too_large(len));
        }

        let status = response.status();
        let mut headers = BTreeMap::new();
        for name in response.headers().keys() {
            let values: Vec<&str> = response
                .headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            if !values.is_empty() {
                headers.insert(name.as_str().to_string(), values.join(", "));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, &request.url))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len() as u64));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes.to_vec(),
        })
    }
}

/// Content type the response declares, without parameters.
pub fn media_type(response: &Response) -> Option<&str> {
    response
        .header(header::CONTENT_TYPE.as_str())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
}
